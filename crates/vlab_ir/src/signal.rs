//! Signal definitions and references.
//!
//! A [`Signal`] represents a materialized net or register within a scope,
//! as produced by the Signal Elaborator (§4.3). [`SignalRef`] provides a
//! way to refer to a full signal, a bit-slice, or a concatenation from a
//! structural (pin-binding) context.

use serde::{Deserialize, Serialize};
use vlab_common::{Ident, LogicVec};
use vlab_source::Span;

use crate::ids::{CellId, ScopeId, SignalId};
use crate::types::ValueKind;
use vlab_pform::PNetKind;

/// Port direction of a signal, as resolved by the Signal Elaborator.
///
/// Distinct from [`vlab_pform::PDirection`]: `Implicit` ports are resolved
/// to one of the other three by the time a [`Signal`] exists, and signals
/// with no port role at all are tagged `NotAPort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// An input port.
    Input,
    /// An output port.
    Output,
    /// A bidirectional port.
    InOut,
    /// Declared with no resolvable direction (recorded as an error).
    Implicit,
    /// Not a port: an ordinary internal signal.
    NotAPort,
}

/// A materialized signal (net or register), scalar or vector, possibly a
/// "memory" array of words.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// The unique ID of this signal within its scope.
    pub id: SignalId,
    /// The signal's local name.
    pub name: Ident,
    /// The owning scope.
    pub scope: ScopeId,
    /// The declared net/variable kind (wire, reg, integer, real, supply).
    pub net_kind: PNetKind,
    /// The self-determined value domain (LOGIC, BOOL, REAL per §4.3).
    pub value_kind: ValueKind,
    /// Bit width. `1` for a scalar declaration.
    pub width: u32,
    /// Whether the declaration is signed.
    pub signed: bool,
    /// `true` if the declared range had `msb > lsb` (big-endian bit order).
    pub msb_gt_lsb: bool,
    /// For "memory" (array-of-word) declarations, the word count.
    pub array_count: Option<u32>,
    /// Resolved port direction.
    pub direction: PortDirection,
    /// The [`crate::cell::Cell`] (a `Net` cell) anchoring this signal's
    /// pin/nexus, created alongside it by the Signal Elaborator.
    pub net_cell: CellId,
    /// Source span of the declaration.
    pub span: Span,
}

impl Signal {
    /// The signal's total bit count, accounting for a memory array.
    pub fn total_bits(&self) -> u32 {
        self.width * self.array_count.unwrap_or(1)
    }
}

/// A reference to a signal or part of a signal, used when binding a pin in
/// a structural context (continuous-assign l-value, port connection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalRef {
    /// A reference to a full signal.
    Signal(SignalId),
    /// A bit-slice of a signal, `high` and `low` both inclusive and given
    /// in declaration-relative (not bit-order-adjusted) terms.
    Slice {
        /// The signal being sliced.
        signal: SignalId,
        /// The high bit index (inclusive).
        high: u32,
        /// The low bit index (inclusive).
        low: u32,
    },
    /// A concatenation of signal references, MSB-first.
    Concat(Vec<SignalRef>),
    /// A constant value, for an l-value context that legally admits one
    /// (e.g. a `force` target computed from a folded expression).
    Const(LogicVec),
}

impl SignalRef {
    /// The bit width of this reference. A bare [`SignalRef::Signal`] has no
    /// width of its own here — callers resolve it against the [`Signal`]
    /// arena.
    pub fn width(&self) -> u32 {
        match self {
            SignalRef::Signal(_) => 0,
            SignalRef::Slice { high, low, .. } => high.abs_diff(*low) + 1,
            SignalRef::Concat(parts) => parts.iter().map(SignalRef::width).sum(),
            SignalRef::Const(v) => v.width(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_signal(width: u32, array_count: Option<u32>) -> Signal {
        Signal {
            id: SignalId::from_raw(0),
            name: Ident::from_raw(1),
            scope: ScopeId::from_raw(0),
            net_kind: PNetKind::Wire,
            value_kind: ValueKind::LogicVector,
            width,
            signed: false,
            msb_gt_lsb: true,
            array_count,
            direction: PortDirection::NotAPort,
            net_cell: CellId::from_raw(0),
            span: Span::DUMMY,
        }
    }

    #[test]
    fn scalar_total_bits() {
        let sig = dummy_signal(1, None);
        assert_eq!(sig.total_bits(), 1);
    }

    #[test]
    fn memory_total_bits() {
        let sig = dummy_signal(8, Some(256));
        assert_eq!(sig.total_bits(), 2048);
    }

    #[test]
    fn slice_width_is_inclusive() {
        let r = SignalRef::Slice {
            signal: SignalId::from_raw(0),
            high: 7,
            low: 0,
        };
        assert_eq!(r.width(), 8);
    }

    #[test]
    fn concat_width_sums_parts() {
        let r = SignalRef::Concat(vec![
            SignalRef::Slice {
                signal: SignalId::from_raw(0),
                high: 3,
                low: 0,
            },
            SignalRef::Slice {
                signal: SignalId::from_raw(1),
                high: 1,
                low: 0,
            },
        ]);
        assert_eq!(r.width(), 6);
    }

    #[test]
    fn port_directions_distinct() {
        assert_ne!(PortDirection::Input, PortDirection::Output);
        assert_ne!(PortDirection::NotAPort, PortDirection::Implicit);
    }
}
