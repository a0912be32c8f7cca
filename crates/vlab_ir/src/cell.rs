//! Netlist cells: the structural nodes of an elaborated design.
//!
//! Per §3, the netlist node universe is closed: [`CellKind::Logic`],
//! [`CellKind::Tran`], [`CellKind::PartSelect`], [`CellKind::Concat`],
//! [`CellKind::Replicate`], [`CellKind::BufZ`], [`CellKind::Udp`], and
//! [`CellKind::Net`]. Every cell has an ordered pin array; pin `i`'s nexus
//! is `cell.pins[i]`.

use serde::{Deserialize, Serialize};
use vlab_common::Ident;
use vlab_source::Span;

use crate::ids::{CellId, NexusId, ScopeId};
use vlab_pform::{GateKind, PNetKind};

/// The direction of data flow through a [`CellKind::PartSelect`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartSelectDirection {
    /// Vector to part: reads a slice out of a wider vector.
    VectorToPart,
    /// Part to vector: writes a slice into a wider vector.
    PartToVector,
    /// Bidirectional: charge flows both ways (used for `inout` part-selects
    /// realized as a `Tran`-style connection).
    Bidirectional,
}

/// The kind of a netlist cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CellKind {
    /// A combinational/switch-level logic primitive: every [`GateKind`]
    /// except the `tran`-family switches carried by [`CellKind::Tran`].
    Logic {
        /// The gate family.
        kind: GateKind,
        /// Output width (and, for array-collapsed gates, input width too).
        width: u32,
    },
    /// A bidirectional analog switch: TRAN/RTRAN/TRANIFx/RTRANIFx. `kind`
    /// is restricted to [`GateKind::is_tran`] members.
    Tran {
        /// The switch family.
        kind: GateKind,
    },
    /// Extracts or writes a contiguous bit range of a wider nexus.
    PartSelect {
        /// Direction of the part-select.
        direction: PartSelectDirection,
        /// Bit offset of the part within the wide vector, counted from
        /// its LSB.
        offset: u32,
    },
    /// Assembles its input pins, MSB-first, into one wide output pin.
    Concat,
    /// Repeats its single input pin `count` times into a wide output pin.
    Replicate {
        /// The repeat count.
        count: u32,
    },
    /// A buffer inserted to carry an explicit delay and/or drive strength
    /// between two nexuses that would otherwise be merged directly (§4.4.1).
    BufZ,
    /// An instantiated user-defined primitive.
    Udp {
        /// The UDP template's type name.
        template: Ident,
    },
    /// The netlist anchor for a declared signal.
    Net {
        /// The declared net/variable kind.
        kind: PNetKind,
    },
}

/// A cell in the netlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// The unique ID of this cell within the design.
    pub id: CellId,
    /// The scope this cell was elaborated into.
    pub scope: ScopeId,
    /// The instance name, if the source gave one (gates and module/UDP
    /// instances may be anonymous in some grammars; structural fragments
    /// synthesized by elaboration, like an inserted `BufZ`, have none).
    pub name: Option<Ident>,
    /// The cell's kind.
    pub kind: CellKind,
    /// Ordered pins, each naming the nexus it belongs to.
    pub pins: Vec<NexusId>,
    /// The source span this cell was elaborated from.
    pub span: Span,
}

impl Cell {
    /// The output pin's nexus, by the §4.4.2 convention that a primitive's
    /// output is always pin 0.
    pub fn output_nexus(&self) -> Option<NexusId> {
        self.pins.first().copied()
    }

    /// `true` if this cell is a `Net` anchor.
    pub fn is_net(&self) -> bool {
        matches!(self.kind, CellKind::Net { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_cell(kind: CellKind, pins: Vec<NexusId>) -> Cell {
        Cell {
            id: CellId::from_raw(0),
            scope: ScopeId::from_raw(0),
            name: None,
            kind,
            pins,
            span: Span::DUMMY,
        }
    }

    #[test]
    fn output_nexus_is_pin_zero() {
        let cell = dummy_cell(
            CellKind::Logic {
                kind: GateKind::And,
                width: 1,
            },
            vec![NexusId::from_raw(5), NexusId::from_raw(6)],
        );
        assert_eq!(cell.output_nexus(), Some(NexusId::from_raw(5)));
    }

    #[test]
    fn net_cell_is_recognized() {
        let cell = dummy_cell(
            CellKind::Net {
                kind: PNetKind::Wire,
            },
            vec![NexusId::from_raw(0)],
        );
        assert!(cell.is_net());
    }

    #[test]
    fn non_net_cell_is_not_net() {
        let cell = dummy_cell(CellKind::Concat, vec![NexusId::from_raw(0)]);
        assert!(!cell.is_net());
    }

    #[test]
    fn bufz_cell_has_no_kind_payload() {
        let cell = dummy_cell(CellKind::BufZ, vec![NexusId::from_raw(0), NexusId::from_raw(1)]);
        assert!(matches!(cell.kind, CellKind::BufZ));
    }

    #[test]
    fn part_select_directions_distinct() {
        assert_ne!(
            PartSelectDirection::VectorToPart,
            PartSelectDirection::PartToVector
        );
    }
}
