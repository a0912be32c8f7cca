//! PForm primitive gate instantiations.

use serde::{Deserialize, Serialize};
use vlab_common::Ident;
use vlab_source::Span;

use crate::expr::PExpr;

/// The kind of a built-in primitive gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateKind {
    /// `and`
    And,
    /// `nand`
    Nand,
    /// `or`
    Or,
    /// `nor`
    Nor,
    /// `xor`
    Xor,
    /// `xnor`
    Xnor,
    /// `buf`
    Buf,
    /// `not`
    Not,
    /// `bufif0`
    Bufif0,
    /// `bufif1`
    Bufif1,
    /// `notif0`
    Notif0,
    /// `notif1`
    Notif1,
    /// `cmos`
    Cmos,
    /// `rcmos`
    Rcmos,
    /// `nmos`
    Nmos,
    /// `pmos`
    Pmos,
    /// `rnmos`
    Rnmos,
    /// `rpmos`
    Rpmos,
    /// `tran`
    Tran,
    /// `rtran`
    Rtran,
    /// `tranif0`
    Tranif0,
    /// `tranif1`
    Tranif1,
    /// `rtranif0`
    Rtranif0,
    /// `rtranif1`
    Rtranif1,
    /// `pullup`
    Pullup,
    /// `pulldown`
    Pulldown,
}

impl GateKind {
    /// The number of pins (in source order, output(s) first) this gate
    /// family requires per §4.4.2's per-family pin-count rules.
    pub fn pin_count(self) -> PinCountRule {
        use GateKind::*;
        match self {
            And | Nand | Or | Nor | Xor | Xnor => PinCountRule::AtLeast(2),
            Buf | Not => PinCountRule::Exactly(2),
            Bufif0 | Bufif1 | Notif0 | Notif1 | Nmos | Pmos | Rnmos | Rpmos | Tranif0 | Tranif1
            | Rtranif0 | Rtranif1 => PinCountRule::Exactly(3),
            Cmos | Rcmos => PinCountRule::Exactly(4),
            Tran | Rtran => PinCountRule::Exactly(2),
            Pullup | Pulldown => PinCountRule::Exactly(1),
        }
    }

    /// Whether this gate family is a logic gate (drives a single scalar
    /// output from one or more inputs) as opposed to a switch/tran family.
    pub fn is_logic(self) -> bool {
        use GateKind::*;
        matches!(self, And | Nand | Or | Nor | Xor | Xnor | Buf | Not)
    }

    /// Whether this gate family is a `tran`-style bidirectional switch.
    pub fn is_tran(self) -> bool {
        use GateKind::*;
        matches!(self, Tran | Rtran | Tranif0 | Tranif1 | Rtranif0 | Rtranif1)
    }
}

/// The pin-count constraint for a gate family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCountRule {
    /// Exactly `n` pins are required.
    Exactly(usize),
    /// At least `n` pins are required.
    AtLeast(usize),
}

impl PinCountRule {
    /// Whether `count` satisfies this rule.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            PinCountRule::Exactly(n) => count == n,
            PinCountRule::AtLeast(n) => count >= n,
        }
    }
}

/// A delay triple `(rise, fall, decay)` attached to a gate, UDP, or
/// continuous assign, each either a constant or an expression to be folded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PDelayTriple {
    /// The rise-time expression.
    pub rise: PExpr,
    /// The fall-time expression, if distinct from `rise`.
    pub fall: Option<PExpr>,
    /// The turn-off (decay) expression, if distinct from `rise`/`fall`.
    pub decay: Option<PExpr>,
}

/// Drive strength as declared in PForm (the enumeration is resolved to the
/// IR's `DriveStrength` during structural elaboration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PDriveStrength {
    /// `highz0` / `highz1`
    HighZ,
    /// `weak0` / `weak1`
    Weak,
    /// `pull0` / `pull1`
    Pull,
    /// `strong0` / `strong1` (the default when unspecified).
    Strong,
    /// `supply0` / `supply1`
    Supply,
}

/// A primitive gate or switch instantiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PGate {
    /// The gate family.
    pub kind: GateKind,
    /// Optional instance name (synthesized if absent).
    pub name: Option<Ident>,
    /// Optional array range `[msb:lsb]` for a gate array.
    pub range: Option<(PExpr, PExpr)>,
    /// Pins in source order: output(s) first, then inputs/controls.
    pub pins: Vec<PExpr>,
    /// Optional propagation delay.
    pub delay: Option<PDelayTriple>,
    /// Drive strength for logic-0, if declared.
    pub strength0: Option<PDriveStrength>,
    /// Drive strength for logic-1, if declared.
    pub strength1: Option<PDriveStrength>,
    /// Source span.
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_count_rules() {
        assert_eq!(GateKind::And.pin_count(), PinCountRule::AtLeast(2));
        assert_eq!(GateKind::Buf.pin_count(), PinCountRule::Exactly(2));
        assert_eq!(GateKind::Bufif0.pin_count(), PinCountRule::Exactly(3));
        assert_eq!(GateKind::Cmos.pin_count(), PinCountRule::Exactly(4));
        assert_eq!(GateKind::Tran.pin_count(), PinCountRule::Exactly(2));
        assert_eq!(GateKind::Pullup.pin_count(), PinCountRule::Exactly(1));
    }

    #[test]
    fn pin_count_accepts() {
        assert!(PinCountRule::AtLeast(2).accepts(3));
        assert!(!PinCountRule::AtLeast(2).accepts(1));
        assert!(PinCountRule::Exactly(2).accepts(2));
        assert!(!PinCountRule::Exactly(2).accepts(3));
    }

    #[test]
    fn is_logic_and_is_tran() {
        assert!(GateKind::And.is_logic());
        assert!(!GateKind::Tran.is_logic());
        assert!(GateKind::Tran.is_tran());
        assert!(!GateKind::And.is_tran());
    }
}
