//! The expression graph: lowered, self-typed expressions.
//!
//! Every [`Expr`] node carries its own `width`/`signed`/`value_kind` rather
//! than indirecting through a shared [`crate::types::TypeDb`] entry — per
//! §3, expression typing is a per-node self-determined/context-determined
//! computation during elaboration, not a nominal type system.

use serde::{Deserialize, Serialize};
use vlab_common::{Ident, LogicVec};
use vlab_source::Span;

use crate::ids::{EventId, ScopeId, SignalId};
use crate::types::ValueKind;

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Bitwise NOT (`~`).
    BitNot,
    /// Arithmetic negation (`-`).
    Neg,
    /// Logical NOT (`!`).
    LogicNot,
}

/// A reduction operator (`&expr`, `|expr`, `^expr`, and their negations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReductionOp {
    /// Reduction AND.
    And,
    /// Reduction OR.
    Or,
    /// Reduction XOR.
    Xor,
    /// Reduction NAND.
    Nand,
    /// Reduction NOR.
    Nor,
    /// Reduction XNOR.
    Xnor,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// Bitwise AND (`&`).
    And,
    /// Bitwise OR (`|`).
    Or,
    /// Bitwise XOR (`^`).
    Xor,
    /// Bitwise XNOR (`~^` / `^~`).
    Xnor,
    /// Left shift (`<<`).
    Shl,
    /// Logical right shift (`>>`).
    ShrLogical,
    /// Arithmetic right shift (`>>>`), sign-extending.
    ShrArith,
    /// Case-insensitive-to-x/z equality (`==`); yields x if either operand
    /// has an unknown bit.
    Eq,
    /// `===`: exact 4-state equality, never yields x.
    CaseEq,
    /// `!=`
    Ne,
    /// `!==`: exact 4-state inequality, never yields x.
    CaseNe,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`, short-circuiting.
    LogicAnd,
    /// `||`, short-circuiting.
    LogicOr,
    /// `min` (system-function lowering).
    Min,
    /// `max` (system-function lowering).
    Max,
}

/// The callee of a [`Expr::Call`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallTarget {
    /// A user-defined function, resolved to its declaring scope.
    User {
        /// The scope owning the function definition.
        scope: ScopeId,
        /// The function's name.
        name: Ident,
    },
    /// A system function (`$signed`, `$random`, `$bits`, ...).
    System {
        /// The system function's name, including its leading `$`.
        name: Ident,
    },
}

/// An expression in the elaborated procedure/continuous-assign graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// A constant 4-state vector literal.
    ConstVector {
        /// The literal value.
        value: LogicVec,
        /// Whether this literal is signed.
        signed: bool,
        /// Source span.
        span: Span,
    },
    /// A constant real literal.
    ConstReal {
        /// The literal value.
        value: f64,
        /// Source span.
        span: Span,
    },
    /// A reference to a signal, optionally indexed/sliced/muxed.
    SignalRef {
        /// The signal being referenced.
        signal: SignalId,
        /// A variable word index, for a "memory" array reference.
        word_index: Option<Box<Expr>>,
        /// A variable part-select base offset.
        part_offset: Option<Box<Expr>>,
        /// The part-select width, fixed at elaboration time even when
        /// `part_offset` is variable (indexed part-select).
        part_width: Option<u32>,
        /// A variable bit-select index (`signal[expr]`), mutually
        /// exclusive with `part_offset`/`part_width`.
        mux_select: Option<Box<Expr>>,
        /// This reference's self-determined width.
        width: u32,
        /// This reference's self-determined signedness.
        signed: bool,
        /// This reference's self-determined value domain.
        value_kind: ValueKind,
        /// Source span.
        span: Span,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
        /// Result width.
        width: u32,
        /// Result signedness.
        signed: bool,
        /// Source span.
        span: Span,
    },
    /// A reduction operation (always yields a single bit).
    Reduction {
        /// The operator.
        op: ReductionOp,
        /// The operand.
        operand: Box<Expr>,
        /// Source span.
        span: Span,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// The left-hand operand.
        lhs: Box<Expr>,
        /// The right-hand operand.
        rhs: Box<Expr>,
        /// Result width.
        width: u32,
        /// Result signedness.
        signed: bool,
        /// Result value domain (`BoolVector` for comparisons/logicals,
        /// `LogicVector` or `Real` otherwise).
        value_kind: ValueKind,
        /// Source span.
        span: Span,
    },
    /// A ternary/conditional expression (`cond ? true_val : false_val`).
    Ternary {
        /// The condition.
        cond: Box<Expr>,
        /// The value when `cond` is true.
        true_val: Box<Expr>,
        /// The value when `cond` is false (or a bitwise blend when `cond`
        /// is x/z, per the simulation semantics).
        false_val: Box<Expr>,
        /// Result width.
        width: u32,
        /// Result signedness.
        signed: bool,
        /// Source span.
        span: Span,
    },
    /// A concatenation, MSB-first.
    Concat {
        /// The parts being concatenated.
        parts: Vec<Expr>,
        /// The summed width of all parts.
        width: u32,
        /// Source span.
        span: Span,
    },
    /// A replication (`{count{expr}}`).
    Replicate {
        /// The expression being repeated.
        operand: Box<Expr>,
        /// The repeat count.
        count: u32,
        /// The total width (`count * operand width`).
        width: u32,
        /// Source span.
        span: Span,
    },
    /// A call to a user function or system function.
    Call {
        /// The function being called.
        callee: CallTarget,
        /// Argument expressions, positionally bound.
        args: Vec<Expr>,
        /// Result width.
        width: u32,
        /// Result signedness.
        signed: bool,
        /// Result value domain.
        value_kind: ValueKind,
        /// Source span.
        span: Span,
    },
    /// A reference to an event's current (fired this step) state, as used
    /// in an `@(event)` wait or an `event.triggered`-style probe.
    EventProbeRef {
        /// The event being probed.
        event: EventId,
        /// Source span.
        span: Span,
    },
}

impl Expr {
    /// This expression's self-determined bit width, or `0` for a `Real`
    /// or event-probe result with no fixed vector width.
    pub fn width(&self) -> u32 {
        match self {
            Expr::ConstVector { value, .. } => value.width(),
            Expr::ConstReal { .. } => 0,
            Expr::SignalRef { width, .. }
            | Expr::Unary { width, .. }
            | Expr::Binary { width, .. }
            | Expr::Ternary { width, .. }
            | Expr::Concat { width, .. }
            | Expr::Replicate { width, .. }
            | Expr::Call { width, .. } => *width,
            Expr::Reduction { .. } | Expr::EventProbeRef { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SignalId;

    #[test]
    fn const_vector_width() {
        let e = Expr::ConstVector {
            value: LogicVec::all_zero(8),
            signed: false,
            span: Span::DUMMY,
        };
        assert_eq!(e.width(), 8);
    }

    #[test]
    fn const_real_has_no_vector_width() {
        let e = Expr::ConstReal {
            value: 3.25,
            span: Span::DUMMY,
        };
        assert_eq!(e.width(), 0);
    }

    #[test]
    fn reduction_is_always_one_bit() {
        let e = Expr::Reduction {
            op: ReductionOp::And,
            operand: Box::new(Expr::ConstVector {
                value: LogicVec::all_one(8),
                signed: false,
                span: Span::DUMMY,
            }),
            span: Span::DUMMY,
        };
        assert_eq!(e.width(), 1);
    }

    #[test]
    fn binary_carries_value_kind() {
        let e = Expr::Binary {
            op: BinaryOp::Lt,
            lhs: Box::new(Expr::ConstVector {
                value: LogicVec::all_zero(8),
                signed: false,
                span: Span::DUMMY,
            }),
            rhs: Box::new(Expr::ConstVector {
                value: LogicVec::all_one(8),
                signed: false,
                span: Span::DUMMY,
            }),
            width: 1,
            signed: false,
            value_kind: ValueKind::BoolVector,
            span: Span::DUMMY,
        };
        if let Expr::Binary { value_kind, .. } = &e {
            assert_eq!(*value_kind, ValueKind::BoolVector);
        } else {
            panic!("expected Binary");
        }
    }

    #[test]
    fn signal_ref_with_mux_select() {
        let e = Expr::SignalRef {
            signal: SignalId::from_raw(0),
            word_index: None,
            part_offset: None,
            part_width: None,
            mux_select: Some(Box::new(Expr::ConstVector {
                value: LogicVec::all_zero(4),
                signed: false,
                span: Span::DUMMY,
            })),
            width: 1,
            signed: false,
            value_kind: ValueKind::LogicVector,
            span: Span::DUMMY,
        };
        if let Expr::SignalRef { mux_select, .. } = &e {
            assert!(mux_select.is_some());
        } else {
            panic!("expected SignalRef");
        }
    }

    #[test]
    fn concat_width_is_explicit_on_node() {
        let e = Expr::Concat {
            parts: vec![
                Expr::ConstVector {
                    value: LogicVec::all_zero(4),
                    signed: false,
                    span: Span::DUMMY,
                },
                Expr::ConstVector {
                    value: LogicVec::all_one(4),
                    signed: false,
                    span: Span::DUMMY,
                },
            ],
            width: 8,
            span: Span::DUMMY,
        };
        assert_eq!(e.width(), 8);
    }

    #[test]
    fn event_probe_is_one_bit() {
        let e = Expr::EventProbeRef {
            event: EventId::from_raw(0),
            span: Span::DUMMY,
        };
        assert_eq!(e.width(), 1);
    }

    #[test]
    fn all_binary_ops_distinct() {
        let ops = [
            BinaryOp::Add,
            BinaryOp::Sub,
            BinaryOp::Mul,
            BinaryOp::Div,
            BinaryOp::Mod,
            BinaryOp::Pow,
            BinaryOp::And,
            BinaryOp::Or,
            BinaryOp::Xor,
            BinaryOp::Xnor,
            BinaryOp::Shl,
            BinaryOp::ShrLogical,
            BinaryOp::ShrArith,
            BinaryOp::Eq,
            BinaryOp::CaseEq,
            BinaryOp::Ne,
            BinaryOp::CaseNe,
            BinaryOp::Lt,
            BinaryOp::Le,
            BinaryOp::Gt,
            BinaryOp::Ge,
            BinaryOp::LogicAnd,
            BinaryOp::LogicOr,
            BinaryOp::Min,
            BinaryOp::Max,
        ];
        for (i, a) in ops.iter().enumerate() {
            for (j, b) in ops.iter().enumerate() {
                assert_eq!(i == j, a == b);
            }
        }
    }
}
