//! PForm expression trees.

use serde::{Deserialize, Serialize};
use vlab_common::{Ident, LogicVec};
use vlab_source::Span;

/// Unary operators available in PForm expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation `-x`.
    Minus,
    /// Bitwise negation `~x`.
    BitNot,
    /// Logical negation `!x`.
    LogicNot,
    /// Reduction AND `&x`.
    RedAnd,
    /// Reduction NAND `~&x`.
    RedNand,
    /// Reduction OR `|x`.
    RedOr,
    /// Reduction NOR `~|x`.
    RedNor,
    /// Reduction XOR `^x`.
    RedXor,
    /// Reduction XNOR `~^x` / `^~x`.
    RedXnor,
}

/// Binary operators available in PForm expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `~^` / `^~`
    Xnor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `<<<` (arithmetic left shift; equivalent to `<<` for this language).
    Ashl,
    /// `>>>` (arithmetic right shift).
    Ashr,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `===` (case equality, x/z compared literally).
    CaseEq,
    /// `!==` (case inequality).
    CaseNe,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&` (short-circuit logical AND).
    LogicAnd,
    /// `||` (short-circuit logical OR).
    LogicOr,
    /// `min` system-style binary min.
    Min,
    /// `max` system-style binary max.
    Max,
}

/// A PForm expression node.
///
/// Mirrors the language's expression grammar closely enough that constant
/// folding and lowering can both walk it directly; it carries no width or
/// type information of its own (that is computed during elaboration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PExpr {
    /// A literal vector constant, already parsed (sign, width, x/z bits).
    Literal {
        /// The parsed constant value.
        value: LogicVec,
        /// Whether the literal carries an explicit sign (`'sh..` etc).
        signed: bool,
        /// Source span.
        span: Span,
    },
    /// A real-valued literal.
    RealLiteral {
        /// The parsed value.
        value: f64,
        /// Source span.
        span: Span,
    },
    /// A simple identifier reference (signal, parameter, genvar, or event).
    Ident {
        /// The referenced name.
        name: Ident,
        /// Source span.
        span: Span,
    },
    /// A hierarchical scope path reference, e.g. `top.sub.sig`.
    ScopePath {
        /// Path components, root first.
        path: Vec<Ident>,
        /// Source span.
        span: Span,
    },
    /// A single-bit index into a vector or memory word, e.g. `a[i]`.
    Index {
        /// The base expression.
        base: Box<PExpr>,
        /// The index expression.
        index: Box<PExpr>,
        /// Source span.
        span: Span,
    },
    /// A fixed part-select, e.g. `a[7:0]`.
    PartSelect {
        /// The base expression.
        base: Box<PExpr>,
        /// The MSB-side bound expression.
        msb: Box<PExpr>,
        /// The LSB-side bound expression.
        lsb: Box<PExpr>,
        /// Source span.
        span: Span,
    },
    /// An indexed part-select, e.g. `a[i +: 4]` / `a[i -: 4]`.
    IndexedPartSelect {
        /// The base expression.
        base: Box<PExpr>,
        /// The base index expression.
        index: Box<PExpr>,
        /// The constant width of the select.
        width: u32,
        /// Whether the select grows upward (`+:`) or downward (`-:`).
        ascending: bool,
        /// Source span.
        span: Span,
    },
    /// Unary operator application.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<PExpr>,
        /// Source span.
        span: Span,
    },
    /// Binary operator application.
    Binary {
        /// The left operand.
        left: Box<PExpr>,
        /// The operator.
        op: BinaryOp,
        /// The right operand.
        right: Box<PExpr>,
        /// Source span.
        span: Span,
    },
    /// Ternary conditional `cond ? a : b`.
    Ternary {
        /// The condition.
        cond: Box<PExpr>,
        /// The true-branch value.
        if_true: Box<PExpr>,
        /// The false-branch value.
        if_false: Box<PExpr>,
        /// Source span.
        span: Span,
    },
    /// Concatenation `{a, b, c}`.
    Concat {
        /// The concatenated sub-expressions, MSB-first.
        elements: Vec<PExpr>,
        /// Source span.
        span: Span,
    },
    /// Replication `{n{a}}`.
    Replicate {
        /// The constant replication count expression.
        count: Box<PExpr>,
        /// The replicated sub-expression.
        value: Box<PExpr>,
        /// Source span.
        span: Span,
    },
    /// A user-defined task/function call, e.g. `my_func(a, b)`.
    Call {
        /// The callee name.
        name: Ident,
        /// The argument expressions.
        args: Vec<PExpr>,
        /// Source span.
        span: Span,
    },
    /// A system function/task call, e.g. `$clog2(x)`.
    SystemCall {
        /// The system identifier, including the leading `$`.
        name: Ident,
        /// The argument expressions.
        args: Vec<PExpr>,
        /// Source span.
        span: Span,
    },
    /// A malformed expression retained for error recovery.
    Error {
        /// Source span.
        span: Span,
    },
}

impl PExpr {
    /// Returns the span covering this expression node.
    pub fn span(&self) -> Span {
        match self {
            PExpr::Literal { span, .. }
            | PExpr::RealLiteral { span, .. }
            | PExpr::Ident { span, .. }
            | PExpr::ScopePath { span, .. }
            | PExpr::Index { span, .. }
            | PExpr::PartSelect { span, .. }
            | PExpr::IndexedPartSelect { span, .. }
            | PExpr::Unary { span, .. }
            | PExpr::Binary { span, .. }
            | PExpr::Ternary { span, .. }
            | PExpr::Concat { span, .. }
            | PExpr::Replicate { span, .. }
            | PExpr::Call { span, .. }
            | PExpr::SystemCall { span, .. }
            | PExpr::Error { span } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_common::Interner;

    #[test]
    fn span_accessor_covers_every_variant() {
        let interner = Interner::new();
        let name = interner.get_or_intern("a");
        let exprs = vec![
            PExpr::Literal {
                value: LogicVec::all_zero(4),
                signed: false,
                span: Span::DUMMY,
            },
            PExpr::RealLiteral {
                value: 1.5,
                span: Span::DUMMY,
            },
            PExpr::Ident {
                name,
                span: Span::DUMMY,
            },
            PExpr::Error { span: Span::DUMMY },
        ];
        for e in exprs {
            assert_eq!(e.span(), Span::DUMMY);
        }
    }
}
