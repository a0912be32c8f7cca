//! PForm procedural statements, behaviors, tasks, and functions.

use serde::{Deserialize, Serialize};
use vlab_common::Ident;
use vlab_source::Span;

use crate::expr::PExpr;
use crate::module::PSignalDecl;

/// Which modality a `case` statement uses for guard comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PCaseKind {
    /// `case`: exact x/z-sensitive comparison.
    Exact,
    /// `casex`: x and z in either operand are don't-care.
    CaseX,
    /// `casez`: z (and `?`) in either operand are don't-care.
    CaseZ,
    /// A case over real-valued selector and guards.
    RealCase,
}

/// One edge qualifier in an event-control list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PEdge {
    /// `posedge`
    Posedge,
    /// `negedge`
    Negedge,
    /// No qualifier: sensitive to any value change.
    AnyEdge,
}

/// One element of an `@(...)` event-control list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PEventExpr {
    /// A reference to a named `event` object: the wait refers to it directly.
    NamedEvent {
        /// The event's name.
        name: Ident,
        /// Source span.
        span: Span,
    },
    /// An expression with an edge qualifier, e.g. `posedge clk`.
    Edge {
        /// The edge qualifier.
        edge: PEdge,
        /// The watched expression.
        expr: PExpr,
        /// Source span.
        span: Span,
    },
    /// `@*` / `@(*)`: sensitivity is computed from the statement's read set.
    Star {
        /// Source span.
        span: Span,
    },
}

/// An `@(...)` event-control list attached to a statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PEventControl {
    /// The list of event expressions (empty list paired with `is_star` means
    /// a bare `@*`).
    pub events: Vec<PEventExpr>,
    /// Source span.
    pub span: Span,
}

/// One arm of a `case`/`casex`/`casez` statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PCaseArm {
    /// Guard expressions for this arm (empty means `default`).
    pub guards: Vec<PExpr>,
    /// The arm's body.
    pub body: Box<PStmt>,
    /// Source span.
    pub span: Span,
}

/// A procedural statement, as written in PForm.
///
/// This is the pre-elaboration tree; it is lowered one-to-(one-or-more) onto
/// [`vlab_ir::stmt::Statement`] during behavioral elaboration (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PStmt {
    /// `lhs = rhs;` optionally preceded by a delay (`lhs = #d rhs;`) or
    /// an event control (`lhs = @(e) rhs;`, rare but legal).
    BlockingAssign {
        /// The l-value expression.
        lhs: PExpr,
        /// The r-value expression.
        rhs: PExpr,
        /// An optional `#delay` on the right of `=`.
        delay: Option<PExpr>,
        /// Source span.
        span: Span,
    },
    /// `lhs <= rhs;`
    NonBlockingAssign {
        /// The l-value expression.
        lhs: PExpr,
        /// The r-value expression.
        rhs: PExpr,
        /// An optional `#delay` on the right of `<=`.
        delay: Option<PExpr>,
        /// Source span.
        span: Span,
    },
    /// `assign lhs = rhs;` (procedural continuous assign).
    ProceduralContinuousAssign {
        /// The l-value expression.
        lhs: PExpr,
        /// The r-value expression.
        rhs: PExpr,
        /// Source span.
        span: Span,
    },
    /// `force lhs = rhs;`
    Force {
        /// The l-value expression.
        lhs: PExpr,
        /// The r-value expression.
        rhs: PExpr,
        /// Source span.
        span: Span,
    },
    /// `deassign lhs;`
    Deassign {
        /// The l-value expression.
        lhs: PExpr,
        /// Source span.
        span: Span,
    },
    /// `release lhs;`
    Release {
        /// The l-value expression.
        lhs: PExpr,
        /// Source span.
        span: Span,
    },
    /// `#delay stmt;`
    Delay {
        /// The delay expression.
        delay: PExpr,
        /// The statement following the delay.
        body: Box<PStmt>,
        /// Source span.
        span: Span,
    },
    /// `@(events) stmt;`
    EventControl {
        /// The event-control list.
        control: PEventControl,
        /// The statement following the control.
        body: Box<PStmt>,
        /// Source span.
        span: Span,
    },
    /// `-> event_name;`
    Trigger {
        /// The triggered event's name.
        name: Ident,
        /// Source span.
        span: Span,
    },
    /// `wait (expr) stmt;`
    Wait {
        /// The wait condition.
        cond: PExpr,
        /// The statement to run once the condition holds.
        body: Box<PStmt>,
        /// Source span.
        span: Span,
    },
    /// `begin ... end` (sequential block), optionally named with a local
    /// scope (block-local declarations).
    SeqBlock {
        /// Optional block name.
        name: Option<Ident>,
        /// Block-local declarations, if named.
        decls: Vec<PSignalDecl>,
        /// Statements, in order.
        body: Vec<PStmt>,
        /// Source span.
        span: Span,
    },
    /// `fork ... join` (parallel block), optionally named.
    ParBlock {
        /// Optional block name.
        name: Option<Ident>,
        /// Block-local declarations, if named.
        decls: Vec<PSignalDecl>,
        /// Statements, run concurrently.
        body: Vec<PStmt>,
        /// Source span.
        span: Span,
    },
    /// `if (cond) then_stmt else else_stmt`
    If {
        /// The condition expression.
        cond: PExpr,
        /// The taken-when-true statement.
        then_branch: Box<PStmt>,
        /// The taken-when-false statement, if an `else` exists.
        else_branch: Option<Box<PStmt>>,
        /// Source span.
        span: Span,
    },
    /// `case`/`casex`/`casez` (§3's "three modalities"; the real-valued
    /// fourth modality is represented by the same node with `kind`
    /// set to [`PCaseKind::RealCase`]).
    Case {
        /// The case modality.
        kind: PCaseKind,
        /// The selector expression.
        selector: PExpr,
        /// The case arms, in source order; duplicate guards are preserved.
        arms: Vec<PCaseArm>,
        /// Source span.
        span: Span,
    },
    /// `while (cond) body`
    While {
        /// The loop condition.
        cond: PExpr,
        /// The loop body.
        body: Box<PStmt>,
        /// Source span.
        span: Span,
    },
    /// `forever body`
    Forever {
        /// The loop body.
        body: Box<PStmt>,
        /// Source span.
        span: Span,
    },
    /// `repeat (count) body`
    Repeat {
        /// The repeat-count expression.
        count: PExpr,
        /// The loop body.
        body: Box<PStmt>,
        /// Source span.
        span: Span,
    },
    /// `for (init; cond; step) body`
    For {
        /// The initializer statement (normally an assign).
        init: Box<PStmt>,
        /// The loop condition.
        cond: PExpr,
        /// The per-iteration step statement.
        step: Box<PStmt>,
        /// The loop body.
        body: Box<PStmt>,
        /// Source span.
        span: Span,
    },
    /// A user task call, `my_task(a, b);`.
    TaskCall {
        /// The task's name.
        name: Ident,
        /// Argument expressions.
        args: Vec<PExpr>,
        /// Source span.
        span: Span,
    },
    /// A system task call, `$display("%d", x);`.
    SystemTaskCall {
        /// The system task identifier, including the leading `$`.
        name: Ident,
        /// Argument expressions.
        args: Vec<PExpr>,
        /// Source span.
        span: Span,
    },
    /// `disable scope_or_task_name;`
    Disable {
        /// The dotted path naming the target scope/task.
        target_path: Vec<Ident>,
        /// Source span.
        span: Span,
    },
    /// An explicit no-op (`;`).
    Nop {
        /// Source span.
        span: Span,
    },
}

impl PStmt {
    /// The span covering this statement.
    pub fn span(&self) -> Span {
        match self {
            PStmt::BlockingAssign { span, .. }
            | PStmt::NonBlockingAssign { span, .. }
            | PStmt::ProceduralContinuousAssign { span, .. }
            | PStmt::Force { span, .. }
            | PStmt::Deassign { span, .. }
            | PStmt::Release { span, .. }
            | PStmt::Delay { span, .. }
            | PStmt::EventControl { span, .. }
            | PStmt::Trigger { span, .. }
            | PStmt::Wait { span, .. }
            | PStmt::SeqBlock { span, .. }
            | PStmt::ParBlock { span, .. }
            | PStmt::If { span, .. }
            | PStmt::Case { span, .. }
            | PStmt::While { span, .. }
            | PStmt::Forever { span, .. }
            | PStmt::Repeat { span, .. }
            | PStmt::For { span, .. }
            | PStmt::TaskCall { span, .. }
            | PStmt::SystemTaskCall { span, .. }
            | PStmt::Disable { span, .. }
            | PStmt::Nop { span } => *span,
        }
    }
}

/// The trigger kind for a top-level behavior (`initial` vs `always`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PBehaviorKind {
    /// `initial` — runs once at time zero.
    Initial,
    /// `always` — runs forever, re-triggered per its body's own control.
    Always,
}

/// A top-level `initial`/`always` behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PBehavior {
    /// Whether this is `initial` or `always`.
    pub kind: PBehaviorKind,
    /// The behavior's statement body.
    pub body: PStmt,
    /// Source span.
    pub span: Span,
}

/// A task definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PTaskDecl {
    /// The task's local name.
    pub name: Ident,
    /// Declared arguments (direction carried on the signal decl).
    pub args: Vec<PSignalDecl>,
    /// Task-local variable declarations.
    pub decls: Vec<PSignalDecl>,
    /// The task body.
    pub body: PStmt,
    /// Source span.
    pub span: Span,
}

/// A function definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PFunctionDecl {
    /// The function's local name.
    pub name: Ident,
    /// Declared arguments (always input direction, by language rule).
    pub args: Vec<PSignalDecl>,
    /// Function-local variable declarations.
    pub decls: Vec<PSignalDecl>,
    /// The declared return-value range/type, reusing the signal-decl shape
    /// with `name` equal to the function's own name (the implicit
    /// return-value register).
    pub return_decl: PSignalDecl,
    /// The function body.
    pub body: PStmt,
    /// Source span.
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_common::Interner;

    #[test]
    fn nop_span_roundtrip() {
        let stmt = PStmt::Nop { span: Span::DUMMY };
        assert_eq!(stmt.span(), Span::DUMMY);
    }

    #[test]
    fn case_arm_preserves_duplicate_guards() {
        let interner = Interner::new();
        let name = interner.get_or_intern("x");
        let guard = PExpr::Ident {
            name,
            span: Span::DUMMY,
        };
        let arms = vec![
            PCaseArm {
                guards: vec![guard.clone()],
                body: Box::new(PStmt::Nop { span: Span::DUMMY }),
                span: Span::DUMMY,
            },
            PCaseArm {
                guards: vec![guard],
                body: Box::new(PStmt::Nop { span: Span::DUMMY }),
                span: Span::DUMMY,
            },
        ];
        assert_eq!(arms.len(), 2);
    }
}
