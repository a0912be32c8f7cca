//! The procedure graph: lowered behavioral statements.
//!
//! [`Stmt`] is the Behavioral Elaborator's output (§4.5) — every delayed
//! assign, `wait`, `for`-loop, and case statement has already been lowered
//! to the primitive forms this enum carries.

use serde::{Deserialize, Serialize};
use vlab_common::Ident;
use vlab_source::Span;

use crate::expr::Expr;
use crate::ids::{EventId, ScopeId};
use crate::signal::SignalRef;

/// The case-statement matching discipline (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseKind {
    /// `case`: exact 4-state match, x/z treated as literal values.
    Exact,
    /// `casex`: x and z in either operand are wildcards.
    CaseX,
    /// `casez`: z (and `?`) in either operand is a wildcard; x is not.
    CaseZ,
    /// `case` over a real-valued selector (approximate/real comparison).
    RealCase,
}

/// A reference to a user task, by the scope that declares it and its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    /// The scope owning the task definition.
    pub scope: ScopeId,
    /// The task's name.
    pub name: Ident,
}

/// One arm of a [`Stmt::Case`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseArm {
    /// The guard expressions for this arm (more than one for a
    /// comma-joined case item); an empty list denotes `default`.
    pub guards: Vec<Expr>,
    /// The body executed when a guard matches.
    pub body: Stmt,
    /// Source span.
    pub span: Span,
}

/// A single delay amount, either folded to a constant or left as an
/// expression to be evaluated at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DelayValue {
    /// A delay folded to a constant tick count at elaboration time.
    Const(u64),
    /// A delay computed at run time from an expression.
    Expr(Box<Expr>),
}

/// A statement in the lowered procedure graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    /// `begin ... end`: sequential execution, optionally in its own named
    /// scope (for a named block's local declarations).
    SeqBlock {
        /// The block's own scope, if it was named.
        scope: Option<ScopeId>,
        /// Statements in execution order.
        body: Vec<Stmt>,
    },
    /// `fork ... join`: concurrent execution of all branches.
    ParBlock {
        /// The block's own scope, if it was named.
        scope: Option<ScopeId>,
        /// Branches, started concurrently.
        body: Vec<Stmt>,
    },
    /// `lhs = rhs`: takes effect immediately.
    BlockingAssign {
        /// The assignment target.
        lhs: SignalRef,
        /// The value expression.
        rhs: Expr,
        /// Source span.
        span: Span,
    },
    /// `lhs <= rhs [after delay]`: scheduled to take effect at the end of
    /// the current time step (or after `delay` additional ticks).
    NonBlockingAssign {
        /// The assignment target.
        lhs: SignalRef,
        /// The value expression.
        rhs: Expr,
        /// An optional intra-assignment delay.
        delay: Option<DelayValue>,
        /// Source span.
        span: Span,
    },
    /// `assign lhs = rhs` issued from within a process: holds until
    /// released by a matching [`Stmt::Deassign`].
    ProceduralContinuousAssign {
        /// The assignment target.
        lhs: SignalRef,
        /// The held value expression.
        rhs: Expr,
        /// Source span.
        span: Span,
    },
    /// `force lhs = rhs`: as [`Stmt::ProceduralContinuousAssign`] but
    /// overriding every other driver until released.
    Force {
        /// The forced target.
        lhs: SignalRef,
        /// The forced value expression.
        rhs: Expr,
        /// Source span.
        span: Span,
    },
    /// `deassign lhs`: releases a [`Stmt::ProceduralContinuousAssign`].
    Deassign {
        /// The target to release.
        lhs: SignalRef,
        /// Source span.
        span: Span,
    },
    /// `release lhs`: releases a [`Stmt::Force`].
    Release {
        /// The target to release.
        lhs: SignalRef,
        /// Source span.
        span: Span,
    },
    /// `#delay body`: suspends for `delay` ticks, then runs `body`.
    Delay {
        /// The delay amount.
        delay: DelayValue,
        /// The statement to run once the delay elapses.
        body: Box<Stmt>,
        /// Source span.
        span: Span,
    },
    /// `@(events) body`: suspends until any listed event fires, then runs
    /// `body`.
    EventWait {
        /// The events being waited on.
        events: Vec<EventId>,
        /// The statement to run once awoken.
        body: Box<Stmt>,
        /// Source span.
        span: Span,
    },
    /// `-> event`: fires a named event, waking every waiter.
    EventTrigger {
        /// The event being triggered.
        event: EventId,
        /// Source span.
        span: Span,
    },
    /// `if (cond) then_branch [else else_branch]`.
    Conditional {
        /// The condition expression.
        cond: Expr,
        /// The branch taken when `cond` is true (and not x/z).
        then_branch: Box<Stmt>,
        /// The branch taken otherwise, if present.
        else_branch: Option<Box<Stmt>>,
        /// Source span.
        span: Span,
    },
    /// `case`/`casex`/`casez` over `selector`.
    Case {
        /// The matching discipline.
        kind: CaseKind,
        /// The expression being matched.
        selector: Expr,
        /// The arms, in source order (a guard-less arm is `default`).
        arms: Vec<CaseArm>,
        /// Source span.
        span: Span,
    },
    /// `while (cond) body`.
    While {
        /// The loop condition, tested before each iteration.
        cond: Expr,
        /// The loop body.
        body: Box<Stmt>,
        /// Source span.
        span: Span,
    },
    /// `forever body`.
    Forever {
        /// The loop body.
        body: Box<Stmt>,
        /// Source span.
        span: Span,
    },
    /// `repeat (count) body`.
    Repeat {
        /// The iteration count expression, evaluated once before the loop
        /// starts.
        count: Expr,
        /// The loop body.
        body: Box<Stmt>,
        /// Source span.
        span: Span,
    },
    /// A call to a user-defined task.
    UserTaskCall {
        /// The task being called.
        task: TaskRef,
        /// Argument expressions, positionally bound.
        args: Vec<Expr>,
        /// Source span.
        span: Span,
    },
    /// A call to a system task (`$display`, `$finish`, `$monitor`, ...).
    SystemTaskCall {
        /// The system task's name, including its leading `$`.
        name: Ident,
        /// Argument expressions.
        args: Vec<Expr>,
        /// Source span.
        span: Span,
    },
    /// `disable target`: aborts an in-progress named block or task.
    Disable {
        /// The scope to abort.
        target_scope: ScopeId,
        /// Source span.
        span: Span,
    },
    /// A no-op (an elided branch, an empty statement).
    Nop,
}

impl Stmt {
    /// The source span of this statement, or [`Span::DUMMY`] for [`Stmt::Nop`]
    /// and block forms (whose span lives on their constituent statements).
    pub fn span(&self) -> Span {
        match self {
            Stmt::SeqBlock { .. } | Stmt::ParBlock { .. } | Stmt::Nop => Span::DUMMY,
            Stmt::BlockingAssign { span, .. }
            | Stmt::NonBlockingAssign { span, .. }
            | Stmt::ProceduralContinuousAssign { span, .. }
            | Stmt::Force { span, .. }
            | Stmt::Deassign { span, .. }
            | Stmt::Release { span, .. }
            | Stmt::Delay { span, .. }
            | Stmt::EventWait { span, .. }
            | Stmt::EventTrigger { span, .. }
            | Stmt::Conditional { span, .. }
            | Stmt::Case { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Forever { span, .. }
            | Stmt::Repeat { span, .. }
            | Stmt::UserTaskCall { span, .. }
            | Stmt::SystemTaskCall { span, .. }
            | Stmt::Disable { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SignalId;
    use vlab_common::LogicVec;

    #[test]
    fn blocking_assign() {
        let stmt = Stmt::BlockingAssign {
            lhs: SignalRef::Signal(SignalId::from_raw(0)),
            rhs: Expr::ConstVector {
                value: LogicVec::all_zero(8),
                signed: false,
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        };
        assert!(matches!(stmt, Stmt::BlockingAssign { .. }));
    }

    #[test]
    fn nonblocking_assign_carries_optional_delay() {
        let stmt = Stmt::NonBlockingAssign {
            lhs: SignalRef::Signal(SignalId::from_raw(0)),
            rhs: Expr::ConstVector {
                value: LogicVec::all_one(1),
                signed: false,
                span: Span::DUMMY,
            },
            delay: Some(DelayValue::Const(5)),
            span: Span::DUMMY,
        };
        if let Stmt::NonBlockingAssign { delay, .. } = &stmt {
            assert!(matches!(delay, Some(DelayValue::Const(5))));
        } else {
            panic!("expected NonBlockingAssign");
        }
    }

    #[test]
    fn conditional_with_else() {
        let stmt = Stmt::Conditional {
            cond: Expr::ConstVector {
                value: LogicVec::all_one(1),
                signed: false,
                span: Span::DUMMY,
            },
            then_branch: Box::new(Stmt::Nop),
            else_branch: Some(Box::new(Stmt::Nop)),
            span: Span::DUMMY,
        };
        if let Stmt::Conditional { else_branch, .. } = &stmt {
            assert!(else_branch.is_some());
        } else {
            panic!("expected Conditional");
        }
    }

    #[test]
    fn case_with_default_arm() {
        let default_arm = CaseArm {
            guards: Vec::new(),
            body: Stmt::Nop,
            span: Span::DUMMY,
        };
        let stmt = Stmt::Case {
            kind: CaseKind::CaseX,
            selector: Expr::SignalRef {
                signal: SignalId::from_raw(0),
                word_index: None,
                part_offset: None,
                part_width: None,
                mux_select: None,
                width: 2,
                signed: false,
                value_kind: crate::types::ValueKind::LogicVector,
                span: Span::DUMMY,
            },
            arms: vec![default_arm],
            span: Span::DUMMY,
        };
        if let Stmt::Case { arms, kind, .. } = &stmt {
            assert_eq!(arms.len(), 1);
            assert!(arms[0].guards.is_empty());
            assert_eq!(*kind, CaseKind::CaseX);
        } else {
            panic!("expected Case");
        }
    }

    #[test]
    fn delay_then_forever() {
        let stmt = Stmt::Forever {
            body: Box::new(Stmt::Delay {
                delay: DelayValue::Const(5),
                body: Box::new(Stmt::Nop),
                span: Span::DUMMY,
            }),
            span: Span::DUMMY,
        };
        if let Stmt::Forever { body, .. } = &stmt {
            assert!(matches!(**body, Stmt::Delay { .. }));
        } else {
            panic!("expected Forever");
        }
    }

    #[test]
    fn event_wait_lists_multiple_events() {
        let stmt = Stmt::EventWait {
            events: vec![EventId::from_raw(0), EventId::from_raw(1)],
            body: Box::new(Stmt::Nop),
            span: Span::DUMMY,
        };
        if let Stmt::EventWait { events, .. } = &stmt {
            assert_eq!(events.len(), 2);
        } else {
            panic!("expected EventWait");
        }
    }

    #[test]
    fn case_kinds_distinct() {
        assert_ne!(CaseKind::Exact, CaseKind::CaseX);
        assert_ne!(CaseKind::CaseZ, CaseKind::RealCase);
    }

    #[test]
    fn nop_and_block_have_dummy_span() {
        assert_eq!(Stmt::Nop.span(), Span::DUMMY);
        let block = Stmt::SeqBlock {
            scope: None,
            body: vec![Stmt::Nop],
        };
        assert_eq!(block.span(), Span::DUMMY);
    }
}
