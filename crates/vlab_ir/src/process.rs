//! Process definitions: `initial` and `always` behaviors.
//!
//! A [`Process`] is the elaborated form of one `initial` or `always`
//! statement (§3). Its sensitivity, if any, lives inside its own body as an
//! [`crate::stmt::Stmt::EventWait`] — there is no separate sensitivity field.

use serde::{Deserialize, Serialize};
use vlab_source::Span;

use crate::ids::{ProcessId, ScopeId};
use crate::stmt::Stmt;

/// The kind of behavior a process realizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessKind {
    /// An `initial` block: runs once at time zero.
    Initial,
    /// An `always` block: re-runs each time its body completes.
    Always,
}

/// An elaborated behavioral process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    /// The unique ID of this process within its scope.
    pub id: ProcessId,
    /// The scope this process executes in.
    pub scope: ScopeId,
    /// `initial` or `always`.
    pub kind: ProcessKind,
    /// The lowered statement graph (§4.5's lowerings already applied).
    pub body: Stmt,
    /// Whether this process was recognized as purely combinational and
    /// should be scheduled with the simulator's "push" discipline rather
    /// than the ordinary "active" queue, so its outputs settle within the
    /// current time step before any reads observe them (§4.5.6).
    pub combinational_push: bool,
    /// Source span of the `initial`/`always` statement.
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_process(kind: ProcessKind, push: bool) -> Process {
        Process {
            id: ProcessId::from_raw(0),
            scope: ScopeId::from_raw(0),
            kind,
            body: Stmt::Nop,
            combinational_push: push,
            span: Span::DUMMY,
        }
    }

    #[test]
    fn initial_process() {
        let p = dummy_process(ProcessKind::Initial, false);
        assert_eq!(p.kind, ProcessKind::Initial);
        assert!(!p.combinational_push);
    }

    #[test]
    fn always_process_tagged_combinational() {
        let p = dummy_process(ProcessKind::Always, true);
        assert_eq!(p.kind, ProcessKind::Always);
        assert!(p.combinational_push);
    }

    #[test]
    fn process_kinds_distinct() {
        assert_ne!(ProcessKind::Initial, ProcessKind::Always);
    }
}
