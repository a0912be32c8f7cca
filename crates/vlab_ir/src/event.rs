//! Events: rendezvous objects fanned into by probes/triggers and fanned out
//! to `wait` statements.

use serde::{Deserialize, Serialize};
use vlab_common::Ident;
use vlab_source::Span;

use crate::ids::{EventId, NexusId, ScopeId};

/// The edge polarity a probe watches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Low-to-high transition.
    Posedge,
    /// High-to-low transition.
    Negedge,
    /// Any value change.
    AnyEdge,
}

/// An edge detector feeding an event. One event may have any number of
/// probes fanned into it (e.g. one per term of an `@(a or b or c)` list,
/// or one per input of an `always @*`'s computed sensitivity set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    /// The edge polarity this probe watches for.
    pub edge: EdgeKind,
    /// The nexus being watched.
    pub nexus: NexusId,
    /// Source span of the expression that produced this probe.
    pub span: Span,
}

/// A named or synthetic event object.
///
/// Named Verilog `event` variables carry a `name`; events synthesized by
/// the behavioral elaborator for `@(...)`/`@*`/`wait(...)` lowering do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The event's name, for a declared `event` variable.
    pub name: Option<Ident>,
    /// The scope this event is declared (or synthesized) in.
    pub scope: ScopeId,
    /// The probes fanned into this event.
    pub probes: Vec<Probe>,
    /// Source span.
    pub span: Span,
}

impl Event {
    /// An event with no probes yet, for incremental construction.
    pub fn new(scope: ScopeId, name: Option<Ident>, span: Span) -> Self {
        Self {
            name,
            scope,
            probes: Vec::new(),
            span,
        }
    }

    /// Whether this event was synthesized by elaboration rather than
    /// declared by the user as a named `event` variable.
    pub fn is_synthetic(&self) -> bool {
        self.name.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_common::Interner;

    #[test]
    fn synthetic_event_has_no_name() {
        let event = Event::new(ScopeId::from_raw(0), None, Span::DUMMY);
        assert!(event.is_synthetic());
    }

    #[test]
    fn named_event_is_not_synthetic() {
        let interner = Interner::new();
        let name = interner.get_or_intern("done");
        let event = Event::new(ScopeId::from_raw(0), Some(name), Span::DUMMY);
        assert!(!event.is_synthetic());
    }

    #[test]
    fn probes_accumulate_in_order() {
        let mut event = Event::new(ScopeId::from_raw(0), None, Span::DUMMY);
        event.probes.push(Probe {
            edge: EdgeKind::Posedge,
            nexus: NexusId::from_raw(0),
            span: Span::DUMMY,
        });
        event.probes.push(Probe {
            edge: EdgeKind::AnyEdge,
            nexus: NexusId::from_raw(1),
            span: Span::DUMMY,
        });
        assert_eq!(event.probes.len(), 2);
        assert_eq!(event.probes[0].edge, EdgeKind::Posedge);
    }
}
