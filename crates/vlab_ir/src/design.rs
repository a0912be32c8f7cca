//! Top-level design container.
//!
//! A [`Design`] holds the entire scope tree, the shared nexus and event
//! arenas (both of which may be referenced across scope boundaries), the
//! type database, and the source map. It is the Structural/Behavioral
//! Elaborators' output and the Back-End Emitter's input.

use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::event::Event;
use crate::ids::{EventId, NexusId, ScopeId};
use crate::nexus::Nexus;
use crate::scope::Scope;
use crate::source_map::SourceMap;
use crate::types::TypeDb;

/// A complete elaborated design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Design {
    /// All scopes in the design's scope tree, keyed by [`ScopeId`].
    pub scopes: Arena<ScopeId, Scope>,
    /// The design's root module instances (§3: "one or more root modules").
    pub roots: Vec<ScopeId>,
    /// Global type database.
    pub types: TypeDb,
    /// Nexus equivalence classes, shared across scope boundaries.
    pub nexuses: Arena<NexusId, Nexus>,
    /// Named and synthetic events, shared across scope boundaries.
    pub events: Arena<EventId, Event>,
    /// Source mapping from IR entities to original source spans.
    pub source_map: SourceMap,
    /// The number of elaboration errors recorded against this design.
    /// A nonzero count means the design is not safe to emit (§7).
    pub error_count: u32,
}

impl Design {
    /// An empty design with no roots, ready for the elaborator to populate.
    pub fn new() -> Self {
        Self {
            scopes: Arena::new(),
            roots: Vec::new(),
            types: TypeDb::new(),
            nexuses: Arena::new(),
            events: Arena::new(),
            source_map: SourceMap::new(),
            error_count: 0,
        }
    }

    /// The root scopes, dereferenced.
    pub fn root_scopes(&self) -> impl Iterator<Item = &Scope> {
        self.roots.iter().map(move |&id| &self.scopes[id])
    }

    /// `true` if elaboration recorded no errors against this design.
    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }
}

impl Default for Design {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeKind;
    use std::collections::HashMap;
    use vlab_common::Interner;
    use vlab_source::Span;

    fn make_design() -> Design {
        let interner = Interner::new();
        let name = interner.get_or_intern("top");
        let mut design = Design::new();
        let top_id = design.scopes.alloc(Scope {
            id: ScopeId::from_raw(0),
            parent: None,
            children: HashMap::new(),
            kind: ScopeKind::Module,
            name,
            parameters: HashMap::new(),
            specparams: HashMap::new(),
            signals: Arena::new(),
            ports: Vec::new(),
            cells: Arena::new(),
            processes: Arena::new(),
            events: Vec::new(),
            tasks: Vec::new(),
            functions: Vec::new(),
            next_local_symbol: 0,
            time_unit: -9,
            time_precision: -9,
            default_net_kind: None,
            span: Span::DUMMY,
        });
        design.roots.push(top_id);
        design
    }

    #[test]
    fn design_construction() {
        let design = make_design();
        assert_eq!(design.roots.len(), 1);
        assert!(design.is_clean());
    }

    #[test]
    fn root_scopes_iterates_roots() {
        let design = make_design();
        let names: Vec<_> = design.root_scopes().map(|s| s.name).collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn design_with_errors_is_not_clean() {
        let mut design = make_design();
        design.error_count = 3;
        assert!(!design.is_clean());
    }

    #[test]
    fn design_serde_roundtrip() {
        let design = make_design();
        let json = serde_json::to_string(&design).unwrap();
        let restored: Design = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.roots, design.roots);
    }
}
