//! Source mapping from IR entities back to their original source locations.
//!
//! The [`SourceMap`] records the source [`Span`] for every IR entity,
//! enabling precise error messages and diagnostics even after elaboration.

use crate::ids::{CellId, ProcessId, ScopeId, SignalId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vlab_source::Span;

/// Maps IR entity IDs back to their original source spans.
///
/// Every scope, signal, cell, and process can be traced back to the exact
/// source location where it was declared or inferred.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    /// Scope ID → source span.
    scope_spans: HashMap<ScopeId, Span>,
    /// (Scope, Signal) → source span.
    signal_spans: HashMap<(ScopeId, SignalId), Span>,
    /// (Scope, Cell) → source span.
    cell_spans: HashMap<(ScopeId, CellId), Span>,
    /// (Scope, Process) → source span.
    process_spans: HashMap<(ScopeId, ProcessId), Span>,
}

impl SourceMap {
    /// Creates a new, empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the source span for a scope.
    pub fn insert_scope(&mut self, id: ScopeId, span: Span) {
        self.scope_spans.insert(id, span);
    }

    /// Records the source span for a signal within a scope.
    pub fn insert_signal(&mut self, scope: ScopeId, signal: SignalId, span: Span) {
        self.signal_spans.insert((scope, signal), span);
    }

    /// Records the source span for a cell within a scope.
    pub fn insert_cell(&mut self, scope: ScopeId, cell: CellId, span: Span) {
        self.cell_spans.insert((scope, cell), span);
    }

    /// Records the source span for a process within a scope.
    pub fn insert_process(&mut self, scope: ScopeId, process: ProcessId, span: Span) {
        self.process_spans.insert((scope, process), span);
    }

    /// Looks up the source span for a scope.
    pub fn get_scope(&self, id: ScopeId) -> Option<Span> {
        self.scope_spans.get(&id).copied()
    }

    /// Looks up the source span for a signal within a scope.
    pub fn get_signal(&self, scope: ScopeId, signal: SignalId) -> Option<Span> {
        self.signal_spans.get(&(scope, signal)).copied()
    }

    /// Looks up the source span for a cell within a scope.
    pub fn get_cell(&self, scope: ScopeId, cell: CellId) -> Option<Span> {
        self.cell_spans.get(&(scope, cell)).copied()
    }

    /// Looks up the source span for a process within a scope.
    pub fn get_process(&self, scope: ScopeId, process: ProcessId) -> Option<Span> {
        self.process_spans.get(&(scope, process)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_source::FileId;

    fn test_span(start: u32, end: u32) -> Span {
        Span::new(FileId::from_raw(0), start, end)
    }

    #[test]
    fn insert_and_get_scope() {
        let mut map = SourceMap::new();
        let sid = ScopeId::from_raw(0);
        let span = test_span(10, 20);
        map.insert_scope(sid, span);
        assert_eq!(map.get_scope(sid), Some(span));
    }

    #[test]
    fn missing_scope_returns_none() {
        let map = SourceMap::new();
        assert_eq!(map.get_scope(ScopeId::from_raw(99)), None);
    }

    #[test]
    fn insert_and_get_signal() {
        let mut map = SourceMap::new();
        let scope = ScopeId::from_raw(0);
        let sid = SignalId::from_raw(5);
        let span = test_span(30, 40);
        map.insert_signal(scope, sid, span);
        assert_eq!(map.get_signal(scope, sid), Some(span));
    }

    #[test]
    fn insert_and_get_cell() {
        let mut map = SourceMap::new();
        let scope = ScopeId::from_raw(0);
        let cid = CellId::from_raw(3);
        let span = test_span(50, 60);
        map.insert_cell(scope, cid, span);
        assert_eq!(map.get_cell(scope, cid), Some(span));
    }

    #[test]
    fn insert_and_get_process() {
        let mut map = SourceMap::new();
        let scope = ScopeId::from_raw(0);
        let pid = ProcessId::from_raw(7);
        let span = test_span(70, 80);
        map.insert_process(scope, pid, span);
        assert_eq!(map.get_process(scope, pid), Some(span));
    }

    #[test]
    fn signals_scoped_by_scope() {
        let mut map = SourceMap::new();
        let s0 = ScopeId::from_raw(0);
        let s1 = ScopeId::from_raw(1);
        let sid = SignalId::from_raw(0);
        let span0 = test_span(0, 10);
        let span1 = test_span(100, 110);
        map.insert_signal(s0, sid, span0);
        map.insert_signal(s1, sid, span1);
        assert_eq!(map.get_signal(s0, sid), Some(span0));
        assert_eq!(map.get_signal(s1, sid), Some(span1));
    }
}
