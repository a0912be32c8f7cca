//! Scopes: the nodes of the design's scope tree.
//!
//! A [`Scope`] is a module, task, function, named block, or generate block,
//! per §3's scope-tree model. Scopes are built by the work-list-driven
//! Scope Builder (§4.1) rather than by direct recursive descent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vlab_common::Ident;
use vlab_source::Span;

use crate::arena::Arena;
use crate::const_value::ConstValue;
use crate::ids::{CellId, EventId, ProcessId, ScopeId, SignalId, TypeId};
use crate::stmt::Stmt;
use vlab_pform::PNetKind;

/// The kind of a scope node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    /// A module instance.
    Module,
    /// A task definition's body scope.
    Task,
    /// A function definition's body scope.
    Function,
    /// A named sequential/parallel block (`begin : name ... end`).
    NamedBlock,
    /// A generate block, named or synthesized as `genblk<n>` (§4.1.4).
    GenerateBlock,
}

/// A resolved parameter or specparam entry in a scope's parameter table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamEntry {
    /// The parameter's declared type.
    pub ty: TypeId,
    /// The value after `defparam`s have been applied and the expression
    /// has been constant-folded to a fixpoint (§4.2).
    pub value: ConstValue,
    /// Source span of the declaration.
    pub span: Span,
}

/// A task definition owned by a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDef {
    /// The task's local name.
    pub name: Ident,
    /// Argument signals, in declaration order, already materialized in the
    /// task's own body scope.
    pub args: Vec<SignalId>,
    /// The task's body scope (kind `Task`).
    pub body_scope: ScopeId,
    /// The lowered statement graph.
    pub body: Stmt,
    /// Source span.
    pub span: Span,
}

/// A function definition owned by a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    /// The function's local name.
    pub name: Ident,
    /// Argument signals, in declaration order.
    pub args: Vec<SignalId>,
    /// The signal implicitly declared to hold the return value (shares the
    /// function's own name per Verilog rules).
    pub return_signal: SignalId,
    /// The function's body scope (kind `Function`).
    pub body_scope: ScopeId,
    /// The lowered statement graph.
    pub body: Stmt,
    /// Source span.
    pub span: Span,
}

/// A node in the design's scope tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    /// This scope's own ID.
    pub id: ScopeId,
    /// The enclosing scope, or `None` for a root module.
    pub parent: Option<ScopeId>,
    /// Child scopes, keyed by their local name. Arrayed-instance children
    /// sharing one declaration are grouped under the same key and
    /// distinguished by their own `name`/index rather than the map key.
    pub children: HashMap<Ident, Vec<ScopeId>>,
    /// The kind of scope this is.
    pub kind: ScopeKind,
    /// The scope's local name (a synthesized `genblk<n>` for an unnamed
    /// generate block).
    pub name: Ident,
    /// The parameter table (`parameter` declarations).
    pub parameters: HashMap<Ident, ParamEntry>,
    /// The specparam table (`specparam` declarations).
    pub specparams: HashMap<Ident, ParamEntry>,
    /// Signals declared directly in this scope.
    pub signals: Arena<SignalId, crate::signal::Signal>,
    /// Ports, in declaration order, as a subsequence of `signals`.
    pub ports: Vec<SignalId>,
    /// Structural cells elaborated into this scope.
    pub cells: Arena<CellId, crate::cell::Cell>,
    /// Behavioral processes (`initial`/`always`) elaborated into this scope.
    pub processes: Arena<ProcessId, crate::process::Process>,
    /// Named and synthetic events declared/synthesized in this scope,
    /// indexing into the design's global event arena (a nexus-like object,
    /// an event can be probed from outside its declaring scope).
    pub events: Vec<EventId>,
    /// Task definitions owned by this scope.
    pub tasks: Vec<TaskDef>,
    /// Function definitions owned by this scope.
    pub functions: Vec<FunctionDef>,
    /// Next local symbol-generator counter, used to mint fresh `genblk<n>`
    /// and internal temporary names uniquely within this scope.
    pub next_local_symbol: u32,
    /// Time unit, as a power-of-ten exponent relative to one second
    /// (e.g. `-9` for `` `timescale 1ns``).
    pub time_unit: i32,
    /// Time precision, as a power-of-ten exponent.
    pub time_precision: i32,
    /// The default net kind for implicit declarations (`` `default_nettype``),
    /// or `None` if implicit declarations are disabled.
    pub default_net_kind: Option<PNetKind>,
    /// Source span of the scope's declaration.
    pub span: Span,
}

impl Scope {
    /// Mints a fresh local symbol suffix and advances the generator.
    pub fn next_symbol(&mut self) -> u32 {
        let n = self.next_local_symbol;
        self.next_local_symbol += 1;
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use vlab_common::Interner;

    fn empty_scope(id: u32, name: Ident, kind: ScopeKind) -> Scope {
        Scope {
            id: ScopeId::from_raw(id),
            parent: None,
            children: HashMap::new(),
            kind,
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
            default_net_kind: Some(PNetKind::Wire),
            span: Span::DUMMY,
        }
    }

    #[test]
    fn next_symbol_advances_monotonically() {
        let interner = Interner::new();
        let name = interner.get_or_intern("top");
        let mut scope = empty_scope(0, name, ScopeKind::Module);
        assert_eq!(scope.next_symbol(), 0);
        assert_eq!(scope.next_symbol(), 1);
        assert_eq!(scope.next_symbol(), 2);
    }

    #[test]
    fn children_group_by_name() {
        let interner = Interner::new();
        let name = interner.get_or_intern("top");
        let mut scope = empty_scope(0, name, ScopeKind::Module);
        let inst_name = interner.get_or_intern("u_array");
        scope
            .children
            .entry(inst_name)
            .or_default()
            .extend([ScopeId::from_raw(1), ScopeId::from_raw(2)]);
        assert_eq!(scope.children[&inst_name].len(), 2);
    }

    #[test]
    fn scope_kinds_distinct() {
        assert_ne!(ScopeKind::Module, ScopeKind::Task);
        assert_ne!(ScopeKind::NamedBlock, ScopeKind::GenerateBlock);
    }
}
