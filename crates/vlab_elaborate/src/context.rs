//! Mutable elaboration state shared by every stage of the pipeline.
//!
//! [`ElaborationContext`] holds the [`Design`] under construction, the
//! PForm table (with its on-demand [`Loader`] hook), a cache of already
//! elaborated scopes keyed by name + parameter values, and the current
//! elaboration stack used for instantiation-cycle detection. Every pipeline
//! stage (scope builder, parameter resolver, signal/structural/behavioral
//! elaborators) takes `&mut ElaborationContext` rather than threading these
//! pieces through individually.

use std::collections::HashMap;

use vlab_common::{ContentHash, Ident, Interner};
use vlab_config::CompilerFlags;
use vlab_diagnostics::DiagnosticSink;
use vlab_ir::{ConstValue, Design, ScopeId, TypeDb};
use vlab_pform::{Loader, PFormTable, PFunctionDecl, PGenerateBody, PModuleTemplate, PTaskDecl};
use vlab_source::Span;

use crate::errors;

/// Cache key: scope's type name + sorted parameter bindings, hashed together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    name: Ident,
    param_hash: ContentHash,
}

/// The PForm content a built scope was instantiated from, owned rather than
/// borrowed so later phases can walk it without holding a lifetime into
/// `table` across the whole run (a scope outlives any single `lookup` call).
pub enum ScopeContent {
    /// A module instance's (cloned) template.
    Module(Box<PModuleTemplate>),
    /// A generate block's (cloned) body.
    Generate(Box<PGenerateBody>),
    /// A task's (cloned) declaration, lowered later by the behavioral
    /// elaborator once its body scope's signals exist.
    Task(Box<PTaskDecl>),
    /// A function's (cloned) declaration, lowered the same way.
    Function(Box<PFunctionDecl>),
}

/// Mutable state carried through the whole elaboration run.
pub struct ElaborationContext<'a> {
    /// The design being built.
    pub design: Design,
    /// The PForm table: module/primitive templates and declared roots.
    pub table: &'a mut PFormTable,
    /// The on-demand loader consulted when `table` misses a lookup.
    pub loader: &'a mut dyn Loader,
    /// The string interner shared with the PForm.
    pub interner: &'a Interner,
    /// The diagnostic sink for error/warning reporting.
    pub sink: &'a DiagnosticSink,
    /// Resolved `vlab.toml` elaboration flags.
    pub flags: CompilerFlags,
    /// Cache of resolved parameter tables by (name, override-hash), so that
    /// re-instantiating the same template with the same overrides does not
    /// re-run constant folding over every parameter expression. Each
    /// instance still gets its own [`ScopeId`]; only the parameter-value
    /// computation is memoized.
    cache: HashMap<CacheKey, Vec<(Ident, ConstValue)>>,
    /// Stack of type names currently being elaborated (cycle detection).
    elab_stack: Vec<Ident>,
    /// The PForm content each built scope came from, consumed by the
    /// signal/structural/behavioral phases.
    pub scope_content: HashMap<ScopeId, ScopeContent>,
}

impl<'a> ElaborationContext<'a> {
    /// Creates a new, empty elaboration context.
    pub fn new(
        table: &'a mut PFormTable,
        loader: &'a mut dyn Loader,
        interner: &'a Interner,
        sink: &'a DiagnosticSink,
        flags: CompilerFlags,
    ) -> Self {
        Self {
            design: Design::new(),
            table,
            loader,
            interner,
            sink,
            flags,
            cache: HashMap::new(),
            elab_stack: Vec::new(),
            scope_content: HashMap::new(),
        }
    }

    /// Returns a mutable reference to the shared type database.
    pub fn types(&mut self) -> &mut TypeDb {
        &mut self.design.types
    }

    /// Looks up a previously computed resolved-parameter table for the
    /// given type name and override set.
    pub fn check_cache(&self, name: Ident, overrides: &[(Ident, ConstValue)]) -> Option<&[(Ident, ConstValue)]> {
        let key = CacheKey {
            name,
            param_hash: hash_params(overrides),
        };
        self.cache.get(&key).map(Vec::as_slice)
    }

    /// Records a resolved parameter table for later reuse.
    pub fn insert_cache(
        &mut self,
        name: Ident,
        overrides: &[(Ident, ConstValue)],
        resolved: Vec<(Ident, ConstValue)>,
    ) {
        let key = CacheKey {
            name,
            param_hash: hash_params(overrides),
        };
        self.cache.insert(key, resolved);
    }

    /// Pushes a type name onto the elaboration stack.
    ///
    /// Returns `false` if the name is already on the stack (a circular
    /// instantiation), emitting an `E207` diagnostic.
    pub fn push_elab_stack(&mut self, name: Ident, span: Span) -> bool {
        if self.elab_stack.contains(&name) {
            self.sink.emit(errors::error_circular_instantiation(
                self.interner.resolve(name),
                span,
            ));
            return false;
        }
        self.elab_stack.push(name);
        true
    }

    /// Pops the most recently pushed type name from the elaboration stack.
    pub fn pop_elab_stack(&mut self) {
        self.elab_stack.pop();
    }
}

/// Computes a deterministic hash over sorted parameter bindings.
fn hash_params(params: &[(Ident, ConstValue)]) -> ContentHash {
    use std::hash::Hash;

    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by_key(|(name, _)| name.as_raw());

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for (name, val) in &sorted {
        name.as_raw().hash(&mut hasher);
        match val {
            ConstValue::Int(n) => {
                0u8.hash(&mut hasher);
                n.hash(&mut hasher);
            }
            ConstValue::Real(f) => {
                1u8.hash(&mut hasher);
                f.to_bits().hash(&mut hasher);
            }
            ConstValue::Logic(lv) => {
                2u8.hash(&mut hasher);
                lv.width().hash(&mut hasher);
                lv.to_string().hash(&mut hasher);
            }
            ConstValue::String(s) => {
                3u8.hash(&mut hasher);
                s.hash(&mut hasher);
            }
            ConstValue::Bool(b) => {
                4u8.hash(&mut hasher);
                b.hash(&mut hasher);
            }
        }
    }
    let h = std::hash::Hasher::finish(&hasher);
    ContentHash::from_bytes(&h.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_common::Interner;
    use vlab_diagnostics::DiagnosticSink;
    use vlab_pform::{ClosedLoader, PFormTable};
    use vlab_source::Span;

    fn make_ctx_parts() -> (PFormTable, ClosedLoader, Interner, DiagnosticSink) {
        (
            PFormTable::new(),
            ClosedLoader::default(),
            Interner::new(),
            DiagnosticSink::new(),
        )
    }

    #[test]
    fn context_construction() {
        let (mut table, mut loader, interner, sink) = make_ctx_parts();
        let ctx = ElaborationContext::new(
            &mut table,
            &mut loader,
            &interner,
            &sink,
            CompilerFlags::default(),
        );
        assert_eq!(ctx.design.scopes.len(), 0);
    }

    #[test]
    fn cache_miss_returns_none() {
        let (mut table, mut loader, interner, sink) = make_ctx_parts();
        let ctx = ElaborationContext::new(
            &mut table,
            &mut loader,
            &interner,
            &sink,
            CompilerFlags::default(),
        );
        let name = interner.get_or_intern("counter");
        assert!(ctx.check_cache(name, &[]).is_none());
    }

    #[test]
    fn cache_hit_after_insert() {
        let (mut table, mut loader, interner, sink) = make_ctx_parts();
        let mut ctx = ElaborationContext::new(
            &mut table,
            &mut loader,
            &interner,
            &sink,
            CompilerFlags::default(),
        );
        let name = interner.get_or_intern("counter");
        let width = interner.get_or_intern("WIDTH");
        let resolved = vec![(width, ConstValue::Int(8))];
        ctx.insert_cache(name, &[], resolved.clone());
        assert_eq!(ctx.check_cache(name, &[]), Some(resolved.as_slice()));
    }

    #[test]
    fn cache_different_params_different_entries() {
        let (mut table, mut loader, interner, sink) = make_ctx_parts();
        let mut ctx = ElaborationContext::new(
            &mut table,
            &mut loader,
            &interner,
            &sink,
            CompilerFlags::default(),
        );
        let name = interner.get_or_intern("counter");
        let width = interner.get_or_intern("WIDTH");

        ctx.insert_cache(name, &[(width, ConstValue::Int(8))], vec![(width, ConstValue::Int(8))]);
        ctx.insert_cache(name, &[(width, ConstValue::Int(16))], vec![(width, ConstValue::Int(16))]);

        assert_eq!(
            ctx.check_cache(name, &[(width, ConstValue::Int(8))]),
            Some([(width, ConstValue::Int(8))].as_slice())
        );
        assert_eq!(
            ctx.check_cache(name, &[(width, ConstValue::Int(16))]),
            Some([(width, ConstValue::Int(16))].as_slice())
        );
    }

    #[test]
    fn elab_stack_push_pop() {
        let (mut table, mut loader, interner, sink) = make_ctx_parts();
        let mut ctx = ElaborationContext::new(
            &mut table,
            &mut loader,
            &interner,
            &sink,
            CompilerFlags::default(),
        );
        let name = interner.get_or_intern("top");
        assert!(ctx.push_elab_stack(name, Span::DUMMY));
        ctx.pop_elab_stack();
    }

    #[test]
    fn elab_stack_cycle_detection() {
        let (mut table, mut loader, interner, sink) = make_ctx_parts();
        let mut ctx = ElaborationContext::new(
            &mut table,
            &mut loader,
            &interner,
            &sink,
            CompilerFlags::default(),
        );
        let name = interner.get_or_intern("top");
        assert!(ctx.push_elab_stack(name, Span::DUMMY));
        assert!(!ctx.push_elab_stack(name, Span::DUMMY));
        assert!(sink.has_errors());
    }

    #[test]
    fn elab_stack_no_false_positive() {
        let (mut table, mut loader, interner, sink) = make_ctx_parts();
        let mut ctx = ElaborationContext::new(
            &mut table,
            &mut loader,
            &interner,
            &sink,
            CompilerFlags::default(),
        );
        let a = interner.get_or_intern("a");
        let b = interner.get_or_intern("b");
        assert!(ctx.push_elab_stack(a, Span::DUMMY));
        assert!(ctx.push_elab_stack(b, Span::DUMMY));
        ctx.pop_elab_stack();
        ctx.pop_elab_stack();
        assert!(ctx.push_elab_stack(a, Span::DUMMY));
        assert!(!sink.has_errors());
    }

    #[test]
    fn types_access() {
        let (mut table, mut loader, interner, sink) = make_ctx_parts();
        let mut ctx = ElaborationContext::new(
            &mut table,
            &mut loader,
            &interner,
            &sink,
            CompilerFlags::default(),
        );
        use vlab_ir::Type;
        let tid = ctx.types().intern(Type::Bit);
        assert_eq!(*ctx.types().get(tid), Type::Bit);
    }
}
