//! The top-level PForm forest: a type-name-keyed table of module and UDP
//! templates, plus the set of root module names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vlab_common::Ident;

use crate::loader::Loader;
use crate::module::PModuleTemplate;
use crate::udp::PUdpTemplate;

/// A forest of module templates, UDP templates, and the root-module list
/// that the elaboration core walks to build its scope tree.
///
/// Entries are keyed by type name. A type name never appears in both
/// `pform_modules` and `pform_primitives` at once; the elaboration core
/// checks `pform_modules` first, falling back to `pform_primitives`, which
/// mirrors how a module definition shadows a same-named UDP.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PFormTable {
    /// Module (and UDP-hosting) templates, keyed by type name.
    pform_modules: HashMap<Ident, PModuleTemplate>,
    /// User-defined primitive templates, keyed by type name.
    pform_primitives: HashMap<Ident, PUdpTemplate>,
    /// Names of modules to elaborate as design roots.
    roots: Vec<Ident>,
}

impl PFormTable {
    /// An empty table with no roots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a module template, replacing any prior definition of the
    /// same type name.
    pub fn insert_module(&mut self, template: PModuleTemplate) {
        self.pform_modules.insert(template.name, template);
    }

    /// Inserts a UDP template, replacing any prior definition of the same
    /// type name.
    pub fn insert_primitive(&mut self, template: PUdpTemplate) {
        self.pform_primitives.insert(template.name, template);
    }

    /// Marks `name` as a design root. Does not require the module to be
    /// present yet; roots are resolved lazily like any other reference.
    pub fn add_root(&mut self, name: Ident) {
        self.roots.push(name);
    }

    /// The design root names, in the order they were added.
    pub fn roots(&self) -> &[Ident] {
        &self.roots
    }

    /// Looks up a module template by type name, without invoking a loader.
    pub fn module(&self, type_name: Ident) -> Option<&PModuleTemplate> {
        self.pform_modules.get(&type_name)
    }

    /// Looks up a UDP template by type name, without invoking a loader.
    pub fn primitive(&self, type_name: Ident) -> Option<&PUdpTemplate> {
        self.pform_primitives.get(&type_name)
    }

    /// Looks up `type_name`, first as a module then as a UDP. If neither is
    /// present, asks `loader` to produce one and retries once.
    ///
    /// This is the lookup path the scope-tree builder's work-list driver
    /// uses for every instantiation and `defparam` target it encounters, so
    /// that an unknown type is resolved on demand rather than requiring the
    /// whole design to be loaded up front.
    pub fn lookup(&mut self, type_name: Ident, loader: &mut dyn Loader) -> Option<PFormEntry<'_>> {
        if self.pform_modules.contains_key(&type_name) {
            return self.pform_modules.get(&type_name).map(PFormEntry::Module);
        }
        if self.pform_primitives.contains_key(&type_name) {
            return self
                .pform_primitives
                .get(&type_name)
                .map(PFormEntry::Primitive);
        }
        if loader.load_module(type_name) {
            if let Some(m) = self.pform_modules.get(&type_name) {
                return Some(PFormEntry::Module(m));
            }
            if let Some(u) = self.pform_primitives.get(&type_name) {
                return Some(PFormEntry::Primitive(u));
            }
        }
        None
    }
}

/// The result of a [`PFormTable::lookup`]: either a module or a UDP
/// template, borrowed from the table.
#[derive(Debug, Clone, Copy)]
pub enum PFormEntry<'a> {
    /// A module (or UDP-hosting) template.
    Module(&'a PModuleTemplate),
    /// A user-defined primitive template.
    Primitive(&'a PUdpTemplate),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ClosedLoader;
    use crate::module::PNetKind;
    use vlab_common::Interner;
    use vlab_source::Span;

    fn empty_module(name: Ident) -> PModuleTemplate {
        PModuleTemplate {
            name,
            ports: vec![],
            parameters: vec![],
            specparams: vec![],
            signals: vec![],
            gates: vec![],
            continuous_assigns: vec![],
            instances: vec![],
            behaviors: vec![],
            tasks: vec![],
            functions: vec![],
            generates: vec![],
            specify_paths: vec![],
            defparams: vec![],
            time_unit: -9,
            time_precision: -9,
            default_net_kind: Some(PNetKind::Wire),
            span: Span::DUMMY,
        }
    }

    #[test]
    fn module_shadows_same_named_primitive_lookup_order() {
        let interner = Interner::new();
        let name = interner.get_or_intern("dup");
        let mut table = PFormTable::new();
        table.insert_module(empty_module(name));
        assert!(table.module(name).is_some());
        assert!(table.primitive(name).is_none());
    }

    #[test]
    fn lookup_falls_back_to_loader_once() {
        let interner = Interner::new();
        let name = interner.get_or_intern("missing");
        let mut table = PFormTable::new();
        let mut loader = ClosedLoader;
        assert!(table.lookup(name, &mut loader).is_none());
    }

    #[test]
    fn roots_preserve_insertion_order() {
        let interner = Interner::new();
        let a = interner.get_or_intern("top_a");
        let b = interner.get_or_intern("top_b");
        let mut table = PFormTable::new();
        table.add_root(a);
        table.add_root(b);
        assert_eq!(table.roots(), &[a, b]);
    }
}
