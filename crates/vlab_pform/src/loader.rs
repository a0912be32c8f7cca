//! The boundary between PForm and whatever upstream parser produced it.

use vlab_common::Ident;

/// A callback the elaboration core uses to ask its host for a module or UDP
/// template it has not seen yet.
///
/// The scope-tree builder calls [`Loader::load_module`] at most once per
/// distinct unknown type name, from its work-list driver, whenever a
/// module-item or instantiation names a type that is not already present in
/// the [`crate::PFormTable`] it was handed. A real host backs this with an
/// incremental parser that lexes/parses the named type's source file lazily
/// and inserts the resulting template into the same table before returning;
/// this crate never does that parsing itself.
pub trait Loader {
    /// Attempt to make `type_name` available in the table this loader is
    /// backing. Returns `true` if the type is now defined (whether it
    /// already was, or became so as a side effect of this call), `false` if
    /// the host could not find or produce a definition for it.
    fn load_module(&mut self, type_name: Ident) -> bool;
}

/// A [`Loader`] that never finds anything, for use with a [`crate::PFormTable`]
/// that is already closed (every reachable type already present).
#[derive(Debug, Default, Clone, Copy)]
pub struct ClosedLoader;

impl Loader for ClosedLoader {
    fn load_module(&mut self, _type_name: Ident) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_common::Interner;

    #[test]
    fn closed_loader_never_resolves() {
        let interner = Interner::new();
        let name = interner.get_or_intern("missing_mod");
        let mut loader = ClosedLoader;
        assert!(!loader.load_module(name));
    }
}
