//! Deserializing a PForm fixture from JSON.
//!
//! A [`vlab_pform::PFormTable`] is keyed and cross-referenced entirely by
//! [`Ident`], which serializes as a bare `u32`. That integer only means
//! anything relative to the [`Interner`] that produced it, and a fresh CLI
//! invocation starts with an empty interner. A [`Fixture`] carries its own
//! symbol table alongside the PForm tree so the raw integers can be
//! re-interned in the same order they were assigned when the fixture was
//! written, reproducing the original `Ident` values exactly.

use serde::Deserialize;
use vlab_common::{Ident, Interner};
use vlab_pform::PFormTable;

/// A self-contained, serializable PForm fixture: the symbol table an
/// `Interner` must reproduce, plus the table itself.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    /// Interned strings in assignment order. `symbols[i]` is the string
    /// behind `Ident::from_raw(i as u32)` everywhere in `table`.
    pub symbols: Vec<String>,
    /// The PForm forest, with `Ident`s relative to `symbols`.
    pub table: PFormTable,
}

impl Fixture {
    /// Interns `self.symbols` into a fresh [`Interner`], in order, so every
    /// `Ident` already present in `self.table` resolves correctly.
    ///
    /// Panics if a symbol doesn't land on the raw index it was recorded
    /// under — this only happens if `interner` isn't fresh, which would be
    /// a bug in the caller, not a malformed fixture.
    pub fn intern_symbols(&self, interner: &Interner) {
        for (i, symbol) in self.symbols.iter().enumerate() {
            let ident = interner.get_or_intern(symbol);
            assert_eq!(
                ident,
                Ident::from_raw(i as u32),
                "fixture symbol table must be interned into a fresh Interner"
            );
        }
    }
}
