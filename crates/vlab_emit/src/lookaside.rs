//! Expression lookaside: caches the register already holding a signal's
//! value so a later read of the same bits within the same basic block can
//! skip re-emitting a load (§4.6, §9).

use std::collections::HashMap;

use vlab_ir::SignalId;

/// Identifies a specific slice of a signal's value: the whole signal
/// (`word = None`) or one word of an array (`word = Some(index)`), plus an
/// optional constant bit offset within that word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookasideKey {
    pub signal: SignalId,
    pub word: Option<u32>,
    pub bit_offset: Option<u32>,
}

impl LookasideKey {
    pub fn whole(signal: SignalId) -> Self {
        Self { signal, word: None, bit_offset: None }
    }

    pub fn word(signal: SignalId, word: u32) -> Self {
        Self { signal, word: Some(word), bit_offset: None }
    }

    pub fn part(signal: SignalId, word: u32, bit_offset: u32) -> Self {
        Self { signal, word: Some(word), bit_offset: Some(bit_offset) }
    }
}

/// Block-scoped cache from a signal slice to the register currently holding
/// its value.
///
/// Any routine that can change a signal's value (an assignment, a task or
/// function call, a system task call) or that crosses a scheduling
/// boundary (`%delay`, `%wait`, `%fork`/`%join`) invalidates the whole
/// cache rather than trying to prove which entries survived — the same
/// conservative rule the original target used, since cross-thread writes
/// are otherwise invisible to the emitting thread.
#[derive(Default)]
pub struct Lookaside {
    entries: HashMap<LookasideKey, u32>,
}

impl Lookaside {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: LookasideKey) -> Option<u32> {
        self.entries.get(&key).copied()
    }

    pub fn insert(&mut self, key: LookasideKey, reg: u32) {
        self.entries.insert(key, reg);
    }

    /// Drops every cached entry. Called after any value-changing write and
    /// at every delay/wait/fork crossing.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }
}
