//! Output buffer, label formatting, and per-design counters shared by
//! [`crate::stmt`] and [`crate::expr`] (§4.6, §5 "Emitted assembly format").

use vlab_common::Interner;
use vlab_ir::{EventId, ScopeId};

use crate::lookaside::Lookaside;
use crate::regalloc::{VecRegFile, WordRegFile};

/// Accumulates emitted assembly text plus the allocator and counter state
/// live while lowering one design.
///
/// Mirrors the "own an output buffer, build it up, hand it back" shape
/// used elsewhere in this codebase for serializers: a plain struct around
/// a `String`, appended to with ordinary `push_str`/`write!` calls, with
/// the finished text returned by value rather than written through a
/// trait object.
pub struct Emitter<'a> {
    out: String,
    interner: &'a Interner,
    thread_count: u32,
    local_count: u32,
    transient_id: u32,
    pub words: WordRegFile,
    pub vecs: VecRegFile,
    pub lookaside: Lookaside,
}

impl<'a> Emitter<'a> {
    pub fn new(interner: &'a Interner) -> Self {
        Self {
            out: String::new(),
            interner,
            thread_count: 0,
            local_count: 0,
            transient_id: 0,
            words: WordRegFile::default(),
            vecs: VecRegFile::new(),
            lookaside: Lookaside::new(),
        }
    }

    pub fn interner(&self) -> &'a Interner {
        self.interner
    }

    /// Appends a raw line, verbatim, with a trailing newline.
    pub fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Appends an instruction line in the target's canonical indentation
    /// (`    %opcode operand, operand;`).
    pub fn instr(&mut self, text: &str) {
        self.out.push_str("    ");
        self.out.push_str(text);
        if !text.ends_with(';') {
            self.out.push(';');
        }
        self.out.push('\n');
    }

    /// Appends a bare label line (`label:`), unindented.
    pub fn label(&mut self, label: &str) {
        self.out.push_str(label);
        self.out.push_str(":\n");
    }

    /// Allocates the next top-level thread number.
    pub fn next_thread(&mut self) -> u32 {
        let n = self.thread_count;
        self.thread_count += 1;
        n
    }

    /// Allocates the next thread-local label suffix, for the nested labels
    /// a single thread's control flow needs (if/else arms, loop tops, case
    /// arms).
    pub fn next_local(&mut self) -> u32 {
        let n = self.local_count;
        self.local_count += 1;
        n
    }

    /// Allocates the next transient (synthesized sub-thread) id, used for
    /// `fork`/`join` bookkeeping and synthesized event cascades.
    pub fn next_transient(&mut self) -> u32 {
        let n = self.transient_id;
        self.transient_id += 1;
        n
    }

    /// The `.scope S_<ptr>` style label identifying a scope.
    pub fn scope_label(scope: ScopeId) -> String {
        format!("S_{:x}", scope.as_raw())
    }

    /// The `E_<ptr>` style label identifying an event.
    pub fn event_label(event: EventId) -> String {
        format!("E_{:x}", event.as_raw())
    }

    /// The `T_<n>` label for a top-level thread.
    pub fn thread_label(n: u32) -> String {
        format!("T_{n}")
    }

    /// The `T_<n>.<m>` label for a thread-local branch target.
    pub fn thread_local_label(n: u32, m: u32) -> String {
        format!("T_{n}.{m}")
    }

    /// The `t_<id>` label for a synthesized sub-thread.
    pub fn transient_label(id: u32) -> String {
        format!("t_{id}")
    }

    /// The `TD_<mangled-scope-name>` label for a task/function definition,
    /// mangled from the fully-resolved scope name.
    pub fn task_def_label(&self, scope: ScopeId, name: vlab_common::Ident) -> String {
        format!("TD_{}_{:x}", self.interner.resolve(name), scope.as_raw())
    }

    /// Consumes the emitter and returns the finished assembly text.
    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_ir::ArenaId;

    #[test]
    fn labels_have_expected_shape() {
        assert_eq!(Emitter::scope_label(ScopeId::from_raw(0x1a)), "S_1a");
        assert_eq!(Emitter::event_label(EventId::from_raw(2)), "E_2");
        assert_eq!(Emitter::thread_label(3), "T_3");
        assert_eq!(Emitter::thread_local_label(3, 1), "T_3.1");
        assert_eq!(Emitter::transient_label(5), "t_5");
    }

    #[test]
    fn counters_are_independent_and_monotonic() {
        let interner = Interner::new();
        let mut emitter = Emitter::new(&interner);
        assert_eq!(emitter.next_thread(), 0);
        assert_eq!(emitter.next_thread(), 1);
        assert_eq!(emitter.next_local(), 0);
        assert_eq!(emitter.next_transient(), 0);
        assert_eq!(emitter.next_local(), 1);
    }

    #[test]
    fn instr_appends_semicolon_and_indentation() {
        let interner = Interner::new();
        let mut emitter = Emitter::new(&interner);
        emitter.instr("%jmp out_label");
        assert_eq!(emitter.finish(), "    %jmp out_label;\n");
    }

    #[test]
    fn label_is_unindented() {
        let interner = Interner::new();
        let mut emitter = Emitter::new(&interner);
        emitter.label("out_label");
        assert_eq!(emitter.finish(), "out_label:\n");
    }
}
