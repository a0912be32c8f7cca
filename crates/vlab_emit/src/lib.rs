//! Back-end emitter: lowers an elaborated [`Design`] into the target
//! virtual machine's textual assembly (§4.6).
//!
//! Statement and expression lowering live in [`stmt`]/[`expr`]; register
//! allocation and the expression lookaside are self-contained helpers in
//! [`regalloc`]/[`lookaside`] reused by both. [`emit_design`] is the single
//! entry point: walk every scope once, emit its functions and tasks as
//! definition blocks, then its own `initial`/`always` processes as threads.

pub mod emitter;
pub mod expr;
pub mod lookaside;
pub mod regalloc;
pub mod stmt;

use vlab_common::Interner;
use vlab_ir::{Design, Process, ProcessKind, ScopeId, Stmt};

use crate::emitter::Emitter;

/// Emits the full assembly listing for `design`.
///
/// Iterates every scope in the design's arena (not just roots — tasks,
/// functions, and generate blocks live alongside modules there), emitting
/// each scope's functions, then its tasks, then its own behavioral
/// processes, matching the elaborator's own functions-before-tasks-before-
/// behaviors registration order.
pub fn emit_design(design: &Design, interner: &Interner) -> String {
    let mut emitter = Emitter::new(interner);

    for (scope_id, scope) in design.scopes.iter() {
        emitter.line(&format!(".scope {};", Emitter::scope_label(scope_id)));

        for func in &scope.functions {
            let label = emitter.task_def_label(scope_id, func.name);
            emit_definition(&mut emitter, design, &label, func.body_scope, &func.body);
        }
        for task in &scope.tasks {
            let label = emitter.task_def_label(scope_id, task.name);
            emit_definition(&mut emitter, design, &label, task.body_scope, &task.body);
        }
        for (_, process) in scope.processes.iter() {
            emit_process(&mut emitter, design, scope_id, process);
        }
    }

    emitter.finish()
}

fn emit_definition(emitter: &mut Emitter, design: &Design, label: &str, body_scope: ScopeId, body: &Stmt) {
    emitter.label(label);
    emitter.lookaside.invalidate();
    stmt::emit_stmt(emitter, design, body_scope, body);
    emitter.instr("%end");
}

fn emit_process(emitter: &mut Emitter, design: &Design, scope_id: ScopeId, process: &Process) {
    let thread = emitter.next_thread();
    let thread_label = Emitter::thread_label(thread);
    let push = if process.combinational_push { ", $push" } else { "" };
    emitter.line(&format!("    .thread {thread_label}{push};"));
    emitter.label(&thread_label);
    emitter.lookaside.invalidate();
    stmt::emit_stmt(emitter, design, scope_id, &process.body);
    match process.kind {
        ProcessKind::Initial => emitter.instr("%end"),
        ProcessKind::Always => emitter.instr(&format!("%jmp {thread_label}")),
    }
}
