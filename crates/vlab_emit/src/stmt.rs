//! Emits one statement at a time into the thread it was asked to run in
//! (§4.6's fourteen statement-emission categories).

use vlab_ir::{ArenaId, CaseKind, DelayValue, Design, Scope, ScopeId, Signal, SignalRef, Stmt, ValueKind};

use crate::emitter::Emitter;
use crate::expr::{eval_expr, ValueReg};

/// Emits `stmt`, running in `scope`, into the current thread.
pub fn emit_stmt(emitter: &mut Emitter, design: &Design, scope: ScopeId, stmt: &Stmt) {
    match stmt {
        Stmt::Nop => {}
        Stmt::SeqBlock { scope: inner, body } => {
            let inner_scope = inner.unwrap_or(scope);
            for s in body {
                emit_stmt(emitter, design, inner_scope, s);
            }
        }
        Stmt::ParBlock { scope: inner, body } => emit_par_block(emitter, design, inner.unwrap_or(scope), body),
        Stmt::BlockingAssign { lhs, rhs, .. } => emit_blocking_assign(emitter, design, scope, lhs, rhs),
        Stmt::NonBlockingAssign { lhs, rhs, delay, .. } => {
            emit_nonblocking_assign(emitter, design, scope, lhs, rhs, delay.as_ref())
        }
        Stmt::ProceduralContinuousAssign { lhs, rhs, .. } => {
            emit_hold(emitter, design, scope, StoreFamily::Cassign, "%deassign", lhs, Some(rhs))
        }
        Stmt::Force { lhs, rhs, .. } => emit_hold(emitter, design, scope, StoreFamily::Force, "%release", lhs, Some(rhs)),
        Stmt::Deassign { lhs, .. } => emit_hold(emitter, design, scope, StoreFamily::Cassign, "%deassign", lhs, None),
        Stmt::Release { lhs, .. } => emit_hold(emitter, design, scope, StoreFamily::Force, "%release", lhs, None),
        Stmt::Delay { delay, body, .. } => {
            emit_delay(emitter, design, scope, delay);
            emit_stmt(emitter, design, scope, body);
        }
        Stmt::EventWait { events, body, .. } => {
            emit_wait(emitter, events);
            emit_stmt(emitter, design, scope, body);
        }
        Stmt::EventTrigger { event, .. } => {
            emitter.instr(&format!("%set/v {}, 0, 1", Emitter::event_label(*event)));
        }
        Stmt::Conditional { cond, then_branch, else_branch, .. } => {
            emit_conditional(emitter, design, scope, cond, then_branch, else_branch.as_deref())
        }
        Stmt::Case { kind, selector, arms, .. } => emit_case(emitter, design, scope, *kind, selector, arms),
        Stmt::While { cond, body, .. } => emit_while(emitter, design, scope, cond, body),
        Stmt::Forever { body, .. } => emit_forever(emitter, design, scope, body),
        Stmt::Repeat { count, body, .. } => emit_repeat(emitter, design, scope, count, body),
        Stmt::UserTaskCall { task, args, .. } => emit_user_task_call(emitter, design, scope, task, args),
        Stmt::SystemTaskCall { name, args, .. } => emit_system_task_call(emitter, design, scope, *name, args),
        Stmt::Disable { target_scope, .. } => {
            emitter.instr(&format!("%disable {}", Emitter::scope_label(*target_scope)));
        }
    }
}

fn signal_label(emitter: &Emitter, sig: &Signal) -> String {
    format!("v_{}_{:x}", emitter.interner().resolve(sig.name), sig.id.as_raw())
}

fn lookup_signal<'d>(design: &'d Design, scope: ScopeId, id: vlab_ir::SignalId) -> &'d Signal {
    &design.scopes[scope].signals[id]
}

/// Which `%set`/`%assign`/`%force`/`%cassign` family a store belongs to,
/// and the exact suffixes each uses for a plain, sliced, or real target
/// (§4.6 categories 1, 3, 13).
#[derive(Clone, Copy)]
enum StoreFamily {
    /// Blocking assign: `%set/v`, `%set/x<low>`, `%set/wr`.
    Set,
    /// Non-blocking assign with no delay: `%assign/v0`, `%assign/v0/x<low>`, `%assign/wr`.
    Assign,
    /// `force`: `%force`, `%force/x<low>`, `%force/wr`.
    Force,
    /// Procedural continuous assign: `%cassign`, `%cassign/x<low>`, `%cassign/wr`.
    Cassign,
}

impl StoreFamily {
    fn simple(self) -> &'static str {
        match self {
            StoreFamily::Set => "%set/v",
            StoreFamily::Assign => "%assign/v0",
            StoreFamily::Force => "%force",
            StoreFamily::Cassign => "%cassign",
        }
    }

    fn slice_base(self) -> &'static str {
        match self {
            StoreFamily::Set => "%set",
            StoreFamily::Assign => "%assign/v0",
            StoreFamily::Force => "%force",
            StoreFamily::Cassign => "%cassign",
        }
    }

    fn real(self) -> &'static str {
        match self {
            StoreFamily::Set => "%set/wr",
            StoreFamily::Assign => "%assign/wr",
            StoreFamily::Force => "%force/wr",
            StoreFamily::Cassign => "%cassign/wr",
        }
    }
}

/// Stores `value` into `lref` under the given opcode family. A
/// [`SignalRef::Concat`] target is split into one store per part,
/// most-significant part first, since the target ISA has no single
/// "store to a concat" primitive.
fn store_lvalue(emitter: &mut Emitter, design: &Design, scope: ScopeId, lref: &SignalRef, value: &ValueReg, family: StoreFamily) {
    match lref {
        SignalRef::Signal(id) => {
            let sig = lookup_signal(design, scope, *id);
            let label = signal_label(emitter, sig);
            let opcode = if sig.value_kind == ValueKind::Real { family.real() } else { family.simple() };
            emitter.instr(&format!("{opcode} {label}, v{}, {}", value.base, value.width));
        }
        SignalRef::Slice { signal, high, low } => {
            let sig = lookup_signal(design, scope, *signal);
            let label = signal_label(emitter, sig);
            let width = high.abs_diff(*low) + 1;
            emitter.instr(&format!("{}/x{low} {label}, v{}, {}", family.slice_base(), value.base, width));
        }
        SignalRef::Concat(parts) => {
            for part in parts {
                let part_width = part.width();
                store_lvalue(emitter, design, scope, part, &ValueReg { base: value.base, width: part_width }, family);
            }
        }
        SignalRef::Const(_) => {
            // A constant target never appears on a write path produced by
            // elaboration; only as a force source, never a force target.
        }
    }
}

fn emit_blocking_assign(emitter: &mut Emitter, design: &Design, scope: ScopeId, lhs: &SignalRef, rhs: &vlab_ir::Expr) {
    let value = eval_expr(emitter, design, scope, rhs);
    store_lvalue(emitter, design, scope, lhs, &value, StoreFamily::Set);
    emitter.vecs.free(value.base, value.width);
    emitter.lookaside.invalidate();
}

fn emit_nonblocking_assign(
    emitter: &mut Emitter,
    design: &Design,
    scope: ScopeId,
    lhs: &SignalRef,
    rhs: &vlab_ir::Expr,
    delay: Option<&DelayValue>,
) {
    let value = eval_expr(emitter, design, scope, rhs);
    match delay {
        None => store_lvalue(emitter, design, scope, lhs, &value, StoreFamily::Assign),
        Some(DelayValue::Const(ticks)) => {
            store_lvalue(emitter, design, scope, lhs, &value, StoreFamily::Assign);
            emitter.instr(&format!("%assign/d {ticks}"));
        }
        Some(DelayValue::Expr(expr)) => {
            let delay_reg = eval_expr(emitter, design, scope, expr);
            store_lvalue(emitter, design, scope, lhs, &value, StoreFamily::Assign);
            emitter.instr(&format!("%assign/d/x v{}", delay_reg.base));
            emitter.vecs.free(delay_reg.base, delay_reg.width);
        }
    }
    emitter.vecs.free(value.base, value.width);
    emitter.lookaside.invalidate();
}

/// `assign`/`force`/`deassign`/`release`: `deassign`/`release` share the
/// same target-addressing rules but carry no source value.
fn emit_hold(emitter: &mut Emitter, design: &Design, scope: ScopeId, family: StoreFamily, release_opcode: &str, lhs: &SignalRef, rhs: Option<&vlab_ir::Expr>) {
    match rhs {
        Some(rhs) => {
            let value = eval_expr(emitter, design, scope, rhs);
            store_lvalue(emitter, design, scope, lhs, &value, family);
            if is_plain_signal_ref(rhs) {
                emitter.instr(&format!("{}/link", family.simple()));
            }
            emitter.vecs.free(value.base, value.width);
        }
        None => {
            let label = lvalue_primary_label(emitter, design, scope, lhs);
            emitter.instr(&format!("{release_opcode} {label}"));
        }
    }
    emitter.lookaside.invalidate();
}

/// Whether `expr` is a bare, unsliced, unmuxed read of a single signal — a
/// `force`/`cassign` whose source is one of these wires the target
/// directly to that signal's driver rather than to a computed value.
fn is_plain_signal_ref(expr: &vlab_ir::Expr) -> bool {
    matches!(
        expr,
        vlab_ir::Expr::SignalRef { word_index: None, part_offset: None, mux_select: None, .. }
    )
}

fn lvalue_primary_label(emitter: &Emitter, design: &Design, scope: ScopeId, lref: &SignalRef) -> String {
    match lref {
        SignalRef::Signal(id) | SignalRef::Slice { signal: id, .. } => {
            signal_label(emitter, lookup_signal(design, scope, *id))
        }
        SignalRef::Concat(parts) => parts
            .first()
            .map(|p| lvalue_primary_label(emitter, design, scope, p))
            .unwrap_or_default(),
        SignalRef::Const(_) => String::new(),
    }
}

fn emit_delay(emitter: &mut Emitter, design: &Design, scope: ScopeId, delay: &DelayValue) {
    match delay {
        DelayValue::Const(ticks) => {
            let low = (*ticks & 0xffff_ffff) as u32;
            let high = (*ticks >> 32) as u32;
            emitter.instr(&format!("%delay {low}, {high}"));
        }
        DelayValue::Expr(expr) => {
            let reg = eval_expr(emitter, design, scope, expr);
            emitter.instr(&format!("%delayx 0, v{}", reg.base));
            emitter.vecs.free(reg.base, reg.width);
        }
    }
    emitter.lookaside.invalidate();
}

fn emit_wait(emitter: &mut Emitter, events: &[vlab_ir::EventId]) {
    match events {
        [] => unreachable!("an EventWait with no events violates elaboration's non-empty sensitivity invariant"),
        [single] => emitter.instr(&format!("%wait {}", Emitter::event_label(*single))),
        many => {
            let id = emitter.next_transient();
            let mut cascade = format!("Ewait_{id} .event/or");
            for (i, event) in many.iter().enumerate() {
                if i > 0 {
                    cascade.push(',');
                }
                cascade.push(' ');
                cascade.push_str(&Emitter::event_label(*event));
            }
            emitter.line(&cascade);
            emitter.instr(&format!("%wait Ewait_{id}"));
        }
    }
    emitter.lookaside.invalidate();
}

fn emit_conditional(
    emitter: &mut Emitter,
    design: &Design,
    scope: ScopeId,
    cond: &vlab_ir::Expr,
    then_branch: &Stmt,
    else_branch: Option<&Stmt>,
) {
    let cond_val = eval_expr(emitter, design, scope, cond);
    let local = emitter.next_local();
    let false_label = Emitter::thread_local_label(local, 0);
    let out_label = Emitter::thread_local_label(local, 1);
    emitter.instr(&format!("%jmp/0xz {false_label}, v{}", cond_val.base));
    emitter.vecs.free(cond_val.base, cond_val.width);
    emit_stmt(emitter, design, scope, then_branch);
    if else_branch.is_some() {
        emitter.instr(&format!("%jmp {out_label}"));
    }
    emitter.label(&false_label);
    emitter.lookaside.invalidate();
    if let Some(else_branch) = else_branch {
        emit_stmt(emitter, design, scope, else_branch);
        emitter.label(&out_label);
        emitter.lookaside.invalidate();
    }
}

fn emit_case(emitter: &mut Emitter, design: &Design, scope: ScopeId, kind: CaseKind, selector: &vlab_ir::Expr, arms: &[vlab_ir::CaseArm]) {
    let sel = eval_expr(emitter, design, scope, selector);
    let local = emitter.next_local();
    let out_label = Emitter::thread_local_label(local, 0);
    let cmp = match kind {
        CaseKind::Exact => "%cmp/u",
        CaseKind::CaseX => "%cmp/x",
        CaseKind::CaseZ => "%cmp/z",
        CaseKind::RealCase => "%cmp/wr",
    };

    let mut default_arm = None;
    let mut arm_labels = Vec::new();
    for (i, arm) in arms.iter().enumerate() {
        if arm.guards.is_empty() {
            default_arm = Some(i);
            continue;
        }
        let arm_label = Emitter::thread_local_label(local, (i + 1) as u32);
        arm_labels.push((i, arm_label.clone()));
        for guard in &arm.guards {
            let guard_val = eval_expr(emitter, design, scope, guard);
            emitter.instr(&format!("{cmp} v{}, v{}", sel.base, guard_val.base));
            emitter.instr(&format!("%jmp/1 {arm_label}"));
            emitter.vecs.free(guard_val.base, guard_val.width);
        }
    }
    emitter.vecs.free(sel.base, sel.width);
    if let Some(default_idx) = default_arm {
        emit_stmt(emitter, design, scope, &arms[default_idx].body);
    }
    emitter.instr(&format!("%jmp {out_label}"));
    for (i, label) in arm_labels {
        emitter.label(&label);
        emitter.lookaside.invalidate();
        emit_stmt(emitter, design, scope, &arms[i].body);
        emitter.instr(&format!("%jmp {out_label}"));
    }
    emitter.label(&out_label);
    emitter.lookaside.invalidate();
}

fn emit_while(emitter: &mut Emitter, design: &Design, scope: ScopeId, cond: &vlab_ir::Expr, body: &Stmt) {
    let local = emitter.next_local();
    let top_label = Emitter::thread_local_label(local, 0);
    let out_label = Emitter::thread_local_label(local, 1);
    emitter.label(&top_label);
    emitter.lookaside.invalidate();
    let cond_val = eval_expr(emitter, design, scope, cond);
    emitter.instr(&format!("%jmp/0xz {out_label}, v{}", cond_val.base));
    emitter.vecs.free(cond_val.base, cond_val.width);
    emit_stmt(emitter, design, scope, body);
    emitter.instr(&format!("%jmp {top_label}"));
    emitter.label(&out_label);
    emitter.lookaside.invalidate();
}

fn emit_forever(emitter: &mut Emitter, design: &Design, scope: ScopeId, body: &Stmt) {
    let local = emitter.next_local();
    let top_label = Emitter::thread_local_label(local, 0);
    emitter.label(&top_label);
    emitter.lookaside.invalidate();
    emit_stmt(emitter, design, scope, body);
    emitter.instr(&format!("%jmp {top_label}"));
}

fn emit_repeat(emitter: &mut Emitter, design: &Design, scope: ScopeId, count: &vlab_ir::Expr, body: &Stmt) {
    let count_val = eval_expr(emitter, design, scope, count);
    let counter = emitter.words.alloc().expect("word register exhaustion during repeat lowering");
    emitter.instr(&format!("%mov/wr w{counter}, v{}", count_val.base));
    emitter.vecs.free(count_val.base, count_val.width);

    let local = emitter.next_local();
    let top_label = Emitter::thread_local_label(local, 0);
    let out_label = Emitter::thread_local_label(local, 1);
    emitter.label(&top_label);
    emitter.lookaside.invalidate();
    emitter.instr(&format!("%jmp/0xz {out_label}, w{counter}"));
    emit_stmt(emitter, design, scope, body);
    emitter.instr(&format!("%sub/i w{counter}, 1"));
    emitter.instr(&format!("%jmp {top_label}"));
    emitter.label(&out_label);
    emitter.lookaside.invalidate();
    emitter.words.free(counter);
}

fn emit_par_block(emitter: &mut Emitter, design: &Design, scope: ScopeId, body: &[Stmt]) {
    if body.is_empty() {
        return;
    }
    let thread_ids: Vec<u32> = body.iter().map(|_| emitter.next_thread()).collect();
    for &id in thread_ids.iter().skip(1) {
        emitter.instr(&format!("%fork {}, {}", Emitter::thread_label(id), Emitter::scope_label(scope)));
    }
    emit_stmt(emitter, design, scope, &body[0]);
    for &id in thread_ids.iter().skip(1) {
        emitter.instr(&format!("%join {}", Emitter::thread_label(id)));
    }
    emitter.lookaside.invalidate();

    if thread_ids.len() > 1 {
        let local = emitter.next_local();
        let after_label = Emitter::thread_local_label(local, 0);
        emitter.instr(&format!("%jmp {after_label}"));
        for (i, stmt) in body.iter().enumerate().skip(1) {
            emitter.line(&format!(".thread {};", Emitter::thread_label(thread_ids[i])));
            emitter.label(&Emitter::thread_label(thread_ids[i]));
            emit_stmt(emitter, design, scope, stmt);
            emitter.instr("%end");
        }
        emitter.label(&after_label);
        emitter.lookaside.invalidate();
    }
}

fn emit_user_task_call(emitter: &mut Emitter, design: &Design, scope: ScopeId, task: &vlab_ir::TaskRef, args: &[vlab_ir::Expr]) {
    let owner: &Scope = &design.scopes[task.scope];
    let def = owner
        .tasks
        .iter()
        .find(|t| t.name == task.name)
        .expect("task call resolved to an existing TaskDef by elaboration");
    for (arg_expr, arg_signal) in args.iter().zip(def.args.iter()) {
        let value = eval_expr(emitter, design, scope, arg_expr);
        let sig = lookup_signal(design, task.scope, *arg_signal);
        let label = signal_label(emitter, sig);
        emitter.instr(&format!("%set/v {label}, v{}, {}", value.base, value.width));
        emitter.vecs.free(value.base, value.width);
    }
    emitter.instr(&format!(
        "%fork {}, {}",
        emitter.task_def_label(task.scope, task.name),
        Emitter::scope_label(def.body_scope)
    ));
    emitter.instr("%join");
    emitter.lookaside.invalidate();
}

fn emit_system_task_call(emitter: &mut Emitter, design: &Design, scope: ScopeId, name: vlab_common::Ident, args: &[vlab_ir::Expr]) {
    let name_str = emitter.interner().resolve(name).to_string();
    if args.is_empty() {
        emitter.instr(&format!("%vpi_call 0 0 \"{name_str}\""));
        return;
    }
    let arg_regs: Vec<ValueReg> = args.iter().map(|a| eval_expr(emitter, design, scope, a)).collect();
    let mut call = format!("%vpi_call 0 0 \"{name_str}\"");
    for reg in &arg_regs {
        call.push_str(&format!(", v{}", reg.base));
    }
    emitter.instr(&call);
    for reg in arg_regs {
        emitter.vecs.free(reg.base, reg.width);
    }
    emitter.lookaside.invalidate();
}
