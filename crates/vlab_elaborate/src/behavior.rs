//! Behavioral elaborator: lowers `initial`/`always` behaviors, tasks, and
//! functions from PForm statements/expressions onto the procedure graph
//! (§4.5).
//!
//! Runs after the structural elaborator, once every scope's signals and
//! structural cells exist, so a statement can resolve any identifier it
//! reads or drives. Functions are registered before tasks, tasks before a
//! module's own `initial`/`always` behaviors, matching the teacher's
//! declaration-order convention; nothing here depends on that order beyond
//! letting forward references resolve.

use std::collections::HashSet;

use vlab_common::{Ident, Logic, LogicVec};
use vlab_ir::{
    CaseArm, CaseKind, DelayValue, EdgeKind, Event, EventId, Expr, FunctionDef, Process,
    ProcessKind, ScopeId, ScopeKind, Stmt, TaskDef, TaskRef, UnaryOp,
};
use vlab_pform::stmt::{PBehaviorKind, PCaseArm, PEdge, PEventExpr};
use vlab_pform::{PBehavior, PExpr, PFunctionDecl, PSignalDecl, PStmt, PTaskDecl};
use vlab_source::Span;

use crate::const_eval::{const_to_i64, eval_const_expr, ConstEnv};
use crate::context::{ElaborationContext, ScopeContent};
use crate::errors;
use crate::expr_lower::{lower_expr, lower_lvalue, resolve_task_or_function_owner};
use crate::scope_builder::alloc_scope;
use crate::signals::{find_signal, materialize_signal, param_env};
use crate::structure::{resolve_signal_in_scope, signal_nexus};

/// Lowers every scope's behaviors, tasks, and functions in turn.
pub fn elaborate_behavior(ctx: &mut ElaborationContext<'_>) {
    let scope_ids: Vec<ScopeId> = (0..ctx.design.scopes.len() as u32)
        .map(ScopeId::from_raw)
        .collect();
    for scope_id in scope_ids {
        elaborate_scope_behavior(ctx, scope_id);
    }
}

fn elaborate_scope_behavior(ctx: &mut ElaborationContext<'_>, scope_id: ScopeId) {
    match ctx.scope_content.get(&scope_id) {
        Some(ScopeContent::Module(tmpl)) => {
            let functions = tmpl.functions.clone();
            let tasks = tmpl.tasks.clone();
            let behaviors = tmpl.behaviors.clone();
            register_functions(ctx, scope_id, &functions);
            register_tasks(ctx, scope_id, &tasks);
            for behavior in &behaviors {
                lower_behavior(ctx, scope_id, behavior);
            }
        }
        Some(ScopeContent::Generate(body)) => {
            let behaviors = body.behaviors.clone();
            for behavior in &behaviors {
                lower_behavior(ctx, scope_id, behavior);
            }
        }
        Some(ScopeContent::Task(_)) | Some(ScopeContent::Function(_)) | None => {}
    }
}

/// A task's/function's body scope and signals already exist (built by the
/// scope builder and signal elaborator respectively); this only lowers the
/// body statement and records the `TaskDef`/`FunctionDef` on the parent.
fn register_tasks(ctx: &mut ElaborationContext<'_>, parent_scope: ScopeId, tasks: &[PTaskDecl]) {
    for task in tasks {
        let Some(body_scope) = ctx.design.scopes[parent_scope]
            .children
            .get(&task.name)
            .and_then(|v| v.first())
            .copied()
        else {
            continue;
        };
        let args = ctx.design.scopes[body_scope].ports.clone();
        let env = param_env(ctx, body_scope);
        let body = lower_stmt(ctx, body_scope, &env, &task.body);
        ctx.design.scopes[parent_scope].tasks.push(TaskDef {
            name: task.name,
            args,
            body_scope,
            body,
            span: task.span,
        });
    }
}

fn register_functions(
    ctx: &mut ElaborationContext<'_>,
    parent_scope: ScopeId,
    functions: &[PFunctionDecl],
) {
    for function in functions {
        let Some(body_scope) = ctx.design.scopes[parent_scope]
            .children
            .get(&function.name)
            .and_then(|v| v.first())
            .copied()
        else {
            continue;
        };
        let args = ctx.design.scopes[body_scope].ports.clone();
        let Some(return_signal) = find_signal(&ctx.design.scopes[body_scope], function.name)
        else {
            continue;
        };
        let env = param_env(ctx, body_scope);
        let body = lower_stmt(ctx, body_scope, &env, &function.body);
        ctx.design.scopes[parent_scope].functions.push(FunctionDef {
            name: function.name,
            args,
            return_signal,
            body_scope,
            body,
            span: function.span,
        });
    }
}

/// Lowers one top-level `initial`/`always` behavior to a `Process`.
fn lower_behavior(ctx: &mut ElaborationContext<'_>, scope_id: ScopeId, behavior: &PBehavior) {
    let env = param_env(ctx, scope_id);
    let body = lower_stmt(ctx, scope_id, &env, &behavior.body);

    let kind = match behavior.kind {
        PBehaviorKind::Initial => ProcessKind::Initial,
        PBehaviorKind::Always => ProcessKind::Always,
    };
    check_yield_guarantee(ctx, kind, &body, behavior.span);
    let combinational_push = kind == ProcessKind::Always && is_star_sensitive(&behavior.body);

    let scope = &mut ctx.design.scopes[scope_id];
    let predicted = vlab_ir::ProcessId::from_raw(scope.processes.len() as u32);
    let process_id = scope.processes.alloc(Process {
        id: predicted,
        scope: scope_id,
        kind,
        body,
        combinational_push,
        span: behavior.span,
    });
    debug_assert_eq!(process_id, predicted);
}

/// An `always` behavior whose outermost statement is `@*` is treated as
/// combinational for downstream (emit-stage) scheduling purposes, the same
/// tag the structural elaborator gives a synthesized continuous assign.
fn is_star_sensitive(body: &PStmt) -> bool {
    matches!(
        body,
        PStmt::EventControl { control, .. }
            if control.events.iter().any(|e| matches!(e, PEventExpr::Star { .. }))
    )
}

fn lower_delay(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    expr: &PExpr,
) -> DelayValue {
    match eval_const_expr(expr, env, ctx.sink, ctx.interner).and_then(|v| const_to_i64(&v)) {
        Some(n) => DelayValue::Const(n.max(0) as u64),
        None => DelayValue::Expr(Box::new(lower_expr(ctx, scope_id, env, expr))),
    }
}

/// Walks up through `NamedBlock` ancestors to find the scope kind a
/// statement actually executes under: the enclosing function, task, module,
/// or generate block.
fn enclosing_scope_kind(ctx: &ElaborationContext<'_>, scope_id: ScopeId) -> ScopeKind {
    let mut current = scope_id;
    loop {
        let scope = &ctx.design.scopes[current];
        if scope.kind != ScopeKind::NamedBlock {
            return scope.kind;
        }
        match scope.parent {
            Some(parent) => current = parent,
            None => return scope.kind,
        }
    }
}

/// Emits `E216` and reports `true` when `scope_id` lexically executes inside
/// a function body, where `what` has no well-defined semantics (a function
/// must complete combinationally within a single time step).
fn reject_in_function_body(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    what: &str,
    span: Span,
) -> bool {
    if enclosing_scope_kind(ctx, scope_id) == ScopeKind::Function {
        ctx.sink.emit(errors::error_function_body_construct(what, span));
        true
    } else {
        false
    }
}

/// Mints a fresh register-kind signal in `scope_id` to carry a delayed
/// blocking assign's right-hand value across the delay (§4.5's rewrite of
/// `lhs = #d rhs` to `{ tmp = rhs; #d lhs = tmp; }`).
fn materialize_delay_temp(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    width: u32,
    signed: bool,
    span: Span,
) -> vlab_ir::SignalId {
    let n = ctx.design.scopes[scope_id].next_symbol();
    let temp_name = ctx.interner.get_or_intern(&format!("__delay_tmp{n}"));
    let range = if width > 1 {
        Some((
            PExpr::Literal { value: LogicVec::from_u64((width - 1) as u64, 32), signed: false, span },
            PExpr::Literal { value: LogicVec::from_u64(0, 32), signed: false, span },
        ))
    } else {
        None
    };
    let decl = PSignalDecl {
        name: temp_name,
        kind: vlab_pform::PNetKind::Reg,
        direction: vlab_pform::PDirection::Implicit,
        range,
        array_dim: None,
        signed,
        span,
    };
    let env = ConstEnv::new();
    materialize_signal(ctx, scope_id, &decl, &env, vlab_ir::PortDirection::NotAPort, &mut HashSet::new())
        .expect("synthesized delay temp cannot collide with an existing name")
}

/// Lowers `lhs = #d rhs` to `{ tmp = rhs; #d lhs = tmp; }`, sampling `rhs` at
/// statement entry rather than after the delay (§3, §4.5). `tmp` is a
/// freshly materialized register sized and signed to match `lhs`.
fn lower_delayed_blocking_assign(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    lhs: &PExpr,
    rhs: &PExpr,
    delay: &PExpr,
    span: Span,
) -> Stmt {
    if reject_in_function_body(ctx, scope_id, "a delay", span) {
        return Stmt::Nop;
    }
    let (lhs_ref, lhs_width, lhs_signed) = lower_lvalue(ctx, scope_id, env, lhs);
    let rhs_expr = lower_expr(ctx, scope_id, env, rhs);

    let temp = materialize_delay_temp(ctx, scope_id, lhs_width.max(1), lhs_signed, span);
    let temp_read = Expr::SignalRef {
        signal: temp,
        word_index: None,
        part_offset: None,
        part_width: None,
        mux_select: None,
        width: lhs_width.max(1),
        signed: lhs_signed,
        value_kind: vlab_ir::ValueKind::LogicVector,
        span,
    };

    let sample = Stmt::BlockingAssign {
        lhs: vlab_ir::SignalRef::Signal(temp),
        rhs: rhs_expr,
        span,
    };
    let delayed_commit = Stmt::Delay {
        delay: lower_delay(ctx, scope_id, env, delay),
        body: Box::new(Stmt::BlockingAssign { lhs: lhs_ref, rhs: temp_read, span }),
        span,
    };
    Stmt::SeqBlock { scope: None, body: vec![sample, delayed_commit] }
}

/// Lowers one PForm statement to its elaborated counterpart. A handful of
/// PForm shapes (`Wait`, `For`) have no direct IR statement and are lowered
/// as a small composition of simpler ones.
fn lower_stmt(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    stmt: &PStmt,
) -> Stmt {
    match stmt {
        PStmt::BlockingAssign { lhs, rhs, delay, span } => match delay {
            Some(d) => lower_delayed_blocking_assign(ctx, scope_id, env, lhs, rhs, d, *span),
            None => {
                let (lhs, _, _) = lower_lvalue(ctx, scope_id, env, lhs);
                let rhs = lower_expr(ctx, scope_id, env, rhs);
                Stmt::BlockingAssign { lhs, rhs, span: *span }
            }
        },
        PStmt::NonBlockingAssign { lhs, rhs, delay, span } => {
            if reject_in_function_body(ctx, scope_id, "a non-blocking assign", *span) {
                return Stmt::Nop;
            }
            let (lhs, _, _) = lower_lvalue(ctx, scope_id, env, lhs);
            let rhs = lower_expr(ctx, scope_id, env, rhs);
            let delay = delay.as_ref().map(|d| lower_delay(ctx, scope_id, env, d));
            Stmt::NonBlockingAssign { lhs, rhs, delay, span: *span }
        }
        PStmt::ProceduralContinuousAssign { lhs, rhs, span } => {
            let (lhs, _, _) = lower_lvalue(ctx, scope_id, env, lhs);
            let rhs = lower_expr(ctx, scope_id, env, rhs);
            Stmt::ProceduralContinuousAssign { lhs, rhs, span: *span }
        }
        PStmt::Force { lhs, rhs, span } => {
            let (lhs, _, _) = lower_lvalue(ctx, scope_id, env, lhs);
            let rhs = lower_expr(ctx, scope_id, env, rhs);
            Stmt::Force { lhs, rhs, span: *span }
        }
        PStmt::Deassign { lhs, span } => {
            let (lhs, _, _) = lower_lvalue(ctx, scope_id, env, lhs);
            Stmt::Deassign { lhs, span: *span }
        }
        PStmt::Release { lhs, span } => {
            let (lhs, _, _) = lower_lvalue(ctx, scope_id, env, lhs);
            Stmt::Release { lhs, span: *span }
        }
        PStmt::Delay { delay, body, span } => {
            if reject_in_function_body(ctx, scope_id, "a delay", *span) {
                return Stmt::Nop;
            }
            Stmt::Delay {
                delay: lower_delay(ctx, scope_id, env, delay),
                body: Box::new(lower_stmt(ctx, scope_id, env, body)),
                span: *span,
            }
        }
        PStmt::EventControl { control, body, span } => {
            if reject_in_function_body(ctx, scope_id, "an event control", *span) {
                return Stmt::Nop;
            }
            let events = control
                .events
                .iter()
                .map(|e| lower_event_expr(ctx, scope_id, e, body))
                .collect();
            Stmt::EventWait {
                events,
                body: Box::new(lower_stmt(ctx, scope_id, env, body)),
                span: *span,
            }
        }
        PStmt::Trigger { name, span } => {
            let event = resolve_or_synthesize_named_event(ctx, scope_id, *name, *span);
            Stmt::EventTrigger { event, span: *span }
        }
        PStmt::Wait { cond, body, span } => {
            if reject_in_function_body(ctx, scope_id, "a wait", *span) {
                return Stmt::Nop;
            }
            lower_wait(ctx, scope_id, env, cond, body, *span)
        }
        PStmt::SeqBlock { name, decls, body, span } => {
            lower_block(ctx, scope_id, env, *name, decls, body, *span, false)
        }
        PStmt::ParBlock { name, decls, body, span } => {
            lower_block(ctx, scope_id, env, *name, decls, body, *span, true)
        }
        PStmt::If { cond, then_branch, else_branch, span } => Stmt::Conditional {
            cond: lower_expr(ctx, scope_id, env, cond),
            then_branch: Box::new(lower_stmt(ctx, scope_id, env, then_branch)),
            else_branch: else_branch
                .as_ref()
                .map(|b| Box::new(lower_stmt(ctx, scope_id, env, b))),
            span: *span,
        },
        PStmt::Case { kind, selector, arms, span } => lower_case(ctx, scope_id, env, *kind, selector, arms, *span),
        PStmt::While { cond, body, span } => Stmt::While {
            cond: lower_expr(ctx, scope_id, env, cond),
            body: Box::new(lower_stmt(ctx, scope_id, env, body)),
            span: *span,
        },
        PStmt::Forever { body, span } => Stmt::Forever {
            body: Box::new(lower_stmt(ctx, scope_id, env, body)),
            span: *span,
        },
        PStmt::Repeat { count, body, span } => Stmt::Repeat {
            count: lower_expr(ctx, scope_id, env, count),
            body: Box::new(lower_stmt(ctx, scope_id, env, body)),
            span: *span,
        },
        PStmt::For { init, cond, step, body, span } => lower_for(ctx, scope_id, env, init, cond, step, body, *span),
        PStmt::TaskCall { name, args, span } => {
            if reject_in_function_body(ctx, scope_id, "a task call", *span) {
                return Stmt::Nop;
            }
            let task = resolve_task_or_function_owner(ctx, scope_id, *name).unwrap_or(scope_id);
            Stmt::UserTaskCall {
                task: TaskRef { scope: task, name: *name },
                args: args.iter().map(|a| lower_expr(ctx, scope_id, env, a)).collect(),
                span: *span,
            }
        }
        PStmt::SystemTaskCall { name, args, span } => {
            Stmt::SystemTaskCall {
                name: *name,
                args: args.iter().map(|a| lower_expr(ctx, scope_id, env, a)).collect(),
                span: *span,
            }
        }
        PStmt::Disable { target_path, span } => {
            let target_scope = resolve_disable_path(ctx, scope_id, target_path).unwrap_or(scope_id);
            let target_kind = ctx.design.scopes[target_scope].kind;
            if matches!(target_kind, ScopeKind::Module | ScopeKind::Function) {
                ctx.sink.emit(errors::error_disable_invalid_target(*span));
                return Stmt::Nop;
            }
            Stmt::Disable { target_scope, span: *span }
        }
        PStmt::Nop { .. } => Stmt::Nop,
    }
}

/// `wait(cond) body` has no direct IR counterpart: it's lowered as "spin on
/// an event fed by every signal `cond` reads until `cond` holds, then run
/// `body`" (`while (!cond) @(synthesized) ;`), matching how a level-
/// sensitive wait actually behaves under event-driven simulation.
fn lower_wait(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    cond: &PExpr,
    body: &PStmt,
    span: Span,
) -> Stmt {
    let cond_expr = lower_expr(ctx, scope_id, env, cond);
    let neg_cond = Expr::Unary {
        op: UnaryOp::LogicNot,
        operand: Box::new(cond_expr),
        width: 1,
        signed: false,
        span,
    };
    let event = synthesize_read_sensitivity_event(ctx, scope_id, cond, span);
    let spin = Stmt::While {
        cond: neg_cond,
        body: Box::new(Stmt::EventWait {
            events: vec![event],
            body: Box::new(Stmt::Nop),
            span,
        }),
        span,
    };
    let lowered_body = lower_stmt(ctx, scope_id, env, body);
    Stmt::SeqBlock { scope: None, body: vec![spin, lowered_body] }
}

/// `for (init; cond; step) body` has no direct IR counterpart: lowered as
/// `{ init; while (cond) { body; step; } }`.
#[allow(clippy::too_many_arguments)]
fn lower_for(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    init: &PStmt,
    cond: &PExpr,
    step: &PStmt,
    body: &PStmt,
    span: Span,
) -> Stmt {
    let init = lower_stmt(ctx, scope_id, env, init);
    let cond = lower_expr(ctx, scope_id, env, cond);
    let body = lower_stmt(ctx, scope_id, env, body);
    let step = lower_stmt(ctx, scope_id, env, step);
    let loop_body = Stmt::SeqBlock { scope: None, body: vec![body, step] };
    let while_loop = Stmt::While { cond, body: Box::new(loop_body), span };
    Stmt::SeqBlock { scope: None, body: vec![init, while_loop] }
}

/// `seq`/`par` blocks allocate a fresh `NamedBlock` scope only when named
/// (an unnamed block lowers its statements in the enclosing scope, since it
/// has nothing of its own to `disable` or declare into).
#[allow(clippy::too_many_arguments)]
fn lower_block(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    name: Option<Ident>,
    decls: &[PSignalDecl],
    body: &[PStmt],
    span: Span,
    parallel: bool,
) -> Stmt {
    let (inner_scope, inner_env) = match name {
        Some(name) => {
            let ambient = crate::scope_builder::ambient_of(ctx, scope_id);
            let child = alloc_scope(
                ctx,
                Some(scope_id),
                ScopeKind::NamedBlock,
                name,
                &[],
                &[],
                ambient.time_unit,
                ambient.time_precision,
                ambient.default_net_kind,
                span,
            );
            ctx.design.scopes[scope_id]
                .children
                .entry(name)
                .or_default()
                .push(child);
            let mut seen = HashSet::new();
            let block_env = param_env(ctx, child);
            for decl in decls {
                materialize_signal(ctx, child, decl, &block_env, vlab_ir::PortDirection::NotAPort, &mut seen);
            }
            (child, block_env)
        }
        None => (scope_id, env.clone()),
    };

    let lowered: Vec<Stmt> = body
        .iter()
        .map(|s| lower_stmt(ctx, inner_scope, &inner_env, s))
        .collect();
    let scope = name.map(|_| inner_scope);
    if parallel {
        Stmt::ParBlock { scope, body: lowered }
    } else {
        Stmt::SeqBlock { scope, body: lowered }
    }
}

fn lower_case(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    kind: vlab_pform::PCaseKind,
    selector: &PExpr,
    arms: &[PCaseArm],
    span: Span,
) -> Stmt {
    let case_kind = match kind {
        vlab_pform::PCaseKind::Exact => CaseKind::Exact,
        vlab_pform::PCaseKind::CaseX => CaseKind::CaseX,
        vlab_pform::PCaseKind::CaseZ => CaseKind::CaseZ,
        vlab_pform::PCaseKind::RealCase => CaseKind::RealCase,
    };
    let selector_expr = lower_expr(ctx, scope_id, env, selector);

    let lowered_arms: Vec<CaseArm> = arms
        .iter()
        .map(|arm| CaseArm {
            guards: arm.guards.iter().map(|g| lower_expr(ctx, scope_id, env, g)).collect(),
            body: lower_stmt(ctx, scope_id, env, &arm.body),
            span: arm.span,
        })
        .collect();

    if !arms.iter().any(|a| a.guards.is_empty()) {
        ctx.sink.emit(errors::warn_case_not_full(span));
    }
    check_case_overlap(ctx, case_kind, &lowered_arms, span);

    Stmt::Case { kind: case_kind, selector: selector_expr, arms: lowered_arms, span }
}

/// Pairwise-compares every literal guard across every arm; `casex`/`casez`
/// treat x (and, for `casez`, z/`?`) bits as wildcards when matching a
/// literal pair. Only literal guards are checkable this way — a guard
/// expression that didn't fold to a constant is skipped.
fn check_case_overlap(ctx: &ElaborationContext<'_>, kind: CaseKind, arms: &[CaseArm], span: Span) {
    let literals: Vec<&LogicVec> = arms
        .iter()
        .flat_map(|arm| &arm.guards)
        .filter_map(|g| match g {
            Expr::ConstVector { value, .. } => Some(value),
            _ => None,
        })
        .collect();
    for i in 0..literals.len() {
        for j in (i + 1)..literals.len() {
            if guards_overlap(kind, literals[i], literals[j]) {
                ctx.sink.emit(errors::warn_case_not_parallel(span));
                return;
            }
        }
    }
}

fn guards_overlap(kind: CaseKind, a: &LogicVec, b: &LogicVec) -> bool {
    let width = a.width().max(b.width());
    for i in 0..width {
        let (ba, bb) = (a.get(i), b.get(i));
        let wild_a = matches!(kind, CaseKind::CaseX if ba == Logic::X)
            || matches!(kind, CaseKind::CaseZ if matches!(ba, Logic::X | Logic::Z));
        let wild_b = matches!(kind, CaseKind::CaseX if bb == Logic::X)
            || matches!(kind, CaseKind::CaseZ if matches!(bb, Logic::X | Logic::Z));
        if wild_a || wild_b {
            continue;
        }
        if ba != bb {
            return false;
        }
    }
    true
}

fn resolve_disable_path(
    ctx: &ElaborationContext<'_>,
    scope_id: ScopeId,
    path: &[Ident],
) -> Option<ScopeId> {
    let mut current = scope_id;
    for &segment in path {
        let children = ctx.design.scopes[current].children.get(&segment)?;
        current = *children.first()?;
    }
    Some(current)
}

/// Lowers one `@(...)` list element to an `EventId`, synthesizing a
/// single-probe event for an edge term or a full read-set event for `@*`.
fn lower_event_expr(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    expr: &PEventExpr,
    star_body: &PStmt,
) -> EventId {
    match expr {
        PEventExpr::NamedEvent { name, span } => {
            resolve_or_synthesize_named_event(ctx, scope_id, *name, *span)
        }
        PEventExpr::Edge { edge, expr, span } => {
            let nexus = expr_watch_nexus(ctx, scope_id, expr, *span);
            let mut event = Event::new(scope_id, None, *span);
            event.probes.push(vlab_ir::Probe {
                edge: map_edge(*edge),
                nexus,
                span: *span,
            });
            let event_id = ctx.design.events.alloc(event);
            ctx.design.scopes[scope_id].events.push(event_id);
            event_id
        }
        PEventExpr::Star { span } => synthesize_star_event(ctx, scope_id, star_body, *span),
    }
}

fn map_edge(edge: PEdge) -> EdgeKind {
    match edge {
        PEdge::Posedge => EdgeKind::Posedge,
        PEdge::Negedge => EdgeKind::Negedge,
        PEdge::AnyEdge => EdgeKind::AnyEdge,
    }
}

/// Resolves a bare watched expression to the nexus its signal anchors,
/// auto-resolving through parent scopes the same way a plain identifier
/// read would (`resolve_signal_in_scope`). Non-identifier watch expressions
/// (e.g. `posedge a[3]`) watch the whole signal, since the IR probe model
/// has no sub-signal edge detector.
fn expr_watch_nexus(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    expr: &PExpr,
    span: Span,
) -> vlab_ir::NexusId {
    let name = root_ident(expr);
    let (owner, signal) = resolve_signal_in_scope(ctx, scope_id, name, span);
    signal_nexus(ctx, owner, signal)
}

/// The identifier a read/watch expression is ultimately rooted on, peeling
/// through index/part-select wrappers. Anything else (a literal, a
/// compound expression) has no signal to watch and falls back to an
/// implicit one-off name, matching `lower_lvalue`'s "unsupported base"
/// handling elsewhere.
fn root_ident(expr: &PExpr) -> Ident {
    match expr {
        PExpr::Ident { name, .. } => *name,
        PExpr::Index { base, .. }
        | PExpr::PartSelect { base, .. }
        | PExpr::IndexedPartSelect { base, .. } => root_ident(base),
        _ => Ident::from_raw(0),
    }
}

fn resolve_or_synthesize_named_event(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    name: Ident,
    span: Span,
) -> EventId {
    if let Some(id) = find_named_event(&ctx.design, scope_id, name) {
        return id;
    }
    let event = Event::new(scope_id, Some(name), span);
    let event_id = ctx.design.events.alloc(event);
    ctx.design.scopes[scope_id].events.push(event_id);
    event_id
}

fn find_named_event(design: &vlab_ir::Design, scope_id: ScopeId, name: Ident) -> Option<EventId> {
    let mut current = Some(scope_id);
    while let Some(id) = current {
        let scope = &design.scopes[id];
        if let Some(&event_id) = scope
            .events
            .iter()
            .find(|&&e| design.events.get(e).name == Some(name))
        {
            return Some(event_id);
        }
        current = scope.parent;
    }
    None
}

/// `@*`'s sensitivity is every signal the statement reads, wired up to its
/// whole pin vector (so bit-level changes on a vector signal still wake
/// the process), per how the elaborator treats `ANYEDGE` probes generally.
fn synthesize_star_event(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    body: &PStmt,
    span: Span,
) -> EventId {
    let mut reads = Vec::new();
    collect_stmt_reads(body, &mut reads);
    build_any_edge_event(ctx, scope_id, &reads, span)
}

fn synthesize_read_sensitivity_event(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    expr: &PExpr,
    span: Span,
) -> EventId {
    let mut reads = Vec::new();
    collect_expr_reads(expr, &mut reads);
    build_any_edge_event(ctx, scope_id, &reads, span)
}

fn build_any_edge_event(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    reads: &[Ident],
    span: Span,
) -> EventId {
    let mut event = Event::new(scope_id, None, span);
    let mut seen = HashSet::new();
    for &name in reads {
        if !seen.insert(name) {
            continue;
        }
        let (owner, signal) = resolve_signal_in_scope(ctx, scope_id, name, span);
        let nexus = signal_nexus(ctx, owner, signal);
        event.probes.push(vlab_ir::Probe { edge: EdgeKind::AnyEdge, nexus, span });
    }
    let event_id = ctx.design.events.alloc(event);
    ctx.design.scopes[scope_id].events.push(event_id);
    event_id
}

/// Walks a statement tree collecting every identifier read by an
/// expression anywhere inside it — the read set an `@*`/`wait` sensitivity
/// list is synthesized from. L-values contribute only their index/part-
/// select sub-expressions, not the assigned signal itself.
fn collect_stmt_reads(stmt: &PStmt, out: &mut Vec<Ident>) {
    match stmt {
        PStmt::BlockingAssign { lhs, rhs, delay, .. }
        | PStmt::NonBlockingAssign { lhs, rhs, delay, .. } => {
            collect_lvalue_reads(lhs, out);
            collect_expr_reads(rhs, out);
            if let Some(d) = delay {
                collect_expr_reads(d, out);
            }
        }
        PStmt::ProceduralContinuousAssign { lhs, rhs, .. } | PStmt::Force { lhs, rhs, .. } => {
            collect_lvalue_reads(lhs, out);
            collect_expr_reads(rhs, out);
        }
        PStmt::Deassign { lhs, .. } | PStmt::Release { lhs, .. } => collect_lvalue_reads(lhs, out),
        PStmt::Delay { body, .. } => collect_stmt_reads(body, out),
        PStmt::EventControl { body, .. } => collect_stmt_reads(body, out),
        PStmt::Trigger { .. } => {}
        PStmt::Wait { cond, body, .. } => {
            collect_expr_reads(cond, out);
            collect_stmt_reads(body, out);
        }
        PStmt::SeqBlock { body, .. } | PStmt::ParBlock { body, .. } => {
            for s in body {
                collect_stmt_reads(s, out);
            }
        }
        PStmt::If { cond, then_branch, else_branch, .. } => {
            collect_expr_reads(cond, out);
            collect_stmt_reads(then_branch, out);
            if let Some(e) = else_branch {
                collect_stmt_reads(e, out);
            }
        }
        PStmt::Case { selector, arms, .. } => {
            collect_expr_reads(selector, out);
            for arm in arms {
                for g in &arm.guards {
                    collect_expr_reads(g, out);
                }
                collect_stmt_reads(&arm.body, out);
            }
        }
        PStmt::While { cond, body, .. } => {
            collect_expr_reads(cond, out);
            collect_stmt_reads(body, out);
        }
        PStmt::Forever { body, .. } => collect_stmt_reads(body, out),
        PStmt::Repeat { count, body, .. } => {
            collect_expr_reads(count, out);
            collect_stmt_reads(body, out);
        }
        PStmt::For { init, cond, step, body, .. } => {
            collect_stmt_reads(init, out);
            collect_expr_reads(cond, out);
            collect_stmt_reads(step, out);
            collect_stmt_reads(body, out);
        }
        PStmt::TaskCall { args, .. } | PStmt::SystemTaskCall { args, .. } => {
            for a in args {
                collect_expr_reads(a, out);
            }
        }
        PStmt::Disable { .. } | PStmt::Nop { .. } => {}
    }
}

fn collect_lvalue_reads(expr: &PExpr, out: &mut Vec<Ident>) {
    match expr {
        PExpr::Index { index, .. } => collect_expr_reads(index, out),
        PExpr::PartSelect { msb, lsb, .. } => {
            collect_expr_reads(msb, out);
            collect_expr_reads(lsb, out);
        }
        PExpr::IndexedPartSelect { index, .. } => collect_expr_reads(index, out),
        PExpr::Concat { elements, .. } => {
            for e in elements {
                collect_lvalue_reads(e, out);
            }
        }
        _ => {}
    }
}

fn collect_expr_reads(expr: &PExpr, out: &mut Vec<Ident>) {
    match expr {
        PExpr::Literal { .. } | PExpr::RealLiteral { .. } | PExpr::Error { .. } => {}
        PExpr::Ident { name, .. } => out.push(*name),
        PExpr::ScopePath { .. } => {}
        PExpr::Index { base, index, .. } => {
            collect_expr_reads(base, out);
            collect_expr_reads(index, out);
        }
        PExpr::PartSelect { base, msb, lsb, .. } => {
            collect_expr_reads(base, out);
            collect_expr_reads(msb, out);
            collect_expr_reads(lsb, out);
        }
        PExpr::IndexedPartSelect { base, index, .. } => {
            collect_expr_reads(base, out);
            collect_expr_reads(index, out);
        }
        PExpr::Unary { operand, .. } => collect_expr_reads(operand, out),
        PExpr::Binary { left, right, .. } => {
            collect_expr_reads(left, out);
            collect_expr_reads(right, out);
        }
        PExpr::Ternary { cond, if_true, if_false, .. } => {
            collect_expr_reads(cond, out);
            collect_expr_reads(if_true, out);
            collect_expr_reads(if_false, out);
        }
        PExpr::Concat { elements, .. } => {
            for e in elements {
                collect_expr_reads(e, out);
            }
        }
        PExpr::Replicate { count, value, .. } => {
            collect_expr_reads(count, out);
            collect_expr_reads(value, out);
        }
        PExpr::Call { args, .. } | PExpr::SystemCall { args, .. } => {
            for a in args {
                collect_expr_reads(a, out);
            }
        }
    }
}

/// How reliably a lowered statement yields to the scheduler, ranked from
/// worst to best guarantee. Used to grade an `always`/unbounded-loop body's
/// risk of never yielding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DelayClass {
    /// No delay or event control anywhere: provably never yields.
    NoDelay,
    /// Yields, but only via an explicit `#0`, which advances no simulation
    /// time.
    ZeroDelay,
    /// Yields along some paths only (a delay/event-wait nested under a
    /// conditional branch that need not be taken).
    PossibleDelay,
    /// Yields unconditionally, with a nonzero or run-time delay.
    HasDelay,
}

impl DelayClass {
    /// Combines branches that all execute (a sequential/parallel block):
    /// the block is only as unreliable as its *best* member, since reaching
    /// any one of them guarantees that one's yield.
    fn best(self, other: DelayClass) -> DelayClass {
        self.max(other)
    }

    /// Combines branches where only one executes (an `if`/`case` arm): the
    /// statement is only as reliable as its *worst* branch, since some run
    /// might take that branch.
    fn worst(self, other: DelayClass) -> DelayClass {
        self.min(other)
    }
}

/// Classifies a lowered statement's own [`DelayClass`]. A nested loop's
/// body yields (or doesn't) on its own terms each iteration; it does not by
/// itself make the *outer* body yield, so `Forever`/`While`/`Repeat` are
/// opaque here (see [`worst_loop_class`] for walking into them instead).
fn classify_delay(stmt: &Stmt) -> DelayClass {
    match stmt {
        Stmt::Delay { delay: DelayValue::Const(0), .. } => DelayClass::ZeroDelay,
        Stmt::Delay { delay: DelayValue::Const(_), .. } => DelayClass::HasDelay,
        Stmt::Delay { delay: DelayValue::Expr(_), .. } => DelayClass::PossibleDelay,
        Stmt::EventWait { .. } => DelayClass::HasDelay,
        Stmt::SeqBlock { body, .. } | Stmt::ParBlock { body, .. } => body
            .iter()
            .map(classify_delay)
            .fold(DelayClass::NoDelay, DelayClass::best),
        Stmt::Conditional { then_branch, else_branch, .. } => {
            let else_class = else_branch.as_deref().map(classify_delay).unwrap_or(DelayClass::NoDelay);
            classify_delay(then_branch).worst(else_class)
        }
        Stmt::Case { arms, .. } => arms
            .iter()
            .map(|a| classify_delay(&a.body))
            .fold(DelayClass::HasDelay, DelayClass::worst),
        _ => DelayClass::NoDelay,
    }
}

/// Walks into every `Forever`/`While` found anywhere in `stmt`, classifying
/// each one's own body and combining multiple loops via [`DelayClass::worst`].
/// Returns `None` when `stmt` contains no unbounded loop at all, meaning no
/// never-yields check applies (an `initial` block that just runs once to
/// completion is fine).
fn worst_loop_class(stmt: &Stmt) -> Option<DelayClass> {
    let combine = |a: Option<DelayClass>, b: Option<DelayClass>| match (a, b) {
        (Some(x), Some(y)) => Some(x.worst(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    };
    match stmt {
        Stmt::Forever { body, .. } | Stmt::While { body, .. } => {
            combine(Some(classify_delay(body)), worst_loop_class(body))
        }
        Stmt::SeqBlock { body, .. } | Stmt::ParBlock { body, .. } => {
            body.iter().fold(None, |acc, s| combine(acc, worst_loop_class(s)))
        }
        Stmt::Conditional { then_branch, else_branch, .. } => combine(
            worst_loop_class(then_branch),
            else_branch.as_deref().and_then(worst_loop_class),
        ),
        Stmt::Case { arms, .. } => arms
            .iter()
            .fold(None, |acc, a| combine(acc, worst_loop_class(&a.body))),
        Stmt::Delay { body, .. } | Stmt::EventWait { body, .. } | Stmt::Repeat { body, .. } => {
            worst_loop_class(body)
        }
        _ => None,
    }
}

/// Rejects an `always` (or an `initial`'s unbounded loop) that can provably
/// never yield to the scheduler, and warns when it merely might not
/// (§4.5). An `always` classifies its entire body directly, since the
/// process's own implicit repetition is itself the loop; an `initial` is
/// only checked when it contains an explicit `forever`/`while`.
fn check_yield_guarantee(ctx: &mut ElaborationContext<'_>, kind: ProcessKind, body: &Stmt, span: Span) {
    let class = match kind {
        ProcessKind::Always => Some(classify_delay(body)),
        ProcessKind::Initial => worst_loop_class(body),
    };
    match class {
        Some(DelayClass::NoDelay) | Some(DelayClass::ZeroDelay) => {
            ctx.sink.emit(errors::error_infinite_loop(span));
        }
        Some(DelayClass::PossibleDelay) => {
            if ctx.flags.warn_inf_loop {
                ctx.sink.emit(errors::warn_infinite_loop(span));
            }
        }
        Some(DelayClass::HasDelay) | None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_common::Interner;
    use vlab_config::CompilerFlags;
    use vlab_diagnostics::DiagnosticSink;
    use vlab_pform::{ClosedLoader, PDirection, PFormTable, PModuleTemplate, PNetKind};

    fn wire_decl(interner: &Interner, name: &str) -> PSignalDecl {
        PSignalDecl {
            name: interner.get_or_intern(name),
            kind: PNetKind::Wire,
            direction: PDirection::Implicit,
            range: None,
            array_dim: None,
            signed: false,
            span: Span::DUMMY,
        }
    }

    fn reg_decl(interner: &Interner, name: &str) -> PSignalDecl {
        PSignalDecl {
            name: interner.get_or_intern(name),
            kind: PNetKind::Reg,
            direction: PDirection::Implicit,
            range: None,
            array_dim: None,
            signed: false,
            span: Span::DUMMY,
        }
    }

    fn empty_template(interner: &Interner, name: &str) -> PModuleTemplate {
        PModuleTemplate {
            name: interner.get_or_intern(name),
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
            default_net_kind: None,
            span: Span::DUMMY,
        }
    }

    fn setup(interner: &Interner, tmpl: PModuleTemplate) -> (PFormTable, ClosedLoader, DiagnosticSink) {
        let mut table = PFormTable::new();
        let name = tmpl.name;
        table.insert_module(tmpl);
        table.add_root(name);
        (table, ClosedLoader::default(), DiagnosticSink::new())
    }

    fn run_pipeline(
        ctx: &mut ElaborationContext<'_>,
        name: Ident,
    ) -> ScopeId {
        let scope_id =
            crate::scope_builder::build_module_scope(ctx, name, name, &[], None, Span::DUMMY).unwrap();
        crate::params::apply_defparams(ctx);
        crate::signals::elaborate_signals(ctx);
        crate::structure::elaborate_structure(ctx);
        elaborate_behavior(ctx);
        scope_id
    }

    #[test]
    fn always_star_behavior_synthesizes_combinational_process() {
        let interner = Interner::new();
        let a = interner.get_or_intern("a");
        let b = interner.get_or_intern("b");
        let mut tmpl = empty_template(&interner, "top");
        tmpl.signals = vec![wire_decl(&interner, "a"), reg_decl(&interner, "b")];
        tmpl.behaviors = vec![PBehavior {
            kind: PBehaviorKind::Always,
            body: PStmt::EventControl {
                control: vlab_pform::stmt::PEventControl {
                    events: vec![PEventExpr::Star { span: Span::DUMMY }],
                    span: Span::DUMMY,
                },
                body: Box::new(PStmt::BlockingAssign {
                    lhs: PExpr::Ident { name: b, span: Span::DUMMY },
                    rhs: PExpr::Ident { name: a, span: Span::DUMMY },
                    delay: None,
                    span: Span::DUMMY,
                }),
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        }];
        let name = tmpl.name;
        let (mut table, mut loader, sink) = setup(&interner, tmpl);
        let mut ctx =
            ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = run_pipeline(&mut ctx, name);

        assert!(!sink.has_errors());
        let scope = &ctx.design.scopes[scope_id];
        assert_eq!(scope.processes.len(), 1);
        let process = scope.processes.get(vlab_ir::ProcessId::from_raw(0));
        assert_eq!(process.kind, ProcessKind::Always);
        assert!(process.combinational_push);
        assert_eq!(scope.events.len(), 1);
    }

    #[test]
    fn posedge_behavior_synthesizes_single_probe_event() {
        let interner = Interner::new();
        let clk = interner.get_or_intern("clk");
        let q = interner.get_or_intern("q");
        let d = interner.get_or_intern("d");
        let mut tmpl = empty_template(&interner, "top");
        tmpl.signals = vec![wire_decl(&interner, "clk"), reg_decl(&interner, "q"), wire_decl(&interner, "d")];
        tmpl.behaviors = vec![PBehavior {
            kind: PBehaviorKind::Always,
            body: PStmt::EventControl {
                control: vlab_pform::stmt::PEventControl {
                    events: vec![PEventExpr::Edge {
                        edge: PEdge::Posedge,
                        expr: PExpr::Ident { name: clk, span: Span::DUMMY },
                        span: Span::DUMMY,
                    }],
                    span: Span::DUMMY,
                },
                body: Box::new(PStmt::NonBlockingAssign {
                    lhs: PExpr::Ident { name: q, span: Span::DUMMY },
                    rhs: PExpr::Ident { name: d, span: Span::DUMMY },
                    delay: None,
                    span: Span::DUMMY,
                }),
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        }];
        let name = tmpl.name;
        let (mut table, mut loader, sink) = setup(&interner, tmpl);
        let mut ctx =
            ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = run_pipeline(&mut ctx, name);

        assert!(!sink.has_errors());
        let scope = &ctx.design.scopes[scope_id];
        assert_eq!(scope.events.len(), 1);
        let event = ctx.design.events.get(scope.events[0]);
        assert_eq!(event.probes.len(), 1);
        assert_eq!(event.probes[0].edge, EdgeKind::Posedge);
        assert!(event.is_synthetic());
    }

    #[test]
    fn forever_without_delay_errors_e218() {
        let interner = Interner::new();
        let mut tmpl = empty_template(&interner, "top");
        tmpl.behaviors = vec![PBehavior {
            kind: PBehaviorKind::Initial,
            body: PStmt::Forever {
                body: Box::new(PStmt::Nop { span: Span::DUMMY }),
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        }];
        let name = tmpl.name;
        let (mut table, mut loader, sink) = setup(&interner, tmpl);
        // Unconditional once provably NO_DELAY: no warn_inf_loop flag needed.
        let flags = CompilerFlags::default();
        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, flags);
        run_pipeline(&mut ctx, name);

        assert!(sink.diagnostics().iter().any(|d| d.code == errors::E218));
    }

    #[test]
    fn always_bare_assign_errors_e218() {
        let interner = Interner::new();
        let y = interner.get_or_intern("y");
        let mut tmpl = empty_template(&interner, "top");
        tmpl.signals = vec![reg_decl(&interner, "y")];
        tmpl.behaviors = vec![PBehavior {
            kind: PBehaviorKind::Always,
            body: PStmt::BlockingAssign {
                lhs: PExpr::Ident { name: y, span: Span::DUMMY },
                rhs: PExpr::Literal { value: LogicVec::from_u64(0, 1), signed: false, span: Span::DUMMY },
                delay: None,
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        }];
        let name = tmpl.name;
        let (mut table, mut loader, sink) = setup(&interner, tmpl);
        let flags = CompilerFlags::default();
        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, flags);
        run_pipeline(&mut ctx, name);

        assert!(sink.diagnostics().iter().any(|d| d.code == errors::E218));
    }

    #[test]
    fn forever_with_delay_does_not_warn() {
        let interner = Interner::new();
        let mut tmpl = empty_template(&interner, "top");
        tmpl.behaviors = vec![PBehavior {
            kind: PBehaviorKind::Initial,
            body: PStmt::Forever {
                body: Box::new(PStmt::Delay {
                    delay: PExpr::Literal { value: LogicVec::from_u64(1, 32), signed: false, span: Span::DUMMY },
                    body: Box::new(PStmt::Nop { span: Span::DUMMY }),
                    span: Span::DUMMY,
                }),
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        }];
        let name = tmpl.name;
        let (mut table, mut loader, sink) = setup(&interner, tmpl);
        let mut flags = CompilerFlags::default();
        flags.warn_inf_loop = true;
        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, flags);
        run_pipeline(&mut ctx, name);

        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn case_without_default_warns_w202() {
        let interner = Interner::new();
        let sel = interner.get_or_intern("sel");
        let y = interner.get_or_intern("y");
        let mut tmpl = empty_template(&interner, "top");
        tmpl.signals = vec![wire_decl(&interner, "sel"), reg_decl(&interner, "y")];
        tmpl.behaviors = vec![PBehavior {
            kind: PBehaviorKind::Initial,
            body: PStmt::Case {
                kind: vlab_pform::PCaseKind::Exact,
                selector: PExpr::Ident { name: sel, span: Span::DUMMY },
                arms: vec![PCaseArm {
                    guards: vec![PExpr::Literal { value: LogicVec::from_u64(0, 1), signed: false, span: Span::DUMMY }],
                    body: Box::new(PStmt::BlockingAssign {
                        lhs: PExpr::Ident { name: y, span: Span::DUMMY },
                        rhs: PExpr::Literal { value: LogicVec::from_u64(1, 1), signed: false, span: Span::DUMMY },
                        delay: None,
                        span: Span::DUMMY,
                    }),
                    span: Span::DUMMY,
                }],
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        }];
        let name = tmpl.name;
        let (mut table, mut loader, sink) = setup(&interner, tmpl);
        let mut ctx =
            ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        run_pipeline(&mut ctx, name);

        assert!(!sink.diagnostics().is_empty());
    }

    #[test]
    fn task_call_resolves_to_declaring_scope() {
        let interner = Interner::new();
        let x = interner.get_or_intern("x");
        let task_name = interner.get_or_intern("do_it");
        let mut tmpl = empty_template(&interner, "top");
        tmpl.signals = vec![wire_decl(&interner, "x")];
        tmpl.tasks = vec![PTaskDecl {
            name: task_name,
            args: vec![],
            decls: vec![],
            body: PStmt::Nop { span: Span::DUMMY },
            span: Span::DUMMY,
        }];
        tmpl.behaviors = vec![PBehavior {
            kind: PBehaviorKind::Initial,
            body: PStmt::TaskCall {
                name: task_name,
                args: vec![PExpr::Ident { name: x, span: Span::DUMMY }],
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        }];
        let name = tmpl.name;
        let (mut table, mut loader, sink) = setup(&interner, tmpl);
        let mut ctx =
            ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = run_pipeline(&mut ctx, name);

        assert!(!sink.has_errors());
        let scope = &ctx.design.scopes[scope_id];
        assert_eq!(scope.tasks.len(), 1);
        assert_eq!(scope.processes.len(), 1);
        match &scope.processes.get(vlab_ir::ProcessId::from_raw(0)).body {
            Stmt::UserTaskCall { task, .. } => assert_eq!(task.name, task_name),
            other => panic!("expected UserTaskCall, got {other:?}"),
        }
    }

    #[test]
    fn named_block_allocates_child_scope() {
        let interner = Interner::new();
        let block_name = interner.get_or_intern("blk");
        let local = interner.get_or_intern("tmp");
        let mut tmpl = empty_template(&interner, "top");
        tmpl.behaviors = vec![PBehavior {
            kind: PBehaviorKind::Initial,
            body: PStmt::SeqBlock {
                name: Some(block_name),
                decls: vec![reg_decl(&interner, "tmp")],
                body: vec![PStmt::BlockingAssign {
                    lhs: PExpr::Ident { name: local, span: Span::DUMMY },
                    rhs: PExpr::Literal { value: LogicVec::from_u64(0, 1), signed: false, span: Span::DUMMY },
                    delay: None,
                    span: Span::DUMMY,
                }],
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        }];
        let name = tmpl.name;
        let (mut table, mut loader, sink) = setup(&interner, tmpl);
        let mut ctx =
            ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = run_pipeline(&mut ctx, name);

        assert!(!sink.has_errors());
        assert!(ctx.design.scopes[scope_id].children.contains_key(&block_name));
        match &ctx.design.scopes[scope_id]
            .processes
            .get(vlab_ir::ProcessId::from_raw(0))
            .body
        {
            Stmt::SeqBlock { scope: Some(_), .. } => {}
            other => panic!("expected a scoped SeqBlock, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_lowers_to_seq_and_while() {
        let interner = Interner::new();
        let i = interner.get_or_intern("i");
        let mut tmpl = empty_template(&interner, "top");
        tmpl.signals = vec![reg_decl(&interner, "i")];
        tmpl.behaviors = vec![PBehavior {
            kind: PBehaviorKind::Initial,
            body: PStmt::For {
                init: Box::new(PStmt::BlockingAssign {
                    lhs: PExpr::Ident { name: i, span: Span::DUMMY },
                    rhs: PExpr::Literal { value: LogicVec::from_u64(0, 32), signed: false, span: Span::DUMMY },
                    delay: None,
                    span: Span::DUMMY,
                }),
                cond: PExpr::Binary {
                    left: Box::new(PExpr::Ident { name: i, span: Span::DUMMY }),
                    op: vlab_pform::BinaryOp::Lt,
                    right: Box::new(PExpr::Literal { value: LogicVec::from_u64(4, 32), signed: false, span: Span::DUMMY }),
                    span: Span::DUMMY,
                },
                step: Box::new(PStmt::BlockingAssign {
                    lhs: PExpr::Ident { name: i, span: Span::DUMMY },
                    rhs: PExpr::Binary {
                        left: Box::new(PExpr::Ident { name: i, span: Span::DUMMY }),
                        op: vlab_pform::BinaryOp::Add,
                        right: Box::new(PExpr::Literal { value: LogicVec::from_u64(1, 32), signed: false, span: Span::DUMMY }),
                        span: Span::DUMMY,
                    },
                    delay: None,
                    span: Span::DUMMY,
                }),
                body: Box::new(PStmt::Nop { span: Span::DUMMY }),
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        }];
        let name = tmpl.name;
        let (mut table, mut loader, sink) = setup(&interner, tmpl);
        let mut ctx =
            ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = run_pipeline(&mut ctx, name);

        assert!(!sink.has_errors());
        match &ctx.design.scopes[scope_id]
            .processes
            .get(vlab_ir::ProcessId::from_raw(0))
            .body
        {
            Stmt::SeqBlock { body, .. } => {
                assert_eq!(body.len(), 2);
                assert!(matches!(body[1], Stmt::While { .. }));
            }
            other => panic!("expected SeqBlock, got {other:?}"),
        }
    }

    #[test]
    fn function_registers_with_return_signal() {
        let interner = Interner::new();
        let fn_name = interner.get_or_intern("double");
        let arg = interner.get_or_intern("v");
        let mut tmpl = empty_template(&interner, "top");
        tmpl.functions = vec![PFunctionDecl {
            name: fn_name,
            args: vec![wire_decl(&interner, "v")],
            decls: vec![],
            return_decl: reg_decl(&interner, "double"),
            body: PStmt::BlockingAssign {
                lhs: PExpr::Ident { name: fn_name, span: Span::DUMMY },
                rhs: PExpr::Binary {
                    left: Box::new(PExpr::Ident { name: arg, span: Span::DUMMY }),
                    op: vlab_pform::BinaryOp::Add,
                    right: Box::new(PExpr::Ident { name: arg, span: Span::DUMMY }),
                    span: Span::DUMMY,
                },
                delay: None,
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        }];
        let name = tmpl.name;
        let (mut table, mut loader, sink) = setup(&interner, tmpl);
        let mut ctx =
            ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = run_pipeline(&mut ctx, name);

        assert!(!sink.has_errors());
        let scope = &ctx.design.scopes[scope_id];
        assert_eq!(scope.functions.len(), 1);
        assert_eq!(scope.functions[0].name, fn_name);
    }

    #[test]
    fn guards_overlap_casex_wildcard() {
        let a = LogicVec::from_binary_str("1x").unwrap();
        let b = LogicVec::from_binary_str("10").unwrap();
        assert!(guards_overlap(CaseKind::CaseX, &a, &b));
        assert!(!guards_overlap(CaseKind::Exact, &a, &b));
    }
}
