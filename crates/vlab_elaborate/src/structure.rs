//! Structural elaboration: continuous assigns, gate primitives, module and
//! UDP instances, and specify-path validation (§4.4).
//!
//! Runs once every scope's signals exist (`signals::elaborate_signals`), so
//! every port/net name a structural construct names already has a
//! [`Signal`](vlab_ir::Signal) and a one-pin anchoring [`Cell`] to connect
//! against. The output of this phase is the netlist: [`Cell`]s and the
//! [`Nexus`]es joining their pins, both allocated directly into each scope
//! (or, for a nexus, the design-wide arena).

use std::mem;

use vlab_common::{Ident, LogicVec};
use vlab_ir::{
    Cell, CellId, CellKind, DelayTriple, DriveStrength, Nexus, NexusEndpoint, NexusId,
    PartSelectDirection, PinRef, Process, ProcessKind, ScopeId, SignalId, Stmt,
};
use vlab_pform::gate::PinCountRule;
use vlab_pform::table::PFormEntry;
use vlab_pform::{
    GateKind, PContinuousAssign, PDriveStrength, PExpr, PGate, PModuleInstance, PNetKind,
    PSpecifyPath, PortConnections,
};
use vlab_source::Span;

use crate::const_eval::{const_to_i64, eval_const_expr, eval_range, ConstEnv};
use crate::context::{ElaborationContext, ScopeContent};
use crate::errors;
use crate::expr_lower::{lower_expr, lower_lvalue};
use crate::signals::{find_signal, implicit_net, param_env};

/// The four structural lists a module template or generate body carries, in
/// the shape [`elaborate_scope_structure`] needs to process them uniformly.
struct StructuralContent {
    continuous_assigns: Vec<PContinuousAssign>,
    gates: Vec<PGate>,
    instances: Vec<PModuleInstance>,
    specify_paths: Vec<PSpecifyPath>,
}

/// Elaborates the structural content of every scope already present in the
/// design. A flat pass: a module's gates/instances only ever reference its
/// own scope's signals or its direct children's ports, never a sibling's.
pub fn elaborate_structure(ctx: &mut ElaborationContext<'_>) {
    let scope_ids: Vec<ScopeId> = ctx.design.scopes.iter().map(|(id, _)| id).collect();
    for scope_id in scope_ids {
        elaborate_scope_structure(ctx, scope_id);
    }
}

fn elaborate_scope_structure(ctx: &mut ElaborationContext<'_>, scope_id: ScopeId) {
    let content = match ctx.scope_content.get(&scope_id) {
        Some(ScopeContent::Module(tmpl)) => StructuralContent {
            continuous_assigns: tmpl.continuous_assigns.clone(),
            gates: tmpl.gates.clone(),
            instances: tmpl.instances.clone(),
            specify_paths: tmpl.specify_paths.clone(),
        },
        Some(ScopeContent::Generate(body)) => StructuralContent {
            continuous_assigns: body.continuous_assigns.clone(),
            gates: body.gates.clone(),
            instances: body.instances.clone(),
            specify_paths: Vec::new(),
        },
        _ => return,
    };

    let env = param_env(ctx, scope_id);

    for assign in &content.continuous_assigns {
        elaborate_continuous_assign(ctx, scope_id, &env, assign);
    }
    for gate in &content.gates {
        elaborate_gate(ctx, scope_id, &env, gate);
    }
    for inst in &content.instances {
        elaborate_instance(ctx, scope_id, &env, inst);
    }
    if ctx.flags.gn_specify_blocks_flag {
        for path in &content.specify_paths {
            validate_specify_path(ctx, path);
        }
    }
}

// ---------------------------------------------------------------------
// Continuous assigns
// ---------------------------------------------------------------------

fn elaborate_continuous_assign(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    assign: &PContinuousAssign,
) {
    if let (PExpr::Ident { name: lhs_name, .. }, PExpr::Ident { name: rhs_name, .. }) =
        (&assign.lhs, &assign.rhs)
    {
        if assign.delay.is_some() || assign.strength0.is_some() || assign.strength1.is_some() {
            elaborate_bufz_assign(ctx, scope_id, env, *lhs_name, *rhs_name, assign);
            return;
        }

        let (lhs_owner, lhs_signal) = resolve_signal_in_scope(ctx, scope_id, *lhs_name, assign.span);
        let (rhs_owner, rhs_signal) = resolve_signal_in_scope(ctx, scope_id, *rhs_name, assign.span);
        let lhs_width = ctx.design.scopes[lhs_owner].signals[lhs_signal].width;
        let rhs_width = ctx.design.scopes[rhs_owner].signals[rhs_signal].width;
        if lhs_width == rhs_width {
            let lhs_nexus = signal_nexus(ctx, lhs_owner, lhs_signal);
            let rhs_nexus = signal_nexus(ctx, rhs_owner, rhs_signal);
            merge_nexus_into(ctx, lhs_nexus, rhs_owner, rhs_nexus);
            return;
        }
    }

    let (lhs, lhs_width, _) = lower_lvalue(ctx, scope_id, env, &assign.lhs);
    let rhs = lower_expr(ctx, scope_id, env, &assign.rhs);
    if rhs.width() != 0 && lhs_width != rhs.width() {
        ctx.sink.emit(errors::warn_width_mismatch(
            &format!(
                "continuous assign: {}-bit target, {}-bit source",
                lhs_width,
                rhs.width()
            ),
            assign.span,
        ));
    }

    let body = Stmt::BlockingAssign {
        lhs,
        rhs,
        span: assign.span,
    };
    let scope = &mut ctx.design.scopes[scope_id];
    let predicted = vlab_ir::ProcessId::from_raw(scope.processes.len() as u32);
    let process_id = scope.processes.alloc(Process {
        id: predicted,
        scope: scope_id,
        kind: ProcessKind::Always,
        body,
        combinational_push: true,
        span: assign.span,
    });
    debug_assert_eq!(process_id, predicted);
}

/// A plain wire-to-wire continuous assign carrying a delay and/or an
/// explicit drive strength is realized as an explicit `BufZ` cell rather
/// than a synthesized process or a bare nexus merge, so the delay/strength
/// has somewhere to live as the inserted cell's output endpoint (§4.4.1).
fn elaborate_bufz_assign(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    lhs_name: Ident,
    rhs_name: Ident,
    assign: &PContinuousAssign,
) {
    let (lhs_owner, lhs_signal) = resolve_signal_in_scope(ctx, scope_id, lhs_name, assign.span);
    let (rhs_owner, rhs_signal) = resolve_signal_in_scope(ctx, scope_id, rhs_name, assign.span);

    let lhs_width = ctx.design.scopes[lhs_owner].signals[lhs_signal].width;
    let rhs_width = ctx.design.scopes[rhs_owner].signals[rhs_signal].width;
    if lhs_width != rhs_width {
        ctx.sink.emit(errors::warn_width_mismatch(
            &format!("bufz assign: {lhs_width}-bit target, {rhs_width}-bit source"),
            assign.span,
        ));
    }

    let lhs_nexus = signal_nexus(ctx, lhs_owner, lhs_signal);
    let rhs_nexus = signal_nexus(ctx, rhs_owner, rhs_signal);
    let delay = resolve_delay(ctx, env, &assign.delay);
    let drive0 = map_drive_strength(assign.strength0);
    let drive1 = map_drive_strength(assign.strength1);

    let scope = &mut ctx.design.scopes[scope_id];
    let predicted = CellId::from_raw(scope.cells.len() as u32);
    let cell_id = scope.cells.alloc(Cell {
        id: predicted,
        scope: scope_id,
        name: None,
        kind: CellKind::BufZ,
        pins: vec![lhs_nexus, rhs_nexus],
        span: assign.span,
    });
    debug_assert_eq!(cell_id, predicted);
    push_endpoint(ctx, lhs_nexus, cell_id, 0, drive0, drive1, delay);
}

// ---------------------------------------------------------------------
// Gate primitives
// ---------------------------------------------------------------------

fn elaborate_gate(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    gate: &PGate,
) {
    let rule: PinCountRule = gate.kind.pin_count();
    if !rule.accepts(gate.pins.len()) {
        let expected = match rule {
            PinCountRule::Exactly(n) => n,
            PinCountRule::AtLeast(n) => n,
        };
        ctx.sink.emit(errors::error_pin_count_mismatch(
            "gate",
            expected as u32,
            gate.pins.len(),
            gate.span,
        ));
        return;
    }

    let count = match &gate.range {
        Some(range) => match eval_range(range, env, ctx.sink, ctx.interner) {
            Some((msb, lsb)) => (msb - lsb).unsigned_abs() as u32 + 1,
            None => 1,
        },
        None => 1,
    };

    let delay = resolve_delay(ctx, env, &gate.delay);
    let drive0 = map_drive_strength(gate.strength0);
    let drive1 = map_drive_strength(gate.strength1);

    for k in 0..count {
        let mut pins = Vec::with_capacity(gate.pins.len());
        for pin_expr in &gate.pins {
            let pin_expr = if count > 1 {
                maybe_index_pin(ctx, scope_id, pin_expr, k, count)
            } else {
                pin_expr.clone()
            };
            match expr_nexus(ctx, scope_id, env, &pin_expr) {
                Some((nexus, _width)) => pins.push(nexus),
                None => return,
            }
        }

        let kind = if gate.kind.is_tran() {
            CellKind::Tran { kind: gate.kind }
        } else {
            CellKind::Logic {
                kind: gate.kind,
                width: 1,
            }
        };
        let scope = &mut ctx.design.scopes[scope_id];
        let predicted = CellId::from_raw(scope.cells.len() as u32);
        let cell_id = scope.cells.alloc(Cell {
            id: predicted,
            scope: scope_id,
            name: gate.name,
            kind,
            pins: pins.clone(),
            span: gate.span,
        });
        debug_assert_eq!(cell_id, predicted);
        if let Some(&out) = pins.first() {
            push_endpoint(ctx, out, cell_id, 0, drive0, drive1, delay);
        }
    }
}

/// Rewrites a plain identifier pin expression whose declared width equals
/// the enclosing gate/instance array's element count into an indexed bit
/// select, broadcasting one wide vector's bit `k` onto array element `k`.
/// A plain identifier exactly one bit wide is left untouched and connects
/// every array element to the same nexus instead. Any other shape (a
/// part-select, a concat, a literal) is also left untouched. A plain
/// identifier whose width is neither `1` nor `count` can be split evenly
/// across array elements, so it is reported as an error instead.
fn maybe_index_pin(
    ctx: &ElaborationContext<'_>,
    scope_id: ScopeId,
    pin_expr: &PExpr,
    k: u32,
    count: u32,
) -> PExpr {
    if let PExpr::Ident { name, span } = pin_expr {
        match lookup_signal_width(ctx, scope_id, *name) {
            Some(width) if width == count => {
                return PExpr::Index {
                    base: Box::new(pin_expr.clone()),
                    index: Box::new(PExpr::Literal {
                        value: LogicVec::from_u64(k as u64, 32),
                        signed: false,
                        span: *span,
                    }),
                    span: *span,
                };
            }
            Some(width) if width != 1 => {
                ctx.sink.emit(errors::error_array_pin_width(
                    ctx.interner.resolve(*name),
                    width,
                    count,
                    *span,
                ));
            }
            _ => {}
        }
    }
    pin_expr.clone()
}

fn lookup_signal_width(ctx: &ElaborationContext<'_>, scope_id: ScopeId, name: Ident) -> Option<u32> {
    let mut current = Some(scope_id);
    while let Some(id) = current {
        let scope = &ctx.design.scopes[id];
        if let Some(sig_id) = find_signal(scope, name) {
            return Some(scope.signals[sig_id].width);
        }
        current = scope.parent;
    }
    None
}

// ---------------------------------------------------------------------
// Module and UDP instances
// ---------------------------------------------------------------------

enum InstanceTarget {
    Module,
    Udp {
        output_name: Ident,
        input_names: Vec<Ident>,
    },
}

fn elaborate_instance(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    inst: &PModuleInstance,
) {
    let target = match ctx.table.lookup(inst.type_name, ctx.loader) {
        Some(PFormEntry::Module(_)) => InstanceTarget::Module,
        Some(PFormEntry::Primitive(udp)) => InstanceTarget::Udp {
            output_name: udp.output_name,
            input_names: udp.input_names.clone(),
        },
        None => {
            ctx.sink.emit(errors::error_unknown_module(
                ctx.interner.resolve(inst.type_name),
                inst.span,
            ));
            return;
        }
    };

    match target {
        InstanceTarget::Module => elaborate_module_instance(ctx, scope_id, env, inst),
        InstanceTarget::Udp {
            output_name,
            input_names,
        } => elaborate_udp_instance(ctx, scope_id, env, inst, output_name, input_names),
    }
}

fn elaborate_module_instance(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    inst: &PModuleInstance,
) {
    // The scope builder has already constructed one child scope per array
    // element (or a single element for a scalar instance); a missing entry
    // here means scope construction already diagnosed the failure.
    let Some(children) = ctx.design.scopes[scope_id]
        .children
        .get(&inst.instance_name)
        .cloned()
    else {
        return;
    };

    let count = children.len() as u32;
    for (k, &child_scope) in children.iter().enumerate() {
        let names: Vec<Ident> = ctx.design.scopes[child_scope]
            .ports
            .iter()
            .map(|&sig| ctx.design.scopes[child_scope].signals[sig].name)
            .collect();

        let exprs = resolve_port_exprs(ctx, &inst.ports, &names, inst.instance_name, inst.span);

        for (port_name, port_signal, expr) in names
            .iter()
            .zip(ctx.design.scopes[child_scope].ports.clone())
            .zip(exprs.into_iter())
            .map(|((name, sig), expr)| (*name, sig, expr))
        {
            let expr = expr.map(|e| {
                if count > 1 {
                    maybe_index_pin(ctx, scope_id, &e, k as u32, count)
                } else {
                    e
                }
            });
            bind_port_connection(
                ctx,
                scope_id,
                env,
                expr.as_ref(),
                child_scope,
                port_signal,
                inst.instance_name,
                port_name,
                inst.span,
            );
        }
    }
}

fn elaborate_udp_instance(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    inst: &PModuleInstance,
    output_name: Ident,
    input_names: Vec<Ident>,
) {
    let mut names = Vec::with_capacity(1 + input_names.len());
    names.push(output_name);
    names.extend(input_names);

    let declared = match &inst.ports {
        PortConnections::Positional(exprs) => exprs.len(),
        PortConnections::ByName(pairs) => pairs.len(),
    };
    if declared != names.len() {
        ctx.sink.emit(errors::error_pin_count_mismatch(
            "udp instance",
            names.len() as u32,
            declared,
            inst.span,
        ));
        return;
    }

    let exprs = resolve_port_exprs(ctx, &inst.ports, &names, inst.instance_name, inst.span);

    let count = match &inst.range {
        Some(range) => match eval_range(range, env, ctx.sink, ctx.interner) {
            Some((msb, lsb)) => (msb - lsb).unsigned_abs() as u32 + 1,
            None => 1,
        },
        None => 1,
    };

    let delay = resolve_udp_delay(ctx, env, &inst.delay);

    for k in 0..count {
        let mut pins = Vec::with_capacity(names.len());
        for expr in &exprs {
            match expr {
                Some(e) => {
                    let e = if count > 1 {
                        maybe_index_pin(ctx, scope_id, e, k, count)
                    } else {
                        e.clone()
                    };
                    match expr_nexus(ctx, scope_id, env, &e) {
                        Some((nexus, _)) => pins.push(nexus),
                        None => return,
                    }
                }
                None => {
                    if ctx.flags.warn_portbinding {
                        ctx.sink.emit(errors::warn_unconnected_port(
                            ctx.interner.resolve(names[pins.len()]),
                            ctx.interner.resolve(inst.instance_name),
                            inst.span,
                        ));
                    }
                    pins.push(constant_pin_nexus(ctx, scope_id, false, inst.span));
                }
            }
        }
        let scope = &mut ctx.design.scopes[scope_id];
        let predicted = CellId::from_raw(scope.cells.len() as u32);
        let cell_id = scope.cells.alloc(Cell {
            id: predicted,
            scope: scope_id,
            name: Some(inst.instance_name),
            kind: CellKind::Udp {
                template: inst.type_name,
            },
            pins: pins.clone(),
            span: inst.span,
        });
        debug_assert_eq!(cell_id, predicted);
        if let Some(&out) = pins.first() {
            push_endpoint(
                ctx,
                out,
                cell_id,
                0,
                DriveStrength::Strong,
                DriveStrength::Strong,
                delay,
            );
        }
    }
}

/// Aligns a `PortConnections` (positional or by-name) against an ordered
/// port/pin name list, producing one optional expression per name (`None`
/// for an explicitly unconnected `.port()` or a trailing omitted positional
/// argument).
fn resolve_port_exprs(
    ctx: &ElaborationContext<'_>,
    conn: &PortConnections,
    names: &[Ident],
    inst_name: Ident,
    span: Span,
) -> Vec<Option<PExpr>> {
    match conn {
        PortConnections::Positional(exprs) => {
            if exprs.len() > names.len() {
                ctx.sink.emit(errors::error_port_mismatch(
                    &format!(
                        "too many port connections for `{}` ({} given, {} expected)",
                        ctx.interner.resolve(inst_name),
                        exprs.len(),
                        names.len()
                    ),
                    span,
                ));
            }
            names
                .iter()
                .enumerate()
                .map(|(i, _)| exprs.get(i).cloned())
                .collect()
        }
        PortConnections::ByName(pairs) => {
            let mut result = vec![None; names.len()];
            for (name, expr) in pairs {
                match names.iter().position(|n| n == name) {
                    Some(idx) => result[idx] = expr.clone(),
                    None => {
                        ctx.sink.emit(errors::error_unknown_port(
                            ctx.interner.resolve(*name),
                            ctx.interner.resolve(inst_name),
                            span,
                        ));
                    }
                }
            }
            result
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn bind_port_connection(
    ctx: &mut ElaborationContext<'_>,
    parent_scope: ScopeId,
    env: &ConstEnv,
    expr: Option<&PExpr>,
    child_scope: ScopeId,
    child_signal: SignalId,
    instance_name: Ident,
    port_name: Ident,
    span: Span,
) {
    let Some(expr) = expr else {
        if ctx.flags.warn_portbinding {
            ctx.sink.emit(errors::warn_unconnected_port(
                ctx.interner.resolve(port_name),
                ctx.interner.resolve(instance_name),
                span,
            ));
        }
        return;
    };

    let Some((ext_nexus, ext_width)) = expr_nexus(ctx, parent_scope, env, expr) else {
        return;
    };
    let child_width = ctx.design.scopes[child_scope].signals[child_signal].width;
    if ctx.flags.warn_portbinding && ext_width != child_width {
        ctx.sink.emit(errors::warn_width_mismatch(
            &format!(
                "port `{}`: {}-bit connection to {}-bit port",
                ctx.interner.resolve(port_name),
                ext_width,
                child_width
            ),
            span,
        ));
    }

    let child_signed = ctx.design.scopes[child_scope].signals[child_signal].signed;
    let reconciled = reconcile_width(
        ctx,
        parent_scope,
        ext_nexus,
        ext_width,
        child_width,
        child_signed,
        span,
    );
    connect_nexus_to_signal(ctx, reconciled, child_scope, child_signal);
}

/// Pads (zero- or sign-extending) or crops `nexus` to `target_width`,
/// inserting a one-shot `PartSelect`/`Concat`/`Replicate` cell to reconcile
/// a single connection's width mismatch (§4.4.1). Returns `nexus` unchanged
/// when the widths already match.
fn reconcile_width(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    nexus: NexusId,
    from_width: u32,
    target_width: u32,
    signed: bool,
    span: Span,
) -> NexusId {
    if from_width == target_width || from_width == 0 {
        return nexus;
    }
    if from_width > target_width {
        return build_part_select_nexus(ctx, scope_id, nexus, 0, target_width, span);
    }

    let pad_width = target_width - from_width;
    let fill = if signed {
        build_bit_select_nexus(ctx, scope_id, nexus, from_width - 1, span)
    } else {
        constant_pin_nexus(ctx, scope_id, false, span)
    };
    let pad = build_replicate_nexus(ctx, scope_id, fill, pad_width, span);
    build_concat_nexus(ctx, scope_id, &[pad, nexus], target_width, span)
}

/// Merges a child port's own nexus into the externally-resolved nexus it is
/// bound to, then rewrites every pin in the child's scope that still
/// references the abandoned nexus ID to point at the surviving one.
fn connect_nexus_to_signal(
    ctx: &mut ElaborationContext<'_>,
    ext_nexus: NexusId,
    child_scope: ScopeId,
    child_signal: SignalId,
) {
    let child_nexus = signal_nexus(ctx, child_scope, child_signal);
    merge_nexus_into(ctx, ext_nexus, child_scope, child_nexus);
}

/// Merges `abandoned` (owned by `abandoned_owner`) into `survivor`, then
/// rewrites every pin in `abandoned_owner`'s scope that still references
/// `abandoned` to point at `survivor` instead.
///
/// Arena slots are never reassigned, so the abandoned nexus ID cannot be
/// deleted outright; instead its endpoints are taken via [`mem::replace`]
/// and folded into the surviving nexus, and `abandoned_owner`'s own cells
/// (built in the same pass, before any further scope can reference its
/// pins) are the only place left holding the old ID.
fn merge_nexus_into(
    ctx: &mut ElaborationContext<'_>,
    survivor: NexusId,
    abandoned_owner: ScopeId,
    abandoned: NexusId,
) {
    if survivor == abandoned {
        return;
    }

    let width = ctx.design.nexuses[abandoned].width;
    let taken = mem::replace(&mut ctx.design.nexuses[abandoned], Nexus::new(width));
    ctx.design.nexuses[survivor].merge(taken);

    for (_, cell) in ctx.design.scopes[abandoned_owner].cells.iter_mut() {
        for pin in cell.pins.iter_mut() {
            if *pin == abandoned {
                *pin = survivor;
            }
        }
    }
}

// ---------------------------------------------------------------------
// Specify paths
// ---------------------------------------------------------------------

/// Validates a specify path's delay-table arity. The closed `CellKind`
/// universe has no timing-path node, so this is diagnostic-only and has no
/// structural effect (§4.4.4).
fn validate_specify_path(ctx: &ElaborationContext<'_>, path: &PSpecifyPath) {
    let found = path.delays.values.len();
    if matches!(found, 1 | 2 | 3 | 6 | 12) {
        return;
    }
    let expected = [1usize, 2, 3, 6, 12]
        .into_iter()
        .min_by_key(|n| n.abs_diff(found))
        .unwrap_or(1);
    ctx.sink
        .emit(errors::error_delay_table_arity(expected, found, path.span));
}

// ---------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------

pub(crate) fn signal_nexus(ctx: &ElaborationContext<'_>, owner: ScopeId, signal: SignalId) -> NexusId {
    let scope = &ctx.design.scopes[owner];
    let net_cell = scope.signals[signal].net_cell;
    scope.cells[net_cell].pins[0]
}

#[allow(clippy::too_many_arguments)]
fn push_endpoint(
    ctx: &mut ElaborationContext<'_>,
    nexus: NexusId,
    cell: CellId,
    index: u32,
    drive0: DriveStrength,
    drive1: DriveStrength,
    delay: Option<DelayTriple>,
) {
    ctx.design.nexuses[nexus].endpoints.push(NexusEndpoint {
        pin: PinRef { cell, index },
        drive0,
        drive1,
        delay,
    });
}

fn map_drive_strength(p: Option<PDriveStrength>) -> DriveStrength {
    match p {
        None => DriveStrength::Strong,
        Some(PDriveStrength::HighZ) => DriveStrength::HighZ,
        Some(PDriveStrength::Weak) => DriveStrength::Weak,
        Some(PDriveStrength::Pull) => DriveStrength::Pull,
        Some(PDriveStrength::Strong) => DriveStrength::Strong,
        Some(PDriveStrength::Supply) => DriveStrength::Supply,
    }
}

fn eval_delay_component(
    ctx: &ElaborationContext<'_>,
    env: &ConstEnv,
    e: &PExpr,
    default: u64,
) -> u64 {
    eval_const_expr(e, env, ctx.sink, ctx.interner)
        .and_then(|v| const_to_i64(&v))
        .map(|n| n.max(0) as u64)
        .unwrap_or(default)
}

fn resolve_delay(
    ctx: &ElaborationContext<'_>,
    env: &ConstEnv,
    delay: &Option<vlab_pform::PDelayTriple>,
) -> Option<DelayTriple> {
    let delay = delay.as_ref()?;
    let rise = eval_delay_component(ctx, env, &delay.rise, 0);
    let fall = delay
        .fall
        .as_ref()
        .map(|e| eval_delay_component(ctx, env, e, rise))
        .unwrap_or(rise);
    let decay = delay
        .decay
        .as_ref()
        .map(|e| eval_delay_component(ctx, env, e, rise))
        .unwrap_or(rise);
    Some(DelayTriple { rise, fall, decay })
}

/// Resolves a UDP instance's delay triple, which (unlike a gate's) must
/// fold to a constant outright: `eval_const_expr` emits `E209` on any
/// non-constant component, and that component's triple is dropped rather
/// than defaulted (§4.4.4).
fn resolve_udp_delay(
    ctx: &ElaborationContext<'_>,
    env: &ConstEnv,
    delay: &Option<vlab_pform::PDelayTriple>,
) -> Option<DelayTriple> {
    let delay = delay.as_ref()?;
    let rise = const_to_i64(&eval_const_expr(&delay.rise, env, ctx.sink, ctx.interner)?)?.max(0) as u64;
    let fall = match &delay.fall {
        Some(e) => const_to_i64(&eval_const_expr(e, env, ctx.sink, ctx.interner)?)?.max(0) as u64,
        None => rise,
    };
    let decay = match &delay.decay {
        Some(e) => const_to_i64(&eval_const_expr(e, env, ctx.sink, ctx.interner)?)?.max(0) as u64,
        None => rise,
    };
    Some(DelayTriple { rise, fall, decay })
}

/// Resolves a structural (pin-connection) expression to the nexus it
/// denotes, allocating glue cells for part-selects, bit-selects, and
/// concatenations as needed. Returns `None` (after emitting `E210`) for a
/// shape that cannot appear on a pin: a non-scalar literal containing X/Z,
/// an arithmetic expression, or a system call.
fn expr_nexus(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    expr: &PExpr,
) -> Option<(NexusId, u32)> {
    match expr {
        PExpr::Ident { name, span } => {
            let (owner, signal) = resolve_signal_in_scope(ctx, scope_id, *name, *span);
            let width = ctx.design.scopes[owner].signals[signal].width;
            Some((signal_nexus(ctx, owner, signal), width))
        }
        PExpr::Literal { value, span, .. } => {
            if value.width() == 1 {
                if value.is_all_zero() {
                    return Some((constant_pin_nexus(ctx, scope_id, false, *span), 1));
                }
                if value.is_all_one() {
                    return Some((constant_pin_nexus(ctx, scope_id, true, *span), 1));
                }
            }
            ctx.sink.emit(errors::error_unsupported(
                "non-scalar or indeterminate literal on a structural pin",
                *span,
            ));
            None
        }
        PExpr::PartSelect { base, msb, lsb, span } => {
            let (base_nexus, base_width) = expr_nexus(ctx, scope_id, env, base)?;
            let (msb, lsb) = (
                const_to_i64(&eval_const_expr(msb, env, ctx.sink, ctx.interner)?)?,
                const_to_i64(&eval_const_expr(lsb, env, ctx.sink, ctx.interner)?)?,
            );
            let width = (msb - lsb).unsigned_abs() as u32 + 1;
            if width > base_width {
                ctx.sink.emit(errors::error_unsupported(
                    "part-select exceeds base signal width",
                    *span,
                ));
                return None;
            }
            Some((
                build_part_select_nexus(ctx, scope_id, base_nexus, lsb.min(msb) as u32, width, *span),
                width,
            ))
        }
        PExpr::Index { base, index, span } => {
            let (base_nexus, _base_width) = expr_nexus(ctx, scope_id, env, base)?;
            let offset = match eval_const_expr(index, env, ctx.sink, ctx.interner) {
                Some(v) => const_to_i64(&v).unwrap_or(0) as u32,
                None => 0,
            };
            Some((
                build_bit_select_nexus(ctx, scope_id, base_nexus, offset, *span),
                1,
            ))
        }
        PExpr::Concat { elements, span } => {
            let mut parts = Vec::with_capacity(elements.len());
            let mut total_width = 0u32;
            for el in elements {
                let (nexus, width) = expr_nexus(ctx, scope_id, env, el)?;
                parts.push(nexus);
                total_width += width;
            }
            Some((
                build_concat_nexus(ctx, scope_id, &parts, total_width, *span),
                total_width,
            ))
        }
        other => {
            ctx.sink.emit(errors::error_unsupported(
                "expression shape not valid on a structural pin",
                other.span(),
            ));
            None
        }
    }
}

pub(crate) fn resolve_signal_in_scope(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    name: Ident,
    span: Span,
) -> (ScopeId, SignalId) {
    let mut current = Some(scope_id);
    while let Some(id) = current {
        if let Some(sig_id) = find_signal(&ctx.design.scopes[id], name) {
            return (id, sig_id);
        }
        current = ctx.design.scopes[id].parent;
    }
    let id = implicit_net(ctx, scope_id, name, span);
    (scope_id, id)
}

fn constant_pin_nexus(ctx: &mut ElaborationContext<'_>, scope_id: ScopeId, bit: bool, span: Span) -> NexusId {
    let kind = if bit { PNetKind::Supply1 } else { PNetKind::Supply0 };
    let nexus = ctx.design.nexuses.alloc(Nexus::new(1));
    let scope = &mut ctx.design.scopes[scope_id];
    let predicted = CellId::from_raw(scope.cells.len() as u32);
    let cell_id = scope.cells.alloc(Cell {
        id: predicted,
        scope: scope_id,
        name: None,
        kind: CellKind::Net { kind },
        pins: vec![nexus],
        span,
    });
    debug_assert_eq!(cell_id, predicted);
    push_endpoint(
        ctx,
        nexus,
        cell_id,
        0,
        DriveStrength::Supply,
        DriveStrength::Supply,
        None,
    );
    nexus
}

fn build_part_select_nexus(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    base: NexusId,
    offset: u32,
    width: u32,
    span: Span,
) -> NexusId {
    let out = ctx.design.nexuses.alloc(Nexus::new(width));
    let scope = &mut ctx.design.scopes[scope_id];
    let predicted = CellId::from_raw(scope.cells.len() as u32);
    let cell_id = scope.cells.alloc(Cell {
        id: predicted,
        scope: scope_id,
        name: None,
        kind: CellKind::PartSelect {
            direction: PartSelectDirection::VectorToPart,
            offset,
        },
        pins: vec![out, base],
        span,
    });
    debug_assert_eq!(cell_id, predicted);
    push_endpoint(
        ctx,
        out,
        cell_id,
        0,
        DriveStrength::Strong,
        DriveStrength::Strong,
        None,
    );
    out
}

fn build_bit_select_nexus(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    base: NexusId,
    offset: u32,
    span: Span,
) -> NexusId {
    build_part_select_nexus(ctx, scope_id, base, offset, 1, span)
}

fn build_concat_nexus(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    parts: &[NexusId],
    width: u32,
    span: Span,
) -> NexusId {
    let out = ctx.design.nexuses.alloc(Nexus::new(width));
    let mut pins = Vec::with_capacity(1 + parts.len());
    pins.push(out);
    pins.extend_from_slice(parts);
    let scope = &mut ctx.design.scopes[scope_id];
    let predicted = CellId::from_raw(scope.cells.len() as u32);
    let cell_id = scope.cells.alloc(Cell {
        id: predicted,
        scope: scope_id,
        name: None,
        kind: CellKind::Concat,
        pins,
        span,
    });
    debug_assert_eq!(cell_id, predicted);
    push_endpoint(
        ctx,
        out,
        cell_id,
        0,
        DriveStrength::Strong,
        DriveStrength::Strong,
        None,
    );
    out
}

fn build_replicate_nexus(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    base: NexusId,
    count: u32,
    span: Span,
) -> NexusId {
    let out = ctx.design.nexuses.alloc(Nexus::new(count));
    let scope = &mut ctx.design.scopes[scope_id];
    let predicted = CellId::from_raw(scope.cells.len() as u32);
    let cell_id = scope.cells.alloc(Cell {
        id: predicted,
        scope: scope_id,
        name: None,
        kind: CellKind::Replicate { count },
        pins: vec![out, base],
        span,
    });
    debug_assert_eq!(cell_id, predicted);
    push_endpoint(
        ctx,
        out,
        cell_id,
        0,
        DriveStrength::Strong,
        DriveStrength::Strong,
        None,
    );
    out
}
