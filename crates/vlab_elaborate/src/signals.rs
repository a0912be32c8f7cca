//! Signal elaboration: materializing declared nets and registers (§4.3).
//!
//! Runs once the whole scope tree exists and every scope's parameter table
//! has been resolved (`scope_builder`, `params::apply_defparams`), and
//! before the structural/behavioral elaborators, which resolve identifiers
//! against the signals this phase creates. After this phase, every
//! identifier later lookups need resolves to either a signal, a
//! parameter-constant, an event, a task, or a function.

use std::collections::HashSet;

use vlab_common::Ident;
use vlab_ir::{
    Cell, CellId, CellKind, Nexus, NexusId, PortDirection, Scope, ScopeId, Signal, SignalId,
    ValueKind,
};
use vlab_pform::{PDirection, PNetKind, PSignalDecl};
use vlab_source::Span;

use crate::const_eval::{eval_range, ConstEnv};
use crate::context::{ElaborationContext, ScopeContent};
use crate::errors;

/// Elaborates the declared signals of every scope already present in the
/// design (a flat pass — order between scopes does not matter, since a
/// declaration only ever references its own scope's already-resolved
/// parameters, never another scope's signals).
pub fn elaborate_signals(ctx: &mut ElaborationContext<'_>) {
    let scope_ids: Vec<ScopeId> = ctx.design.scopes.iter().map(|(id, _)| id).collect();
    for scope_id in scope_ids {
        elaborate_scope_signals(ctx, scope_id);
    }
}

/// Looks up a signal by name within a single scope (no parent walk — the
/// caller is responsible for hierarchical resolution, e.g. via `scope.parent`).
pub fn find_signal(scope: &Scope, name: Ident) -> Option<SignalId> {
    scope
        .signals
        .iter()
        .find(|(_, signal)| signal.name == name)
        .map(|(id, _)| id)
}

/// Creates an undeclared 1-bit wire on demand, per §4.4.1's "auto-creating
/// implicit wires where grammar allows". Reports `E214` if `error_implicit`
/// is set, `W206` otherwise.
pub fn implicit_net(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    name: Ident,
    span: Span,
) -> SignalId {
    if ctx.flags.error_implicit {
        ctx.sink
            .emit(errors::error_implicit_net(ctx.interner.resolve(name), span));
    } else {
        ctx.sink
            .emit(errors::warn_implicit_net(ctx.interner.resolve(name), span));
    }

    let (net_cell, _nexus) = alloc_net_cell(ctx, scope_id, Some(name), PNetKind::Wire, 1, span);
    let scope = &mut ctx.design.scopes[scope_id];
    let predicted = SignalId::from_raw(scope.signals.len() as u32);
    let signal = Signal {
        id: predicted,
        name,
        scope: scope_id,
        net_kind: PNetKind::Wire,
        value_kind: ValueKind::LogicVector,
        width: 1,
        signed: false,
        msb_gt_lsb: false,
        array_count: None,
        direction: PortDirection::NotAPort,
        net_cell,
        span,
    };
    let id = scope.signals.alloc(signal);
    debug_assert_eq!(id, predicted);
    id
}

fn elaborate_scope_signals(ctx: &mut ElaborationContext<'_>, scope_id: ScopeId) {
    let mut seen = HashSet::new();

    match ctx.scope_content.get(&scope_id) {
        Some(ScopeContent::Module(tmpl)) => {
            let ports = tmpl.ports.clone();
            let signals = tmpl.signals.clone();
            let env = param_env(ctx, scope_id);

            let port_ids = materialize_ports(ctx, scope_id, &ports, &env, &mut seen);
            ctx.design.scopes[scope_id].ports = port_ids;
            for decl in &signals {
                materialize_signal(ctx, scope_id, decl, &env, PortDirection::NotAPort, &mut seen);
            }
        }
        Some(ScopeContent::Generate(body)) => {
            let signals = body.signals.clone();
            let env = param_env(ctx, scope_id);
            for decl in &signals {
                materialize_signal(ctx, scope_id, decl, &env, PortDirection::NotAPort, &mut seen);
            }
        }
        Some(ScopeContent::Task(task)) => {
            let args = task.args.clone();
            let decls = task.decls.clone();
            let env = param_env(ctx, scope_id);

            let port_ids = materialize_ports(ctx, scope_id, &args, &env, &mut seen);
            ctx.design.scopes[scope_id].ports = port_ids;
            for decl in &decls {
                materialize_signal(ctx, scope_id, decl, &env, PortDirection::NotAPort, &mut seen);
            }
        }
        Some(ScopeContent::Function(function)) => {
            let args = function.args.clone();
            let return_decl = function.return_decl.clone();
            let decls = function.decls.clone();
            let env = param_env(ctx, scope_id);

            let port_ids = materialize_ports(ctx, scope_id, &args, &env, &mut seen);
            ctx.design.scopes[scope_id].ports = port_ids;
            // The return value is an ordinary register named after the
            // function, assigned to from within its own body.
            materialize_signal(ctx, scope_id, &return_decl, &env, PortDirection::NotAPort, &mut seen);
            for decl in &decls {
                materialize_signal(ctx, scope_id, decl, &env, PortDirection::NotAPort, &mut seen);
            }
        }
        None => {}
    }
}

pub(crate) fn param_env(ctx: &ElaborationContext<'_>, scope_id: ScopeId) -> ConstEnv {
    ctx.design.scopes[scope_id]
        .parameters
        .iter()
        .map(|(name, entry)| (*name, entry.value.clone()))
        .collect()
}

fn materialize_ports(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    decls: &[PSignalDecl],
    env: &ConstEnv,
    seen: &mut HashSet<Ident>,
) -> Vec<SignalId> {
    let mut ids = Vec::with_capacity(decls.len());
    for decl in decls {
        let direction = resolve_port_direction(ctx, decl);
        if let Some(id) = materialize_signal(ctx, scope_id, decl, env, direction, seen) {
            ids.push(id);
        }
    }
    ids
}

fn resolve_port_direction(ctx: &ElaborationContext<'_>, decl: &PSignalDecl) -> PortDirection {
    match decl.direction {
        PDirection::Input => PortDirection::Input,
        PDirection::Output => PortDirection::Output,
        PDirection::Inout => PortDirection::InOut,
        PDirection::Implicit => {
            ctx.sink.emit(errors::error_port_mismatch(
                &format!(
                    "port `{}` has no resolvable direction",
                    ctx.interner.resolve(decl.name)
                ),
                decl.span,
            ));
            PortDirection::Implicit
        }
    }
}

/// Materializes one declaration into a [`Signal`] plus its anchoring
/// [`Cell`]/[`Nexus`] pair. Returns `None` (after reporting `E203`) if the
/// name has already been declared in this scope.
pub(crate) fn materialize_signal(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    decl: &PSignalDecl,
    env: &ConstEnv,
    direction: PortDirection,
    seen: &mut HashSet<Ident>,
) -> Option<SignalId> {
    if !seen.insert(decl.name) {
        ctx.sink.emit(errors::error_duplicate_signal(
            ctx.interner.resolve(decl.name),
            decl.span,
        ));
        return None;
    }

    let (width, msb_gt_lsb) = match &decl.range {
        Some(range) => match eval_range(range, env, ctx.sink, ctx.interner) {
            Some((msb, lsb)) => ((msb - lsb).unsigned_abs() as u32 + 1, msb > lsb),
            None => (1, false),
        },
        // Verilog's `integer` is a self-contained 32-bit signed word even
        // without a declared range.
        None if matches!(decl.kind, PNetKind::Integer) => (32, false),
        None => (1, false),
    };

    let array_count = decl.array_dim.as_ref().and_then(|dim| {
        eval_range(dim, env, ctx.sink, ctx.interner)
            .map(|(hi, lo)| (hi - lo).unsigned_abs() as u32 + 1)
    });

    let value_kind = match decl.kind {
        PNetKind::Real => ValueKind::Real,
        _ => ValueKind::LogicVector,
    };
    let signed = decl.signed || matches!(decl.kind, PNetKind::Integer);

    let (net_cell, _nexus) = alloc_net_cell(ctx, scope_id, Some(decl.name), decl.kind, width, decl.span);

    let scope = &mut ctx.design.scopes[scope_id];
    let predicted = SignalId::from_raw(scope.signals.len() as u32);
    let signal = Signal {
        id: predicted,
        name: decl.name,
        scope: scope_id,
        net_kind: decl.kind,
        value_kind,
        width,
        signed,
        msb_gt_lsb,
        array_count,
        direction,
        net_cell,
        span: decl.span,
    };
    let signal_id = scope.signals.alloc(signal);
    debug_assert_eq!(signal_id, predicted);
    Some(signal_id)
}

/// Allocates the `Net` cell and its single, fresh [`Nexus`] anchoring one
/// signal's pin. A "memory" declaration's nexus carries one word's width,
/// not the whole array — per-word access is a procedural (array-indexed)
/// concern, not a structural one.
fn alloc_net_cell(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    name: Option<Ident>,
    net_kind: PNetKind,
    width: u32,
    span: Span,
) -> (CellId, NexusId) {
    let nexus_id = ctx.design.nexuses.alloc(Nexus::new(width));
    let scope = &mut ctx.design.scopes[scope_id];
    let predicted = CellId::from_raw(scope.cells.len() as u32);
    let cell = Cell {
        id: predicted,
        scope: scope_id,
        name,
        kind: CellKind::Net { kind: net_kind },
        pins: vec![nexus_id],
        span,
    };
    let cell_id = scope.cells.alloc(cell);
    debug_assert_eq!(cell_id, predicted);
    (cell_id, nexus_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_common::{Interner, LogicVec};
    use vlab_config::CompilerFlags;
    use vlab_diagnostics::DiagnosticSink;
    use vlab_pform::{ClosedLoader, PExpr, PFormTable, PModuleTemplate};

    fn lit(n: u64, width: u32) -> PExpr {
        PExpr::Literal {
            value: LogicVec::from_u64(n, width),
            signed: false,
            span: Span::DUMMY,
        }
    }

    fn signal_decl(interner: &Interner, name: &str, kind: PNetKind, direction: PDirection, range: Option<(u64, u64)>) -> PSignalDecl {
        PSignalDecl {
            name: interner.get_or_intern(name),
            kind,
            direction,
            range: range.map(|(msb, lsb)| (lit(msb, 32), lit(lsb, 32))),
            array_dim: None,
            signed: false,
            span: Span::DUMMY,
        }
    }

    fn template_with(interner: &Interner, name: &str, ports: Vec<PSignalDecl>, signals: Vec<PSignalDecl>) -> PModuleTemplate {
        PModuleTemplate {
            name: interner.get_or_intern(name),
            ports,
            parameters: Vec::new(),
            specparams: Vec::new(),
            signals,
            gates: Vec::new(),
            continuous_assigns: Vec::new(),
            instances: Vec::new(),
            behaviors: Vec::new(),
            tasks: Vec::new(),
            functions: Vec::new(),
            generates: Vec::new(),
            specify_paths: Vec::new(),
            defparams: Vec::new(),
            time_unit: -9,
            time_precision: -9,
            default_net_kind: Some(PNetKind::Wire),
            span: Span::DUMMY,
        }
    }

    #[test]
    fn scalar_signal_gets_width_one() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();
        let mut table = PFormTable::new();
        let name = interner.get_or_intern("top");
        table.insert_module(template_with(
            &interner,
            "top",
            vec![signal_decl(&interner, "clk", PNetKind::Wire, PDirection::Input, None)],
            Vec::new(),
        ));
        table.add_root(name);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = crate::scope_builder::build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY).unwrap();
        elaborate_signals(&mut ctx);

        let scope = &ctx.design.scopes[scope_id];
        assert_eq!(scope.ports.len(), 1);
        let sig = &scope.signals[scope.ports[0]];
        assert_eq!(sig.width, 1);
        assert_eq!(sig.direction, PortDirection::Input);
        assert!(!sink.has_errors());
    }

    #[test]
    fn ranged_signal_computes_width_and_endianness() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();
        let mut table = PFormTable::new();
        let name = interner.get_or_intern("top");
        table.insert_module(template_with(
            &interner,
            "top",
            Vec::new(),
            vec![signal_decl(&interner, "bus", PNetKind::Wire, PDirection::Implicit, Some((7, 0)))],
        ));
        table.add_root(name);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = crate::scope_builder::build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY).unwrap();
        elaborate_signals(&mut ctx);

        let scope = &ctx.design.scopes[scope_id];
        let bus_name = interner.get_or_intern("bus");
        let sig_id = find_signal(scope, bus_name).unwrap();
        let sig = &scope.signals[sig_id];
        assert_eq!(sig.width, 8);
        assert!(sig.msb_gt_lsb);
    }

    #[test]
    fn little_endian_range_clears_msb_flag() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();
        let mut table = PFormTable::new();
        let name = interner.get_or_intern("top");
        table.insert_module(template_with(
            &interner,
            "top",
            Vec::new(),
            vec![signal_decl(&interner, "bus", PNetKind::Wire, PDirection::Implicit, Some((0, 7)))],
        ));
        table.add_root(name);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = crate::scope_builder::build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY).unwrap();
        elaborate_signals(&mut ctx);

        let scope = &ctx.design.scopes[scope_id];
        let bus_name = interner.get_or_intern("bus");
        let sig = &scope.signals[find_signal(scope, bus_name).unwrap()];
        assert_eq!(sig.width, 8);
        assert!(!sig.msb_gt_lsb);
    }

    #[test]
    fn duplicate_signal_name_errors() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();
        let mut table = PFormTable::new();
        let name = interner.get_or_intern("top");
        table.insert_module(template_with(
            &interner,
            "top",
            vec![signal_decl(&interner, "a", PNetKind::Wire, PDirection::Input, None)],
            vec![signal_decl(&interner, "a", PNetKind::Wire, PDirection::Implicit, None)],
        ));
        table.add_root(name);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        crate::scope_builder::build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY).unwrap();
        elaborate_signals(&mut ctx);

        assert!(sink.has_errors());
    }

    #[test]
    fn integer_without_range_defaults_to_32_bits_signed() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();
        let mut table = PFormTable::new();
        let name = interner.get_or_intern("top");
        table.insert_module(template_with(
            &interner,
            "top",
            Vec::new(),
            vec![signal_decl(&interner, "count", PNetKind::Integer, PDirection::Implicit, None)],
        ));
        table.add_root(name);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = crate::scope_builder::build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY).unwrap();
        elaborate_signals(&mut ctx);

        let scope = &ctx.design.scopes[scope_id];
        let count_name = interner.get_or_intern("count");
        let sig = &scope.signals[find_signal(scope, count_name).unwrap()];
        assert_eq!(sig.width, 32);
        assert!(sig.signed);
    }

    #[test]
    fn real_signal_gets_real_value_kind() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();
        let mut table = PFormTable::new();
        let name = interner.get_or_intern("top");
        table.insert_module(template_with(
            &interner,
            "top",
            Vec::new(),
            vec![signal_decl(&interner, "r", PNetKind::Real, PDirection::Implicit, None)],
        ));
        table.add_root(name);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = crate::scope_builder::build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY).unwrap();
        elaborate_signals(&mut ctx);

        let scope = &ctx.design.scopes[scope_id];
        let r_name = interner.get_or_intern("r");
        let sig = &scope.signals[find_signal(scope, r_name).unwrap()];
        assert_eq!(sig.value_kind, ValueKind::Real);
    }

    #[test]
    fn each_signal_gets_its_own_net_cell_and_nexus() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();
        let mut table = PFormTable::new();
        let name = interner.get_or_intern("top");
        table.insert_module(template_with(
            &interner,
            "top",
            Vec::new(),
            vec![
                signal_decl(&interner, "a", PNetKind::Wire, PDirection::Implicit, None),
                signal_decl(&interner, "b", PNetKind::Wire, PDirection::Implicit, None),
            ],
        ));
        table.add_root(name);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = crate::scope_builder::build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY).unwrap();
        elaborate_signals(&mut ctx);

        let scope = &ctx.design.scopes[scope_id];
        assert_eq!(scope.cells.len(), 2);
        let a_name = interner.get_or_intern("a");
        let b_name = interner.get_or_intern("b");
        let a = &scope.signals[find_signal(scope, a_name).unwrap()];
        let b = &scope.signals[find_signal(scope, b_name).unwrap()];
        assert_ne!(a.net_cell, b.net_cell);
    }

    #[test]
    fn implicit_port_direction_errors() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();
        let mut table = PFormTable::new();
        let name = interner.get_or_intern("top");
        table.insert_module(template_with(
            &interner,
            "top",
            vec![signal_decl(&interner, "p", PNetKind::Wire, PDirection::Implicit, None)],
            Vec::new(),
        ));
        table.add_root(name);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        crate::scope_builder::build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY).unwrap();
        elaborate_signals(&mut ctx);

        assert!(sink.has_errors());
    }

    #[test]
    fn implicit_net_warns_by_default() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();
        let mut table = PFormTable::new();
        let name = interner.get_or_intern("top");
        table.insert_module(template_with(&interner, "top", Vec::new(), Vec::new()));
        table.add_root(name);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = crate::scope_builder::build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY).unwrap();
        let implicit_name = interner.get_or_intern("stray");
        implicit_net(&mut ctx, scope_id, implicit_name, Span::DUMMY);

        assert!(!sink.has_errors());
        assert_eq!(ctx.design.scopes[scope_id].signals.len(), 1);
    }

    #[test]
    fn implicit_net_errors_under_error_implicit_flag() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();
        let mut table = PFormTable::new();
        let name = interner.get_or_intern("top");
        table.insert_module(template_with(&interner, "top", Vec::new(), Vec::new()));
        table.add_root(name);

        let mut flags = CompilerFlags::default();
        flags.error_implicit = true;
        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, flags);
        let scope_id = crate::scope_builder::build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY).unwrap();
        let implicit_name = interner.get_or_intern("stray");
        implicit_net(&mut ctx, scope_id, implicit_name, Span::DUMMY);

        assert!(sink.has_errors());
    }
}
