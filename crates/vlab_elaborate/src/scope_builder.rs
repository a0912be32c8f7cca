//! Scope-tree construction: module instantiation and generate expansion
//! (§4.1 of the elaboration design).
//!
//! Rather than the literal two-level work-list (`elaborate_scope_of` /
//! `run_top_defparams` / `run_later_defparams` batches), this builder walks
//! the instance/generate tree directly and recursively: a module's own
//! parameters are fully resolved before its children are built, so there is
//! never a child waiting on a not-yet-computed parent value. `defparam`
//! application is left to [`crate::params::apply_defparams`], which runs as
//! a separate pass once the whole tree exists.

use std::collections::HashMap;

use vlab_common::Ident;
use vlab_ir::{ConstValue, ParamEntry, Scope, ScopeId, ScopeKind, Type, TypeId};
use vlab_pform::table::PFormEntry;
use vlab_pform::{
    PExpr, PFunctionDecl, PGenerateBody, PGenerateScheme, PModuleInstance, PModuleTemplate,
    PNetKind, PParamOverrides, PTaskDecl,
};
use vlab_source::Span;

use crate::const_eval::{const_to_i64, eval_const_expr, eval_range, ConstEnv};
use crate::context::{ElaborationContext, ScopeContent};
use crate::errors;
use crate::params;

/// Safety bound on `generate for` iteration count, guarding against a
/// malformed or adversarial genvar step that never reaches the loop bound.
const MAX_GENERATE_ITERATIONS: i64 = 1 << 20;

/// Builds the scope for one module instantiation (or a declared root).
///
/// Returns `None` both when `type_name` is genuinely unknown (an `E206`
/// diagnostic is emitted) and when it resolves to a primitive rather than a
/// module (no diagnostic — the structural elaborator instantiates UDPs
/// directly from the parent's instance list without a scope of their own).
pub fn build_module_scope(
    ctx: &mut ElaborationContext<'_>,
    type_name: Ident,
    local_name: Ident,
    overrides: &[(Ident, ConstValue)],
    parent: Option<ScopeId>,
    span: Span,
) -> Option<ScopeId> {
    if !ctx.push_elab_stack(type_name, span) {
        return None;
    }

    let template = match ctx.table.lookup(type_name, ctx.loader) {
        Some(PFormEntry::Module(m)) => m.clone(),
        Some(PFormEntry::Primitive(_)) => {
            ctx.pop_elab_stack();
            return None;
        }
        None => {
            ctx.sink.emit(errors::error_unknown_module(
                ctx.interner.resolve(type_name),
                span,
            ));
            ctx.pop_elab_stack();
            return None;
        }
    };

    let resolved_params = match ctx.check_cache(type_name, overrides) {
        Some(cached) => cached.to_vec(),
        None => {
            let resolved =
                params::evaluate_parameters(&template, overrides, ctx.sink, ctx.interner);
            ctx.insert_cache(type_name, overrides, resolved.clone());
            resolved
        }
    };

    let param_env: ConstEnv = resolved_params.iter().cloned().collect();
    let specparams =
        params::evaluate_specparams(&template.specparams, &param_env, ctx.sink, ctx.interner);

    let scope_id = alloc_scope(
        ctx,
        parent,
        ScopeKind::Module,
        local_name,
        &resolved_params,
        &specparams,
        template.time_unit,
        template.time_precision,
        template.default_net_kind,
        span,
    );

    if let Some(parent_id) = parent {
        ctx.design.scopes[parent_id]
            .children
            .entry(local_name)
            .or_default()
            .push(scope_id);
    }

    build_instances(ctx, scope_id, &template.instances, &param_env);
    build_generates(ctx, scope_id, &template.generates, &param_env);
    build_tasks_and_functions(ctx, scope_id, &template.tasks, &template.functions);

    ctx.scope_content
        .insert(scope_id, ScopeContent::Module(Box::new(template)));
    ctx.pop_elab_stack();
    Some(scope_id)
}

/// Allocates a fresh, mostly-empty scope. Signals, cells, and processes are
/// filled in by the later elaboration phases; only the parameter tables are
/// populated here, since they're known at scope-construction time.
#[allow(clippy::too_many_arguments)]
pub(crate) fn alloc_scope(
    ctx: &mut ElaborationContext<'_>,
    parent: Option<ScopeId>,
    kind: ScopeKind,
    name: Ident,
    resolved_params: &[(Ident, ConstValue)],
    specparams: &[(Ident, ConstValue)],
    time_unit: i32,
    time_precision: i32,
    default_net_kind: Option<PNetKind>,
    span: Span,
) -> ScopeId {
    let mut parameters = HashMap::new();
    for (pname, value) in resolved_params {
        let ty = type_for_const(ctx, value);
        parameters.insert(
            *pname,
            ParamEntry {
                ty,
                value: value.clone(),
                span,
            },
        );
    }

    let mut specparam_table = HashMap::new();
    for (pname, value) in specparams {
        let ty = type_for_const(ctx, value);
        specparam_table.insert(
            *pname,
            ParamEntry {
                ty,
                value: value.clone(),
                span,
            },
        );
    }

    let predicted_id = ScopeId::from_raw(ctx.design.scopes.len() as u32);
    let scope = Scope {
        id: predicted_id,
        parent,
        children: HashMap::new(),
        kind,
        name,
        parameters,
        specparams: specparam_table,
        signals: Default::default(),
        ports: Vec::new(),
        cells: Default::default(),
        processes: Default::default(),
        events: Vec::new(),
        tasks: Vec::new(),
        functions: Vec::new(),
        next_local_symbol: 0,
        time_unit,
        time_precision,
        default_net_kind,
        span,
    };

    let allocated = ctx.design.scopes.alloc(scope);
    debug_assert_eq!(allocated, predicted_id);
    allocated
}

fn type_for_const(ctx: &mut ElaborationContext<'_>, value: &ConstValue) -> TypeId {
    let ty = match value {
        ConstValue::Int(_) => Type::Integer,
        ConstValue::Real(_) => Type::Real,
        ConstValue::Bool(_) => Type::BitVec {
            width: 1,
            signed: false,
        },
        ConstValue::Logic(lv) => Type::BitVec {
            width: lv.width(),
            signed: false,
        },
        ConstValue::String(_) => Type::Error,
    };
    ctx.types().intern(ty)
}

/// Copies a scope's ambient (non-scope-identity) fields, for building
/// child scopes (generate blocks, tasks, functions) that inherit them.
pub(crate) struct Ambient {
    pub(crate) time_unit: i32,
    pub(crate) time_precision: i32,
    pub(crate) default_net_kind: Option<PNetKind>,
}

pub(crate) fn ambient_of(ctx: &ElaborationContext<'_>, scope_id: ScopeId) -> Ambient {
    let scope = &ctx.design.scopes[scope_id];
    Ambient {
        time_unit: scope.time_unit,
        time_precision: scope.time_precision,
        default_net_kind: scope.default_net_kind,
    }
}

fn build_instances(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    instances: &[PModuleInstance],
    env: &ConstEnv,
) {
    for inst in instances {
        let overrides = resolve_overrides(ctx, inst, env);
        let count = instance_count(ctx, inst, env);
        for _ in 0..count {
            build_module_scope(
                ctx,
                inst.type_name,
                inst.instance_name,
                &overrides,
                Some(scope_id),
                inst.span,
            );
        }
    }
}

fn resolve_overrides(
    ctx: &mut ElaborationContext<'_>,
    inst: &PModuleInstance,
    env: &ConstEnv,
) -> Vec<(Ident, ConstValue)> {
    match &inst.param_overrides {
        PParamOverrides::None => Vec::new(),
        PParamOverrides::ByName(pairs) => pairs
            .iter()
            .filter_map(|(name, expr)| {
                eval_const_expr(expr, env, ctx.sink, ctx.interner).map(|v| (*name, v))
            })
            .collect(),
        PParamOverrides::Positional(exprs) => {
            let port_param_names: Vec<Ident> = match ctx.table.lookup(inst.type_name, ctx.loader) {
                Some(PFormEntry::Module(m)) => m
                    .parameters
                    .iter()
                    .filter(|p| p.is_port_param && !p.is_local)
                    .map(|p| p.name)
                    .collect(),
                _ => Vec::new(),
            };
            exprs
                .iter()
                .zip(port_param_names.iter())
                .filter_map(|(expr, name)| {
                    eval_const_expr(expr, env, ctx.sink, ctx.interner).map(|v| (*name, v))
                })
                .collect()
        }
    }
}

fn instance_count(ctx: &mut ElaborationContext<'_>, inst: &PModuleInstance, env: &ConstEnv) -> i64 {
    match &inst.range {
        None => 1,
        Some(range) => match eval_range(range, env, ctx.sink, ctx.interner) {
            Some((msb, lsb)) => (msb - lsb).unsigned_abs() as i64 + 1,
            None => 1,
        },
    }
}

fn build_generates(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    schemes: &[PGenerateScheme],
    env: &ConstEnv,
) {
    for scheme in schemes {
        match scheme {
            PGenerateScheme::For {
                block_name,
                genvar,
                init,
                cond,
                step,
                body,
                span,
            } => build_generate_for(
                ctx, scope_id, *block_name, *genvar, init, cond, step, body, env, *span,
            ),
            PGenerateScheme::If {
                block_name,
                cond,
                then_body,
                else_body,
                span,
            } => {
                let taken = eval_const_expr(cond, env, ctx.sink, ctx.interner)
                    .and_then(|v| const_to_i64(&v))
                    .map(|n| n != 0);
                match taken {
                    Some(true) => {
                        build_generate_block(ctx, scope_id, *block_name, then_body, env, *span)
                    }
                    Some(false) => {
                        if let Some(else_body) = else_body {
                            build_generate_block(ctx, scope_id, *block_name, else_body, env, *span);
                        }
                    }
                    None => {}
                }
            }
            PGenerateScheme::Case {
                block_name,
                selector,
                arms,
                span,
            } => build_generate_case(ctx, scope_id, *block_name, selector, arms, env, *span),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_generate_for(
    ctx: &mut ElaborationContext<'_>,
    parent_scope: ScopeId,
    block_name: Option<Ident>,
    genvar: Ident,
    init: &PExpr,
    cond: &PExpr,
    step: &PExpr,
    body: &PGenerateBody,
    env: &ConstEnv,
    span: Span,
) {
    let mut loop_env = env.clone();
    let Some(init_val) = eval_const_expr(init, &loop_env, ctx.sink, ctx.interner) else {
        return;
    };
    loop_env.insert(genvar, init_val);

    let mut iterations = 0i64;
    loop {
        let keep_going = eval_const_expr(cond, &loop_env, ctx.sink, ctx.interner)
            .and_then(|v| const_to_i64(&v))
            .map(|n| n != 0)
            .unwrap_or(false);
        if !keep_going {
            break;
        }

        build_generate_block(ctx, parent_scope, block_name, body, &loop_env, span);

        let Some(next) = eval_const_expr(step, &loop_env, ctx.sink, ctx.interner) else {
            break;
        };
        loop_env.insert(genvar, next);

        iterations += 1;
        if iterations >= MAX_GENERATE_ITERATIONS {
            break;
        }
    }
}

fn build_generate_case(
    ctx: &mut ElaborationContext<'_>,
    parent_scope: ScopeId,
    block_name: Option<Ident>,
    selector: &PExpr,
    arms: &[(Vec<PExpr>, PGenerateBody)],
    env: &ConstEnv,
    span: Span,
) {
    let Some(selector_val) = eval_const_expr(selector, env, ctx.sink, ctx.interner) else {
        return;
    };

    let mut default_arm = None;
    for (guards, body) in arms {
        if guards.is_empty() {
            default_arm = Some(body);
            continue;
        }
        for guard in guards {
            if let Some(guard_val) = eval_const_expr(guard, env, ctx.sink, ctx.interner) {
                if guard_val == selector_val {
                    build_generate_block(ctx, parent_scope, block_name, body, env, span);
                    return;
                }
            }
        }
    }
    if let Some(body) = default_arm {
        build_generate_block(ctx, parent_scope, block_name, body, env, span);
    }
}

fn build_generate_block(
    ctx: &mut ElaborationContext<'_>,
    parent_scope: ScopeId,
    block_name: Option<Ident>,
    body: &PGenerateBody,
    env: &ConstEnv,
    span: Span,
) {
    let name = match block_name {
        Some(n) => n,
        None => {
            let n = ctx.design.scopes[parent_scope].next_symbol();
            let synth = format!("genblk{n}");
            ctx.interner.get_or_intern(&synth)
        }
    };

    let ambient = ambient_of(ctx, parent_scope);
    let scope_id = alloc_scope(
        ctx,
        Some(parent_scope),
        ScopeKind::GenerateBlock,
        name,
        &[],
        &[],
        ambient.time_unit,
        ambient.time_precision,
        ambient.default_net_kind,
        span,
    );
    ctx.design.scopes[parent_scope]
        .children
        .entry(name)
        .or_default()
        .push(scope_id);

    build_instances(ctx, scope_id, &body.instances, env);
    build_generates(ctx, scope_id, &body.nested, env);

    ctx.scope_content
        .insert(scope_id, ScopeContent::Generate(Box::new(body.clone())));
}

fn build_tasks_and_functions(
    ctx: &mut ElaborationContext<'_>,
    parent_scope: ScopeId,
    tasks: &[PTaskDecl],
    functions: &[PFunctionDecl],
) {
    for task in tasks {
        let ambient = ambient_of(ctx, parent_scope);
        let scope_id = alloc_scope(
            ctx,
            Some(parent_scope),
            ScopeKind::Task,
            task.name,
            &[],
            &[],
            ambient.time_unit,
            ambient.time_precision,
            ambient.default_net_kind,
            task.span,
        );
        ctx.design.scopes[parent_scope]
            .children
            .entry(task.name)
            .or_default()
            .push(scope_id);
        ctx.scope_content
            .insert(scope_id, ScopeContent::Task(Box::new(task.clone())));
    }

    for function in functions {
        let ambient = ambient_of(ctx, parent_scope);
        let scope_id = alloc_scope(
            ctx,
            Some(parent_scope),
            ScopeKind::Function,
            function.name,
            &[],
            &[],
            ambient.time_unit,
            ambient.time_precision,
            ambient.default_net_kind,
            function.span,
        );
        ctx.design.scopes[parent_scope]
            .children
            .entry(function.name)
            .or_default()
            .push(scope_id);
        ctx.scope_content
            .insert(scope_id, ScopeContent::Function(Box::new(function.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_common::{Interner, LogicVec};
    use vlab_config::CompilerFlags;
    use vlab_diagnostics::DiagnosticSink;
    use vlab_pform::{ClosedLoader, PFormTable, PModuleTemplate};

    fn empty_template(interner: &Interner, name: &str) -> PModuleTemplate {
        PModuleTemplate {
            name: interner.get_or_intern(name),
            ports: Vec::new(),
            parameters: Vec::new(),
            specparams: Vec::new(),
            signals: Vec::new(),
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
    fn builds_scope_for_known_root() {
        let mut table = PFormTable::new();
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();

        let name = interner.get_or_intern("top");
        table.insert_module(empty_template(&interner, "top"));
        table.add_root(name);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY);
        assert!(scope_id.is_some());
        assert!(!sink.has_errors());
    }

    #[test]
    fn unknown_root_emits_error() {
        let mut table = PFormTable::new();
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();

        let name = interner.get_or_intern("ghost");
        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = build_module_scope(&mut ctx, name, name, &[], None, Span::DUMMY);
        assert!(scope_id.is_none());
        assert!(sink.has_errors());
    }

    #[test]
    fn child_instance_gets_own_scope() {
        let mut table = PFormTable::new();
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();

        let leaf_name = interner.get_or_intern("leaf");
        let top_name = interner.get_or_intern("top");
        let inst_name = interner.get_or_intern("u0");

        table.insert_module(empty_template(&interner, "leaf"));

        let mut top = empty_template(&interner, "top");
        top.instances.push(PModuleInstance {
            type_name: leaf_name,
            instance_name: inst_name,
            range: None,
            param_overrides: PParamOverrides::None,
            ports: vlab_pform::PortConnections::Positional(Vec::new()),
            delay: None,
            span: Span::DUMMY,
        });
        table.insert_module(top);
        table.add_root(top_name);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let scope_id = build_module_scope(&mut ctx, top_name, top_name, &[], None, Span::DUMMY).unwrap();
        let children = &ctx.design.scopes[scope_id].children[&inst_name];
        assert_eq!(children.len(), 1);
        assert!(!sink.has_errors());
    }

    #[test]
    fn parameter_override_flows_into_child_scope() {
        let mut table = PFormTable::new();
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut loader = ClosedLoader::default();

        let width = interner.get_or_intern("WIDTH");
        let leaf_name = interner.get_or_intern("leaf");

        let mut leaf = empty_template(&interner, "leaf");
        leaf.parameters.push(vlab_pform::PParameterDecl {
            name: width,
            default: PExpr::Literal {
                value: LogicVec::from_u64(1, 32),
                signed: false,
                span: Span::DUMMY,
            },
            is_port_param: true,
            is_local: false,
            span: Span::DUMMY,
        });
        table.insert_module(leaf);

        let mut ctx = ElaborationContext::new(&mut table, &mut loader, &interner, &sink, CompilerFlags::default());
        let overrides = vec![(width, ConstValue::Int(32))];
        let scope_id = build_module_scope(&mut ctx, leaf_name, leaf_name, &overrides, None, Span::DUMMY).unwrap();
        assert_eq!(
            ctx.design.scopes[scope_id].parameters[&width].value,
            ConstValue::Int(32)
        );
    }
}
