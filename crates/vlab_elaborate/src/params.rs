//! Parameter and `defparam` resolution (§4.2).
//!
//! Parameters are evaluated once, at scope-construction time, against an
//! environment built incrementally from earlier parameters declared in the
//! same template (so `parameter B = A * 2` sees `A`'s already-folded value).
//! `defparam`s are applied afterward, in one pass over the fully built scope
//! tree: because every scope already exists by then, there is no need to
//! retry unresolved targets against scopes that haven't been built yet — a
//! single walk resolving each dotted path against `Scope::children` is
//! enough, with genuinely dangling targets reported once at the end.

use vlab_common::{Ident, Interner};
use vlab_diagnostics::DiagnosticSink;
use vlab_ir::{ConstValue, ScopeId};
use vlab_pform::{PModuleTemplate, PSpecparamDecl};

use crate::const_eval::{eval_const_expr, ConstEnv};
use crate::context::{ElaborationContext, ScopeContent};
use crate::errors;

/// Evaluates a module template's own `parameter` declarations to constant
/// values, honoring any overrides supplied by the instantiating context.
///
/// `overrides` binds port-parameter names to already-evaluated values (the
/// instantiator's own parameter environment has already folded the override
/// expressions). `local` parameters ignore overrides entirely — Verilog
/// forbids overriding a `localparam`.
pub fn evaluate_parameters(
    template: &PModuleTemplate,
    overrides: &[(Ident, ConstValue)],
    sink: &DiagnosticSink,
    interner: &Interner,
) -> Vec<(Ident, ConstValue)> {
    let mut env = ConstEnv::new();
    let mut resolved = Vec::with_capacity(template.parameters.len());

    for decl in &template.parameters {
        let overridden = if decl.is_local {
            None
        } else {
            overrides.iter().find(|(name, _)| *name == decl.name)
        };

        let value = match overridden {
            Some((_, v)) => v.clone(),
            None => eval_const_expr(&decl.default, &env, sink, interner)
                .unwrap_or(ConstValue::Int(0)),
        };

        env.insert(decl.name, value.clone());
        resolved.push((decl.name, value));
    }

    resolved
}

/// Evaluates a module template's `specparam` declarations against an
/// already-resolved parameter environment.
pub fn evaluate_specparams(
    specparams: &[PSpecparamDecl],
    param_env: &ConstEnv,
    sink: &DiagnosticSink,
    interner: &Interner,
) -> Vec<(Ident, ConstValue)> {
    let mut env = param_env.clone();
    let mut resolved = Vec::with_capacity(specparams.len());
    for decl in specparams {
        let value =
            eval_const_expr(&decl.value, &env, sink, interner).unwrap_or(ConstValue::Int(0));
        env.insert(decl.name, value.clone());
        resolved.push((decl.name, value));
    }
    resolved
}

/// Applies every `defparam` recorded against every built module scope.
///
/// Must run after the whole scope tree has been constructed: a `defparam`'s
/// target path is resolved by walking `Scope::children` from the scope that
/// declared the `defparam`, so every intermediate instance along the path
/// has to already exist.
pub fn apply_defparams(ctx: &mut ElaborationContext<'_>) {
    let scope_ids: Vec<ScopeId> = ctx.design.scopes.iter().map(|(id, _)| id).collect();
    let mut misses = Vec::new();

    for scope_id in scope_ids {
        let defparams = match ctx.scope_content.get(&scope_id) {
            Some(ScopeContent::Module(tmpl)) if !tmpl.defparams.is_empty() => {
                tmpl.defparams.clone()
            }
            _ => continue,
        };

        let env: ConstEnv = ctx.design.scopes[scope_id]
            .parameters
            .iter()
            .map(|(name, entry)| (*name, entry.value.clone()))
            .collect();

        for dp in &defparams {
            match resolve_target(ctx, scope_id, &dp.target_path) {
                Some((target_scope, param_name)) => {
                    let value = eval_const_expr(&dp.value, &env, ctx.sink, ctx.interner);
                    match value {
                        Some(value) => {
                            if let Some(entry) =
                                ctx.design.scopes[target_scope].parameters.get_mut(&param_name)
                            {
                                entry.value = value;
                            } else {
                                misses.push((dp.target_path.clone(), dp.span));
                            }
                        }
                        None => {}
                    }
                }
                None => misses.push((dp.target_path.clone(), dp.span)),
            }
        }
    }

    for (path, span) in misses {
        let rendered = path
            .iter()
            .map(|ident| ctx.interner.resolve(*ident))
            .collect::<Vec<_>>()
            .join(".");
        ctx.sink.emit(errors::error_defparam_target_not_found(&rendered, span));
    }
}

/// Resolves a `defparam` target path, descending through named child
/// instances and landing on the final component as the parameter name.
/// Arrayed instances resolve to their first element — a deliberate
/// simplification, since `defparam` into a specific array element by index
/// is rarely used and not otherwise modeled in the scope tree.
fn resolve_target(
    ctx: &ElaborationContext<'_>,
    from: ScopeId,
    path: &[Ident],
) -> Option<(ScopeId, Ident)> {
    let (last, prefix) = path.split_last()?;
    let mut current = from;
    for component in prefix {
        let children = &ctx.design.scopes[current].children;
        current = *children.get(component)?.first()?;
    }
    Some((current, *last))
}
