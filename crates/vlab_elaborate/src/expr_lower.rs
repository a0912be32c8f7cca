//! Shared expression/l-value lowering used by both the structural and
//! behavioral elaborators.
//!
//! Identifier resolution walks outward from the reference's own scope: a
//! parameter/specparam entry, then a materialized signal, then (for a
//! net-typed read/write position) an on-demand implicit wire.

use vlab_common::{Ident, LogicVec};
use vlab_ir::{
    BinaryOp, CallTarget, ConstValue, Expr, ReductionOp, ScopeId, Signal, SignalId, SignalRef,
    UnaryOp, ValueKind,
};
use vlab_pform::{self as pform, PExpr};
use vlab_source::Span;

use crate::const_eval::{const_to_i64, eval_const_expr, ConstEnv};
use crate::context::{ElaborationContext, ScopeContent};
use crate::errors;
use crate::signals::{find_signal, implicit_net};

/// Walks a scope's parent chain looking for a parameter, specparam, or
/// signal named `name`. Does not create anything.
fn resolve_existing(
    ctx: &ElaborationContext<'_>,
    scope_id: ScopeId,
    name: Ident,
) -> Option<ResolvedIdent> {
    let mut current = Some(scope_id);
    while let Some(id) = current {
        let scope = &ctx.design.scopes[id];
        if let Some(entry) = scope.parameters.get(&name).or_else(|| scope.specparams.get(&name)) {
            return Some(ResolvedIdent::Const(entry.value.clone()));
        }
        if let Some(signal_id) = find_signal(scope, name) {
            return Some(ResolvedIdent::Signal(id, signal_id));
        }
        current = scope.parent;
    }
    None
}

enum ResolvedIdent {
    Const(ConstValue),
    Signal(ScopeId, SignalId),
}

/// Finds the scope that owns a task or function declaration named `name`,
/// searching outward from `scope_id`.
pub(crate) fn resolve_task_or_function_owner(
    ctx: &ElaborationContext<'_>,
    scope_id: ScopeId,
    name: Ident,
) -> Option<ScopeId> {
    let mut current = Some(scope_id);
    while let Some(id) = current {
        let has_it = match ctx.scope_content.get(&id) {
            Some(ScopeContent::Module(tmpl)) => {
                tmpl.tasks.iter().any(|t| t.name == name)
                    || tmpl.functions.iter().any(|f| f.name == name)
            }
            Some(ScopeContent::Task(_)) | Some(ScopeContent::Function(_)) | Some(ScopeContent::Generate(_)) | None => false,
        };
        if has_it {
            return Some(id);
        }
        current = ctx.design.scopes[id].parent;
    }
    None
}

fn signal_expr(scope_id: ScopeId, signal: &Signal, span: Span) -> Expr {
    let _ = scope_id;
    Expr::SignalRef {
        signal: signal.id,
        word_index: None,
        part_offset: None,
        part_width: None,
        mux_select: None,
        width: signal.width,
        signed: signal.signed,
        value_kind: signal.value_kind,
        span,
    }
}

fn const_value_expr(value: ConstValue, span: Span) -> Expr {
    match value {
        ConstValue::Int(n) => Expr::ConstVector {
            value: LogicVec::from_u64(n as u64, 32),
            signed: true,
            span,
        },
        ConstValue::Real(r) => Expr::ConstReal { value: r, span },
        ConstValue::Logic(v) => Expr::ConstVector {
            value: v,
            signed: false,
            span,
        },
        ConstValue::Bool(b) => Expr::ConstVector {
            value: LogicVec::from_bool(b),
            signed: false,
            span,
        },
        ConstValue::String(_) => Expr::ConstVector {
            value: LogicVec::all_zero(32),
            signed: false,
            span,
        },
    }
}

/// Resolves a bare identifier to an expression, auto-creating an implicit
/// 1-bit wire if nothing named `name` is in scope (§4.4.1's implicit-net rule).
fn lower_ident(ctx: &mut ElaborationContext<'_>, scope_id: ScopeId, name: Ident, span: Span) -> Expr {
    match resolve_existing(ctx, scope_id, name) {
        Some(ResolvedIdent::Const(value)) => const_value_expr(value, span),
        Some(ResolvedIdent::Signal(owner, signal_id)) => {
            let signal = &ctx.design.scopes[owner].signals[signal_id];
            signal_expr(owner, signal, span)
        }
        None => {
            let signal_id = implicit_net(ctx, scope_id, name, span);
            let signal = &ctx.design.scopes[scope_id].signals[signal_id];
            signal_expr(scope_id, signal, span)
        }
    }
}

fn map_binary_op(op: pform::BinaryOp) -> BinaryOp {
    use pform::BinaryOp as P;
    match op {
        P::Add => BinaryOp::Add,
        P::Sub => BinaryOp::Sub,
        P::Mul => BinaryOp::Mul,
        P::Div => BinaryOp::Div,
        P::Mod => BinaryOp::Mod,
        P::Pow => BinaryOp::Pow,
        P::And => BinaryOp::And,
        P::Or => BinaryOp::Or,
        P::Xor => BinaryOp::Xor,
        P::Xnor => BinaryOp::Xnor,
        P::Shl | P::Ashl => BinaryOp::Shl,
        P::Shr => BinaryOp::ShrLogical,
        P::Ashr => BinaryOp::ShrArith,
        P::Eq => BinaryOp::Eq,
        P::Ne => BinaryOp::Ne,
        P::CaseEq => BinaryOp::CaseEq,
        P::CaseNe => BinaryOp::CaseNe,
        P::Lt => BinaryOp::Lt,
        P::Le => BinaryOp::Le,
        P::Gt => BinaryOp::Gt,
        P::Ge => BinaryOp::Ge,
        P::LogicAnd => BinaryOp::LogicAnd,
        P::LogicOr => BinaryOp::LogicOr,
        P::Min => BinaryOp::Min,
        P::Max => BinaryOp::Max,
    }
}

fn is_comparison(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::CaseEq
            | BinaryOp::CaseNe
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::LogicAnd
            | BinaryOp::LogicOr
    )
}

/// Lowers one PForm expression to its elaborated counterpart, sizing every
/// node per the language's self/context-determined width rules.
pub(crate) fn lower_expr(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    expr: &PExpr,
) -> Expr {
    match expr {
        PExpr::Literal { value, signed, span } => Expr::ConstVector {
            value: value.clone(),
            signed: *signed,
            span: *span,
        },
        PExpr::RealLiteral { value, span } => Expr::ConstReal {
            value: *value,
            span: *span,
        },
        PExpr::Ident { name, span } => lower_ident(ctx, scope_id, *name, *span),
        PExpr::ScopePath { path, span } => {
            // Hierarchical reads resolve the same way a defparam target
            // does: walk down from the current scope by child name.
            match resolve_scope_path(ctx, scope_id, path) {
                Some((owner, name)) => lower_ident(ctx, owner, name, *span),
                None => {
                    ctx.sink.emit(errors::error_unknown_signal(
                        &path
                            .iter()
                            .map(|p| ctx.interner.resolve(*p))
                            .collect::<Vec<_>>()
                            .join("."),
                        *span,
                    ));
                    Expr::ConstVector {
                        value: LogicVec::all_zero(1),
                        signed: false,
                        span: *span,
                    }
                }
            }
        }
        PExpr::Index { base, index, span } => {
            lower_index(ctx, scope_id, env, base, index, *span)
        }
        PExpr::PartSelect { base, msb, lsb, span } => {
            lower_part_select(ctx, scope_id, env, base, msb, lsb, *span)
        }
        PExpr::IndexedPartSelect {
            base,
            index,
            width,
            ascending,
            span,
        } => lower_indexed_part_select(ctx, scope_id, env, base, index, *width, *ascending, *span),
        PExpr::Unary { op, operand, span } => lower_unary(ctx, scope_id, env, *op, operand, *span),
        PExpr::Binary { left, op, right, span } => {
            let lhs = lower_expr(ctx, scope_id, env, left);
            let rhs = lower_expr(ctx, scope_id, env, right);
            let ir_op = map_binary_op(*op);
            let real = matches!(lhs, Expr::ConstReal { .. }) || matches!(rhs, Expr::ConstReal { .. });
            if is_comparison(ir_op) {
                Expr::Binary {
                    op: ir_op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    width: 1,
                    signed: false,
                    value_kind: ValueKind::BoolVector,
                    span: *span,
                }
            } else {
                let width = lhs.width().max(rhs.width()).max(1);
                let signed = expr_signed(&lhs) && expr_signed(&rhs);
                Expr::Binary {
                    op: ir_op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    width,
                    signed,
                    value_kind: if real { ValueKind::Real } else { ValueKind::LogicVector },
                    span: *span,
                }
            }
        }
        PExpr::Ternary {
            cond,
            if_true,
            if_false,
            span,
        } => {
            let cond_e = lower_expr(ctx, scope_id, env, cond);
            let true_e = lower_expr(ctx, scope_id, env, if_true);
            let false_e = lower_expr(ctx, scope_id, env, if_false);
            let width = true_e.width().max(false_e.width()).max(1);
            let signed = expr_signed(&true_e) && expr_signed(&false_e);
            Expr::Ternary {
                cond: Box::new(cond_e),
                true_val: Box::new(true_e),
                false_val: Box::new(false_e),
                width,
                signed,
                span: *span,
            }
        }
        PExpr::Concat { elements, span } => {
            let parts: Vec<Expr> = elements.iter().map(|e| lower_expr(ctx, scope_id, env, e)).collect();
            let width = parts.iter().map(Expr::width).sum();
            Expr::Concat {
                parts,
                width,
                span: *span,
            }
        }
        PExpr::Replicate { count, value, span } => {
            let count = match eval_const_expr(count, env, ctx.sink, ctx.interner).and_then(|v| const_to_i64(&v)) {
                Some(n) if n >= 0 => n as u32,
                _ => {
                    ctx.sink.emit(errors::error_param_not_const(
                        "replication count must be a non-negative constant",
                        *span,
                    ));
                    0
                }
            };
            let operand = lower_expr(ctx, scope_id, env, value);
            let width = count * operand.width();
            Expr::Replicate {
                operand: Box::new(operand),
                count,
                width,
                span: *span,
            }
        }
        PExpr::Call { name, args, span } => {
            let lowered_args: Vec<Expr> = args.iter().map(|a| lower_expr(ctx, scope_id, env, a)).collect();
            let callee_scope = resolve_task_or_function_owner(ctx, scope_id, *name).unwrap_or(scope_id);
            let width = lowered_args.first().map(Expr::width).unwrap_or(32);
            Expr::Call {
                callee: CallTarget::User {
                    scope: callee_scope,
                    name: *name,
                },
                args: lowered_args,
                width,
                signed: false,
                value_kind: ValueKind::LogicVector,
                span: *span,
            }
        }
        PExpr::SystemCall { name, args, span } => {
            let lowered_args: Vec<Expr> = args.iter().map(|a| lower_expr(ctx, scope_id, env, a)).collect();
            let width = lowered_args.first().map(Expr::width).unwrap_or(32);
            Expr::Call {
                callee: CallTarget::System { name: *name },
                args: lowered_args,
                width,
                signed: false,
                value_kind: ValueKind::LogicVector,
                span: *span,
            }
        }
        PExpr::Error { span } => Expr::ConstVector {
            value: LogicVec::all_zero(1),
            signed: false,
            span: *span,
        },
    }
}

fn expr_signed(expr: &Expr) -> bool {
    match expr {
        Expr::ConstVector { signed, .. }
        | Expr::SignalRef { signed, .. }
        | Expr::Unary { signed, .. }
        | Expr::Binary { signed, .. }
        | Expr::Ternary { signed, .. } => *signed,
        _ => false,
    }
}

fn lower_unary(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    op: pform::UnaryOp,
    operand: &PExpr,
    span: Span,
) -> Expr {
    use pform::UnaryOp as P;
    let lowered = lower_expr(ctx, scope_id, env, operand);
    match op {
        P::Minus => {
            let width = lowered.width().max(1);
            let signed = expr_signed(&lowered);
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(lowered),
                width,
                signed,
                span,
            }
        }
        P::BitNot => {
            let width = lowered.width().max(1);
            let signed = expr_signed(&lowered);
            Expr::Unary {
                op: UnaryOp::BitNot,
                operand: Box::new(lowered),
                width,
                signed,
                span,
            }
        }
        P::LogicNot => Expr::Unary {
            op: UnaryOp::LogicNot,
            operand: Box::new(lowered),
            width: 1,
            signed: false,
            span,
        },
        P::RedAnd => Expr::Reduction {
            op: ReductionOp::And,
            operand: Box::new(lowered),
            span,
        },
        P::RedNand => Expr::Reduction {
            op: ReductionOp::Nand,
            operand: Box::new(lowered),
            span,
        },
        P::RedOr => Expr::Reduction {
            op: ReductionOp::Or,
            operand: Box::new(lowered),
            span,
        },
        P::RedNor => Expr::Reduction {
            op: ReductionOp::Nor,
            operand: Box::new(lowered),
            span,
        },
        P::RedXor => Expr::Reduction {
            op: ReductionOp::Xor,
            operand: Box::new(lowered),
            span,
        },
        P::RedXnor => Expr::Reduction {
            op: ReductionOp::Xnor,
            operand: Box::new(lowered),
            span,
        },
    }
}

fn lower_index(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    base: &PExpr,
    index: &PExpr,
    span: Span,
) -> Expr {
    let PExpr::Ident { name, .. } = base else {
        ctx.sink.emit(errors::error_unsupported("bit-select of a non-identifier base", span));
        return Expr::ConstVector {
            value: LogicVec::all_zero(1),
            signed: false,
            span,
        };
    };
    let signal_id = match resolve_existing(ctx, scope_id, *name) {
        Some(ResolvedIdent::Signal(owner, id)) => (owner, id),
        _ => {
            let id = implicit_net(ctx, scope_id, *name, span);
            (scope_id, id)
        }
    };
    let index_expr = lower_expr(ctx, scope_id, env, index);
    let const_index = eval_const_expr(index, env, ctx.sink, ctx.interner).and_then(|v| const_to_i64(&v));
    let (owner, signal_id) = signal_id;
    let signal = &ctx.design.scopes[owner].signals[signal_id];
    let (part_offset, mux_select) = match const_index {
        Some(i) => (Some(Box::new(Expr::ConstVector {
            value: LogicVec::from_u64(i as u64, 32),
            signed: false,
            span,
        })), None),
        None => (None, Some(Box::new(index_expr))),
    };
    Expr::SignalRef {
        signal: signal_id,
        word_index: None,
        part_offset,
        part_width: Some(1),
        mux_select,
        width: 1,
        signed: false,
        value_kind: signal.value_kind,
        span,
    }
}

fn lower_part_select(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    base: &PExpr,
    msb: &PExpr,
    lsb: &PExpr,
    span: Span,
) -> Expr {
    let PExpr::Ident { name, .. } = base else {
        ctx.sink.emit(errors::error_unsupported("part-select of a non-identifier base", span));
        return Expr::ConstVector {
            value: LogicVec::all_zero(1),
            signed: false,
            span,
        };
    };
    let msb_v = eval_const_expr(msb, env, ctx.sink, ctx.interner).and_then(|v| const_to_i64(&v));
    let lsb_v = eval_const_expr(lsb, env, ctx.sink, ctx.interner).and_then(|v| const_to_i64(&v));
    let (owner, signal_id) = match resolve_existing(ctx, scope_id, *name) {
        Some(ResolvedIdent::Signal(owner, id)) => (owner, id),
        _ => {
            let id = implicit_net(ctx, scope_id, *name, span);
            (scope_id, id)
        }
    };
    let signal = &ctx.design.scopes[owner].signals[signal_id];
    let value_kind = signal.value_kind;
    match (msb_v, lsb_v) {
        (Some(m), Some(l)) => {
            let lo = m.min(l);
            let width = (m - l).unsigned_abs() as u32 + 1;
            Expr::SignalRef {
                signal: signal_id,
                word_index: None,
                part_offset: Some(Box::new(Expr::ConstVector {
                    value: LogicVec::from_u64(lo as u64, 32),
                    signed: false,
                    span,
                })),
                part_width: Some(width),
                mux_select: None,
                width,
                signed: false,
                value_kind,
                span,
            }
        }
        _ => {
            ctx.sink.emit(errors::error_unsupported("non-constant part-select bounds", span));
            Expr::ConstVector {
                value: LogicVec::all_zero(1),
                signed: false,
                span,
            }
        }
    }
}

fn lower_indexed_part_select(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    base: &PExpr,
    index: &PExpr,
    width: u32,
    ascending: bool,
    span: Span,
) -> Expr {
    let PExpr::Ident { name, .. } = base else {
        ctx.sink.emit(errors::error_unsupported("indexed part-select of a non-identifier base", span));
        return Expr::ConstVector {
            value: LogicVec::all_zero(width.max(1)),
            signed: false,
            span,
        };
    };
    let (owner, signal_id) = match resolve_existing(ctx, scope_id, *name) {
        Some(ResolvedIdent::Signal(owner, id)) => (owner, id),
        _ => {
            let id = implicit_net(ctx, scope_id, *name, span);
            (scope_id, id)
        }
    };
    let signal = &ctx.design.scopes[owner].signals[signal_id];
    let value_kind = signal.value_kind;
    let base_index = lower_expr(ctx, scope_id, env, index);
    let offset = if ascending {
        base_index
    } else {
        Expr::Binary {
            op: BinaryOp::Sub,
            lhs: Box::new(base_index),
            rhs: Box::new(Expr::ConstVector {
                value: LogicVec::from_u64((width.saturating_sub(1)) as u64, 32),
                signed: false,
                span,
            }),
            width: 32,
            signed: false,
            value_kind: ValueKind::LogicVector,
            span,
        }
    };
    Expr::SignalRef {
        signal: signal_id,
        word_index: None,
        part_offset: Some(Box::new(offset)),
        part_width: Some(width),
        mux_select: None,
        width,
        signed: false,
        value_kind,
        span,
    }
}

fn resolve_scope_path(
    ctx: &ElaborationContext<'_>,
    scope_id: ScopeId,
    path: &[Ident],
) -> Option<(ScopeId, Ident)> {
    let (last, init) = path.split_last()?;
    let mut current = scope_id;
    for &segment in init {
        let children = ctx.design.scopes[current].children.get(&segment)?;
        current = *children.first()?;
    }
    Some((current, *last))
}

/// Lowers an l-value expression to a [`SignalRef`], auto-creating an
/// implicit net for an undeclared bare identifier.
pub(crate) fn lower_lvalue(
    ctx: &mut ElaborationContext<'_>,
    scope_id: ScopeId,
    env: &ConstEnv,
    expr: &PExpr,
) -> (SignalRef, u32, bool) {
    match expr {
        PExpr::Ident { name, span } => {
            let (owner, signal_id) = match resolve_existing(ctx, scope_id, *name) {
                Some(ResolvedIdent::Signal(owner, id)) => (owner, id),
                _ => {
                    let id = implicit_net(ctx, scope_id, *name, *span);
                    (scope_id, id)
                }
            };
            let signal = &ctx.design.scopes[owner].signals[signal_id];
            (SignalRef::Signal(signal_id), signal.width, signal.signed)
        }
        PExpr::PartSelect { base, msb, lsb, span } => {
            let PExpr::Ident { name, .. } = base.as_ref() else {
                ctx.sink.emit(errors::error_unsupported("part-select l-value of a non-identifier base", *span));
                return (SignalRef::Const(LogicVec::all_zero(1)), 1, false);
            };
            let msb_v = eval_const_expr(msb, env, ctx.sink, ctx.interner).and_then(|v| const_to_i64(&v));
            let lsb_v = eval_const_expr(lsb, env, ctx.sink, ctx.interner).and_then(|v| const_to_i64(&v));
            let (owner, signal_id) = match resolve_existing(ctx, scope_id, *name) {
                Some(ResolvedIdent::Signal(owner, id)) => (owner, id),
                _ => {
                    let id = implicit_net(ctx, scope_id, *name, *span);
                    (scope_id, id)
                }
            };
            match (msb_v, lsb_v) {
                (Some(m), Some(l)) => {
                    let high = m.max(l) as u32;
                    let low = m.min(l) as u32;
                    (
                        SignalRef::Slice {
                            signal: signal_id,
                            high,
                            low,
                        },
                        high - low + 1,
                        false,
                    )
                }
                _ => {
                    ctx.sink.emit(errors::error_unsupported("non-constant part-select l-value", *span));
                    let signal = &ctx.design.scopes[owner].signals[signal_id];
                    (SignalRef::Signal(signal_id), signal.width, signal.signed)
                }
            }
        }
        PExpr::Index { base, index, span } => {
            let PExpr::Ident { name, .. } = base.as_ref() else {
                ctx.sink.emit(errors::error_unsupported("bit-select l-value of a non-identifier base", *span));
                return (SignalRef::Const(LogicVec::all_zero(1)), 1, false);
            };
            let idx = eval_const_expr(index, env, ctx.sink, ctx.interner).and_then(|v| const_to_i64(&v));
            let (owner, signal_id) = match resolve_existing(ctx, scope_id, *name) {
                Some(ResolvedIdent::Signal(owner, id)) => (owner, id),
                _ => {
                    let id = implicit_net(ctx, scope_id, *name, *span);
                    (scope_id, id)
                }
            };
            match idx {
                Some(i) => (
                    SignalRef::Slice {
                        signal: signal_id,
                        high: i as u32,
                        low: i as u32,
                    },
                    1,
                    false,
                ),
                None => {
                    ctx.sink.emit(errors::error_unsupported("non-constant bit-select l-value", *span));
                    let signal = &ctx.design.scopes[owner].signals[signal_id];
                    (SignalRef::Signal(signal_id), signal.width, signal.signed)
                }
            }
        }
        PExpr::Concat { elements, .. } => {
            let mut parts = Vec::with_capacity(elements.len());
            let mut total = 0;
            for e in elements {
                let (part, width, _) = lower_lvalue(ctx, scope_id, env, e);
                total += width;
                parts.push(part);
            }
            (SignalRef::Concat(parts), total, false)
        }
        other => {
            ctx.sink.emit(errors::error_unsupported("expression is not a valid l-value", other.span()));
            (SignalRef::Const(LogicVec::all_zero(1)), 1, false)
        }
    }
}
