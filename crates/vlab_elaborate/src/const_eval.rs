//! Constant expression evaluation for elaboration.
//!
//! Folds PForm expressions to [`ConstValue`] wherever elaboration needs a
//! compile-time value: parameter defaults, `defparam` overrides, gate-array
//! and part-select ranges, delay amounts, and case/condition selectors that
//! happen to be constant (§4.2's "greedy" folding — fold eagerly, and if
//! folding fails leave the expression as a residual to be lowered for
//! run-time evaluation instead).

use std::collections::HashMap;

use vlab_common::{Ident, Interner};
use vlab_diagnostics::DiagnosticSink;
use vlab_ir::ConstValue;
use vlab_pform::{BinaryOp, PExpr, UnaryOp};
use vlab_source::Span;

use crate::errors;

/// A mapping from interned identifiers to their constant values.
///
/// Used during elaboration to track parameter bindings and genvar values so
/// that constant expressions referencing them can be evaluated.
pub type ConstEnv = HashMap<Ident, ConstValue>;

/// Coerces a [`ConstValue`] to an `i64`, if the value can be represented as one.
///
/// - `Int(n)` returns `Some(n)` directly.
/// - `Real(f)` returns `Some(f as i64)` (truncation toward zero).
/// - `Bool(b)` returns `Some(1)` for `true`, `Some(0)` for `false`.
/// - `Logic(v)` returns `Some(n)` if every bit is definite (0/1), `None` otherwise.
/// - `String` has no natural integer mapping and returns `None`.
pub fn const_to_i64(val: &ConstValue) -> Option<i64> {
    match val {
        ConstValue::Int(n) => Some(*n),
        ConstValue::Real(f) => Some(*f as i64),
        ConstValue::Bool(b) => Some(if *b { 1 } else { 0 }),
        ConstValue::Logic(lv) => lv.to_u64().map(|v| v as i64),
        ConstValue::String(_) => None,
    }
}

/// Parses a Verilog numeric literal from its source text.
///
/// Handles plain decimal (`42`), sized binary (`4'b1010`), sized hex
/// (`8'hFF`), sized octal (`8'o17`), sized decimal (`32'd100`), unsized
/// based literals (`'b1`, `'hFF`), and underscore separators (`1_000`).
/// Retained for textual literal forms that reach elaboration as raw
/// strings (e.g. through `$sformat`-style system-call arguments); ordinary
/// [`PExpr::Literal`] nodes already carry a parsed [`vlab_common::LogicVec`]
/// and do not go through this path.
#[allow(dead_code)]
pub(crate) fn parse_verilog_literal(text: &str) -> Option<i64> {
    let text = text.replace('_', "");

    if let Some(tick_pos) = text.find('\'') {
        let after_tick = &text[tick_pos + 1..];
        if after_tick.is_empty() {
            return None;
        }

        let after_sign = if after_tick.starts_with('s') || after_tick.starts_with('S') {
            &after_tick[1..]
        } else {
            after_tick
        };

        if after_sign.is_empty() {
            return None;
        }

        let base_char = after_sign.as_bytes()[0];
        let digits = &after_sign[1..];

        let radix = match base_char {
            b'b' | b'B' => 2,
            b'o' | b'O' => 8,
            b'd' | b'D' => 10,
            b'h' | b'H' => 16,
            _ => return None,
        };

        let clean: String = digits
            .chars()
            .filter_map(|c| match c {
                'x' | 'X' | 'z' | 'Z' | '?' => Some('0'),
                '_' => None,
                other => Some(other),
            })
            .collect();

        return i64::from_str_radix(&clean, radix).ok();
    }

    text.parse::<i64>().ok()
}

/// Computes the ceiling of log-base-2 for a non-negative integer, per
/// `$clog2` semantics: `clog2(0) = 0`, `clog2(1) = 0`, `clog2(2) = 1`,
/// `clog2(3) = 2`, `clog2(4) = 2`.
pub(crate) fn clog2(n: i64) -> i64 {
    if n <= 1 {
        return 0;
    }
    let mut result = 0i64;
    let mut val = n - 1;
    while val > 0 {
        result += 1;
        val >>= 1;
    }
    result
}

/// Applies an integer binary operator. Returns `None` for division/modulo
/// by zero or a negative exponent made sense of as zero.
fn apply_binop_i64(op: BinaryOp, lhs: i64, rhs: i64) -> Option<i64> {
    match op {
        BinaryOp::Add => Some(lhs.wrapping_add(rhs)),
        BinaryOp::Sub => Some(lhs.wrapping_sub(rhs)),
        BinaryOp::Mul => Some(lhs.wrapping_mul(rhs)),
        BinaryOp::Div => {
            if rhs == 0 {
                None
            } else {
                Some(lhs.wrapping_div(rhs))
            }
        }
        BinaryOp::Mod => {
            if rhs == 0 {
                None
            } else {
                Some(lhs.wrapping_rem(rhs))
            }
        }
        BinaryOp::Pow => {
            if rhs < 0 {
                Some(0)
            } else {
                Some(lhs.wrapping_pow(rhs as u32))
            }
        }
        BinaryOp::And => Some(lhs & rhs),
        BinaryOp::Or => Some(lhs | rhs),
        BinaryOp::Xor => Some(lhs ^ rhs),
        BinaryOp::Xnor => Some(!(lhs ^ rhs)),
        BinaryOp::Shl | BinaryOp::Ashl => Some(lhs.wrapping_shl(rhs as u32)),
        BinaryOp::Shr => Some(((lhs as u64).wrapping_shr(rhs as u32)) as i64),
        BinaryOp::Ashr => Some(lhs.wrapping_shr(rhs as u32)),
        _ => None,
    }
}

/// Folds a binary operator over two already-evaluated operands.
fn eval_binop(op: BinaryOp, lhs: &ConstValue, rhs: &ConstValue) -> Option<ConstValue> {
    if matches!(lhs, ConstValue::Real(_)) || matches!(rhs, ConstValue::Real(_)) {
        let a = real_of(lhs)?;
        let b = real_of(rhs)?;
        return match op {
            BinaryOp::Add => Some(ConstValue::Real(a + b)),
            BinaryOp::Sub => Some(ConstValue::Real(a - b)),
            BinaryOp::Mul => Some(ConstValue::Real(a * b)),
            BinaryOp::Div => {
                if b == 0.0 {
                    None
                } else {
                    Some(ConstValue::Real(a / b))
                }
            }
            BinaryOp::Eq | BinaryOp::CaseEq => Some(ConstValue::Bool(a == b)),
            BinaryOp::Ne | BinaryOp::CaseNe => Some(ConstValue::Bool(a != b)),
            BinaryOp::Lt => Some(ConstValue::Bool(a < b)),
            BinaryOp::Le => Some(ConstValue::Bool(a <= b)),
            BinaryOp::Gt => Some(ConstValue::Bool(a > b)),
            BinaryOp::Ge => Some(ConstValue::Bool(a >= b)),
            BinaryOp::Min => Some(ConstValue::Real(a.min(b))),
            BinaryOp::Max => Some(ConstValue::Real(a.max(b))),
            _ => None,
        };
    }

    let l = const_to_i64(lhs)?;
    let r = const_to_i64(rhs)?;
    match op {
        BinaryOp::Eq | BinaryOp::CaseEq => Some(ConstValue::Bool(l == r)),
        BinaryOp::Ne | BinaryOp::CaseNe => Some(ConstValue::Bool(l != r)),
        BinaryOp::Lt => Some(ConstValue::Bool(l < r)),
        BinaryOp::Le => Some(ConstValue::Bool(l <= r)),
        BinaryOp::Gt => Some(ConstValue::Bool(l > r)),
        BinaryOp::Ge => Some(ConstValue::Bool(l >= r)),
        BinaryOp::LogicAnd => Some(ConstValue::Bool(l != 0 && r != 0)),
        BinaryOp::LogicOr => Some(ConstValue::Bool(l != 0 || r != 0)),
        BinaryOp::Min => Some(ConstValue::Int(l.min(r))),
        BinaryOp::Max => Some(ConstValue::Int(l.max(r))),
        _ => apply_binop_i64(op, l, r).map(ConstValue::Int),
    }
}

fn real_of(val: &ConstValue) -> Option<f64> {
    match val {
        ConstValue::Real(f) => Some(*f),
        other => const_to_i64(other).map(|n| n as f64),
    }
}

fn fold_reduction(op: UnaryOp, val: &ConstValue) -> Option<ConstValue> {
    let ConstValue::Logic(lv) = val else {
        return None;
    };
    let mut acc = lv.get(0);
    for i in 1..lv.width() {
        acc = match op {
            UnaryOp::RedAnd | UnaryOp::RedNand => acc & lv.get(i),
            UnaryOp::RedOr | UnaryOp::RedNor => acc | lv.get(i),
            UnaryOp::RedXor | UnaryOp::RedXnor => acc ^ lv.get(i),
            _ => return None,
        };
    }
    let negate = matches!(
        op,
        UnaryOp::RedNand | UnaryOp::RedNor | UnaryOp::RedXnor
    );
    let result = if negate { !acc } else { acc };
    Some(ConstValue::Bool(result == vlab_common::Logic::One))
}

/// Evaluates a PForm expression to a compile-time constant, if possible.
///
/// Emits an `E209` diagnostic for a reference to a name with no binding in
/// `env` and for expression kinds that can never be constant (a signal
/// index, a procedural call). Other non-constant shapes (a reduction over a
/// computed value, a call whose arguments aren't yet constant) return
/// `None` silently — the caller is expected to fall back to a run-time
/// expression in that case.
pub fn eval_const_expr(
    expr: &PExpr,
    env: &ConstEnv,
    sink: &DiagnosticSink,
    interner: &Interner,
) -> Option<ConstValue> {
    match expr {
        PExpr::Literal { value, .. } => Some(ConstValue::Logic(value.clone())),
        PExpr::RealLiteral { value, .. } => Some(ConstValue::Real(*value)),
        PExpr::Ident { name, span } => lookup_name(*name, env, sink, interner, *span),
        PExpr::ScopePath { path, span } => {
            if let [only] = path.as_slice() {
                lookup_name(*only, env, sink, interner, *span)
            } else {
                sink.emit(errors::error_param_not_const(
                    "qualified names are not constant in this context",
                    *span,
                ));
                None
            }
        }
        PExpr::Unary { op, operand, .. } => {
            let v = eval_const_expr(operand, env, sink, interner)?;
            match op {
                UnaryOp::Minus => const_to_i64(&v).map(|n| ConstValue::Int(n.wrapping_neg())),
                UnaryOp::BitNot => const_to_i64(&v).map(|n| ConstValue::Int(!n)),
                UnaryOp::LogicNot => const_to_i64(&v).map(|n| ConstValue::Bool(n == 0)),
                UnaryOp::RedAnd
                | UnaryOp::RedNand
                | UnaryOp::RedOr
                | UnaryOp::RedNor
                | UnaryOp::RedXor
                | UnaryOp::RedXnor => fold_reduction(*op, &v),
            }
        }
        PExpr::Binary { left, op, right, .. } => {
            let l = eval_const_expr(left, env, sink, interner)?;
            let r = eval_const_expr(right, env, sink, interner)?;
            eval_binop(*op, &l, &r)
        }
        PExpr::Ternary {
            cond,
            if_true,
            if_false,
            ..
        } => {
            let c = eval_const_expr(cond, env, sink, interner)?;
            let taken = const_to_i64(&c)? != 0;
            if taken {
                eval_const_expr(if_true, env, sink, interner)
            } else {
                eval_const_expr(if_false, env, sink, interner)
            }
        }
        PExpr::Call { name, args, span } | PExpr::SystemCall { name, args, span } => {
            eval_call(*name, args, *span, env, sink, interner)
        }
        other => {
            sink.emit(errors::error_param_not_const(
                "non-constant expression",
                other.span(),
            ));
            None
        }
    }
}

fn lookup_name(
    name: Ident,
    env: &ConstEnv,
    sink: &DiagnosticSink,
    interner: &Interner,
    span: Span,
) -> Option<ConstValue> {
    match env.get(&name) {
        Some(v) => Some(v.clone()),
        None => {
            sink.emit(errors::error_param_not_const(
                &format!("unresolved identifier `{}`", interner.resolve(name)),
                span,
            ));
            None
        }
    }
}

fn eval_call(
    name: Ident,
    args: &[PExpr],
    span: Span,
    env: &ConstEnv,
    sink: &DiagnosticSink,
    interner: &Interner,
) -> Option<ConstValue> {
    let fname = interner.resolve(name);
    match fname {
        "$clog2" if args.len() == 1 => {
            let v = eval_const_expr(&args[0], env, sink, interner)?;
            const_to_i64(&v).map(|n| ConstValue::Int(clog2(n)))
        }
        "$bits" if args.len() == 1 => {
            // Width-of-expression queries are resolved by the signal
            // elaborator's type pass rather than here; treat as
            // non-constant at this stage.
            None
        }
        _ => {
            sink.emit(errors::error_param_not_const(
                &format!("call to `{fname}` is not a constant function in this context"),
                span,
            ));
            None
        }
    }
}

/// Evaluates a `(msb, lsb)` range pair to constant bounds, if both sides fold.
pub fn eval_range(
    range: &(PExpr, PExpr),
    env: &ConstEnv,
    sink: &DiagnosticSink,
    interner: &Interner,
) -> Option<(i64, i64)> {
    let msb = const_to_i64(&eval_const_expr(&range.0, env, sink, interner)?)?;
    let lsb = const_to_i64(&eval_const_expr(&range.1, env, sink, interner)?)?;
    Some((msb, lsb))
}
