//! Lowers an [`Expr`] into a sequence of instructions that leave its value
//! in a freshly allocated vector register, per §4.6's expression-evaluation
//! requirements for statement emission.

use vlab_ir::{
    ArenaId, BinaryOp, CallTarget, Design, Expr, ReductionOp, Scope, SignalId, SignalRef, UnaryOp,
    ValueKind,
};

use crate::emitter::Emitter;
use crate::lookaside::LookasideKey;

/// A run of vector registers holding an expression's value, plus the width
/// it was allocated at (needed so callers can free it symmetrically).
#[derive(Clone, Copy)]
pub struct ValueReg {
    pub base: u32,
    pub width: u32,
}

impl ValueReg {
    fn new(base: u32, width: u32) -> Self {
        Self { base, width }
    }
}

/// Evaluates `expr` in `scope`, returning the register holding its value.
///
/// Callers own the returned register and must [`crate::regalloc::VecRegFile::free`]
/// it once done, same as any other vector-register allocation.
pub fn eval_expr(emitter: &mut Emitter, design: &Design, scope: vlab_ir::ScopeId, expr: &Expr) -> ValueReg {
    match expr {
        Expr::ConstVector { value, .. } => {
            let width = value.width();
            let dest = emitter.vecs.allocate(width);
            if let Some(raw) = value.to_u64() {
                emitter.instr(&format!("%mov v{dest}, {raw}, {width}"));
            } else {
                emitter.instr(&format!("%mov/4s v{dest}, \"{value}\""));
            }
            ValueReg::new(dest, width)
        }
        Expr::ConstReal { value, .. } => {
            let dest = emitter.vecs.allocate(1);
            emitter.instr(&format!("%mov/r v{dest}, {value}"));
            ValueReg::new(dest, 1)
        }
        Expr::SignalRef { signal, width, .. } => eval_signal_ref(emitter, design, scope, expr, *signal, *width),
        Expr::Unary { op, operand, width, .. } => {
            let src = eval_expr(emitter, design, scope, operand);
            let dest = emitter.vecs.allocate(*width);
            let mnemonic = match op {
                UnaryOp::BitNot => "%inv",
                UnaryOp::Neg => "%neg",
                UnaryOp::LogicNot => "%lnot",
            };
            emitter.instr(&format!("v{dest} = {mnemonic} v{}, {width}", src.base));
            emitter.vecs.free(src.base, src.width);
            ValueReg::new(dest, *width)
        }
        Expr::Reduction { op, operand, .. } => {
            let src = eval_expr(emitter, design, scope, operand);
            let dest = emitter.vecs.allocate(1);
            let mnemonic = match op {
                ReductionOp::And => "%reduce/and",
                ReductionOp::Or => "%reduce/or",
                ReductionOp::Xor => "%reduce/xor",
                ReductionOp::Nand => "%reduce/nand",
                ReductionOp::Nor => "%reduce/nor",
                ReductionOp::Xnor => "%reduce/xnor",
            };
            emitter.instr(&format!("v{dest} = {mnemonic} v{}", src.base));
            emitter.vecs.free(src.base, src.width);
            ValueReg::new(dest, 1)
        }
        Expr::Binary { op, lhs, rhs, width, value_kind, .. } => {
            let l = eval_expr(emitter, design, scope, lhs);
            let r = eval_expr(emitter, design, scope, rhs);
            let result_width = if binary_is_comparison(*op) { 1 } else { *width };
            let dest = emitter.vecs.allocate(result_width);
            let suffix = if *value_kind == ValueKind::Real { "/wr" } else { "" };
            emitter.instr(&format!(
                "v{dest} = {}{suffix} v{}, v{}",
                binary_mnemonic(*op),
                l.base,
                r.base
            ));
            emitter.vecs.free(l.base, l.width);
            emitter.vecs.free(r.base, r.width);
            ValueReg::new(dest, result_width)
        }
        Expr::Ternary { cond, true_val, false_val, width, .. } => {
            let c = eval_expr(emitter, design, scope, cond);
            let t = eval_expr(emitter, design, scope, true_val);
            let f = eval_expr(emitter, design, scope, false_val);
            let dest = emitter.vecs.allocate(*width);
            emitter.instr(&format!("v{dest} = %ternary v{}, v{}, v{}", c.base, t.base, f.base));
            emitter.vecs.free(c.base, c.width);
            emitter.vecs.free(t.base, t.width);
            emitter.vecs.free(f.base, f.width);
            ValueReg::new(dest, *width)
        }
        Expr::Concat { parts, width, .. } => {
            let dest = emitter.vecs.allocate(*width);
            let mut offset = *width;
            for part in parts {
                let v = eval_expr(emitter, design, scope, part);
                offset -= v.width;
                emitter.instr(&format!("%concat/part v{dest}/{offset}, v{}, {}", v.base, v.width));
                emitter.vecs.free(v.base, v.width);
            }
            ValueReg::new(dest, *width)
        }
        Expr::Replicate { operand, count, width, .. } => {
            let src = eval_expr(emitter, design, scope, operand);
            let dest = emitter.vecs.allocate(*width);
            emitter.instr(&format!("%repl v{dest}, v{}, {count}, {width}", src.base));
            emitter.vecs.free(src.base, src.width);
            ValueReg::new(dest, *width)
        }
        Expr::Call { callee, args, width, value_kind, .. } => {
            eval_call(emitter, design, scope, callee, args, *width, *value_kind)
        }
        Expr::EventProbeRef { event, .. } => {
            let dest = emitter.vecs.allocate(1);
            emitter.instr(&format!("v{dest} = %event/status {}", Emitter::event_label(*event)));
            ValueReg::new(dest, 1)
        }
    }
}

fn eval_signal_ref(
    emitter: &mut Emitter,
    design: &Design,
    scope: vlab_ir::ScopeId,
    expr: &Expr,
    signal: SignalId,
    width: u32,
) -> ValueReg {
    let (word_index, part_offset, part_width, mux_select) = match expr {
        Expr::SignalRef { word_index, part_offset, part_width, mux_select, .. } => {
            (word_index, part_offset, part_width, mux_select)
        }
        _ => unreachable!("eval_signal_ref called with a non-SignalRef expr"),
    };

    let sig = &design.scopes[scope].signals[signal];
    let sig_label = format!("v_{}_{:x}", emitter.interner().resolve(sig.name), signal.as_raw());

    if word_index.is_none() && part_offset.is_none() && mux_select.is_none() {
        if let Some(reg) = emitter.lookaside.get(LookasideKey::whole(signal)) {
            return ValueReg::new(reg, width);
        }
        let dest = emitter.vecs.allocate(width);
        emitter.instr(&format!("v{dest} = %load {sig_label}, {width}"));
        emitter.lookaside.insert(LookasideKey::whole(signal), dest);
        return ValueReg::new(dest, width);
    }

    let mut index_regs = Vec::new();
    if let Some(word_expr) = word_index {
        let word_val = eval_expr(emitter, design, scope, word_expr);
        index_regs.push(word_val);
    }
    if let Some(offset_expr) = part_offset {
        let offset_val = eval_expr(emitter, design, scope, offset_expr);
        index_regs.push(offset_val);
    }
    if let Some(select_expr) = mux_select {
        let select_val = eval_expr(emitter, design, scope, select_expr);
        index_regs.push(select_val);
    }

    let dest = emitter.vecs.allocate(width);
    let mut op = format!("v{dest} = %load/av {sig_label}");
    if let Some(part) = part_width {
        op.push_str(&format!("/x{part}"));
    }
    for idx in &index_regs {
        op.push_str(&format!(", v{}", idx.base));
    }
    op.push_str(&format!(", {width}"));
    emitter.instr(&op);
    for idx in index_regs {
        emitter.vecs.free(idx.base, idx.width);
    }
    ValueReg::new(dest, width)
}

fn eval_call(
    emitter: &mut Emitter,
    design: &Design,
    scope: vlab_ir::ScopeId,
    callee: &CallTarget,
    args: &[Expr],
    width: u32,
    value_kind: ValueKind,
) -> ValueReg {
    match callee {
        CallTarget::User { scope: owner, name } => {
            let owner_scope: &Scope = &design.scopes[*owner];
            let func = owner_scope
                .functions
                .iter()
                .find(|f| f.name == *name)
                .expect("user function call resolved to an existing FunctionDef by elaboration");
            for (arg_expr, arg_signal) in args.iter().zip(func.args.iter()) {
                let v = eval_expr(emitter, design, scope, arg_expr);
                emitter.instr(&format!("%set/v v_arg_{:x}, v{}, {}", arg_signal.as_raw(), v.base, v.width));
                emitter.vecs.free(v.base, v.width);
            }
            emitter.instr(&format!(
                "%fork {}, {}",
                emitter.task_def_label(*owner, *name),
                Emitter::scope_label(func.body_scope)
            ));
            emitter.instr("%join");
            emitter.lookaside.invalidate();
            let dest = emitter.vecs.allocate(width);
            let suffix = if value_kind == ValueKind::Real { "/r" } else { "" };
            emitter.instr(&format!(
                "v{dest} = %load{suffix} v_{:x}, {width}",
                func.return_signal.as_raw()
            ));
            ValueReg::new(dest, width)
        }
        CallTarget::System { name } => {
            let mut arg_regs = Vec::new();
            for arg_expr in args {
                arg_regs.push(eval_expr(emitter, design, scope, arg_expr));
            }
            let suffix = if value_kind == ValueKind::Real { "/r" } else { "" };
            let mut call = format!("%vpi_func{suffix} \"{}\"", emitter.interner().resolve(*name));
            for reg in &arg_regs {
                call.push_str(&format!(", v{}", reg.base));
            }
            let dest = emitter.vecs.allocate(width);
            emitter.instr(&format!("v{dest} = {call}"));
            for reg in arg_regs {
                emitter.vecs.free(reg.base, reg.width);
            }
            ValueReg::new(dest, width)
        }
    }
}

fn binary_is_comparison(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Eq
            | BinaryOp::CaseEq
            | BinaryOp::Ne
            | BinaryOp::CaseNe
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::LogicAnd
            | BinaryOp::LogicOr
    )
}

fn binary_mnemonic(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "%add",
        BinaryOp::Sub => "%sub",
        BinaryOp::Mul => "%mul",
        BinaryOp::Div => "%div",
        BinaryOp::Mod => "%mod",
        BinaryOp::Pow => "%pow",
        BinaryOp::And => "%and",
        BinaryOp::Or => "%or",
        BinaryOp::Xor => "%xor",
        BinaryOp::Xnor => "%xnor",
        BinaryOp::Shl => "%shl",
        BinaryOp::ShrLogical => "%shr",
        BinaryOp::ShrArith => "%shr/s",
        BinaryOp::Eq => "%cmp/eq",
        BinaryOp::CaseEq => "%cmp/eeq",
        BinaryOp::Ne => "%cmp/ne",
        BinaryOp::CaseNe => "%cmp/nee",
        BinaryOp::Lt => "%cmp/lt",
        BinaryOp::Le => "%cmp/le",
        BinaryOp::Gt => "%cmp/gt",
        BinaryOp::Ge => "%cmp/ge",
        BinaryOp::LogicAnd => "%land",
        BinaryOp::LogicOr => "%lor",
        BinaryOp::Min => "%min",
        BinaryOp::Max => "%max",
    }
}
