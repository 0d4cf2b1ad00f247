use aero_msl_ir::{cf_list_is_empty, Block, CfNode, IfNode, InstrKind, JumpKind, LoopNode};

use super::{alu, intrinsic, tex, Ctx};
use crate::CompileError;

fn emit_block(ctx: &mut Ctx<'_>, block: &Block) -> Result<(), CompileError> {
    for instr in &block.instrs {
        match &instr.kind {
            InstrKind::Alu(a) => alu::emit_alu(ctx, instr, a)?,
            InstrKind::Intrinsic(intr) => intrinsic::emit_intrinsic(ctx, instr, intr)?,
            InstrKind::Tex(t) => tex::emit_tex(ctx, instr, t)?,
            InstrKind::Jump { jump } => match jump {
                JumpKind::Break => ctx.line("break;"),
                JumpKind::Continue => ctx.line("continue;"),
                other => return Err(CompileError::UnsupportedJump(*other)),
            },
            // Constants and undefs are spelled inline at their uses.
            InstrKind::LoadConst(_) | InstrKind::Undef { .. } => {}
            InstrKind::Phi(phi) => return Err(CompileError::PhiNotLowered(phi.def.id)),
        }
    }
    Ok(())
}

fn emit_if(ctx: &mut Ctx<'_>, node: &IfNode) -> Result<(), CompileError> {
    let cond = ctx.value(None, node.condition)?;
    ctx.line(format_args!("if ({cond}) {{"));
    ctx.indent += 1;
    emit_cf_list(ctx, &node.then_list)?;
    ctx.indent -= 1;
    if !cf_list_is_empty(&node.else_list) {
        ctx.line("} else {");
        ctx.indent += 1;
        emit_cf_list(ctx, &node.else_list)?;
        ctx.indent -= 1;
    }
    ctx.line("}");
    Ok(())
}

fn emit_loop(ctx: &mut Ctx<'_>, node: &LoopNode) -> Result<(), CompileError> {
    if node.has_continue_construct {
        return Err(CompileError::ContinueConstruct);
    }
    // The Metal compiler crashes on an infinite loop whose conditional break is not
    // provably loop-variant. A bounded counter never changes behavior and avoids the crash.
    ctx.line(
        "for (uint64_t no_crash = 0u; no_crash < 18446744073709551615; ++no_crash) {",
    );
    ctx.indent += 1;
    emit_cf_list(ctx, &node.body)?;
    ctx.indent -= 1;
    ctx.line("}");
    Ok(())
}

pub(super) fn emit_cf_list(ctx: &mut Ctx<'_>, list: &[CfNode]) -> Result<(), CompileError> {
    for node in list {
        match node {
            CfNode::Block(block) => emit_block(ctx, block)?,
            CfNode::If(node) => emit_if(ctx, node)?,
            CfNode::Loop(node) => emit_loop(ctx, node)?,
        }
    }
    Ok(())
}
