use tracing::warn;

use aero_msl_ir::{AluInstr, AluOp, Instr};

use super::{Ctx, XYZW};
use crate::CompileError;

/// Operand `src` with the swizzle of the channels the instruction actually reads.
fn alu_src(ctx: &Ctx<'_>, instr: &Instr, alu: &AluInstr, src: usize) -> Result<String, CompileError> {
    let mut expr = ctx.src(instr, src)?;
    let operand = &alu.srcs[src];
    let src_def = ctx.def(operand.src)?;
    if src_def.num_components > 1 && !alu.src_is_trivial(src, src_def.num_components) {
        expr.push('.');
        let used = usize::from(alu.src_components(src)).min(4);
        expr.extend(operand.swizzle[..used].iter().map(|&c| XYZW[usize::from(c & 3)]));
    }
    Ok(expr)
}

fn binop(ctx: &Ctx<'_>, instr: &Instr, alu: &AluInstr, op: &str) -> Result<String, CompileError> {
    Ok(format!(
        "{} {op} {}",
        alu_src(ctx, instr, alu, 0)?,
        alu_src(ctx, instr, alu, 1)?
    ))
}

fn funclike(ctx: &Ctx<'_>, instr: &Instr, alu: &AluInstr, name: &str) -> Result<String, CompileError> {
    let args = (0..alu.op.info().num_inputs)
        .map(|i| alu_src(ctx, instr, alu, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("{name}({})", args.join(", ")))
}

fn alu_expr(ctx: &Ctx<'_>, instr: &Instr, alu: &AluInstr) -> Result<String, CompileError> {
    use AluOp as A;

    let expr = match alu.op {
        A::Isign => {
            let s = alu_src(ctx, instr, alu, 0)?;
            format!("{s} == 0 ? 0.0 : (({s} < 0) ? -1 : 1)")
        }
        A::Iadd | A::Fadd => binop(ctx, instr, alu, "+")?,
        A::Isub | A::Fsub => binop(ctx, instr, alu, "-")?,
        A::Imul | A::Fmul => binop(ctx, instr, alu, "*")?,
        A::Idiv | A::Udiv | A::Fdiv => binop(ctx, instr, alu, "/")?,
        A::Irem | A::Umod | A::Imod => binop(ctx, instr, alu, "%")?,
        A::Ishl => binop(ctx, instr, alu, "<<")?,
        A::Ishr | A::Ushr => binop(ctx, instr, alu, ">>")?,
        A::Ige | A::Uge | A::Fge => binop(ctx, instr, alu, ">=")?,
        A::Ilt | A::Ult | A::Flt => binop(ctx, instr, alu, "<")?,
        A::Ieq | A::Feq => binop(ctx, instr, alu, "==")?,
        A::Ine | A::Fneu => binop(ctx, instr, alu, "!=")?,
        A::Iand => binop(ctx, instr, alu, "&")?,
        A::Ior => binop(ctx, instr, alu, "|")?,
        A::Ixor => binop(ctx, instr, alu, "^")?,

        A::IaddSat | A::UaddSat => funclike(ctx, instr, alu, "addsat")?,
        A::UsubSat => funclike(ctx, instr, alu, "subsat")?,
        A::BitfieldInsert => funclike(ctx, instr, alu, "insert_bits")?,
        A::IbitfieldExtract | A::UbitfieldExtract => funclike(ctx, instr, alu, "extract_bits")?,
        A::BitfieldReverse => funclike(ctx, instr, alu, "reverse_bits")?,
        A::BitCount => funclike(ctx, instr, alu, "popcount")?,
        A::Uclz => funclike(ctx, instr, alu, "clz")?,
        A::Umax | A::Imax => funclike(ctx, instr, alu, "max")?,
        A::Umin | A::Imin => funclike(ctx, instr, alu, "min")?,
        A::ImulHigh | A::UmulHigh => funclike(ctx, instr, alu, "mulhi")?,
        A::Fsat => funclike(ctx, instr, alu, "saturate")?,
        A::Fisfinite => funclike(ctx, instr, alu, "isfinite")?,
        A::Fisnormal => funclike(ctx, instr, alu, "isnormal")?,
        A::Iabs | A::Fabs => funclike(ctx, instr, alu, "abs")?,
        A::Fceil => funclike(ctx, instr, alu, "ceil")?,
        A::Fcos => funclike(ctx, instr, alu, "cos")?,
        A::Fdot2 | A::Fdot3 | A::Fdot4 => funclike(ctx, instr, alu, "dot")?,
        A::Fexp2 => funclike(ctx, instr, alu, "exp2")?,
        A::Ffloor => funclike(ctx, instr, alu, "floor")?,
        A::Ffma => funclike(ctx, instr, alu, "fma")?,
        A::Ffract => funclike(ctx, instr, alu, "fract")?,
        A::Flog2 => funclike(ctx, instr, alu, "log2")?,
        A::Flrp => funclike(ctx, instr, alu, "mix")?,
        A::Fmax => funclike(ctx, instr, alu, "fmax")?,
        A::Fmin => funclike(ctx, instr, alu, "fmin")?,
        A::Frem => funclike(ctx, instr, alu, "fmod")?,
        A::Fpow => funclike(ctx, instr, alu, "pow")?,
        A::FroundEven => funclike(ctx, instr, alu, "rint")?,
        A::Frsq => funclike(ctx, instr, alu, "rsqrt")?,
        A::Fsign => funclike(ctx, instr, alu, "sign")?,
        A::Fsqrt => funclike(ctx, instr, alu, "sqrt")?,
        A::Fsin => funclike(ctx, instr, alu, "sin")?,
        A::Ldexp => funclike(ctx, instr, alu, "ldexp")?,
        A::Ftrunc => funclike(ctx, instr, alu, "trunc")?,
        A::PackSnorm4x8 => funclike(ctx, instr, alu, "pack_float_to_snorm4x8")?,
        A::PackUnorm4x8 => funclike(ctx, instr, alu, "pack_float_to_unorm4x8")?,
        A::PackSnorm2x16 => funclike(ctx, instr, alu, "pack_float_to_snorm2x16")?,
        A::PackUnorm2x16 => funclike(ctx, instr, alu, "pack_float_to_unorm2x16")?,
        A::UnpackSnorm4x8 => funclike(ctx, instr, alu, "unpack_snorm4x8_to_float")?,
        A::UnpackUnorm4x8 => funclike(ctx, instr, alu, "unpack_unorm4x8_to_float")?,
        A::UnpackSnorm2x16 => funclike(ctx, instr, alu, "unpack_snorm2x16_to_float")?,
        A::UnpackUnorm2x16 => funclike(ctx, instr, alu, "unpack_unorm2x16_to_float")?,

        // Constructors and conversions are spelled as the destination type.
        A::Vec2
        | A::Vec3
        | A::Vec4
        | A::B2b1
        | A::B2b32
        | A::B2i8
        | A::B2i16
        | A::B2i32
        | A::B2i64
        | A::B2f16
        | A::I2f16
        | A::U2f16
        | A::I2f32
        | A::U2f32
        | A::I2i8
        | A::I2i16
        | A::I2i32
        | A::I2i64
        | A::F2i8
        | A::F2i16
        | A::F2i32
        | A::F2i64
        | A::F2u8
        | A::F2u16
        | A::F2u32
        | A::F2u64
        | A::U2u8
        | A::U2u16
        | A::U2u32
        | A::U2u64
        | A::F2f16
        | A::F2f16Rtne
        | A::F2f32 => {
            let ty = ctx.def_type_name(&alu.def)?;
            funclike(ctx, instr, alu, ty)?
        }

        A::UnpackHalf2x16SplitX => format!(
            "float(as_type<half>(ushort({} & 0x0000ffff)))",
            alu_src(ctx, instr, alu, 0)?
        ),
        A::Frcp => format!("1/{}", alu_src(ctx, instr, alu, 0)?),
        A::Inot => {
            let bool_src = ctx.def(alu.srcs[0].src)?.bit_size == 1;
            let op = if bool_src { '!' } else { '~' };
            format!("{op}{}", alu_src(ctx, instr, alu, 0)?)
        }
        A::Ineg | A::Fneg => format!("-{}", alu_src(ctx, instr, alu, 0)?),
        A::Mov => alu_src(ctx, instr, alu, 0)?,
        A::B2f32 => format!("{} ? 1.0 : 0.0", alu_src(ctx, instr, alu, 0)?),
        A::Bcsel => format!(
            "{} ? {} : {}",
            alu_src(ctx, instr, alu, 0)?,
            alu_src(ctx, instr, alu, 1)?,
            alu_src(ctx, instr, alu, 2)?
        ),

        A::UfindMsb | A::FindLsb | A::Fquantize2f16 | A::Fddx | A::Fddy | A::PackHalf2x16 => {
            warn!(op = %alu.op, def = %alu.def.id, "no MSL rule for ALU op; emitting placeholder");
            format!("ALU {}", alu.op)
        }
    };
    Ok(expr)
}

pub(super) fn emit_alu(ctx: &mut Ctx<'_>, instr: &Instr, alu: &AluInstr) -> Result<(), CompileError> {
    let expected = alu.op.info().num_inputs;
    if alu.srcs.len() < expected {
        return Err(CompileError::AluSrcCount {
            op: alu.op,
            expected,
            found: alu.srcs.len(),
        });
    }
    let expr = alu_expr(ctx, instr, alu)?;
    ctx.line(format_args!("t{} = {expr};", alu.def.id.0));
    Ok(())
}
