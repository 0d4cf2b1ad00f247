//! Evaluates ALU ops whose operands are all constants.
//!
//! Values are carried as raw bit patterns, one per component, and interpreted by bit size:
//! integers are sign- or zero-extended as the op requires, floats go through `half::f16`, `f32`
//! or `f64`. Booleans are 1-bit; a true 32-bit boolean is all ones.

use half::f16;
use hashbrown::HashMap;

use aero_msl_ir::{AluInstr, AluOp, DefId, InstrKind, LoadConst, Shader};

use super::constants;

fn mask(bits: u64, width: u8) -> u64 {
    if width >= 64 {
        bits
    } else {
        bits & ((1u64 << width) - 1)
    }
}

fn sext(bits: u64, width: u8) -> i64 {
    if width >= 64 {
        bits as i64
    } else {
        let shift = 64 - u32::from(width);
        ((bits << shift) as i64) >> shift
    }
}

fn to_float(bits: u64, width: u8) -> Option<f64> {
    Some(match width {
        16 => f16::from_bits(bits as u16).to_f64(),
        32 => f64::from(f32::from_bits(bits as u32)),
        64 => f64::from_bits(bits),
        _ => return None,
    })
}

fn from_float(value: f64, width: u8) -> Option<u64> {
    Some(match width {
        16 => u64::from(f16::from_f64(value).to_bits()),
        32 => u64::from((value as f32).to_bits()),
        64 => value.to_bits(),
        _ => return None,
    })
}

fn from_bool(value: bool, width: u8) -> u64 {
    if value {
        mask(u64::MAX, width)
    } else {
        0
    }
}

/// One operand component, already swizzled.
#[derive(Clone, Copy)]
struct Operand {
    bits: u64,
    width: u8,
}

impl Operand {
    fn u(self) -> u64 {
        mask(self.bits, self.width)
    }

    fn i(self) -> i64 {
        sext(self.bits, self.width)
    }

    fn f(self) -> Option<f64> {
        to_float(self.bits, self.width)
    }

    fn b(self) -> bool {
        self.u() != 0
    }
}

/// Evaluates one output component, or `None` when the op is not foldable.
fn eval(op: AluOp, width: u8, srcs: &[Operand]) -> Option<u64> {
    use AluOp as A;

    let a = *srcs.first()?;
    let b = || srcs.get(1).copied();
    let int = |v: i64| mask(v as u64, width);
    let float = |v: f64| from_float(v, width);

    Some(match op {
        A::Mov | A::Vec2 | A::Vec3 | A::Vec4 => mask(a.bits, width),
        A::Bcsel => {
            let (x, y) = (srcs.get(1)?, srcs.get(2)?);
            mask(if a.b() { x.bits } else { y.bits }, width)
        }

        A::Iadd => int(a.i().wrapping_add(b()?.i())),
        A::Isub => int(a.i().wrapping_sub(b()?.i())),
        A::Imul => int(a.i().wrapping_mul(b()?.i())),
        A::Ineg => int(a.i().wrapping_neg()),
        A::Iabs => int(a.i().wrapping_abs()),
        A::Imax => int(a.i().max(b()?.i())),
        A::Imin => int(a.i().min(b()?.i())),
        A::Umax => a.u().max(b()?.u()),
        A::Umin => a.u().min(b()?.u()),
        A::Udiv => a.u().checked_div(b()?.u())?,
        A::Umod => a.u().checked_rem(b()?.u())?,
        A::Iand => mask(a.u() & b()?.u(), width),
        A::Ior => mask(a.u() | b()?.u(), width),
        A::Ixor => mask(a.u() ^ b()?.u(), width),
        A::Inot => mask(!a.u(), width),
        A::Ishl => mask(a.u().checked_shl((b()?.u() % u64::from(width)) as u32)?, width),
        A::Ushr => a.u() >> (b()?.u() % u64::from(width)),
        A::Ishr => int(a.i() >> (b()?.u() % u64::from(width))),

        A::Ieq => from_bool(a.u() == b()?.u(), width),
        A::Ine => from_bool(a.u() != b()?.u(), width),
        A::Ilt => from_bool(a.i() < b()?.i(), width),
        A::Ige => from_bool(a.i() >= b()?.i(), width),
        A::Ult => from_bool(a.u() < b()?.u(), width),
        A::Uge => from_bool(a.u() >= b()?.u(), width),
        A::Feq => from_bool(a.f()? == b()?.f()?, width),
        A::Fneu => from_bool(a.f()? != b()?.f()?, width),
        A::Flt => from_bool(a.f()? < b()?.f()?, width),
        A::Fge => from_bool(a.f()? >= b()?.f()?, width),

        A::Fadd => float(a.f()? + b()?.f()?)?,
        A::Fsub => float(a.f()? - b()?.f()?)?,
        A::Fmul => float(a.f()? * b()?.f()?)?,
        A::Fneg => float(-a.f()?)?,
        A::Fabs => float(a.f()?.abs())?,
        A::Fmax => float(a.f()?.max(b()?.f()?))?,
        A::Fmin => float(a.f()?.min(b()?.f()?))?,
        A::Ffloor => float(a.f()?.floor())?,
        A::Fceil => float(a.f()?.ceil())?,
        A::Ftrunc => float(a.f()?.trunc())?,
        A::Fsat => float(a.f()?.clamp(0.0, 1.0))?,

        A::B2b1 | A::B2b32 => from_bool(a.b(), width),
        A::B2i8 | A::B2i16 | A::B2i32 | A::B2i64 => u64::from(a.b()),
        A::B2f16 | A::B2f32 => float(if a.b() { 1.0 } else { 0.0 })?,
        A::I2f16 | A::I2f32 => float(a.i() as f64)?,
        A::U2f16 | A::U2f32 => float(a.u() as f64)?,
        A::F2f16 | A::F2f16Rtne | A::F2f32 => float(a.f()?)?,
        A::I2i8 | A::I2i16 | A::I2i32 | A::I2i64 => int(a.i()),
        A::U2u8 | A::U2u16 | A::U2u32 | A::U2u64 => mask(a.u(), width),
        A::F2i8 | A::F2i16 | A::F2i32 | A::F2i64 => {
            let v = a.f()?;
            if !v.is_finite() {
                return None;
            }
            int(v as i64)
        }
        A::F2u8 | A::F2u16 | A::F2u32 | A::F2u64 => {
            let v = a.f()?;
            if !v.is_finite() || v < 0.0 {
                return None;
            }
            mask(v as u64, width)
        }
        _ => return None,
    })
}

fn fold(alu: &AluInstr, consts: &HashMap<DefId, LoadConst>) -> Option<LoadConst> {
    let srcs: Vec<&LoadConst> = alu
        .srcs
        .iter()
        .map(|s| consts.get(&s.src))
        .collect::<Option<_>>()?;
    if srcs.len() != alu.op.info().num_inputs {
        return None;
    }
    let horizontal = alu.op.is_vec();
    if alu.op.is_horizontal() && !horizontal {
        return None;
    }

    let width = alu.def.bit_size;
    let mut values = Vec::with_capacity(usize::from(alu.def.num_components));
    for c in 0..usize::from(alu.def.num_components) {
        let operands: Vec<Operand> = if horizontal {
            // `vecN` component c is operand c.
            let src = &alu.srcs[c];
            let load = srcs[c];
            vec![Operand {
                bits: load.component_bits(src.swizzle[0]),
                width: load.def.bit_size,
            }]
        } else {
            alu.srcs
                .iter()
                .zip(&srcs)
                .map(|(src, load)| Operand {
                    bits: load.component_bits(src.swizzle[c]),
                    width: load.def.bit_size,
                })
                .collect()
        };
        values.push(eval(alu.op, width, &operands)?);
    }
    Some(LoadConst {
        def: alu.def,
        values,
    })
}

pub fn run(shader: &mut Shader) -> bool {
    let func = &mut shader.entry;
    let consts = constants(func);
    let mut changed = false;
    func.for_each_instr_mut(&mut |instr| {
        let InstrKind::Alu(alu) = &instr.kind else {
            return;
        };
        if let Some(folded) = fold(alu, &consts) {
            instr.kind = InstrKind::LoadConst(folded);
            changed = true;
        }
    });
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_msl_ir::{Builder, ShaderStage, SizedType};

    fn single_const(shader: &Shader, def: DefId) -> LoadConst {
        shader
            .entry
            .instrs()
            .into_iter()
            .find_map(|i| i.as_load_const().filter(|c| c.def.id == def).cloned())
            .unwrap()
    }

    #[test]
    fn folds_integer_and_float_arithmetic() {
        let mut b = Builder::new("main");
        let x = b.imm_i32(-3);
        let y = b.imm_i32(5);
        let sum = b.alu(AluOp::Iadd, 32, 1, &[x, y]);
        let f = b.imm_f32(1.5);
        let prod = b.alu(AluOp::Fmul, 32, 1, &[f, f]);
        b.store_output(sum, 0, SizedType::int32());
        b.store_output(prod, 1, SizedType::float32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(run(&mut shader));
        assert_eq!(single_const(&shader, sum).values, vec![2]);
        assert_eq!(
            single_const(&shader, prod).values,
            vec![u64::from(2.25f32.to_bits())]
        );
        assert!(!run(&mut shader));
    }

    #[test]
    fn true_widens_to_all_ones() {
        let mut b = Builder::new("main");
        let t = b.imm_bool(true);
        let wide = b.alu(AluOp::B2b32, 32, 1, &[t]);
        b.store_output(wide, 0, SizedType::uint32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(run(&mut shader));
        assert_eq!(single_const(&shader, wide).values, vec![u64::from(u32::MAX)]);
    }

    #[test]
    fn half_precision_goes_through_f16() {
        assert_eq!(
            eval(
                AluOp::Fadd,
                16,
                &[
                    Operand { bits: u64::from(f16::from_f32(1.0).to_bits()), width: 16 },
                    Operand { bits: u64::from(f16::from_f32(0.5).to_bits()), width: 16 },
                ]
            ),
            Some(u64::from(f16::from_f32(1.5).to_bits()))
        );
    }

    #[test]
    fn division_by_zero_is_left_alone() {
        let zero = Operand { bits: 0, width: 32 };
        let one = Operand { bits: 1, width: 32 };
        assert_eq!(eval(AluOp::Udiv, 32, &[one, zero]), None);
    }
}
