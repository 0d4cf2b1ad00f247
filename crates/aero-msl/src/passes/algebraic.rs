//! Local identities: `x + 0`, `x * 1`, `x << 0`, `x & x`, `x | x` and `c ? x : x` become moves;
//! `x * 0` and `x ^ x` become zero; double negation and double complement cancel.

use hashbrown::HashMap;

use aero_msl_ir::{AluInstr, AluOp, AluSrc, DefId, InstrKind, LoadConst, Shader};

use super::constants;

/// Whether every component `alu` reads from operand `src` is the raw value `bits`.
fn reads_splat(alu: &AluInstr, src: usize, consts: &HashMap<DefId, LoadConst>, bits: u64) -> bool {
    let operand = &alu.srcs[src];
    let Some(load) = consts.get(&operand.src) else {
        return false;
    };
    (0..usize::from(alu.src_components(src)))
        .all(|c| load.component_bits(operand.swizzle[c]) == bits)
}

fn one_bits(op: AluOp, bit_size: u8) -> Option<u64> {
    match (op, bit_size) {
        (AluOp::Fmul, 16) => Some(u64::from(half::f16::ONE.to_bits())),
        (AluOp::Fmul, 32) => Some(u64::from(1.0f32.to_bits())),
        (AluOp::Fmul, 64) => Some(1.0f64.to_bits()),
        (AluOp::Fmul, _) => None,
        _ => Some(1),
    }
}

enum Rewrite {
    Move(AluSrc),
    Zero,
}

fn simplify(
    alu: &AluInstr,
    consts: &HashMap<DefId, LoadConst>,
    alus: &HashMap<DefId, AluInstr>,
) -> Option<Rewrite> {
    use AluOp as A;

    let zero = |src| reads_splat(alu, src, consts, 0);
    let same_operands = || alu.srcs.len() >= 2 && alu.srcs[0] == alu.srcs[1];

    match alu.op {
        A::Iadd | A::Ior | A::Ixor if zero(1) => Some(Rewrite::Move(alu.srcs[0])),
        A::Iadd | A::Ior | A::Ixor if zero(0) => Some(Rewrite::Move(alu.srcs[1])),
        A::Ishl | A::Ishr | A::Ushr | A::Isub if zero(1) => Some(Rewrite::Move(alu.srcs[0])),
        A::Imul | A::Fmul => {
            let one = one_bits(alu.op, alu.def.bit_size)?;
            if reads_splat(alu, 1, consts, one) {
                Some(Rewrite::Move(alu.srcs[0]))
            } else if reads_splat(alu, 0, consts, one) {
                Some(Rewrite::Move(alu.srcs[1]))
            } else if alu.op == A::Imul && (zero(0) || zero(1)) {
                Some(Rewrite::Zero)
            } else {
                None
            }
        }
        A::Iand | A::Ior if same_operands() => Some(Rewrite::Move(alu.srcs[0])),
        A::Ixor if same_operands() => Some(Rewrite::Zero),
        A::Bcsel if alu.srcs[1] == alu.srcs[2] => Some(Rewrite::Move(alu.srcs[1])),
        A::Inot | A::Ineg | A::Fneg => {
            let outer = alu.srcs[0];
            let inner = alus.get(&outer.src)?;
            if inner.op != alu.op {
                return None;
            }
            let src = inner.srcs[0];
            Some(Rewrite::Move(AluSrc::swizzled(
                src.src,
                outer.swizzle.map(|c| src.swizzle[usize::from(c & 3)]),
            )))
        }
        _ => None,
    }
}

pub fn run(shader: &mut Shader) -> bool {
    let func = &mut shader.entry;
    let consts = constants(func);
    let mut alus = HashMap::new();
    func.for_each_instr(&mut |instr| {
        if let Some(alu) = instr.as_alu() {
            alus.insert(alu.def.id, alu.clone());
        }
    });

    let mut changed = false;
    func.for_each_instr_mut(&mut |instr| {
        let InstrKind::Alu(alu) = &instr.kind else {
            return;
        };
        if alu.srcs.len() < alu.op.info().num_inputs {
            return;
        }
        let Some(rewrite) = simplify(alu, &consts, &alus) else {
            return;
        };
        let def = alu.def;
        instr.kind = match rewrite {
            Rewrite::Move(src) => InstrKind::Alu(AluInstr {
                op: AluOp::Mov,
                def,
                srcs: vec![src],
            }),
            Rewrite::Zero => InstrKind::LoadConst(LoadConst {
                def,
                values: vec![0; usize::from(def.num_components)],
            }),
        };
        changed = true;
    });
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_msl_ir::{Builder, IntrinsicOp, ShaderStage, SizedType};

    fn op_of(shader: &Shader, def: DefId) -> Option<AluOp> {
        shader
            .entry
            .instrs()
            .into_iter()
            .find_map(|i| i.as_alu().filter(|a| a.def.id == def).map(|a| a.op))
    }

    #[test]
    fn additive_and_multiplicative_identities() {
        let mut b = Builder::new("main");
        let x = b.load_sysval(IntrinsicOp::LoadLocalInvocationIndex, 32, 1);
        let zero = b.imm_u32(0);
        let one = b.imm_u32(1);
        let add = b.alu(AluOp::Iadd, 32, 1, &[zero, x]);
        let mul = b.alu(AluOp::Imul, 32, 1, &[add, one]);
        let killed = b.alu(AluOp::Imul, 32, 1, &[mul, zero]);
        b.store_output(killed, 0, SizedType::uint32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(run(&mut shader));
        assert_eq!(op_of(&shader, add), Some(AluOp::Mov));
        assert_eq!(op_of(&shader, mul), Some(AluOp::Mov));
        assert_eq!(op_of(&shader, killed), None);
        assert!(!run(&mut shader));
    }

    #[test]
    fn double_negation_cancels() {
        let mut b = Builder::new("main");
        let x = b.imm_f32(3.0);
        let n1 = b.alu(AluOp::Fneg, 32, 1, &[x]);
        let n2 = b.alu(AluOp::Fneg, 32, 1, &[n1]);
        b.store_output(n2, 0, SizedType::float32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(run(&mut shader));
        assert_eq!(op_of(&shader, n2), Some(AluOp::Mov));
    }

    #[test]
    fn float_multiply_by_integer_one_is_kept() {
        let mut b = Builder::new("main");
        let x = b.imm_f32(3.0);
        let one = b.imm_u32(1);
        let m = b.alu(AluOp::Fmul, 32, 1, &[x, one]);
        b.store_output(m, 0, SizedType::float32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(!run(&mut shader));
    }
}
