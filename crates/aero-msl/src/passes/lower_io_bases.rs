//! Folds the constant `base` of push-constant, shared and scratch accesses into the explicit
//! byte offset operand, leaving `base == 0` behind.

use aero_msl_ir::{AluInstr, AluOp, AluSrc, InstrKind, IntrinsicOp, LoadConst, Shader};

use super::{def_shapes, rewrite_blocks};

/// Operand holding the byte offset, for ops that carry a `base`.
fn offset_src(op: IntrinsicOp) -> Option<usize> {
    use IntrinsicOp as I;
    match op {
        I::LoadPushConstant | I::LoadShared | I::LoadScratch => Some(0),
        I::SharedAtomic | I::SharedAtomicSwap => Some(0),
        I::StoreShared | I::StoreScratch => Some(1),
        _ => None,
    }
}

pub fn run(shader: &mut Shader) -> bool {
    let func = &mut shader.entry;
    let shapes = def_shapes(func);
    rewrite_blocks(func, &mut |func, mut instr, out| {
        let InstrKind::Intrinsic(intr) = &mut instr.kind else {
            out.push(instr);
            return false;
        };
        let target = offset_src(intr.op)
            .filter(|_| intr.index.base != 0)
            .and_then(|i| Some((i, *intr.srcs.get(i)?)));
        let Some((i, offset)) = target else {
            out.push(instr);
            return false;
        };

        let bits = shapes.get(&offset).map_or(32, |def| def.bit_size);
        let base = i64::from(intr.index.base) as u64;
        let base = if bits >= 64 { base } else { base & ((1u64 << bits) - 1) };
        let base_def = func.alloc_def(bits, 1);
        out.push(func.alloc_instr(InstrKind::LoadConst(LoadConst {
            def: base_def,
            values: vec![base],
        })));

        let sum = func.alloc_def(bits, 1);
        out.push(func.alloc_instr(InstrKind::Alu(AluInstr {
            op: AluOp::Iadd,
            def: sum,
            srcs: vec![AluSrc::new(offset), AluSrc::new(base_def.id)],
        })));

        intr.srcs[i] = sum.id;
        intr.index.base = 0;
        out.push(instr);
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_msl_ir::{Builder, IntrinsicIndices, ShaderStage};

    #[test]
    fn base_is_added_to_the_offset() {
        let mut b = Builder::new("main");
        let offset = b.imm_u32(4);
        let value = b.intrinsic_value(
            IntrinsicOp::LoadShared,
            &[offset],
            32,
            1,
            IntrinsicIndices {
                base: 16,
                ..Default::default()
            },
        );
        b.intrinsic_effect(
            IntrinsicOp::StoreScratch,
            &[value, offset],
            IntrinsicIndices::default(),
        );
        let mut shader = Shader::new(ShaderStage::Compute, b.finish().unwrap());

        assert!(run(&mut shader));
        let instrs = shader.entry.instrs();
        let load = instrs
            .iter()
            .find_map(|i| i.as_intrinsic().filter(|x| x.op == IntrinsicOp::LoadShared))
            .unwrap();
        assert_eq!(load.index.base, 0);
        let add = instrs
            .iter()
            .find_map(|i| i.as_alu().filter(|a| a.def.id == load.srcs[0]))
            .unwrap();
        assert_eq!(add.op, AluOp::Iadd);
        assert_eq!(add.srcs[0].src, offset);

        let store = instrs
            .iter()
            .find_map(|i| i.as_intrinsic().filter(|x| x.op == IntrinsicOp::StoreScratch))
            .unwrap();
        assert_eq!(store.srcs[1], offset);
        assert!(!run(&mut shader));
    }
}
