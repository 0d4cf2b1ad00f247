//! Splits per-component vector ALU ops into scalar ops recombined with `vecN`.
//!
//! Moves, `vecN` itself and horizontal ops (dot products, packs) are left alone.

use aero_msl_ir::{AluInstr, AluOp, AluSrc, Function, Instr, InstrKind, Shader};

use super::rewrite_blocks;

fn needs_split(alu: &AluInstr) -> bool {
    alu.def.num_components > 1
        && alu.op != AluOp::Mov
        && !alu.op.is_horizontal()
        && alu.srcs.len() == alu.op.info().num_inputs
}

fn split(func: &mut Function, alu: AluInstr, out: &mut Vec<Instr>) {
    let Some(vec_op) = AluOp::vec_for_components(alu.def.num_components) else {
        return;
    };
    let mut parts = Vec::with_capacity(usize::from(alu.def.num_components));
    for c in 0..usize::from(alu.def.num_components) {
        let def = func.alloc_def(alu.def.bit_size, 1);
        let srcs = alu
            .srcs
            .iter()
            .map(|s| AluSrc::component(s.src, s.swizzle[c]))
            .collect();
        out.push(func.alloc_instr(InstrKind::Alu(AluInstr {
            op: alu.op,
            def,
            srcs,
        })));
        parts.push(AluSrc::new(def.id));
    }
    out.push(func.alloc_instr(InstrKind::Alu(AluInstr {
        op: vec_op,
        def: alu.def,
        srcs: parts,
    })));
}

pub fn run(shader: &mut Shader) -> bool {
    rewrite_blocks(&mut shader.entry, &mut |func, instr, out| match instr.kind {
        InstrKind::Alu(alu) if needs_split(&alu) => {
            split(func, alu, out);
            true
        }
        _ => {
            out.push(instr);
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_msl_ir::{Builder, ShaderStage, SizedType};

    #[test]
    fn vector_add_becomes_scalar_adds() {
        let mut b = Builder::new("main");
        let x = b.imm_vec_f32(&[1.0, 2.0, 3.0]);
        let y = b.alu_swizzled(
            AluOp::Fadd,
            32,
            3,
            vec![AluSrc::new(x), AluSrc::swizzled(x, [2, 1, 0, 0])],
        );
        b.store_output(y, 0, SizedType::float32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(run(&mut shader));
        let alus: Vec<AluInstr> = shader
            .entry
            .instrs()
            .into_iter()
            .filter_map(|i| i.as_alu().cloned())
            .collect();
        assert_eq!(alus.len(), 4);
        assert!(alus[..3]
            .iter()
            .all(|a| a.op == AluOp::Fadd && a.def.num_components == 1));
        assert_eq!(alus[0].srcs[1].swizzle, [2; 4]);
        assert_eq!(alus[2].srcs[1].swizzle, [0; 4]);
        assert_eq!(alus[3].op, AluOp::Vec3);
        assert_eq!(alus[3].def.id, y);
        assert!(!run(&mut shader));
    }

    #[test]
    fn dot_products_stay_vector() {
        let mut b = Builder::new("main");
        let x = b.imm_vec_f32(&[1.0, 2.0]);
        let d = b.alu(AluOp::Fdot2, 32, 1, &[x, x]);
        let m = b.alu(AluOp::Mov, 32, 2, &[x]);
        b.store_output(d, 0, SizedType::float32());
        b.store_output(m, 1, SizedType::float32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(!run(&mut shader));
    }
}
