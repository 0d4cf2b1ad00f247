//! Forwards plain copies to their users.
//!
//! Two shapes are copies: a `mov` reading every component of its source in order, and a `vecN`
//! that gathers components `0..N` of one N-wide value. Users of either are pointed at the
//! source. Swizzled `mov`s are folded into the swizzles of ALU users.
//!
//! Register loads are never forwarded: a `mov` of a `load_reg` snapshots the register before a
//! later store can clobber it.

use hashbrown::HashMap;

use aero_msl_ir::{AluInstr, AluOp, AluSrc, DefId, Instr, InstrKind, IntrinsicOp, Shader};

use super::{def_map, def_shapes};

fn is_register_load(defs: &HashMap<DefId, Instr>, id: DefId) -> bool {
    defs.get(&id)
        .is_some_and(|instr| instr.is_intrinsic(IntrinsicOp::LoadReg))
}

/// The value `alu` is an exact copy of, if any.
fn copied_value(alu: &AluInstr, src_components: impl Fn(DefId) -> Option<u8>) -> Option<DefId> {
    let n = alu.def.num_components;
    if alu.op == AluOp::Mov {
        let src = alu.srcs.first()?;
        return (src_components(src.src)? == n && alu.src_is_trivial(0, n)).then_some(src.src);
    }
    if alu.op.is_vec() {
        let first = alu.srcs.first()?.src;
        let gathers = alu.srcs.len() == usize::from(n)
            && src_components(first)? == n
            && alu
                .srcs
                .iter()
                .enumerate()
                .all(|(i, s)| s.src == first && usize::from(s.swizzle[0]) == i);
        return gathers.then_some(first);
    }
    None
}

pub fn run(shader: &mut Shader) -> bool {
    let func = &mut shader.entry;
    let defs = def_map(func);
    let shapes = def_shapes(func);
    let components = |id: DefId| shapes.get(&id).map(|d| d.num_components);

    let mut copies = Vec::new();
    let mut swizzled_movs: HashMap<DefId, AluSrc> = HashMap::new();
    for instr in defs.values() {
        let Some(alu) = instr.as_alu() else {
            continue;
        };
        let Some(first) = alu.srcs.first() else {
            continue;
        };
        if is_register_load(&defs, first.src) {
            continue;
        }
        if let Some(src) = copied_value(alu, components) {
            copies.push((alu.def.id, src));
        } else if alu.op == AluOp::Mov {
            swizzled_movs.insert(alu.def.id, *first);
        }
    }
    copies.sort();

    let mut changed = false;
    for (from, to) in copies {
        changed |= func.rewrite_uses(from, to);
    }

    func.for_each_instr_mut(&mut |instr| {
        let InstrKind::Alu(alu) = &mut instr.kind else {
            return;
        };
        for src in &mut alu.srcs {
            let Some(mov) = swizzled_movs.get(&src.src) else {
                continue;
            };
            let composed = AluSrc::swizzled(
                mov.src,
                src.swizzle.map(|c| mov.swizzle[usize::from(c & 3)]),
            );
            if composed != *src {
                *src = composed;
                changed = true;
            }
        }
    });
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_msl_ir::{Builder, ShaderStage, SizedType};

    #[test]
    fn forwards_identity_moves() {
        let mut b = Builder::new("main");
        let v = b.imm_vec_f32(&[1.0, 2.0]);
        let m = b.alu(AluOp::Mov, 32, 2, &[v]);
        let sum = b.alu(AluOp::Fadd, 32, 2, &[m, m]);
        b.store_output(sum, 0, SizedType::float32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(run(&mut shader));
        let fadd = shader
            .entry
            .instrs()
            .into_iter()
            .find_map(|i| i.as_alu().filter(|a| a.op == AluOp::Fadd).cloned())
            .unwrap();
        assert_eq!(fadd.srcs[0].src, v);
        assert!(!run(&mut shader));
    }

    #[test]
    fn composes_swizzled_moves() {
        let mut b = Builder::new("main");
        let v = b.imm_vec_f32(&[1.0, 2.0, 3.0]);
        let yzx = b.alu_swizzled(AluOp::Mov, 32, 3, vec![AluSrc::swizzled(v, [1, 2, 0, 0])]);
        let x = b.alu_swizzled(AluOp::Fneg, 32, 1, vec![AluSrc::component(yzx, 2)]);
        b.store_output(x, 0, SizedType::float32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(run(&mut shader));
        let fneg = shader
            .entry
            .instrs()
            .into_iter()
            .find_map(|i| i.as_alu().filter(|a| a.op == AluOp::Fneg).cloned())
            .unwrap();
        assert_eq!(fneg.srcs[0].src, v);
        assert_eq!(fneg.srcs[0].swizzle[0], 0);
    }

    #[test]
    fn register_loads_keep_their_snapshot() {
        use aero_msl_ir::IntrinsicIndices;

        let mut b = Builder::new("main");
        let reg = b.intrinsic_value(
            IntrinsicOp::DeclReg,
            &[],
            32,
            1,
            IntrinsicIndices {
                bit_size: 32,
                num_components: 1,
                ..Default::default()
            },
        );
        let load = b.intrinsic_value(IntrinsicOp::LoadReg, &[reg], 32, 1, Default::default());
        let snapshot = b.alu(AluOp::Mov, 32, 1, &[load]);
        b.store_output(snapshot, 0, SizedType::uint32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(!run(&mut shader));
    }
}
