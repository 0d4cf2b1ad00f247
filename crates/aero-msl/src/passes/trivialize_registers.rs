//! Register reads are spelled inline at each use (`as_type<T>(rN)`), so a `load_reg` whose uses
//! can observe a later `store_reg` to the same register would read the new value. Such loads are
//! copied into a fresh SSA value right where they execute and every use reads the copy.

use hashbrown::{HashMap, HashSet};

use aero_msl_ir::{AluInstr, AluOp, AluSrc, CfNode, Def, DefId, InstrKind, IntrinsicOp, Shader};

use super::rewrite_blocks;

/// Positions of register traffic in program order.
#[derive(Default)]
struct Timeline {
    next: usize,
    loads: HashMap<DefId, (usize, DefId)>,
    stores: Vec<(usize, DefId)>,
    uses: Vec<(usize, DefId)>,
    loops: Vec<(usize, usize)>,
}

impl Timeline {
    fn tick(&mut self) -> usize {
        let pos = self.next;
        self.next += 1;
        pos
    }

    fn walk(&mut self, list: &[CfNode]) {
        for node in list {
            match node {
                CfNode::Block(block) => {
                    for instr in &block.instrs {
                        let pos = self.tick();
                        for src in instr.srcs() {
                            self.uses.push((pos, src));
                        }
                        let Some(intr) = instr.as_intrinsic() else {
                            continue;
                        };
                        match (intr.op, intr.def, intr.srcs.as_slice()) {
                            (IntrinsicOp::LoadReg, Some(def), &[reg]) => {
                                self.loads.insert(def.id, (pos, reg));
                            }
                            (IntrinsicOp::StoreReg, _, &[_, reg]) => self.stores.push((pos, reg)),
                            _ => {}
                        }
                    }
                }
                CfNode::If(node) => {
                    let pos = self.tick();
                    self.uses.push((pos, node.condition));
                    self.walk(&node.then_list);
                    self.walk(&node.else_list);
                }
                CfNode::Loop(node) => {
                    let start = self.next;
                    self.walk(&node.body);
                    self.loops.push((start, self.next));
                }
            }
        }
    }

    /// Whether a store to `reg` may run between the load at `load` and a use at `at`.
    fn clobbered(&self, load: usize, reg: DefId, at: usize) -> bool {
        self.stores.iter().filter(|&&(_, r)| r == reg).any(|&(store, _)| {
            (load < store && store < at)
                || self.loops.iter().any(|&(start, end)| {
                    let inside = |p: usize| start <= p && p < end;
                    // A later iteration of a loop the load is outside of.
                    inside(at) && !inside(load) && inside(store)
                })
        })
    }
}

pub fn run(shader: &mut Shader) -> bool {
    let func = &mut shader.entry;
    let mut timeline = Timeline::default();
    timeline.walk(&func.body);

    let mut unsafe_loads: Vec<DefId> = timeline
        .uses
        .iter()
        .filter_map(|&(at, src)| {
            let &(load, reg) = timeline.loads.get(&src)?;
            timeline.clobbered(load, reg, at).then_some(src)
        })
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if unsafe_loads.is_empty() {
        return false;
    }
    unsafe_loads.sort();

    let shapes: HashMap<DefId, Def> = func
        .instrs()
        .into_iter()
        .filter_map(|i| i.def().copied())
        .filter(|d| unsafe_loads.contains(&d.id))
        .map(|d| (d.id, d))
        .collect();

    let mut copies: HashMap<DefId, Def> = HashMap::new();
    for load in unsafe_loads {
        let Some(shape) = shapes.get(&load) else {
            continue;
        };
        let copy = func.alloc_def(shape.bit_size, shape.num_components);
        func.rewrite_uses(load, copy.id);
        copies.insert(load, copy);
    }

    rewrite_blocks(func, &mut |func, instr, out| {
        let copy = instr
            .as_intrinsic()
            .filter(|i| i.op == IntrinsicOp::LoadReg)
            .and_then(|i| i.def)
            .and_then(|def| Some((def.id, *copies.get(&def.id)?)));
        out.push(instr);
        let Some((load, copy)) = copy else {
            return false;
        };
        out.push(func.alloc_instr(InstrKind::Alu(AluInstr {
            op: AluOp::Mov,
            def: copy,
            srcs: vec![AluSrc::new(load)],
        })));
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_msl_ir::{Builder, IntrinsicIndices, JumpKind, ShaderStage, SizedType};

    fn decl(b: &mut Builder) -> DefId {
        b.intrinsic_value(
            IntrinsicOp::DeclReg,
            &[],
            32,
            1,
            IntrinsicIndices {
                bit_size: 32,
                num_components: 1,
                ..Default::default()
            },
        )
    }

    fn load(b: &mut Builder, reg: DefId) -> DefId {
        b.intrinsic_value(IntrinsicOp::LoadReg, &[reg], 32, 1, Default::default())
    }

    fn store(b: &mut Builder, value: DefId, reg: DefId) {
        b.intrinsic_effect(IntrinsicOp::StoreReg, &[value, reg], Default::default());
    }

    fn mov_srcs(shader: &Shader) -> Vec<DefId> {
        shader
            .entry
            .instrs()
            .into_iter()
            .filter_map(|i| i.as_alu().filter(|a| a.op == AluOp::Mov))
            .map(|a| a.srcs[0].src)
            .collect()
    }

    #[test]
    fn load_used_after_store_is_copied() {
        let mut b = Builder::new("main");
        let reg = decl(&mut b);
        let old = load(&mut b, reg);
        let one = b.imm_u32(1);
        store(&mut b, one, reg);
        b.store_output(old, 0, SizedType::uint32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(run(&mut shader));
        assert_eq!(mov_srcs(&shader), vec![old]);
        let output = shader
            .entry
            .instrs()
            .into_iter()
            .find_map(|i| i.as_intrinsic().filter(|x| x.op == IntrinsicOp::StoreOutput).cloned())
            .unwrap();
        assert_ne!(output.srcs[0], old);
        assert!(!run(&mut shader));
    }

    #[test]
    fn load_used_before_store_is_left_alone() {
        let mut b = Builder::new("main");
        let reg = decl(&mut b);
        let old = load(&mut b, reg);
        b.store_output(old, 0, SizedType::uint32());
        let one = b.imm_u32(1);
        store(&mut b, one, reg);
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(!run(&mut shader));
    }

    #[test]
    fn stores_in_a_surrounding_loop_clobber() {
        let mut b = Builder::new("main");
        let reg = decl(&mut b);
        let old = load(&mut b, reg);
        b.begin_loop();
        b.intrinsic_effect(IntrinsicOp::StoreShared, &[old, old], Default::default());
        let one = b.imm_u32(1);
        store(&mut b, one, reg);
        b.jump(JumpKind::Break);
        b.end_loop().unwrap();
        let mut shader = Shader::new(ShaderStage::Compute, b.finish().unwrap());

        assert!(run(&mut shader));
        assert_eq!(mov_srcs(&shader), vec![old]);
    }
}
