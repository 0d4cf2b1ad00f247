//! Leaves SSA form: every phi becomes a register.
//!
//! Each phi gets a `decl_reg` at the top of the entry block, a `store_reg` at the end of every
//! predecessor (ahead of its trailing jump) and is itself replaced by a `load_reg` of the
//! register that keeps the phi's def.

use hashbrown::HashMap;

use aero_msl_ir::{
    BlockId, CfNode, DefId, Instr, InstrKind, IntrinsicIndices, IntrinsicInstr, IntrinsicOp,
    Phi, Shader,
};

pub fn run(shader: &mut Shader) -> bool {
    let func = &mut shader.entry;
    let mut phis: Vec<Phi> = Vec::new();
    func.for_each_instr(&mut |instr| {
        if let InstrKind::Phi(phi) = &instr.kind {
            phis.push(phi.clone());
        }
    });
    if phis.is_empty() {
        return false;
    }

    let mut decls = Vec::with_capacity(phis.len());
    let mut regs: HashMap<DefId, DefId> = HashMap::new();
    let mut stores: HashMap<BlockId, Vec<Instr>> = HashMap::new();
    for phi in &phis {
        let reg = func.alloc_def(phi.def.bit_size, phi.def.num_components);
        decls.push(func.alloc_instr(InstrKind::Intrinsic(IntrinsicInstr {
            op: IntrinsicOp::DeclReg,
            srcs: Vec::new(),
            def: Some(reg),
            index: IntrinsicIndices {
                bit_size: phi.def.bit_size,
                num_components: phi.def.num_components,
                ..Default::default()
            },
        })));
        regs.insert(phi.def.id, reg.id);
        for src in &phi.srcs {
            let store = func.alloc_instr(InstrKind::Intrinsic(IntrinsicInstr::new(
                IntrinsicOp::StoreReg,
                vec![src.src, reg.id],
                None,
            )));
            stores.entry(src.pred).or_default().push(store);
        }
    }

    func.for_each_block_mut(&mut |block| {
        for instr in &mut block.instrs {
            if let InstrKind::Phi(phi) = &instr.kind {
                if let Some(&reg) = regs.get(&phi.def.id) {
                    instr.kind = InstrKind::Intrinsic(IntrinsicInstr::new(
                        IntrinsicOp::LoadReg,
                        vec![reg],
                        Some(phi.def),
                    ));
                }
            }
        }
        if let Some(pending) = stores.remove(&block.id) {
            let at = if block.jump().is_some() {
                block.instrs.len() - 1
            } else {
                block.instrs.len()
            };
            block.instrs.splice(at..at, pending);
        }
    });

    if !matches!(func.body.first(), Some(CfNode::Block(_))) {
        let block = func.alloc_block();
        func.body.insert(0, CfNode::Block(block));
    }
    if let Some(CfNode::Block(entry)) = func.body.first_mut() {
        entry.instrs.splice(0..0, decls);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_msl_ir::{AluOp, Builder, JumpKind, PhiSrc, ShaderStage, SizedType};

    #[test]
    fn phi_becomes_register_traffic() {
        let mut b = Builder::new("main");
        let cond = b.imm_bool(true);
        b.begin_if(cond);
        let a = b.imm_u32(1);
        let then_block = b.current_block_id();
        b.begin_else().unwrap();
        let c = b.imm_u32(2);
        let else_block = b.current_block_id();
        b.end_if().unwrap();
        let merged = b.phi(32, 1, &[(then_block, a), (else_block, c)]);
        b.store_output(merged, 0, SizedType::uint32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(run(&mut shader));
        let instrs = shader.entry.instrs();
        assert!(instrs.iter().all(|i| !i.is_phi()));
        assert!(instrs[0].is_intrinsic(IntrinsicOp::DeclReg));
        let reg = instrs[0].def().unwrap().id;

        let stores: Vec<Vec<DefId>> = instrs
            .iter()
            .filter(|i| i.is_intrinsic(IntrinsicOp::StoreReg))
            .map(|i| i.srcs())
            .collect();
        assert_eq!(stores, vec![vec![a, reg], vec![c, reg]]);

        let load = instrs
            .iter()
            .find(|i| i.is_intrinsic(IntrinsicOp::LoadReg))
            .unwrap();
        assert_eq!(load.def().map(|d| d.id), Some(merged));
        assert_eq!(load.srcs(), vec![reg]);
        assert!(!run(&mut shader));
    }

    #[test]
    fn stores_go_before_the_loop_exit() {
        let mut b = Builder::new("main");
        let init = b.imm_u32(0);
        let entry = b.current_block_id();
        b.begin_loop();
        let header = b.current_block_id();
        let placeholder = b.new_def(32, 1);
        b.push(InstrKind::Phi(Phi {
            def: placeholder,
            srcs: Vec::new(),
        }));
        let one = b.imm_u32(1);
        let next = b.alu(AluOp::Iadd, 32, 1, &[placeholder.id, one]);
        let latch = b.current_block_id();
        b.jump(JumpKind::Break);
        b.end_loop().unwrap();
        let mut func = b.finish().unwrap();
        func.for_each_instr_mut(&mut |instr| {
            if let InstrKind::Phi(phi) = &mut instr.kind {
                phi.srcs = vec![
                    PhiSrc { pred: entry, src: init },
                    PhiSrc { pred: latch, src: next },
                ];
            }
        });
        assert_eq!(header, latch);
        let mut shader = Shader::new(ShaderStage::Compute, func);

        assert!(run(&mut shader));
        let CfNode::Loop(node) = &shader.entry.body[1] else {
            panic!("expected loop");
        };
        let CfNode::Block(body) = &node.body[0] else {
            panic!("expected block");
        };
        let n = body.instrs.len();
        assert!(body.instrs[n - 2].is_intrinsic(IntrinsicOp::StoreReg));
        assert!(body.instrs[n - 1].is_jump());
    }
}
