use crate::error::{build_err, BuildError};
use crate::ir::{
    AluInstr, AluSrc, Block, BlockId, CfNode, Def, DefId, Function, IfNode, InstrKind,
    IntrinsicIndices, IntrinsicInstr, IoSemantics, LoadConst, LoopNode, Phi, PhiSrc, TexInstr,
};
use crate::ops::{AluOp, IntrinsicOp, JumpKind};
use crate::types::{InterpMode, SizedType};

enum Frame {
    Root(Vec<CfNode>),
    Then {
        condition: DefId,
        list: Vec<CfNode>,
    },
    Else {
        condition: DefId,
        then_list: Vec<CfNode>,
        list: Vec<CfNode>,
    },
    Loop(Vec<CfNode>),
}

impl Frame {
    fn list(&mut self) -> &mut Vec<CfNode> {
        match self {
            Frame::Root(list) | Frame::Loop(list) => list,
            Frame::Then { list, .. } | Frame::Else { list, .. } => list,
        }
    }
}

/// Appends instructions and structured control flow to a function in program order.
///
/// Every control-flow list the builder closes ends in a block, so the last block of a list is
/// always the predecessor that a following phi names.
pub struct Builder {
    func: Function,
    stack: Vec<Frame>,
}

impl Builder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            func: Function::new(name),
            stack: vec![Frame::Root(Vec::new())],
        }
    }

    fn list(&mut self) -> &mut Vec<CfNode> {
        // The root frame is never popped before `finish`.
        let last = self.stack.len() - 1;
        self.stack[last].list()
    }

    fn block(&mut self) -> &mut Block {
        if !matches!(self.list().last(), Some(CfNode::Block(_))) {
            let block = self.func.alloc_block();
            self.list().push(CfNode::Block(block));
        }
        match self.list().last_mut() {
            Some(CfNode::Block(block)) => block,
            _ => unreachable!("a block was just appended"),
        }
    }

    fn seal(func: &mut Function, list: &mut Vec<CfNode>) {
        if !matches!(list.last(), Some(CfNode::Block(_))) {
            list.push(CfNode::Block(func.alloc_block()));
        }
    }

    /// Id of the block instructions are currently appended to.
    pub fn current_block_id(&mut self) -> BlockId {
        self.block().id
    }

    pub fn push(&mut self, kind: InstrKind) {
        let instr = self.func.alloc_instr(kind);
        self.block().instrs.push(instr);
    }

    pub fn new_def(&mut self, bit_size: u8, num_components: u8) -> Def {
        self.func.alloc_def(bit_size, num_components)
    }

    pub fn alu(&mut self, op: AluOp, bit_size: u8, num_components: u8, srcs: &[DefId]) -> DefId {
        let srcs = srcs.iter().copied().map(AluSrc::new).collect();
        self.alu_swizzled(op, bit_size, num_components, srcs)
    }

    pub fn alu_swizzled(
        &mut self,
        op: AluOp,
        bit_size: u8,
        num_components: u8,
        srcs: Vec<AluSrc>,
    ) -> DefId {
        let def = self.new_def(bit_size, num_components);
        self.push(InstrKind::Alu(AluInstr { op, def, srcs }));
        def.id
    }

    pub fn imm(&mut self, bit_size: u8, values: &[u64]) -> DefId {
        let def = self.new_def(bit_size, values.len() as u8);
        self.push(InstrKind::LoadConst(LoadConst {
            def,
            values: values.to_vec(),
        }));
        def.id
    }

    pub fn imm_u32(&mut self, value: u32) -> DefId {
        self.imm(32, &[u64::from(value)])
    }

    pub fn imm_i32(&mut self, value: i32) -> DefId {
        self.imm(32, &[u64::from(value as u32)])
    }

    pub fn imm_u64(&mut self, value: u64) -> DefId {
        self.imm(64, &[value])
    }

    pub fn imm_f32(&mut self, value: f32) -> DefId {
        self.imm(32, &[u64::from(value.to_bits())])
    }

    pub fn imm_vec_f32(&mut self, values: &[f32]) -> DefId {
        let bits: Vec<u64> = values.iter().map(|v| u64::from(v.to_bits())).collect();
        self.imm(32, &bits)
    }

    pub fn imm_bool(&mut self, value: bool) -> DefId {
        self.imm(1, &[u64::from(value)])
    }

    pub fn undef(&mut self, bit_size: u8, num_components: u8) -> DefId {
        let def = self.new_def(bit_size, num_components);
        self.push(InstrKind::Undef { def });
        def.id
    }

    pub fn intrinsic(
        &mut self,
        op: IntrinsicOp,
        srcs: &[DefId],
        dest: Option<(u8, u8)>,
        index: IntrinsicIndices,
    ) -> Option<DefId> {
        let def = dest.map(|(bits, comps)| self.new_def(bits, comps));
        self.push(InstrKind::Intrinsic(IntrinsicInstr {
            op,
            srcs: srcs.to_vec(),
            def,
            index,
        }));
        def.map(|d| d.id)
    }

    /// An intrinsic producing a value.
    pub fn intrinsic_value(
        &mut self,
        op: IntrinsicOp,
        srcs: &[DefId],
        bit_size: u8,
        num_components: u8,
        index: IntrinsicIndices,
    ) -> DefId {
        let def = self.new_def(bit_size, num_components);
        self.push(InstrKind::Intrinsic(IntrinsicInstr {
            op,
            srcs: srcs.to_vec(),
            def: Some(def),
            index,
        }));
        def.id
    }

    /// An intrinsic executed for its side effect only.
    pub fn intrinsic_effect(&mut self, op: IntrinsicOp, srcs: &[DefId], index: IntrinsicIndices) {
        self.push(InstrKind::Intrinsic(IntrinsicInstr {
            op,
            srcs: srcs.to_vec(),
            def: None,
            index,
        }));
    }

    pub fn load_sysval(&mut self, op: IntrinsicOp, bit_size: u8, num_components: u8) -> DefId {
        self.intrinsic_value(op, &[], bit_size, num_components, IntrinsicIndices::default())
    }

    pub fn store_output(&mut self, value: DefId, location: u32, src_type: SizedType) {
        let offset = self.imm_u32(0);
        self.intrinsic_effect(
            IntrinsicOp::StoreOutput,
            &[value, offset],
            IntrinsicIndices {
                io: Some(IoSemantics {
                    location,
                    num_slots: 1,
                }),
                src_type: Some(src_type),
                ..Default::default()
            },
        );
    }

    pub fn load_input(&mut self, location: u32, num_components: u8, dest_type: SizedType) -> DefId {
        let offset = self.imm_u32(0);
        self.intrinsic_value(
            IntrinsicOp::LoadInput,
            &[offset],
            dest_type.bits,
            num_components,
            IntrinsicIndices {
                io: Some(IoSemantics {
                    location,
                    num_slots: 1,
                }),
                dest_type: Some(dest_type),
                ..Default::default()
            },
        )
    }

    /// Loads a fragment input through a barycentric of kind `barycentric`.
    pub fn load_interpolated_input(
        &mut self,
        location: u32,
        num_components: u8,
        dest_type: SizedType,
        barycentric: IntrinsicOp,
        interp_mode: InterpMode,
    ) -> DefId {
        let bary = self.intrinsic_value(
            barycentric,
            &[],
            32,
            2,
            IntrinsicIndices {
                interp_mode,
                ..Default::default()
            },
        );
        let offset = self.imm_u32(0);
        self.intrinsic_value(
            IntrinsicOp::LoadInterpolatedInput,
            &[bary, offset],
            dest_type.bits,
            num_components,
            IntrinsicIndices {
                io: Some(IoSemantics {
                    location,
                    num_slots: 1,
                }),
                dest_type: Some(dest_type),
                ..Default::default()
            },
        )
    }

    pub fn tex(&mut self, tex: TexInstr) -> DefId {
        let id = tex.def.id;
        self.push(InstrKind::Tex(tex));
        id
    }

    pub fn jump(&mut self, jump: JumpKind) {
        self.push(InstrKind::Jump { jump });
    }

    /// A phi at the current position; callers place it at the top of a merge block.
    pub fn phi(&mut self, bit_size: u8, num_components: u8, srcs: &[(BlockId, DefId)]) -> DefId {
        let def = self.new_def(bit_size, num_components);
        let srcs = srcs
            .iter()
            .map(|&(pred, src)| PhiSrc { pred, src })
            .collect();
        self.push(InstrKind::Phi(Phi { def, srcs }));
        def.id
    }

    pub fn begin_if(&mut self, condition: DefId) {
        // Materialize the block holding the condition before the if node.
        self.block();
        self.stack.push(Frame::Then {
            condition,
            list: Vec::new(),
        });
    }

    pub fn begin_else(&mut self) -> Result<(), BuildError> {
        match self.stack.pop() {
            Some(Frame::Then {
                condition,
                mut list,
            }) => {
                Self::seal(&mut self.func, &mut list);
                self.stack.push(Frame::Else {
                    condition,
                    then_list: list,
                    list: Vec::new(),
                });
                Ok(())
            }
            Some(other) => {
                self.stack.push(other);
                Err(build_err("else without matching if"))
            }
            None => Err(build_err("builder stack is empty")),
        }
    }

    pub fn end_if(&mut self) -> Result<(), BuildError> {
        let (condition, mut then_list, mut else_list) = match self.stack.pop() {
            Some(Frame::Then { condition, list }) => (condition, list, Vec::new()),
            Some(Frame::Else {
                condition,
                then_list,
                list,
            }) => (condition, then_list, list),
            Some(other) => {
                self.stack.push(other);
                return Err(build_err("endif without matching if"));
            }
            None => return Err(build_err("builder stack is empty")),
        };
        Self::seal(&mut self.func, &mut then_list);
        Self::seal(&mut self.func, &mut else_list);
        self.list().push(CfNode::If(IfNode {
            condition,
            then_list,
            else_list,
        }));
        Ok(())
    }

    pub fn begin_loop(&mut self) {
        self.block();
        self.stack.push(Frame::Loop(Vec::new()));
    }

    pub fn end_loop(&mut self) -> Result<(), BuildError> {
        match self.stack.pop() {
            Some(Frame::Loop(mut body)) => {
                Self::seal(&mut self.func, &mut body);
                self.list().push(CfNode::Loop(LoopNode {
                    body,
                    has_continue_construct: false,
                }));
                Ok(())
            }
            Some(other) => {
                self.stack.push(other);
                Err(build_err("endloop without matching loop"))
            }
            None => Err(build_err("builder stack is empty")),
        }
    }

    pub fn finish(mut self) -> Result<Function, BuildError> {
        if self.stack.len() != 1 {
            return Err(build_err(format!(
                "{} unterminated control flow construct(s)",
                self.stack.len() - 1
            )));
        }
        let Some(Frame::Root(mut body)) = self.stack.pop() else {
            return Err(build_err("builder stack is corrupt"));
        };
        Self::seal(&mut self.func, &mut body);
        self.func.body = body;
        self.func.assign_ids();
        Ok(self.func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::cf_list_is_empty;

    #[test]
    fn if_lists_end_in_blocks() {
        let mut b = Builder::new("main");
        let c = b.imm_bool(true);
        b.begin_if(c);
        b.begin_if(c);
        b.end_if().unwrap();
        b.end_if().unwrap();
        let func = b.finish().unwrap();

        assert_eq!(func.body.len(), 3);
        let CfNode::If(outer) = &func.body[1] else {
            panic!("expected if");
        };
        assert!(matches!(outer.then_list.last(), Some(CfNode::Block(_))));
        assert!(cf_list_is_empty(&outer.else_list));
        assert!(matches!(func.body.last(), Some(CfNode::Block(_))));
    }

    #[test]
    fn mismatched_control_flow_is_rejected() {
        let mut b = Builder::new("main");
        b.begin_loop();
        assert!(b.end_if().is_err());
        assert!(b.begin_else().is_err());
        b.end_loop().unwrap();
        assert!(b.end_loop().is_err());

        let mut b = Builder::new("main");
        b.begin_loop();
        assert!(b.finish().is_err());
    }

    #[test]
    fn block_ids_are_unique() {
        let mut b = Builder::new("main");
        let c = b.imm_bool(false);
        b.begin_if(c);
        b.jump(JumpKind::Break);
        b.begin_else().unwrap();
        b.end_if().unwrap();
        let func = b.finish().unwrap();
        let mut ids = Vec::new();
        func.for_each_block(&mut |block| ids.push(block.id));
        let mut dedup = ids.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(ids.len(), dedup.len());
        assert!(ids.iter().all(|id| id.0 != 0));
    }
}
