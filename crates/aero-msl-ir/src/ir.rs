use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::ops::{AluOp, IntrinsicOp, JumpKind, TexOp, TexSrcKind};
use crate::types::{
    Access, AtomicOp, DepthLayout, InterpMode, MemoryModes, SamplerDim, Scope, ShaderStage,
    SizedType, SlotSet, SystemValues,
};

/// Identity of an SSA value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefId(pub u32);

impl fmt::Display for DefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Identity of an instruction. Assigned by [`Function::assign_ids`]; not serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InstrId(pub u32);

/// Identity of a basic block. `0` in serialized input means "assign one".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// An SSA definition: owned by the instruction that produces it.
///
/// Deserialization rejects shapes outside `bit_size` in {1, 8, 16, 32, 64} and
/// `num_components` in 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDef")]
pub struct Def {
    pub id: DefId,
    pub bit_size: u8,
    pub num_components: u8,
}

#[derive(Deserialize)]
struct RawDef {
    id: DefId,
    bit_size: u8,
    num_components: u8,
}

impl TryFrom<RawDef> for Def {
    type Error = ParseError;

    fn try_from(raw: RawDef) -> Result<Self, Self::Error> {
        let bits_ok = matches!(raw.bit_size, 1 | 8 | 16 | 32 | 64);
        if !bits_ok || !(1..=4).contains(&raw.num_components) {
            return Err(ParseError::BadDefShape {
                def: raw.id,
                bit_size: raw.bit_size,
                num_components: raw.num_components,
            });
        }
        Ok(Def {
            id: raw.id,
            bit_size: raw.bit_size,
            num_components: raw.num_components,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AluSrc {
    pub src: DefId,
    #[serde(default = "identity_swizzle", skip_serializing_if = "is_identity_swizzle")]
    pub swizzle: [u8; 4],
}

pub const IDENTITY_SWIZZLE: [u8; 4] = [0, 1, 2, 3];

fn identity_swizzle() -> [u8; 4] {
    IDENTITY_SWIZZLE
}

fn is_identity_swizzle(swizzle: &[u8; 4]) -> bool {
    *swizzle == IDENTITY_SWIZZLE
}

impl AluSrc {
    pub fn new(src: DefId) -> Self {
        Self {
            src,
            swizzle: IDENTITY_SWIZZLE,
        }
    }

    pub fn swizzled(src: DefId, swizzle: [u8; 4]) -> Self {
        Self { src, swizzle }
    }

    /// Selects a single component of `src`.
    pub fn component(src: DefId, component: u8) -> Self {
        Self {
            src,
            swizzle: [component; 4],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AluInstr {
    pub op: AluOp,
    pub def: Def,
    pub srcs: Vec<AluSrc>,
}

impl AluInstr {
    /// Number of components operand `src` contributes to this instruction.
    pub fn src_components(&self, src: usize) -> u8 {
        let size = self.op.info().input_sizes[src];
        if size == 0 {
            self.def.num_components
        } else {
            size
        }
    }

    /// An operand is trivial when it reads every component of its def in order.
    pub fn src_is_trivial(&self, src: usize, src_def_components: u8) -> bool {
        let n = self.src_components(src);
        n == src_def_components
            && self.srcs[src].swizzle[..usize::from(n)]
                .iter()
                .enumerate()
                .all(|(i, &c)| usize::from(c) == i)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IoSemantics {
    pub location: u32,
    #[serde(default = "one")]
    pub num_slots: u32,
}

fn one() -> u32 {
    1
}

/// Constant indices attached to an intrinsic. Which ones are meaningful depends on the op.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrinsicIndices {
    pub base: i32,
    pub component: u8,
    pub write_mask: Option<u8>,
    pub io: Option<IoSemantics>,
    pub dest_type: Option<SizedType>,
    pub src_type: Option<SizedType>,
    pub interp_mode: InterpMode,
    pub atomic_op: Option<AtomicOp>,
    pub reduction_op: Option<AluOp>,
    pub execution_scope: Scope,
    pub memory_scope: Scope,
    pub memory_modes: MemoryModes,
    pub image_dim: Option<SamplerDim>,
    pub image_array: bool,
    pub access: Access,
    pub binding: u32,
    pub bit_size: u8,
    pub num_components: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicInstr {
    pub op: IntrinsicOp,
    #[serde(default)]
    pub srcs: Vec<DefId>,
    #[serde(default)]
    pub def: Option<Def>,
    #[serde(default)]
    pub index: IntrinsicIndices,
}

impl IntrinsicInstr {
    pub fn new(op: IntrinsicOp, srcs: Vec<DefId>, def: Option<Def>) -> Self {
        Self {
            op,
            srcs,
            def,
            index: IntrinsicIndices::default(),
        }
    }

    /// The write mask index, or every component of an `num_components`-wide value.
    pub fn write_mask_or_full(&self, num_components: u8) -> u8 {
        self.index
            .write_mask
            .unwrap_or_else(|| ((1u16 << num_components) - 1) as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TexSrc {
    pub kind: TexSrcKind,
    pub src: DefId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TexInstr {
    pub op: TexOp,
    pub def: Def,
    pub srcs: Vec<TexSrc>,
    pub sampler_dim: SamplerDim,
    #[serde(default)]
    pub is_array: bool,
    pub coord_components: u8,
    #[serde(default)]
    pub component: u8,
    pub dest_type: SizedType,
}

impl TexInstr {
    pub fn src(&self, kind: TexSrcKind) -> Option<DefId> {
        self.srcs.iter().find(|s| s.kind == kind).map(|s| s.src)
    }
}

/// Per-component raw bits, interpreted according to the def's bit size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConst {
    pub def: Def,
    pub values: Vec<u64>,
}

impl LoadConst {
    pub fn component_bits(&self, component: u8) -> u64 {
        self.values.get(usize::from(component)).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhiSrc {
    pub pred: BlockId,
    pub src: DefId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phi {
    pub def: Def,
    pub srcs: Vec<PhiSrc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstrKind {
    Alu(AluInstr),
    Intrinsic(IntrinsicInstr),
    Tex(TexInstr),
    Jump { jump: JumpKind },
    LoadConst(LoadConst),
    Undef { def: Def },
    Phi(Phi),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instr {
    #[serde(skip)]
    pub id: InstrId,
    #[serde(flatten)]
    pub kind: InstrKind,
}

impl Instr {
    pub fn new(kind: InstrKind) -> Self {
        Self {
            id: InstrId::default(),
            kind,
        }
    }

    pub fn def(&self) -> Option<&Def> {
        match &self.kind {
            InstrKind::Alu(alu) => Some(&alu.def),
            InstrKind::Intrinsic(intr) => intr.def.as_ref(),
            InstrKind::Tex(tex) => Some(&tex.def),
            InstrKind::LoadConst(load) => Some(&load.def),
            InstrKind::Undef { def } => Some(def),
            InstrKind::Phi(phi) => Some(&phi.def),
            InstrKind::Jump { .. } => None,
        }
    }

    pub fn def_mut(&mut self) -> Option<&mut Def> {
        match &mut self.kind {
            InstrKind::Alu(alu) => Some(&mut alu.def),
            InstrKind::Intrinsic(intr) => intr.def.as_mut(),
            InstrKind::Tex(tex) => Some(&mut tex.def),
            InstrKind::LoadConst(load) => Some(&mut load.def),
            InstrKind::Undef { def } => Some(def),
            InstrKind::Phi(phi) => Some(&mut phi.def),
            InstrKind::Jump { .. } => None,
        }
    }

    /// SSA sources in operand order.
    pub fn srcs(&self) -> Vec<DefId> {
        match &self.kind {
            InstrKind::Alu(alu) => alu.srcs.iter().map(|s| s.src).collect(),
            InstrKind::Intrinsic(intr) => intr.srcs.clone(),
            InstrKind::Tex(tex) => tex.srcs.iter().map(|s| s.src).collect(),
            InstrKind::Phi(phi) => phi.srcs.iter().map(|s| s.src).collect(),
            InstrKind::Jump { .. } | InstrKind::LoadConst(_) | InstrKind::Undef { .. } => {
                Vec::new()
            }
        }
    }

    pub fn srcs_mut(&mut self) -> Vec<&mut DefId> {
        match &mut self.kind {
            InstrKind::Alu(alu) => alu.srcs.iter_mut().map(|s| &mut s.src).collect(),
            InstrKind::Intrinsic(intr) => intr.srcs.iter_mut().collect(),
            InstrKind::Tex(tex) => tex.srcs.iter_mut().map(|s| &mut s.src).collect(),
            InstrKind::Phi(phi) => phi.srcs.iter_mut().map(|s| &mut s.src).collect(),
            InstrKind::Jump { .. } | InstrKind::LoadConst(_) | InstrKind::Undef { .. } => {
                Vec::new()
            }
        }
    }

    pub fn as_alu(&self) -> Option<&AluInstr> {
        match &self.kind {
            InstrKind::Alu(alu) => Some(alu),
            _ => None,
        }
    }

    pub fn as_intrinsic(&self) -> Option<&IntrinsicInstr> {
        match &self.kind {
            InstrKind::Intrinsic(intr) => Some(intr),
            _ => None,
        }
    }

    pub fn as_load_const(&self) -> Option<&LoadConst> {
        match &self.kind {
            InstrKind::LoadConst(load) => Some(load),
            _ => None,
        }
    }

    pub fn is_intrinsic(&self, op: IntrinsicOp) -> bool {
        matches!(&self.kind, InstrKind::Intrinsic(intr) if intr.op == op)
    }

    pub fn is_jump(&self) -> bool {
        matches!(self.kind, InstrKind::Jump { .. })
    }

    pub fn is_phi(&self) -> bool {
        matches!(self.kind, InstrKind::Phi(_))
    }

    /// Whether the instruction may be deleted when its result is unused.
    pub fn is_removable(&self) -> bool {
        match &self.kind {
            InstrKind::Alu(_) | InstrKind::Tex(_) | InstrKind::LoadConst(_) => true,
            InstrKind::Undef { .. } | InstrKind::Phi(_) => true,
            InstrKind::Intrinsic(intr) => intr.op.info().can_eliminate,
            InstrKind::Jump { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: BlockId,
    #[serde(default)]
    pub instrs: Vec<Instr>,
}

impl Block {
    /// The trailing jump, if the block ends in one.
    pub fn jump(&self) -> Option<JumpKind> {
        match self.instrs.last().map(|i| &i.kind) {
            Some(InstrKind::Jump { jump }) => Some(*jump),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfNode {
    pub condition: DefId,
    #[serde(default)]
    pub then_list: Vec<CfNode>,
    #[serde(default)]
    pub else_list: Vec<CfNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopNode {
    #[serde(default)]
    pub body: Vec<CfNode>,
    #[serde(default)]
    pub has_continue_construct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum CfNode {
    Block(Block),
    If(IfNode),
    Loop(LoopNode),
}

/// A control-flow list is "empty" when it holds nothing but instruction-free blocks.
pub fn cf_list_is_empty(list: &[CfNode]) -> bool {
    list.iter()
        .all(|node| matches!(node, CfNode::Block(block) if block.instrs.is_empty()))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub body: Vec<CfNode>,
    #[serde(skip)]
    next_def: u32,
    #[serde(skip)]
    next_instr: u32,
    #[serde(skip)]
    next_block: u32,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_body(name: impl Into<String>, body: Vec<CfNode>) -> Self {
        let mut func = Self::new(name);
        func.body = body;
        func.assign_ids();
        func
    }

    /// Gives every instruction and unnumbered block an id and primes the def allocator.
    ///
    /// Safe to call repeatedly; existing non-zero block ids are preserved.
    pub fn assign_ids(&mut self) {
        let mut max_def = None::<u32>;
        let mut max_block = 0;
        visit_blocks(&self.body, &mut |block| {
            max_block = max_block.max(block.id.0);
            for instr in &block.instrs {
                if let Some(def) = instr.def() {
                    max_def = Some(max_def.map_or(def.id.0, |m| m.max(def.id.0)));
                }
            }
        });
        self.next_def = self.next_def.max(max_def.map_or(0, |m| m.saturating_add(1)));
        self.next_block = self.next_block.max(max_block.saturating_add(1));

        let mut next_instr = 0;
        let mut next_block = self.next_block;
        visit_blocks_mut(&mut self.body, &mut |block| {
            if block.id.0 == 0 {
                block.id = BlockId(next_block);
                next_block += 1;
            }
            for instr in &mut block.instrs {
                instr.id = InstrId(next_instr);
                next_instr += 1;
            }
        });
        self.next_block = next_block;
        self.next_instr = next_instr;
    }

    pub fn alloc_def(&mut self, bit_size: u8, num_components: u8) -> Def {
        let id = DefId(self.next_def);
        self.next_def += 1;
        Def {
            id,
            bit_size,
            num_components,
        }
    }

    pub fn alloc_instr(&mut self, kind: InstrKind) -> Instr {
        let id = InstrId(self.next_instr);
        self.next_instr += 1;
        Instr { id, kind }
    }

    pub fn alloc_block(&mut self) -> Block {
        // Block id 0 is reserved for "unassigned".
        self.next_block = self.next_block.max(1);
        let id = BlockId(self.next_block);
        self.next_block += 1;
        Block {
            id,
            instrs: Vec::new(),
        }
    }

    /// Upper bound (exclusive) of def ids in use.
    pub fn def_count(&self) -> u32 {
        self.next_def
    }

    /// Every instruction in program order.
    pub fn instrs(&self) -> Vec<&Instr> {
        let mut out = Vec::new();
        collect_instrs(&self.body, &mut out);
        out
    }

    pub fn for_each_instr(&self, f: &mut impl FnMut(&Instr)) {
        visit_blocks(&self.body, &mut |block| block.instrs.iter().for_each(&mut *f));
    }

    pub fn for_each_instr_mut(&mut self, f: &mut impl FnMut(&mut Instr)) {
        visit_blocks_mut(&mut self.body, &mut |block| {
            block.instrs.iter_mut().for_each(&mut *f)
        });
    }

    pub fn for_each_block(&self, f: &mut impl FnMut(&Block)) {
        visit_blocks(&self.body, f);
    }

    pub fn for_each_block_mut(&mut self, f: &mut impl FnMut(&mut Block)) {
        visit_blocks_mut(&mut self.body, f);
    }

    /// Looks up the defining instruction of every def.
    pub fn def_table(&self) -> BTreeMap<DefId, Instr> {
        let mut table = BTreeMap::new();
        self.for_each_instr(&mut |instr| {
            if let Some(def) = instr.def() {
                table.insert(def.id, instr.clone());
            }
        });
        table
    }

    /// Replaces every use of `from` (instruction operands and if conditions) with `to`.
    pub fn rewrite_uses(&mut self, from: DefId, to: DefId) -> bool {
        let mut changed = false;
        rewrite_uses_in(&mut self.body, from, to, &mut changed);
        changed
    }

    /// Number of uses of each def, counting if conditions.
    pub fn use_counts(&self) -> BTreeMap<DefId, usize> {
        let mut counts = BTreeMap::new();
        count_uses(&self.body, &mut counts);
        counts
    }

    /// Renumbers defs densely in program order, starting at zero.
    pub fn reindex_defs(&mut self) {
        let mut remap = BTreeMap::new();
        let mut next = 0u32;
        self.for_each_instr(&mut |instr| {
            if let Some(def) = instr.def() {
                remap.insert(def.id, DefId(next));
                next += 1;
            }
        });
        remap_defs(&mut self.body, &remap);
        self.next_def = next;
    }
}

fn collect_instrs<'a>(list: &'a [CfNode], out: &mut Vec<&'a Instr>) {
    for node in list {
        match node {
            CfNode::Block(block) => out.extend(block.instrs.iter()),
            CfNode::If(node) => {
                collect_instrs(&node.then_list, out);
                collect_instrs(&node.else_list, out);
            }
            CfNode::Loop(node) => collect_instrs(&node.body, out),
        }
    }
}

fn visit_blocks(list: &[CfNode], f: &mut impl FnMut(&Block)) {
    for node in list {
        match node {
            CfNode::Block(block) => f(block),
            CfNode::If(node) => {
                visit_blocks(&node.then_list, f);
                visit_blocks(&node.else_list, f);
            }
            CfNode::Loop(node) => visit_blocks(&node.body, f),
        }
    }
}

fn visit_blocks_mut(list: &mut [CfNode], f: &mut impl FnMut(&mut Block)) {
    for node in list {
        match node {
            CfNode::Block(block) => f(block),
            CfNode::If(node) => {
                visit_blocks_mut(&mut node.then_list, f);
                visit_blocks_mut(&mut node.else_list, f);
            }
            CfNode::Loop(node) => visit_blocks_mut(&mut node.body, f),
        }
    }
}

fn rewrite_uses_in(list: &mut [CfNode], from: DefId, to: DefId, changed: &mut bool) {
    for node in list {
        match node {
            CfNode::Block(block) => {
                for instr in &mut block.instrs {
                    for src in instr.srcs_mut() {
                        if *src == from {
                            *src = to;
                            *changed = true;
                        }
                    }
                }
            }
            CfNode::If(node) => {
                if node.condition == from {
                    node.condition = to;
                    *changed = true;
                }
                rewrite_uses_in(&mut node.then_list, from, to, changed);
                rewrite_uses_in(&mut node.else_list, from, to, changed);
            }
            CfNode::Loop(node) => rewrite_uses_in(&mut node.body, from, to, changed),
        }
    }
}

fn count_uses(list: &[CfNode], counts: &mut BTreeMap<DefId, usize>) {
    for node in list {
        match node {
            CfNode::Block(block) => {
                for instr in &block.instrs {
                    for src in instr.srcs() {
                        *counts.entry(src).or_default() += 1;
                    }
                }
            }
            CfNode::If(node) => {
                *counts.entry(node.condition).or_default() += 1;
                count_uses(&node.then_list, counts);
                count_uses(&node.else_list, counts);
            }
            CfNode::Loop(node) => count_uses(&node.body, counts),
        }
    }
}

fn remap_defs(list: &mut [CfNode], remap: &BTreeMap<DefId, DefId>) {
    let lookup = |id: DefId| remap.get(&id).copied().unwrap_or(id);
    for node in list {
        match node {
            CfNode::Block(block) => {
                for instr in &mut block.instrs {
                    if let Some(def) = instr.def_mut() {
                        def.id = lookup(def.id);
                    }
                    for src in instr.srcs_mut() {
                        *src = lookup(*src);
                    }
                }
            }
            CfNode::If(node) => {
                node.condition = lookup(node.condition);
                remap_defs(&mut node.then_list, remap);
                remap_defs(&mut node.else_list, remap);
            }
            CfNode::Loop(node) => remap_defs(&mut node.body, remap),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderInfo {
    pub inputs_read: SlotSet,
    pub outputs_written: SlotSet,
    pub outputs_read: SlotSet,
    pub system_values_read: SystemValues,
    pub shared_size: u32,
    pub scratch_size: u32,
    pub early_fragment_tests: bool,
    pub depth_layout: DepthLayout,
}

/// One shader program: a stage, its I/O metadata and a single entry function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shader {
    pub stage: ShaderStage,
    #[serde(default)]
    pub info: ShaderInfo,
    pub entry: Function,
}

impl Shader {
    pub fn new(stage: ShaderStage, entry: Function) -> Self {
        Self {
            stage,
            info: ShaderInfo::default(),
            entry,
        }
    }

    /// Prepares a deserialized program for use: assigns instruction and block ids.
    pub fn prepare(&mut self) {
        self.entry.assign_ids();
    }
}
