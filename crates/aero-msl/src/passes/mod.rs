//! IR-to-IR rewrites run before emission.
//!
//! Every pass exposes `run(&mut Shader) -> bool`, returning whether it changed the program. The
//! [`Pass`] trait wraps those functions so pipelines can be described as data and driven to a
//! fixpoint.

pub mod algebraic;
pub mod constant_folding;
pub mod convert_from_ssa;
pub mod copy_prop;
pub mod cse;
pub mod dce;
pub mod dead_cf;
pub mod gather_system_values;
pub mod lower_alu_to_scalar;
pub mod lower_io_bases;
pub mod lower_subgroups;
pub mod opt_loop;
pub mod remove_phis;
pub mod trivialize_registers;

use hashbrown::HashMap;
use tracing::{debug, trace, warn};

use aero_msl_ir::{Block, CfNode, Def, DefId, Function, Instr, LoadConst, Shader};

/// A single IR rewrite.
pub trait Pass {
    fn name(&self) -> &'static str;

    /// Rewrites `shader` in place and reports whether anything changed.
    fn run(&self, shader: &mut Shader) -> bool;
}

/// A pass backed by a plain function.
#[derive(Clone, Copy)]
pub struct FnPass {
    name: &'static str,
    run: fn(&mut Shader) -> bool,
}

impl FnPass {
    pub const fn new(name: &'static str, run: fn(&mut Shader) -> bool) -> Self {
        Self { name, run }
    }
}

impl Pass for FnPass {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, shader: &mut Shader) -> bool {
        (self.run)(shader)
    }
}

impl std::fmt::Debug for FnPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FnPass").field(&self.name).finish()
    }
}

pub const COPY_PROP: FnPass = FnPass::new("copy_prop", copy_prop::run);
pub const DCE: FnPass = FnPass::new("dce", dce::run);
pub const CSE: FnPass = FnPass::new("cse", cse::run);
pub const DEAD_CF: FnPass = FnPass::new("dead_cf", dead_cf::run);
pub const CONSTANT_FOLDING: FnPass = FnPass::new("constant_folding", constant_folding::run);
pub const ALGEBRAIC: FnPass = FnPass::new("algebraic", algebraic::run);
pub const REMOVE_PHIS: FnPass = FnPass::new("remove_phis", remove_phis::run);
pub const OPT_LOOP: FnPass = FnPass::new("opt_loop", opt_loop::run);
pub const LOWER_ALU_TO_SCALAR: FnPass =
    FnPass::new("lower_alu_to_scalar", lower_alu_to_scalar::run);
pub const LOWER_IO_BASES: FnPass = FnPass::new("lower_io_bases", lower_io_bases::run);
pub const LOWER_SUBGROUPS: FnPass = FnPass::new("lower_subgroups", lower_subgroups::run);
pub const GATHER_SYSTEM_VALUES: FnPass =
    FnPass::new("gather_system_values", gather_system_values::run);
pub const CONVERT_FROM_SSA: FnPass = FnPass::new("convert_from_ssa", convert_from_ssa::run);
pub const TRIVIALIZE_REGISTERS: FnPass =
    FnPass::new("trivialize_registers", trivialize_registers::run);

/// Canonicalization run once on the incoming program.
pub const PREPROCESS: [FnPass; 4] = [
    LOWER_IO_BASES,
    LOWER_SUBGROUPS,
    LOWER_ALU_TO_SCALAR,
    GATHER_SYSTEM_VALUES,
];

/// Simplifications repeated until none of them makes progress.
pub const OPTIMIZE_LOOP: [FnPass; 9] = [
    COPY_PROP,
    DCE,
    CSE,
    DEAD_CF,
    CONSTANT_FOLDING,
    ALGEBRAIC,
    REMOVE_PHIS,
    OPT_LOOP,
    LOWER_ALU_TO_SCALAR,
];

/// Leaves SSA form. Runs exactly once, after the fixpoint.
pub const FINALIZE: [FnPass; 3] = [CONVERT_FROM_SSA, TRIVIALIZE_REGISTERS, COPY_PROP];

/// Safety net for the fixpoint loop; every listed pass shrinks or canonicalizes the program, so
/// real shaders settle in a handful of rounds.
pub const MAX_FIXPOINT_ROUNDS: usize = 64;

/// Runs each pass once, in order. Returns whether any of them made progress.
pub fn run_passes<P: Pass>(shader: &mut Shader, passes: &[P]) -> bool {
    let mut progress = false;
    for pass in passes {
        if pass.run(shader) {
            debug!(pass = pass.name(), "pass made progress");
            trace!(pass = pass.name(), ir = %shader.entry, "after pass");
            progress = true;
        }
    }
    progress
}

/// Repeats `passes` until a full round makes no progress. Returns the number of rounds that did.
pub fn run_to_fixpoint<P: Pass>(shader: &mut Shader, passes: &[P]) -> usize {
    let mut rounds = 0;
    while run_passes(shader, passes) {
        rounds += 1;
        if rounds >= MAX_FIXPOINT_ROUNDS {
            warn!(rounds, "optimization did not reach a fixpoint; continuing with current IR");
            break;
        }
    }
    debug!(rounds, "optimization fixpoint reached");
    rounds
}

/// Producing instruction of every def, by value.
pub(crate) fn def_map(func: &Function) -> HashMap<DefId, Instr> {
    func.def_table().into_iter().collect()
}

/// Shape of every def.
pub(crate) fn def_shapes(func: &Function) -> HashMap<DefId, Def> {
    let mut shapes = HashMap::new();
    func.for_each_instr(&mut |instr| {
        if let Some(def) = instr.def() {
            shapes.insert(def.id, *def);
        }
    });
    shapes
}

/// Every constant in the function.
pub(crate) fn constants(func: &Function) -> HashMap<DefId, LoadConst> {
    let mut consts = HashMap::new();
    func.for_each_instr(&mut |instr| {
        if let Some(load) = instr.as_load_const() {
            consts.insert(load.def.id, load.clone());
        }
    });
    consts
}

/// Rebuilds every block's instruction list through `rewrite`, which may allocate new defs and
/// instructions on the function while the body is detached.
///
/// `rewrite` receives each instruction by value and pushes its replacement(s) onto the output.
/// Returns whether it reported any change.
pub(crate) fn rewrite_blocks(
    func: &mut Function,
    rewrite: &mut impl FnMut(&mut Function, Instr, &mut Vec<Instr>) -> bool,
) -> bool {
    let mut body = std::mem::take(&mut func.body);
    let mut changed = false;
    rewrite_list(func, &mut body, rewrite, &mut changed);
    func.body = body;
    changed
}

fn rewrite_list(
    func: &mut Function,
    list: &mut [CfNode],
    rewrite: &mut impl FnMut(&mut Function, Instr, &mut Vec<Instr>) -> bool,
    changed: &mut bool,
) {
    for node in list {
        match node {
            CfNode::Block(block) => rewrite_block(func, block, rewrite, changed),
            CfNode::If(node) => {
                rewrite_list(func, &mut node.then_list, rewrite, changed);
                rewrite_list(func, &mut node.else_list, rewrite, changed);
            }
            CfNode::Loop(node) => rewrite_list(func, &mut node.body, rewrite, changed),
        }
    }
}

fn rewrite_block(
    func: &mut Function,
    block: &mut Block,
    rewrite: &mut impl FnMut(&mut Function, Instr, &mut Vec<Instr>) -> bool,
    changed: &mut bool,
) {
    let instrs = std::mem::take(&mut block.instrs);
    let mut out = Vec::with_capacity(instrs.len());
    for instr in instrs {
        *changed |= rewrite(func, instr, &mut out);
    }
    block.instrs = out;
}

/// Whether the first instruction of the first block in `list` is a phi.
pub(crate) fn starts_with_phi(list: &[CfNode]) -> bool {
    matches!(
        list.first(),
        Some(CfNode::Block(block)) if block.instrs.first().is_some_and(Instr::is_phi)
    )
}
