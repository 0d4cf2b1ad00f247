//! Metal Shading Language backend for [`aero_msl_ir`] shader programs.
//!
//! Compilation runs in four phases:
//!
//! - [`preprocess`]: canonicalizing rewrites (I/O base folding, subgroup lowering, scalarization)
//!   and system-value collection;
//! - stage lowering chosen by the caller, either [`StageLowering`] or a closure passed to
//!   [`compile_with`];
//! - [`optimize`]: generic simplifications run to a fixpoint, then conversion out of SSA;
//! - [`generate_msl`]: type inference, I/O gathering and text emission.
//!
//! [`compile`] runs all of them in order.

#![forbid(unsafe_code)]

mod emit;
mod error;
pub mod io;
pub mod lower;
pub mod passes;
pub mod types;


use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use aero_msl_ir::{Shader, ShaderStage};

pub use crate::error::CompileError;
pub use crate::io::{gather_io_info, IoInfo, IoSlotInfo};
pub use crate::lower::{RenderTargetClass, StageLowering};
pub use crate::passes::{FnPass, Pass};
pub use crate::types::{infer_types, TiType, TypeMap};

pub const DEFAULT_ENTRY_POINT: &str = "main_entrypoint";
pub const DEFAULT_BANNER: &str = "// Generated by aero-msl";

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_owned()
}

fn default_banner() -> String {
    DEFAULT_BANNER.to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Name given to the generated entry point function.
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// First line of the output; empty to omit.
    #[serde(default = "default_banner")]
    pub banner: String,
    #[serde(default)]
    pub stage_lowering: StageLowering,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            entry_point: default_entry_point(),
            banner: default_banner(),
            stage_lowering: StageLowering::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MslOutput {
    pub msl: String,
    pub entry_point: String,
}

/// Canonicalizes a freshly built or deserialized program. Returns whether anything changed.
pub fn preprocess(shader: &mut Shader) -> bool {
    shader.prepare();
    let progress = passes::run_passes(shader, &passes::PREPROCESS);
    trace!(ir = %shader.entry, "after preprocess");
    progress
}

/// Runs the simplification passes until none makes progress. Returns the number of rounds that
/// did.
pub fn optimize_to_fixpoint(shader: &mut Shader) -> usize {
    passes::run_to_fixpoint(shader, &passes::OPTIMIZE_LOOP)
}

/// Optimizes to a fixpoint, then converts out of SSA. The result is ready for
/// [`generate_msl`] and must not be optimized again.
pub fn optimize(shader: &mut Shader) {
    let rounds = optimize_to_fixpoint(shader);
    passes::run_passes(shader, &passes::FINALIZE);
    debug!(rounds, "optimized");
    trace!(ir = %shader.entry, "after optimize");
}

/// Slot info for the stage's inputs and outputs. Compute shaders have none.
pub fn gather_info(shader: &Shader) -> Result<IoInfo, CompileError> {
    match shader.stage {
        ShaderStage::Compute => Ok(IoInfo::default()),
        ShaderStage::Vertex | ShaderStage::Fragment => gather_io_info(shader),
    }
}

/// Emits MSL for an optimized program. Renames the entry function and renumbers its defs so the
/// output's `tN` names are dense.
pub fn generate_msl(
    shader: &mut Shader,
    options: &CompileOptions,
) -> Result<MslOutput, CompileError> {
    shader.entry.name.clone_from(&options.entry_point);
    shader.entry.reindex_defs();

    let types = infer_types(&shader.entry);
    debug!(typed = types.len(), "inferred types");
    let io_info = gather_info(shader)?;
    let msl = emit::emit_program(shader, &types, &io_info, &options.banner)?;
    Ok(MslOutput {
        msl,
        entry_point: options.entry_point.clone(),
    })
}

/// Compiles `shader` with the stage lowering described by `options`.
///
/// `shader` is left in its final, optimized form.
pub fn compile(shader: &mut Shader, options: &CompileOptions) -> Result<MslOutput, CompileError> {
    compile_with(shader, options, |shader| options.stage_lowering.apply(shader))
}

/// Compiles `shader`, running `lower` as the stage lowering step instead of
/// `options.stage_lowering`.
pub fn compile_with<F>(
    shader: &mut Shader,
    options: &CompileOptions,
    lower: F,
) -> Result<MslOutput, CompileError>
where
    F: FnOnce(&mut Shader) -> Result<bool, CompileError>,
{
    debug!(stage = %shader.stage, entry = %options.entry_point, "compiling shader");
    preprocess(shader);
    if lower(shader)? {
        debug!("stage lowering changed the program");
    }
    optimize(shader);
    generate_msl(shader, options)
}
