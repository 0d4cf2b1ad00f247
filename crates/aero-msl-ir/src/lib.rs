//! SSA shader IR consumed by the `aero-msl` backend.
//!
//! A [`Shader`] holds one entry [`Function`] whose body is a structured control-flow tree of
//! [`Block`], [`IfNode`] and [`LoopNode`] nodes. Values are SSA [`Def`]s owned by the
//! instruction that produces them and referenced by [`DefId`] everywhere else.
//!
//! Programs can be built in code with [`Builder`] or deserialized from JSON via serde (call
//! [`Shader::prepare`] after deserializing).

mod builder;
mod dump;
mod error;
mod ir;
mod ops;
mod types;

pub use builder::Builder;
pub use error::{BuildError, ParseError};
pub use ir::{
    cf_list_is_empty, AluInstr, AluSrc, Block, BlockId, CfNode, Def, DefId, Function, IfNode,
    Instr, InstrId, InstrKind, IntrinsicIndices, IntrinsicInstr, IoSemantics, LoadConst,
    LoopNode, Phi, PhiSrc, Shader, ShaderInfo, TexInstr, TexSrc, IDENTITY_SWIZZLE,
};
pub use ops::{AluOp, AluOpInfo, IntrinsicInfo, IntrinsicOp, JumpKind, TexOp, TexSrcKind};
pub use types::{
    frag_result, varying_slot, Access, AtomicOp, BaseType, DepthLayout, InterpMode, MemoryModes,
    SamplerDim, Scope, ShaderStage, SizedType, SlotSet, SystemValues,
};
