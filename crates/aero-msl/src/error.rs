use aero_msl_ir::{AluOp, DefId, IntrinsicOp, JumpKind, Scope, ShaderStage, SizedType, TexOp, TexSrcKind};
use thiserror::Error;

/// A program the backend cannot translate.
///
/// Every variant is a contract violation by the producer of the IR (an un-lowered construct or
/// malformed instruction). Operations that merely lack an emission rule do not fail; they leave a
/// visible placeholder in the generated source instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("jump `{0}` must be lowered to structured control flow before emission")]
    UnsupportedJump(JumpKind),
    #[error("phi {0} survived conversion out of SSA")]
    PhiNotLowered(DefId),
    #[error("loops with a continue construct are not supported")]
    ContinueConstruct,
    #[error("indexed I/O at location {location} spanning {num_slots} slots is not supported")]
    IndexedIo { location: u32, num_slots: u32 },
    #[error("I/O offset operand of `{op}` is not a constant")]
    NonConstantIoOffset { op: IntrinsicOp },
    #[error("{stage} shader has no I/O slot for location {location}")]
    UnknownSlot { stage: ShaderStage, location: u32 },
    #[error("I/O location {location} needs {components} components, at most 4 fit in a slot")]
    SlotTooWide { location: u32, components: u32 },
    #[error("I/O location {location} is accessed without a type")]
    UntypedSlot { location: u32 },
    #[error("I/O location {location} has type {ty}, which has no Metal equivalent")]
    UnsupportedIoType { location: u32, ty: SizedType },
    #[error("value {0} has no inferred type")]
    Untyped(DefId),
    #[error("value {def} has unsupported bit size {bits}")]
    BadBitSize { def: DefId, bits: u8 },
    #[error("value {0} is used but never defined")]
    UndefinedValue(DefId),
    #[error("`{op}` is missing its `{index}` index")]
    MissingIndex {
        op: IntrinsicOp,
        index: &'static str,
    },
    #[error("texture op `{op}` is missing its `{kind}` source")]
    MissingTexSrc { op: TexOp, kind: TexSrcKind },
    #[error("texture projectors must be lowered before emission")]
    TexProjector,
    #[error("`{op}` expects {expected} sources, found {found}")]
    AluSrcCount {
        op: AluOp,
        expected: usize,
        found: usize,
    },
    #[error("`{op}` produces a value but has no destination")]
    MissingDef { op: IntrinsicOp },
    #[error("`{op}` expects at least {expected} sources, found {found}")]
    SrcCount {
        op: IntrinsicOp,
        expected: usize,
        found: usize,
    },
    #[error("`{op}` with non-zero base {base} must go through base lowering first")]
    NonZeroBase { op: IntrinsicOp, base: i32 },
    #[error("`{op}` is not valid in a {stage} shader")]
    WrongStage { op: IntrinsicOp, stage: ShaderStage },
    #[error("stage lowering `{helper}` does not apply to a {stage} shader")]
    LoweringStage {
        helper: &'static str,
        stage: ShaderStage,
    },
    #[error("unsupported memory scope `{0}` for a fence")]
    BadFenceScope(Scope),
    #[error("unsupported barrier execution scope `{0}`")]
    BadBarrierScope(Scope),
    #[error("interpolated input {0} does not read a barycentric")]
    BadBarycentric(DefId),
    #[error("texture element type {0} has no Metal texture equivalent")]
    BadTextureType(SizedType),
}
