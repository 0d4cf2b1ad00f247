//! Closed operation tables for ALU, intrinsic and texture instructions.

use crate::types::{named_enum, BaseType, SystemValues};

named_enum! {
    pub enum AluOp {
        Mov => "mov",
        Vec2 => "vec2",
        Vec3 => "vec3",
        Vec4 => "vec4",
        Bcsel => "bcsel",

        Iadd => "iadd",
        Isub => "isub",
        Imul => "imul",
        Idiv => "idiv",
        Udiv => "udiv",
        Irem => "irem",
        Imod => "imod",
        Umod => "umod",
        Ineg => "ineg",
        Iabs => "iabs",
        Isign => "isign",
        Imax => "imax",
        Imin => "imin",
        Umax => "umax",
        Umin => "umin",
        ImulHigh => "imul_high",
        UmulHigh => "umul_high",
        IaddSat => "iadd_sat",
        UaddSat => "uadd_sat",
        UsubSat => "usub_sat",

        Iand => "iand",
        Ior => "ior",
        Ixor => "ixor",
        Inot => "inot",
        Ishl => "ishl",
        Ishr => "ishr",
        Ushr => "ushr",
        BitfieldInsert => "bitfield_insert",
        IbitfieldExtract => "ibitfield_extract",
        UbitfieldExtract => "ubitfield_extract",
        BitfieldReverse => "bitfield_reverse",
        BitCount => "bit_count",
        Uclz => "uclz",
        UfindMsb => "ufind_msb",
        FindLsb => "find_lsb",

        Ieq => "ieq",
        Ine => "ine",
        Ilt => "ilt",
        Ige => "ige",
        Ult => "ult",
        Uge => "uge",
        Feq => "feq",
        Fneu => "fneu",
        Flt => "flt",
        Fge => "fge",

        Fadd => "fadd",
        Fsub => "fsub",
        Fmul => "fmul",
        Fdiv => "fdiv",
        Fneg => "fneg",
        Fabs => "fabs",
        Fsat => "fsat",
        Fsign => "fsign",
        Fceil => "fceil",
        Ffloor => "ffloor",
        Ffract => "ffract",
        Ftrunc => "ftrunc",
        FroundEven => "fround_even",
        Fsqrt => "fsqrt",
        Frsq => "frsq",
        Frcp => "frcp",
        Fexp2 => "fexp2",
        Flog2 => "flog2",
        Fsin => "fsin",
        Fcos => "fcos",
        Fpow => "fpow",
        Fmax => "fmax",
        Fmin => "fmin",
        Frem => "frem",
        Ffma => "ffma",
        Flrp => "flrp",
        Fdot2 => "fdot2",
        Fdot3 => "fdot3",
        Fdot4 => "fdot4",
        Ldexp => "ldexp",
        Fisfinite => "fisfinite",
        Fisnormal => "fisnormal",
        Fquantize2f16 => "fquantize2f16",
        Fddx => "fddx",
        Fddy => "fddy",

        PackSnorm4x8 => "pack_snorm_4x8",
        PackUnorm4x8 => "pack_unorm_4x8",
        PackSnorm2x16 => "pack_snorm_2x16",
        PackUnorm2x16 => "pack_unorm_2x16",
        PackHalf2x16 => "pack_half_2x16",
        UnpackSnorm4x8 => "unpack_snorm_4x8",
        UnpackUnorm4x8 => "unpack_unorm_4x8",
        UnpackSnorm2x16 => "unpack_snorm_2x16",
        UnpackUnorm2x16 => "unpack_unorm_2x16",
        UnpackHalf2x16SplitX => "unpack_half_2x16_split_x",

        B2b1 => "b2b1",
        B2b32 => "b2b32",
        B2i8 => "b2i8",
        B2i16 => "b2i16",
        B2i32 => "b2i32",
        B2i64 => "b2i64",
        B2f16 => "b2f16",
        B2f32 => "b2f32",
        I2f16 => "i2f16",
        U2f16 => "u2f16",
        I2f32 => "i2f32",
        U2f32 => "u2f32",
        I2i8 => "i2i8",
        I2i16 => "i2i16",
        I2i32 => "i2i32",
        I2i64 => "i2i64",
        F2i8 => "f2i8",
        F2i16 => "f2i16",
        F2i32 => "f2i32",
        F2i64 => "f2i64",
        F2u8 => "f2u8",
        F2u16 => "f2u16",
        F2u32 => "f2u32",
        F2u64 => "f2u64",
        U2u8 => "u2u8",
        U2u16 => "u2u16",
        U2u32 => "u2u32",
        U2u64 => "u2u64",
        F2f16 => "f2f16",
        F2f16Rtne => "f2f16_rtne",
        F2f32 => "f2f32",
    }
}

/// Signature of an ALU opcode.
///
/// A size of 0 means "per component": the operand has as many components as the destination.
/// Bit sizes are not part of the signature except for conversions, which fix the output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluOpInfo {
    pub num_inputs: usize,
    pub output_type: BaseType,
    pub output_size: u8,
    pub output_bits: Option<u8>,
    pub input_types: [BaseType; 4],
    pub input_sizes: [u8; 4],
}

const fn unop(out: BaseType, input: BaseType) -> AluOpInfo {
    AluOpInfo {
        num_inputs: 1,
        output_type: out,
        output_size: 0,
        output_bits: None,
        input_types: [input, input, input, input],
        input_sizes: [0; 4],
    }
}

const fn binop(out: BaseType, input: BaseType) -> AluOpInfo {
    AluOpInfo {
        num_inputs: 2,
        ..unop(out, input)
    }
}

const fn triop(out: BaseType, input: BaseType) -> AluOpInfo {
    AluOpInfo {
        num_inputs: 3,
        ..unop(out, input)
    }
}

const fn conv(out: BaseType, bits: u8, input: BaseType) -> AluOpInfo {
    AluOpInfo {
        output_bits: Some(bits),
        ..unop(out, input)
    }
}

const fn horiz(out: BaseType, out_size: u8, input: BaseType, in_size: u8, n: usize) -> AluOpInfo {
    AluOpInfo {
        num_inputs: n,
        output_type: out,
        output_size: out_size,
        output_bits: None,
        input_types: [input; 4],
        input_sizes: [in_size; 4],
    }
}

impl AluOp {
    pub fn info(self) -> AluOpInfo {
        use BaseType::{Bool as B, Float as F, Int as I, Uint as U};
        match self {
            AluOp::Mov => unop(U, U),
            AluOp::Vec2 => horiz(U, 2, U, 1, 2),
            AluOp::Vec3 => horiz(U, 3, U, 1, 3),
            AluOp::Vec4 => horiz(U, 4, U, 1, 4),
            AluOp::Bcsel => AluOpInfo {
                input_types: [B, U, U, U],
                ..triop(U, U)
            },

            AluOp::Iadd | AluOp::Isub | AluOp::Imul | AluOp::Idiv | AluOp::Irem | AluOp::Imod => {
                binop(I, I)
            }
            AluOp::Imax | AluOp::Imin | AluOp::ImulHigh | AluOp::IaddSat => binop(I, I),
            AluOp::Udiv
            | AluOp::Umod
            | AluOp::Umax
            | AluOp::Umin
            | AluOp::UmulHigh
            | AluOp::UaddSat
            | AluOp::UsubSat => binop(U, U),
            AluOp::Ineg | AluOp::Iabs | AluOp::Isign => unop(I, I),

            AluOp::Iand | AluOp::Ior | AluOp::Ixor => binop(U, U),
            AluOp::Inot => unop(U, U),
            AluOp::Ishl | AluOp::Ishr => AluOpInfo {
                input_types: [I, U, U, U],
                ..binop(I, I)
            },
            AluOp::Ushr => binop(U, U),
            AluOp::BitfieldInsert => AluOpInfo {
                num_inputs: 4,
                input_types: [U, U, I, I],
                ..unop(U, U)
            },
            AluOp::IbitfieldExtract => triop(I, I),
            AluOp::UbitfieldExtract => AluOpInfo {
                input_types: [U, I, I, I],
                ..triop(U, U)
            },
            AluOp::BitfieldReverse | AluOp::Uclz => unop(U, U),
            AluOp::BitCount | AluOp::UfindMsb => unop(U, U),
            AluOp::FindLsb => unop(I, I),

            AluOp::Ieq | AluOp::Ine | AluOp::Ilt | AluOp::Ige => binop(B, I),
            AluOp::Ult | AluOp::Uge => binop(B, U),
            AluOp::Feq | AluOp::Fneu | AluOp::Flt | AluOp::Fge => binop(B, F),

            AluOp::Fadd
            | AluOp::Fsub
            | AluOp::Fmul
            | AluOp::Fdiv
            | AluOp::Fpow
            | AluOp::Fmax
            | AluOp::Fmin
            | AluOp::Frem => binop(F, F),
            AluOp::Fneg
            | AluOp::Fabs
            | AluOp::Fsat
            | AluOp::Fsign
            | AluOp::Fceil
            | AluOp::Ffloor
            | AluOp::Ffract
            | AluOp::Ftrunc
            | AluOp::FroundEven
            | AluOp::Fsqrt
            | AluOp::Frsq
            | AluOp::Frcp
            | AluOp::Fexp2
            | AluOp::Flog2
            | AluOp::Fsin
            | AluOp::Fcos
            | AluOp::Fquantize2f16
            | AluOp::Fddx
            | AluOp::Fddy => unop(F, F),
            AluOp::Ffma | AluOp::Flrp => triop(F, F),
            AluOp::Fdot2 => horiz(F, 1, F, 2, 2),
            AluOp::Fdot3 => horiz(F, 1, F, 3, 2),
            AluOp::Fdot4 => horiz(F, 1, F, 4, 2),
            AluOp::Ldexp => AluOpInfo {
                input_types: [F, I, I, I],
                ..binop(F, F)
            },
            AluOp::Fisfinite | AluOp::Fisnormal => unop(B, F),

            AluOp::PackSnorm4x8 | AluOp::PackUnorm4x8 => horiz(U, 1, F, 4, 1),
            AluOp::PackSnorm2x16 | AluOp::PackUnorm2x16 | AluOp::PackHalf2x16 => {
                horiz(U, 1, F, 2, 1)
            }
            AluOp::UnpackSnorm4x8 | AluOp::UnpackUnorm4x8 => horiz(F, 4, U, 1, 1),
            AluOp::UnpackSnorm2x16 | AluOp::UnpackUnorm2x16 => horiz(F, 2, U, 1, 1),
            AluOp::UnpackHalf2x16SplitX => unop(F, U),

            AluOp::B2b1 => conv(B, 1, B),
            AluOp::B2b32 => conv(B, 32, B),
            AluOp::B2i8 => conv(I, 8, B),
            AluOp::B2i16 => conv(I, 16, B),
            AluOp::B2i32 => conv(I, 32, B),
            AluOp::B2i64 => conv(I, 64, B),
            AluOp::B2f16 => conv(F, 16, B),
            AluOp::B2f32 => conv(F, 32, B),
            AluOp::I2f16 => conv(F, 16, I),
            AluOp::U2f16 => conv(F, 16, U),
            AluOp::I2f32 => conv(F, 32, I),
            AluOp::U2f32 => conv(F, 32, U),
            AluOp::I2i8 => conv(I, 8, I),
            AluOp::I2i16 => conv(I, 16, I),
            AluOp::I2i32 => conv(I, 32, I),
            AluOp::I2i64 => conv(I, 64, I),
            AluOp::F2i8 => conv(I, 8, F),
            AluOp::F2i16 => conv(I, 16, F),
            AluOp::F2i32 => conv(I, 32, F),
            AluOp::F2i64 => conv(I, 64, F),
            AluOp::F2u8 => conv(U, 8, F),
            AluOp::F2u16 => conv(U, 16, F),
            AluOp::F2u32 => conv(U, 32, F),
            AluOp::F2u64 => conv(U, 64, F),
            AluOp::U2u8 => conv(U, 8, U),
            AluOp::U2u16 => conv(U, 16, U),
            AluOp::U2u32 => conv(U, 32, U),
            AluOp::U2u64 => conv(U, 64, U),
            AluOp::F2f16 | AluOp::F2f16Rtne => conv(F, 16, F),
            AluOp::F2f32 => conv(F, 32, F),
        }
    }

    /// Ops whose operands are not per-component with the destination.
    pub fn is_horizontal(self) -> bool {
        let info = self.info();
        info.output_size != 0 || info.input_sizes[..info.num_inputs].iter().any(|&s| s != 0)
    }

    pub fn is_vec(self) -> bool {
        matches!(self, AluOp::Vec2 | AluOp::Vec3 | AluOp::Vec4)
    }

    pub fn vec_for_components(num_components: u8) -> Option<AluOp> {
        match num_components {
            2 => Some(AluOp::Vec2),
            3 => Some(AluOp::Vec3),
            4 => Some(AluOp::Vec4),
            _ => None,
        }
    }

    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            AluOp::Iadd
                | AluOp::Imul
                | AluOp::Imax
                | AluOp::Imin
                | AluOp::Umax
                | AluOp::Umin
                | AluOp::Iand
                | AluOp::Ior
                | AluOp::Ixor
                | AluOp::Ieq
                | AluOp::Ine
                | AluOp::Feq
                | AluOp::Fneu
                | AluOp::Fadd
                | AluOp::Fmul
                | AluOp::Fmax
                | AluOp::Fmin
        )
    }
}

named_enum! {
    pub enum IntrinsicOp {
        DeclReg => "decl_reg",
        LoadReg => "load_reg",
        StoreReg => "store_reg",

        LoadSubgroupSize => "load_subgroup_size",
        LoadSubgroupInvocation => "load_subgroup_invocation",
        LoadNumSubgroups => "load_num_subgroups",
        LoadSubgroupId => "load_subgroup_id",
        LoadWorkgroupId => "load_workgroup_id",
        LoadLocalInvocationId => "load_local_invocation_id",
        LoadGlobalInvocationId => "load_global_invocation_id",
        LoadNumWorkgroups => "load_num_workgroups",
        LoadLocalInvocationIndex => "load_local_invocation_index",
        LoadFragCoord => "load_frag_coord",
        LoadPointCoord => "load_point_coord",
        LoadFirstVertex => "load_first_vertex",
        LoadVertexId => "load_vertex_id",
        LoadInstanceId => "load_instance_id",
        LoadBaseInstance => "load_base_instance",
        LoadHelperInvocation => "load_helper_invocation",
        IsHelperInvocation => "is_helper_invocation",
        LoadFrontFace => "load_front_face",
        LoadLayerId => "load_layer_id",
        LoadSampleId => "load_sample_id",
        LoadSampleMaskIn => "load_sample_mask_in",
        LoadAmplificationId => "load_amplification_id",
        LoadViewIndex => "load_view_index",

        Ddx => "ddx",
        DdxCoarse => "ddx_coarse",
        DdxFine => "ddx_fine",
        Ddy => "ddy",
        DdyCoarse => "ddy_coarse",
        DdyFine => "ddy_fine",

        LoadBarycentricPixel => "load_barycentric_pixel",
        LoadBarycentricCentroid => "load_barycentric_centroid",
        LoadBarycentricSample => "load_barycentric_sample",
        LoadInterpolatedInput => "load_interpolated_input",
        LoadInput => "load_input",
        LoadOutput => "load_output",
        StoreOutput => "store_output",

        LoadPushConstant => "load_push_constant",
        LoadBufferPtr => "load_buffer_ptr",
        LoadVulkanDescriptor => "load_vulkan_descriptor",
        LoadGlobal => "load_global",
        LoadGlobalConstant => "load_global_constant",
        LoadGlobalConstantBounded => "load_global_constant_bounded",
        LoadGlobalConstantOffset => "load_global_constant_offset",
        StoreGlobal => "store_global",
        GlobalAtomic => "global_atomic",
        GlobalAtomicSwap => "global_atomic_swap",
        SharedAtomic => "shared_atomic",
        SharedAtomicSwap => "shared_atomic_swap",
        LoadShared => "load_shared",
        StoreShared => "store_shared",
        LoadScratch => "load_scratch",
        StoreScratch => "store_scratch",

        Barrier => "barrier",
        Demote => "demote",
        DemoteIf => "demote_if",
        Terminate => "terminate",
        TerminateIf => "terminate_if",

        LoadTextureHandle => "load_texture_handle",
        LoadDepthTexture => "load_depth_texture",
        LoadSamplerHandle => "load_sampler_handle",
        BindlessImageLoad => "bindless_image_load",
        BindlessImageStore => "bindless_image_store",
        BindlessImageAtomic => "bindless_image_atomic",
        BindlessImageAtomicSwap => "bindless_image_atomic_swap",

        Ballot => "ballot",
        Elect => "elect",
        ReadFirstInvocation => "read_first_invocation",
        ReadInvocation => "read_invocation",
        Shuffle => "shuffle",
        ShuffleXor => "shuffle_xor",
        ShuffleUp => "shuffle_up",
        ShuffleDown => "shuffle_down",
        VoteAll => "vote_all",
        VoteAny => "vote_any",
        QuadBroadcast => "quad_broadcast",
        QuadSwapHorizontal => "quad_swap_horizontal",
        QuadSwapVertical => "quad_swap_vertical",
        QuadSwapDiagonal => "quad_swap_diagonal",
        Reduce => "reduce",
        InclusiveScan => "inclusive_scan",
        ExclusiveScan => "exclusive_scan",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntrinsicInfo {
    pub num_srcs: usize,
    pub has_dest: bool,
    /// The instruction has no side effects and may be removed when its result is unused.
    pub can_eliminate: bool,
}

const fn pure_op(num_srcs: usize) -> IntrinsicInfo {
    IntrinsicInfo {
        num_srcs,
        has_dest: true,
        can_eliminate: true,
    }
}

const fn effect(num_srcs: usize, has_dest: bool) -> IntrinsicInfo {
    IntrinsicInfo {
        num_srcs,
        has_dest,
        can_eliminate: false,
    }
}

impl IntrinsicOp {
    pub fn info(self) -> IntrinsicInfo {
        use IntrinsicOp as I;
        match self {
            I::DeclReg => pure_op(0),
            I::LoadReg => pure_op(1),
            I::StoreReg => effect(2, false),

            I::LoadSubgroupSize
            | I::LoadSubgroupInvocation
            | I::LoadNumSubgroups
            | I::LoadSubgroupId
            | I::LoadWorkgroupId
            | I::LoadLocalInvocationId
            | I::LoadGlobalInvocationId
            | I::LoadNumWorkgroups
            | I::LoadLocalInvocationIndex
            | I::LoadFragCoord
            | I::LoadPointCoord
            | I::LoadFirstVertex
            | I::LoadVertexId
            | I::LoadInstanceId
            | I::LoadBaseInstance
            | I::LoadHelperInvocation
            | I::IsHelperInvocation
            | I::LoadFrontFace
            | I::LoadLayerId
            | I::LoadSampleId
            | I::LoadSampleMaskIn
            | I::LoadAmplificationId
            | I::LoadViewIndex => pure_op(0),

            I::Ddx | I::DdxCoarse | I::DdxFine | I::Ddy | I::DdyCoarse | I::DdyFine => pure_op(1),

            I::LoadBarycentricPixel | I::LoadBarycentricCentroid | I::LoadBarycentricSample => {
                pure_op(0)
            }
            I::LoadInterpolatedInput => pure_op(2),
            I::LoadInput | I::LoadOutput => pure_op(1),
            I::StoreOutput => effect(2, false),

            I::LoadPushConstant | I::LoadVulkanDescriptor => pure_op(1),
            I::LoadBufferPtr => pure_op(0),
            I::LoadGlobal | I::LoadGlobalConstant => pure_op(1),
            I::LoadGlobalConstantBounded => pure_op(3),
            I::LoadGlobalConstantOffset => pure_op(2),
            I::StoreGlobal => effect(2, false),
            I::GlobalAtomic | I::SharedAtomic => effect(2, true),
            I::GlobalAtomicSwap | I::SharedAtomicSwap => effect(3, true),
            I::LoadShared | I::LoadScratch => pure_op(1),
            I::StoreShared | I::StoreScratch => effect(2, false),

            I::Barrier | I::Demote | I::Terminate => effect(0, false),
            I::DemoteIf | I::TerminateIf => effect(1, false),

            I::LoadTextureHandle | I::LoadDepthTexture | I::LoadSamplerHandle => pure_op(1),
            I::BindlessImageLoad => pure_op(4),
            I::BindlessImageStore => effect(5, false),
            I::BindlessImageAtomic => effect(4, true),
            I::BindlessImageAtomicSwap => effect(5, true),

            I::Elect => pure_op(0),
            I::Ballot
            | I::ReadFirstInvocation
            | I::VoteAll
            | I::VoteAny
            | I::QuadSwapHorizontal
            | I::QuadSwapVertical
            | I::QuadSwapDiagonal
            | I::Reduce
            | I::InclusiveScan
            | I::ExclusiveScan => pure_op(1),
            I::ReadInvocation
            | I::Shuffle
            | I::ShuffleXor
            | I::ShuffleUp
            | I::ShuffleDown
            | I::QuadBroadcast => pure_op(2),
        }
    }

    /// The built-in value this intrinsic reads, if it is a system-value load.
    pub fn system_value(self) -> Option<SystemValues> {
        use IntrinsicOp as I;
        Some(match self {
            I::LoadSubgroupSize => SystemValues::SUBGROUP_SIZE,
            I::LoadSubgroupInvocation => SystemValues::SUBGROUP_INVOCATION,
            I::LoadNumSubgroups => SystemValues::NUM_SUBGROUPS,
            I::LoadSubgroupId => SystemValues::SUBGROUP_ID,
            I::LoadWorkgroupId => SystemValues::WORKGROUP_ID,
            I::LoadLocalInvocationId => SystemValues::LOCAL_INVOCATION_ID,
            I::LoadGlobalInvocationId => SystemValues::GLOBAL_INVOCATION_ID,
            I::LoadNumWorkgroups => SystemValues::NUM_WORKGROUPS,
            I::LoadLocalInvocationIndex => SystemValues::LOCAL_INVOCATION_INDEX,
            I::LoadVertexId => SystemValues::VERTEX_ID,
            I::LoadInstanceId => SystemValues::INSTANCE_ID,
            I::LoadBaseInstance => SystemValues::BASE_INSTANCE,
            I::LoadFragCoord => SystemValues::FRAG_COORD,
            I::LoadPointCoord => SystemValues::POINT_COORD,
            I::LoadFrontFace => SystemValues::FRONT_FACE,
            I::LoadLayerId => SystemValues::LAYER_ID,
            I::LoadSampleId => SystemValues::SAMPLE_ID,
            I::LoadSampleMaskIn => SystemValues::SAMPLE_MASK_IN,
            I::LoadAmplificationId => SystemValues::AMPLIFICATION_ID,
            I::LoadFirstVertex => SystemValues::FIRST_VERTEX,
            I::LoadHelperInvocation => SystemValues::HELPER_INVOCATION,
            _ => return None,
        })
    }

    pub fn is_barycentric(self) -> bool {
        matches!(
            self,
            IntrinsicOp::LoadBarycentricPixel
                | IntrinsicOp::LoadBarycentricCentroid
                | IntrinsicOp::LoadBarycentricSample
        )
    }

    /// Cross-lane operations whose operand and result are the same value kind.
    pub fn is_subgroup_data_op(self) -> bool {
        use IntrinsicOp as I;
        matches!(
            self,
            I::ReadFirstInvocation
                | I::ReadInvocation
                | I::Shuffle
                | I::ShuffleXor
                | I::ShuffleUp
                | I::ShuffleDown
                | I::QuadBroadcast
                | I::QuadSwapHorizontal
                | I::QuadSwapVertical
                | I::QuadSwapDiagonal
                | I::Reduce
                | I::InclusiveScan
                | I::ExclusiveScan
        )
    }
}

named_enum! {
    pub enum TexOp {
        Tex => "tex",
        Txb => "txb",
        Txl => "txl",
        Txd => "txd",
        Txf => "txf",
        TxfMs => "txf_ms",
        Txs => "txs",
        QueryLevels => "query_levels",
        Tg4 => "tg4",
        TextureSamples => "texture_samples",
        Lod => "lod",
        SamplesIdentical => "samples_identical",
        FragmentMaskFetch => "fragment_mask_fetch",
    }
}

named_enum! {
    pub enum TexSrcKind {
        Coord => "coord",
        Comparator => "comparator",
        Offset => "offset",
        Bias => "bias",
        Lod => "lod",
        MinLod => "min_lod",
        MaxLod => "max_lod",
        MsIndex => "ms_index",
        Ddx => "ddx",
        Ddy => "ddy",
        TextureHandle => "texture_handle",
        SamplerHandle => "sampler_handle",
        Projector => "projector",
    }
}

named_enum! {
    pub enum JumpKind {
        Break => "break",
        Continue => "continue",
        Return => "return",
        Halt => "halt",
        Goto => "goto",
        GotoIf => "goto_if",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_names_are_unique_and_parse_back() {
        let mut seen = std::collections::HashSet::new();
        for op in AluOp::ALL {
            assert!(seen.insert(op.name()), "duplicate {}", op.name());
            assert_eq!(op.name().parse::<AluOp>().unwrap(), *op);
        }
        for op in IntrinsicOp::ALL {
            assert_eq!(op.name().parse::<IntrinsicOp>().unwrap(), *op);
        }
        assert!("not_an_op".parse::<AluOp>().is_err());
    }

    #[test]
    fn horizontal_ops() {
        assert!(AluOp::Vec4.is_horizontal());
        assert!(AluOp::Fdot3.is_horizontal());
        assert!(AluOp::PackUnorm4x8.is_horizontal());
        assert!(!AluOp::Fadd.is_horizontal());
        assert!(!AluOp::Bcsel.is_horizontal());
    }

    #[test]
    fn system_value_loads_map_to_flags() {
        let loads: Vec<_> = IntrinsicOp::ALL
            .iter()
            .filter_map(|op| op.system_value())
            .collect();
        assert_eq!(loads.len(), SystemValues::all().iter().count());
    }
}
