//! Scalar type inference.
//!
//! The IR only records bit sizes, but every Metal temporary needs a concrete scalar type. Each
//! instruction first seeds what its opcode implies about its result and operands, then a fixpoint
//! pushes the most specific type known at either end of every def/use edge to the other end.
//!
//! Types live on two kinds of key: the def itself, and each use site of a def (instruction plus
//! operand index). When the two disagree the emitter reinterprets the bits at the use site.

use hashbrown::HashMap;
use tracing::{debug, warn};

use aero_msl_ir::{
    AluInstr, AluOp, BaseType, Def, DefId, Function, Instr, InstrId, InstrKind, IntrinsicInstr,
    IntrinsicOp, SizedType, TexInstr, TexOp, TexSrcKind,
};

/// Upper bound on propagation sweeps. The lattice is finite so this is never reached by
/// well-formed input; it keeps a pathological program from hanging the compiler.
const MAX_PROPAGATION_ROUNDS: usize = 256;

/// Inferred scalar kind of a value, ordered from least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TiType {
    /// Nothing is known yet.
    #[default]
    None,
    /// Only moved around or stored; any bit-compatible type will do.
    GenericData,
    /// Used by bitwise ops, which accept integers and booleans alike.
    GenericIntOrBool,
    /// Used by ops that do not care about signedness.
    GenericInt,
    Int,
    Uint,
    Bool,
    Float,
    Sampler,
}

impl TiType {
    pub fn from_base(base: BaseType) -> Self {
        match base {
            BaseType::Int => TiType::Int,
            BaseType::Uint => TiType::Uint,
            BaseType::Float => TiType::Float,
            BaseType::Bool => TiType::Bool,
        }
    }

    /// The refinement two observations of the same value agree on, or `None` when they are
    /// equal or conflict.
    pub fn unify(self, other: Self) -> Self {
        if self == other {
            return TiType::None;
        }
        let (generic, specific) = if self < other {
            (self, other)
        } else {
            (other, self)
        };
        match (generic, specific) {
            (TiType::None | TiType::GenericData, _) => specific,
            (TiType::GenericIntOrBool, TiType::Int | TiType::Uint | TiType::Bool) => specific,
            (TiType::GenericInt, TiType::Int | TiType::Uint) => specific,
            _ => TiType::None,
        }
    }
}

const BOOL_NAMES: [&str; 4] = ["bool", "bool2", "bool3", "bool4"];
const HALF_NAMES: [&str; 4] = ["half", "half2", "half3", "half4"];
const FLOAT_NAMES: [&str; 4] = ["float", "float2", "float3", "float4"];
const INT8_NAMES: [&str; 4] = ["char", "char2", "char3", "char4"];
const UINT8_NAMES: [&str; 4] = ["uchar", "uchar2", "uchar3", "uchar4"];
const INT16_NAMES: [&str; 4] = ["short", "short2", "short3", "short4"];
const UINT16_NAMES: [&str; 4] = ["ushort", "ushort2", "ushort3", "ushort4"];
const INT32_NAMES: [&str; 4] = ["int", "int2", "int3", "int4"];
const UINT32_NAMES: [&str; 4] = ["uint", "uint2", "uint3", "uint4"];
const INT64_NAMES: [&str; 4] = ["long", "long2", "long3", "long4"];
const UINT64_NAMES: [&str; 4] = ["ulong", "ulong2", "ulong3", "ulong4"];

/// Metal spelling of a `num_components`-wide vector of `ty` with `bit_size`-bit lanes.
pub fn msl_type_name(ty: TiType, bit_size: u8, num_components: u8) -> Option<&'static str> {
    let lane = usize::from(num_components).checked_sub(1).filter(|&i| i < 4)?;
    let names = match ty {
        TiType::GenericData | TiType::GenericInt | TiType::GenericIntOrBool | TiType::Uint => {
            match bit_size {
                1 => &BOOL_NAMES,
                8 => &UINT8_NAMES,
                16 => &UINT16_NAMES,
                32 => &UINT32_NAMES,
                64 => &UINT64_NAMES,
                _ => return None,
            }
        }
        TiType::Bool => &BOOL_NAMES,
        TiType::Int => match bit_size {
            8 => &INT8_NAMES,
            16 => &INT16_NAMES,
            32 => &INT32_NAMES,
            64 => &INT64_NAMES,
            _ => return None,
        },
        TiType::Float => match bit_size {
            16 => &HALF_NAMES,
            32 => &FLOAT_NAMES,
            _ => return None,
        },
        TiType::Sampler => return Some("sampler"),
        TiType::None => return None,
    };
    Some(names[lane])
}

/// Unsigned Metal type of a given shape, used for register declarations.
pub fn msl_uint_type(bit_size: u8, num_components: u8) -> Option<&'static str> {
    msl_type_name(TiType::Uint, bit_size, num_components)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Key {
    Def(DefId),
    Src(InstrId, usize),
}

/// Result of [`infer_types`]: a type for every def and every use site that could be typed.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    types: HashMap<Key, TiType>,
}

impl TypeMap {
    fn get(&self, key: Key) -> TiType {
        self.types.get(&key).copied().unwrap_or_default()
    }

    /// Records `ty`, returning whether anything changed.
    fn set(&mut self, key: Key, ty: TiType) -> bool {
        self.types.insert(key, ty) != Some(ty)
    }

    fn set_def(&mut self, def: DefId, ty: TiType) -> bool {
        self.set(Key::Def(def), ty)
    }

    fn set_src(&mut self, instr: InstrId, src: usize, ty: TiType) -> bool {
        self.set(Key::Src(instr, src), ty)
    }

    pub fn def_type(&self, def: DefId) -> TiType {
        self.get(Key::Def(def))
    }

    pub fn src_type(&self, instr: InstrId, src: usize) -> TiType {
        self.get(Key::Src(instr, src))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn def_type_name(&self, def: &Def) -> Option<&'static str> {
        msl_type_name(self.def_type(def.id), def.bit_size, def.num_components)
    }

    /// Type of the use site `(instr, src)`, spelled with the shape of the def it reads.
    pub fn src_type_name(&self, instr: InstrId, src: usize, def: &Def) -> Option<&'static str> {
        msl_type_name(self.src_type(instr, src), def.bit_size, def.num_components)
    }

    /// The type a use site must reinterpret its operand as, when it differs from the def's.
    ///
    /// Booleans cannot go through `as_type`, so no cast is produced when either side is one.
    pub fn bitcast(&self, instr: InstrId, src: usize, def: &Def) -> Option<&'static str> {
        let src_type = self.src_type(instr, src);
        let def_type = self.def_type(def.id);
        if src_type == def_type || src_type == TiType::Bool || def_type == TiType::Bool {
            return None;
        }
        msl_type_name(src_type, def.bit_size, def.num_components)
    }
}

fn seed_all_srcs(map: &mut TypeMap, instr: InstrId, count: usize, ty: TiType) {
    for i in 0..count {
        map.set_src(instr, i, ty);
    }
}

fn seed_alu(map: &mut TypeMap, id: InstrId, alu: &AluInstr) {
    let def = alu.def.id;
    let num_srcs = alu.srcs.len();
    match alu.op {
        AluOp::Iadd | AluOp::Isub | AluOp::Ishl => {
            map.set_def(def, TiType::GenericInt);
            seed_all_srcs(map, id, num_srcs, TiType::GenericInt);
        }
        AluOp::Iand | AluOp::Ior | AluOp::Ixor | AluOp::Inot => {
            map.set_def(def, TiType::GenericIntOrBool);
            seed_all_srcs(map, id, num_srcs, TiType::GenericIntOrBool);
        }
        AluOp::Ieq | AluOp::Ine => {
            map.set_def(def, TiType::Bool);
            seed_all_srcs(map, id, num_srcs, TiType::GenericIntOrBool);
        }
        AluOp::Bcsel => {
            map.set_def(def, TiType::GenericData);
            map.set_src(id, 0, TiType::Bool);
            map.set_src(id, 1, TiType::GenericData);
            map.set_src(id, 2, TiType::GenericData);
        }
        // No information of their own; propagation fills these in.
        AluOp::Mov | AluOp::Vec2 | AluOp::Vec3 | AluOp::Vec4 => {}
        // There are no 32-bit booleans in Metal: those are plain uints.
        AluOp::B2b32 => {
            map.set_def(def, TiType::Uint);
            map.set_src(id, 0, TiType::Uint);
        }
        op => {
            let info = op.info();
            map.set_def(def, TiType::from_base(info.output_type));
            for (i, ty) in info.input_types[..num_srcs.min(4)].iter().enumerate() {
                map.set_src(id, i, TiType::from_base(*ty));
            }
        }
    }
}

fn sized(ty: Option<SizedType>) -> TiType {
    ty.map_or(TiType::None, |t| TiType::from_base(t.base))
}

fn seed_intrinsic(map: &mut TypeMap, id: InstrId, intr: &IntrinsicInstr) {
    use IntrinsicOp as I;

    let def = intr.def.map(|d| d.id);
    let set_def = |map: &mut TypeMap, ty: TiType| {
        if let Some(def) = def {
            map.set_def(def, ty);
        }
    };
    let atomic_type = intr
        .index
        .atomic_op
        .map_or(TiType::None, |op| TiType::from_base(op.value_type()));

    match intr.op {
        I::LoadInput | I::LoadInterpolatedInput | I::LoadOutput => {
            set_def(map, sized(intr.index.dest_type));
        }
        I::LoadGlobalConstant | I::LoadGlobal | I::LoadPushConstant => {
            set_def(map, TiType::GenericData);
            map.set_src(id, 0, TiType::Uint);
        }
        I::LoadGlobalConstantBounded => {
            set_def(map, TiType::GenericData);
            seed_all_srcs(map, id, 3, TiType::Uint);
        }
        I::LoadGlobalConstantOffset => {
            set_def(map, TiType::GenericData);
            seed_all_srcs(map, id, 2, TiType::Uint);
        }
        I::GlobalAtomic | I::GlobalAtomicSwap | I::SharedAtomic | I::SharedAtomicSwap => {
            set_def(map, atomic_type);
            map.set_src(id, 0, TiType::Uint);
            for i in 1..intr.srcs.len() {
                map.set_src(id, i, atomic_type);
            }
        }
        I::StoreGlobal => {
            map.set_src(id, 0, TiType::GenericData);
            map.set_src(id, 1, TiType::Uint);
        }
        I::StoreOutput => {
            map.set_src(id, 0, sized(intr.index.src_type));
        }
        I::DeclReg => {
            let ty = if intr.index.bit_size == 1 {
                TiType::Bool
            } else {
                TiType::None
            };
            set_def(map, ty);
        }
        I::StoreReg => {
            seed_all_srcs(map, id, 2, TiType::None);
        }
        I::LoadReg => {
            map.set_src(id, 0, TiType::None);
            set_def(map, TiType::None);
        }
        I::LoadScratch | I::LoadShared => {
            set_def(map, TiType::Uint);
            map.set_src(id, 0, TiType::Uint);
        }
        I::StoreScratch | I::StoreShared => {
            seed_all_srcs(map, id, 2, TiType::Uint);
        }
        I::LoadWorkgroupId
        | I::LoadSubgroupId
        | I::LoadLocalInvocationId
        | I::LoadGlobalInvocationId
        | I::LoadNumWorkgroups
        | I::LoadNumSubgroups
        | I::LoadSubgroupSize
        | I::LoadSampleId
        | I::LoadSampleMaskIn
        | I::LoadSubgroupInvocation
        | I::LoadAmplificationId
        | I::LoadLocalInvocationIndex
        | I::LoadVertexId
        | I::LoadInstanceId
        | I::LoadBaseInstance
        | I::LoadFirstVertex
        | I::LoadLayerId => set_def(map, TiType::Uint),
        I::LoadVulkanDescriptor => {
            map.set_src(id, 0, TiType::Uint);
            set_def(map, TiType::Uint);
        }
        I::LoadBufferPtr => set_def(map, TiType::Uint),
        // Handle defs never flow into arithmetic; only their operand (a table offset) is typed.
        I::LoadTextureHandle | I::LoadDepthTexture => {
            map.set_src(id, 0, TiType::Uint);
        }
        I::LoadSamplerHandle => {
            set_def(map, TiType::Sampler);
            map.set_src(id, 0, TiType::Uint);
        }
        I::Ddx | I::DdxCoarse | I::DdxFine | I::Ddy | I::DdyCoarse | I::DdyFine => {
            map.set_src(id, 0, TiType::Float);
            set_def(map, TiType::Float);
        }
        I::LoadPointCoord | I::LoadFragCoord => set_def(map, TiType::Float),
        I::LoadFrontFace | I::Elect | I::LoadHelperInvocation | I::IsHelperInvocation => {
            set_def(map, TiType::Bool);
        }
        I::BindlessImageLoad => {
            set_def(map, sized(intr.index.dest_type));
            map.set_src(id, 1, TiType::Uint);
            map.set_src(id, 3, TiType::Uint);
        }
        I::BindlessImageStore => {
            map.set_src(id, 1, TiType::Uint);
            map.set_src(id, 3, sized(intr.index.src_type));
            map.set_src(id, 4, TiType::Uint);
        }
        I::DemoteIf | I::TerminateIf => {
            map.set_src(id, 0, TiType::Bool);
        }
        I::BindlessImageAtomic | I::BindlessImageAtomicSwap => {
            map.set_src(id, 1, TiType::Uint);
            map.set_src(id, 2, TiType::Uint);
            map.set_src(id, 3, atomic_type);
            if intr.op == I::BindlessImageAtomicSwap {
                map.set_src(id, 4, atomic_type);
            }
            set_def(map, atomic_type);
        }
        I::Ballot => {
            map.set_src(id, 0, TiType::Bool);
            set_def(map, TiType::Uint);
        }
        I::VoteAll | I::VoteAny => {
            map.set_src(id, 0, TiType::Bool);
            set_def(map, TiType::Bool);
        }
        I::ReadFirstInvocation
        | I::QuadSwapHorizontal
        | I::QuadSwapVertical
        | I::QuadSwapDiagonal => {
            map.set_src(id, 0, TiType::GenericData);
            set_def(map, TiType::GenericData);
        }
        I::ReadInvocation
        | I::QuadBroadcast
        | I::Shuffle
        | I::ShuffleDown
        | I::ShuffleUp
        | I::ShuffleXor => {
            map.set_src(id, 0, TiType::GenericData);
            set_def(map, TiType::GenericData);
            map.set_src(id, 1, TiType::Uint);
        }
        I::Reduce => {
            let ty = match intr.index.reduction_op {
                Some(AluOp::Iand | AluOp::Ior | AluOp::Ixor | AluOp::Iadd | AluOp::Imul) => {
                    TiType::GenericInt
                }
                Some(AluOp::Imax | AluOp::Imin) => TiType::Int,
                Some(AluOp::Umax | AluOp::Umin) => TiType::Uint,
                Some(AluOp::Fadd | AluOp::Fmax | AluOp::Fmin | AluOp::Fmul) => TiType::Float,
                _ => return,
            };
            map.set_src(id, 0, ty);
            set_def(map, ty);
        }
        I::LoadViewIndex
        | I::LoadBarycentricPixel
        | I::LoadBarycentricCentroid
        | I::LoadBarycentricSample
        | I::Barrier
        | I::Demote
        | I::Terminate
        | I::InclusiveScan
        | I::ExclusiveScan => {}
    }
}

fn seed_tex(map: &mut TypeMap, id: InstrId, tex: &TexInstr) {
    map.set_def(tex.def.id, TiType::from_base(tex.dest_type.base));
    let fetch = matches!(tex.op, TexOp::Txf | TexOp::TxfMs);
    for (i, src) in tex.srcs.iter().enumerate() {
        let ty = match src.kind {
            TexSrcKind::Coord if fetch => TiType::Uint,
            TexSrcKind::Coord => TiType::Float,
            TexSrcKind::Comparator
            | TexSrcKind::Bias
            | TexSrcKind::MinLod
            | TexSrcKind::MaxLod => TiType::Float,
            TexSrcKind::Offset => TiType::Int,
            TexSrcKind::Lod if fetch || tex.op == TexOp::Txs => TiType::Uint,
            TexSrcKind::Lod => TiType::Float,
            TexSrcKind::MsIndex => TiType::Uint,
            TexSrcKind::Ddx | TexSrcKind::Ddy => TiType::Float,
            TexSrcKind::TextureHandle
            | TexSrcKind::SamplerHandle
            | TexSrcKind::Projector => continue,
        };
        map.set_src(id, i, ty);
    }
}

fn seed(map: &mut TypeMap, instr: &Instr) {
    match &instr.kind {
        InstrKind::Alu(alu) => seed_alu(map, instr.id, alu),
        InstrKind::Intrinsic(intr) => seed_intrinsic(map, instr.id, intr),
        InstrKind::Tex(tex) => seed_tex(map, instr.id, tex),
        InstrKind::Jump { .. }
        | InstrKind::LoadConst(_)
        | InstrKind::Undef { .. }
        | InstrKind::Phi(_) => {}
    }
}

/// Applies a refined type to every slot of `instr` that carries the value's kind through.
///
/// Returns whether any slot changed. Instructions whose operands have fixed types (and consts,
/// which are typed at each use site instead) are left alone.
fn update_instr_type(map: &mut TypeMap, instr: &Instr, ty: TiType) -> bool {
    let id = instr.id;
    match &instr.kind {
        InstrKind::Alu(alu) => {
            let def = alu.def.id;
            match alu.op {
                AluOp::Iadd | AluOp::Isub | AluOp::Ishl | AluOp::Iand | AluOp::Ior | AluOp::Ixor => {
                    map.set_def(def, ty) | map.set_src(id, 0, ty) | map.set_src(id, 1, ty)
                }
                AluOp::Inot => map.set_def(def, ty) | map.set_src(id, 0, ty),
                AluOp::Ieq | AluOp::Ine => map.set_src(id, 0, ty) | map.set_src(id, 1, ty),
                AluOp::Bcsel => {
                    map.set_def(def, ty) | map.set_src(id, 1, ty) | map.set_src(id, 2, ty)
                }
                AluOp::Mov | AluOp::Vec2 | AluOp::Vec3 | AluOp::Vec4 => {
                    let mut changed = map.set_def(def, ty);
                    for i in 0..alu.srcs.len() {
                        changed |= map.set_src(id, i, ty);
                    }
                    changed
                }
                _ => false,
            }
        }
        InstrKind::Intrinsic(intr) => {
            use IntrinsicOp as I;
            let def = intr.def.map(|d| d.id);
            let set_def = |map: &mut TypeMap| def.is_some_and(|d| map.set_def(d, ty));
            match intr.op {
                I::LoadReg => set_def(map) | map.set_src(id, 0, ty),
                I::StoreReg => map.set_src(id, 0, ty) | map.set_src(id, 1, ty),
                I::DeclReg => set_def(map),
                I::LoadGlobal
                | I::LoadGlobalConstant
                | I::LoadGlobalConstantBounded
                | I::LoadGlobalConstantOffset
                | I::LoadPushConstant => set_def(map),
                // Scratch and shared memory are always accessed as uint.
                I::LoadScratch | I::StoreScratch | I::LoadShared | I::StoreShared => false,
                I::StoreGlobal => map.set_src(id, 0, ty),
                I::ReadFirstInvocation
                | I::ReadInvocation
                | I::QuadBroadcast
                | I::QuadSwapHorizontal
                | I::QuadSwapVertical
                | I::QuadSwapDiagonal
                | I::Shuffle
                | I::ShuffleDown
                | I::ShuffleUp
                | I::ShuffleXor => map.set_src(id, 0, ty) | set_def(map),
                op => {
                    let info = op.info();
                    if info.has_dest && info.num_srcs == 0 {
                        set_def(map)
                    } else {
                        false
                    }
                }
            }
        }
        InstrKind::Tex(_)
        | InstrKind::Jump { .. }
        | InstrKind::LoadConst(_)
        | InstrKind::Undef { .. }
        | InstrKind::Phi(_) => false,
    }
}

fn propagate(
    map: &mut TypeMap,
    instr: &Instr,
    instrs: &[&Instr],
    parents: &HashMap<DefId, usize>,
) -> bool {
    let is_tex = matches!(instr.kind, InstrKind::Tex(_));
    if !matches!(instr.kind, InstrKind::Alu(_) | InstrKind::Intrinsic(_)) && !is_tex {
        return false;
    }

    let mut progress = false;
    for (i, src) in instr.srcs().into_iter().enumerate() {
        let src_type = map.src_type(instr.id, i);
        let def_type = map.def_type(src);
        let unified = src_type.unify(def_type);
        let parent = parents.get(&src).map(|&p| instrs[p]);

        if is_tex {
            // Texture operands only ever push their fixed type up to the producer.
            if src_type == TiType::None {
                continue;
            }
            if unified > def_type {
                if let Some(parent) = parent {
                    progress |= update_instr_type(map, parent, unified);
                }
            }
        } else if unified > src_type {
            progress |= update_instr_type(map, instr, unified);
        } else if unified > def_type {
            if let Some(parent) = parent {
                progress |= update_instr_type(map, parent, unified);
            }
        }
    }
    progress
}

/// Infers a type for every def and use site of `func`.
pub fn infer_types(func: &Function) -> TypeMap {
    let instrs = func.instrs();
    let parents: HashMap<DefId, usize> = instrs
        .iter()
        .enumerate()
        .filter_map(|(i, instr)| instr.def().map(|d| (d.id, i)))
        .collect();

    let mut map = TypeMap::default();
    for instr in &instrs {
        seed(&mut map, instr);
    }

    let mut rounds = 0;
    loop {
        rounds += 1;
        let mut progress = false;
        for instr in &instrs {
            progress |= propagate(&mut map, instr, &instrs, &parents);
        }
        if !progress {
            break;
        }
        if rounds >= MAX_PROPAGATION_ROUNDS {
            warn!(rounds, "type propagation did not settle; emitting with current types");
            break;
        }
    }
    debug!(rounds, entries = map.len(), "type inference finished");
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_msl_ir::{AluSrc, Builder, IntrinsicIndices, SizedType};

    #[test]
    fn unify_refines_generic_types() {
        assert_eq!(TiType::None.unify(TiType::Float), TiType::Float);
        assert_eq!(TiType::GenericData.unify(TiType::Int), TiType::Int);
        assert_eq!(TiType::GenericIntOrBool.unify(TiType::Bool), TiType::Bool);
        assert_eq!(TiType::Uint.unify(TiType::GenericInt), TiType::Uint);
        assert_eq!(TiType::GenericInt.unify(TiType::Bool), TiType::None);
        assert_eq!(TiType::Float.unify(TiType::Int), TiType::None);
        assert_eq!(TiType::Uint.unify(TiType::Uint), TiType::None);
    }

    #[test]
    fn type_names_follow_width_and_lanes() {
        assert_eq!(msl_type_name(TiType::Float, 32, 4), Some("float4"));
        assert_eq!(msl_type_name(TiType::Float, 16, 1), Some("half"));
        assert_eq!(msl_type_name(TiType::GenericInt, 64, 2), Some("ulong2"));
        assert_eq!(msl_type_name(TiType::Int, 8, 3), Some("char3"));
        assert_eq!(msl_type_name(TiType::Uint, 1, 1), Some("bool"));
        assert_eq!(msl_type_name(TiType::Sampler, 32, 1), Some("sampler"));
        assert_eq!(msl_type_name(TiType::Float, 64, 1), None);
        assert_eq!(msl_type_name(TiType::None, 32, 1), None);
        assert_eq!(msl_type_name(TiType::Uint, 32, 0), None);
    }

    #[test]
    fn integer_add_takes_the_type_of_its_operands() {
        let mut b = Builder::new("main");
        let gid = b.load_sysval(IntrinsicOp::LoadLocalInvocationIndex, 32, 1);
        let one = b.imm_u32(1);
        let sum = b.alu(AluOp::Iadd, 32, 1, &[gid, one]);
        let func = b.finish().unwrap();

        let types = infer_types(&func);
        assert_eq!(types.def_type(sum), TiType::Uint);

        let add = func.instrs()[2].id;
        assert_eq!(types.src_type(add, 1), TiType::Uint);
        // Constants are typed at their use, not at their def.
        assert_eq!(types.def_type(one), TiType::None);
    }

    #[test]
    fn stored_output_type_flows_back_through_moves() {
        let mut b = Builder::new("main");
        let idx = b.load_sysval(IntrinsicOp::LoadVertexId, 32, 1);
        let value = b.intrinsic_value(
            IntrinsicOp::LoadGlobal,
            &[idx],
            32,
            4,
            IntrinsicIndices::default(),
        );
        let moved = b.alu(AluOp::Mov, 32, 4, &[value]);
        b.store_output(moved, 0, SizedType::float32());
        let func = b.finish().unwrap();

        let types = infer_types(&func);
        assert_eq!(types.def_type(moved), TiType::Float);
        assert_eq!(types.def_type(value), TiType::Float);

        // The load's address operand keeps its own type; the def it reads is a uint too, so no
        // reinterpretation is needed.
        let load = func.instrs()[1];
        let idx_def = func.instrs()[0].def().copied().unwrap();
        assert_eq!(types.bitcast(load.id, 0, &idx_def), None);
    }

    #[test]
    fn conflicting_uses_produce_a_bitcast() {
        let mut b = Builder::new("main");
        let coord = b.load_sysval(IntrinsicOp::LoadFragCoord, 32, 4);
        let bits = b.alu_swizzled(
            AluOp::F2u32,
            32,
            1,
            vec![AluSrc::component(coord, 0)],
        );
        let shifted = b.alu(AluOp::Ushr, 32, 1, &[bits, bits]);
        let as_int = b.alu(AluOp::Ineg, 32, 1, &[shifted]);
        let func = b.finish().unwrap();

        let types = infer_types(&func);
        let neg = func.instrs()[3];
        let shifted_def = func.instrs()[2].def().copied().unwrap();
        assert_eq!(types.def_type(shifted), TiType::Uint);
        assert_eq!(types.def_type(as_int), TiType::Int);
        assert_eq!(types.bitcast(neg.id, 0, &shifted_def), Some("int"));
    }
}
