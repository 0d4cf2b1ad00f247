use tracing::warn;

use aero_msl_ir::{
    Access, AluOp, AtomicOp, Instr, IntrinsicInstr, IntrinsicOp, MemoryModes, SamplerDim, Scope,
    ShaderStage,
};

use super::tex::{tex_type_name, texture_dim, texture_src_coord_swizzle};
use super::{Ctx, XYZW};
use crate::io;
use crate::CompileError;

const MEMORY_ORDER: &str = "memory_order_relaxed";

/// Whether the instruction is emitted as an assignment to a predeclared `tN`.
///
/// Register ops, texture handles and atomic swaps declare their own destination.
pub(crate) fn needs_dest_type(intr: &IntrinsicInstr) -> bool {
    use IntrinsicOp as I;
    match intr.op {
        I::DeclReg
        | I::LoadReg
        | I::LoadTextureHandle
        | I::LoadDepthTexture
        | I::GlobalAtomicSwap
        | I::SharedAtomicSwap
        | I::BindlessImageAtomicSwap => false,
        op if op.is_barycentric() => false,
        op => op.info().has_dest,
    }
}

/// Intrinsics that only ever produce a placeholder.
pub(crate) fn has_emission_rule(op: IntrinsicOp) -> bool {
    !matches!(
        op,
        IntrinsicOp::LoadVulkanDescriptor
            | IntrinsicOp::LoadViewIndex
            | IntrinsicOp::InclusiveScan
            | IntrinsicOp::ExclusiveScan
    )
}

fn atomic_op_name(op: AtomicOp) -> &'static str {
    match op {
        AtomicOp::Iadd | AtomicOp::Fadd => "atomic_fetch_add",
        AtomicOp::Umin | AtomicOp::Imin | AtomicOp::Fmin => "atomic_fetch_min",
        AtomicOp::Umax | AtomicOp::Imax | AtomicOp::Fmax => "atomic_fetch_max",
        AtomicOp::Iand => "atomic_fetch_and",
        AtomicOp::Ior => "atomic_fetch_or",
        AtomicOp::Ixor => "atomic_fetch_xor",
        AtomicOp::Xchg => "atomic_exchange",
        AtomicOp::Cmpxchg | AtomicOp::Fcmpxchg => "atomic_compare_exchange_weak",
    }
}

fn memory_modes(modes: MemoryModes) -> String {
    let flags: Vec<&str> = modes
        .iter()
        .map(|mode| {
            if mode == MemoryModes::IMAGE {
                "mem_flags::mem_texture"
            } else if mode == MemoryModes::SSBO || mode == MemoryModes::GLOBAL {
                "mem_flags::mem_device"
            } else if mode == MemoryModes::SHARED {
                "mem_flags::mem_threadgroup"
            } else {
                "mem_flags::mem_none"
            }
        })
        .collect();
    if flags.is_empty() {
        "mem_flags::mem_none".to_owned()
    } else {
        flags.join(" | ")
    }
}

/// `.xy`-style selection of the lanes `write_mask` enables, omitted when every lane is written.
fn write_mask_swizzle(write_mask: u8, num_components: u8) -> String {
    if u32::from(num_components) == (write_mask & ((1u16 << num_components) - 1) as u8).count_ones()
    {
        return String::new();
    }
    let mut out = String::from(".");
    out.extend(
        (0..num_components.min(4))
            .filter(|i| (write_mask >> i) & 1 != 0)
            .map(|i| XYZW[usize::from(i)]),
    );
    out
}

fn component_suffix(num_components: u8) -> &'static str {
    match num_components {
        2 => "2",
        3 => "3",
        4 => "4",
        _ => "",
    }
}

struct Emitter<'c, 'a> {
    ctx: &'c mut Ctx<'a>,
    instr: &'c Instr,
    intr: &'c IntrinsicInstr,
}

impl Emitter<'_, '_> {
    fn src(&self, i: usize) -> Result<String, CompileError> {
        self.ctx.src(self.instr, i)
    }

    fn src_components(&self, i: usize) -> Result<u8, CompileError> {
        let id = super::nth_src(self.instr, i)?;
        Ok(self.ctx.def(id)?.num_components)
    }

    fn src_is_const(&self, i: usize) -> Result<bool, CompileError> {
        let id = super::nth_src(self.instr, i)?;
        Ok(self.ctx.parent(id)?.as_load_const().is_some())
    }

    fn dest(&self) -> Result<&aero_msl_ir::Def, CompileError> {
        self.intr
            .def
            .as_ref()
            .ok_or(CompileError::MissingDef { op: self.intr.op })
    }

    fn dest_type(&self) -> Result<&'static str, CompileError> {
        let def = self.dest()?;
        self.ctx.def_type_name(def)
    }

    fn atomic_op(&self) -> Result<AtomicOp, CompileError> {
        self.intr.index.atomic_op.ok_or(CompileError::MissingIndex {
            op: self.intr.op,
            index: "atomic_op",
        })
    }

    fn image_dim(&self) -> Result<SamplerDim, CompileError> {
        self.intr.index.image_dim.ok_or(CompileError::MissingIndex {
            op: self.intr.op,
            index: "image_dim",
        })
    }

    fn require_zero_base(&self) -> Result<(), CompileError> {
        match self.intr.index.base {
            0 => Ok(()),
            base => Err(CompileError::NonZeroBase {
                op: self.intr.op,
                base,
            }),
        }
    }

    /// Slot addressed by an I/O intrinsic whose constant offset is operand `offset_src`.
    fn io_location(&self, offset_src: usize) -> Result<u32, CompileError> {
        let io = self.intr.index.io.ok_or(CompileError::MissingIndex {
            op: self.intr.op,
            index: "io",
        })?;
        let offset = super::nth_src(self.instr, offset_src)?;
        let offset = self
            .ctx
            .parent(offset)?
            .as_load_const()
            .ok_or(CompileError::NonConstantIoOffset { op: self.intr.op })?;
        crate::io::offset_location(self.ctx.shader.stage, io.location, offset.component_bits(0))
    }

    fn input_name(&self, location: u32) -> Result<&'static str, CompileError> {
        let stage = self.ctx.shader.stage;
        if stage != ShaderStage::Fragment {
            return Err(CompileError::WrongStage {
                op: self.intr.op,
                stage,
            });
        }
        io::input_name(stage, location).ok_or(CompileError::UnknownSlot { stage, location })
    }

    fn output_name(&self, location: u32) -> Result<&'static str, CompileError> {
        let stage = self.ctx.shader.stage;
        if stage == ShaderStage::Compute {
            return Err(CompileError::WrongStage {
                op: self.intr.op,
                stage,
            });
        }
        io::output_name(stage, location).ok_or(CompileError::UnknownSlot { stage, location })
    }

    /// The coordinate operand of an image access, split into texel coordinates followed by the
    /// face and array layer Metal takes as separate arguments.
    fn image_coords(&self) -> Result<String, CompileError> {
        let (mut comps, cube) = match self.image_dim()? {
            SamplerDim::Buf | SamplerDim::Dim1D => (1, false),
            SamplerDim::Dim2D | SamplerDim::Ms => (2, false),
            SamplerDim::Dim3D => (3, false),
            SamplerDim::Cube => (3, true),
        };
        let array = self.intr.index.image_array;
        if array {
            comps += 1;
        }
        texture_src_coord_swizzle(&*self.ctx, self.instr, 1, comps, cube, array)
    }

    /// `*(space T*)(addr)` for scalars; vectors read through the packed type, which only needs
    /// scalar alignment.
    fn packed_load(&self, addr: &str, space: &str) -> Result<String, CompileError> {
        let ty = self.dest_type()?;
        Ok(if self.dest()?.num_components == 1 {
            format!("*({space} {ty}*)({addr})")
        } else {
            format!("{ty}(*({space} packed_{ty}*){addr})")
        })
    }

    fn packed_load_offset(&self, space: &str) -> Result<String, CompileError> {
        let ty = self.dest_type()?;
        let (base, offset) = (self.src(0)?, self.src(1)?);
        Ok(if self.dest()?.num_components == 1 {
            format!("*({space} {ty}*)(({base} + {offset}))")
        } else {
            format!("{ty}(*({space} packed_{ty}*)({base} + {offset}))")
        })
    }

    fn interpolated_input(&self, offset_src: usize) -> Result<String, CompileError> {
        let location = self.io_location(offset_src)?;
        let name = self.input_name(location)?;
        let def = self.dest()?;
        let slot_components = self
            .ctx
            .io
            .inputs
            .get(location as usize)
            .map_or(0, |slot| slot.num_components);
        let mut expr = format!("in.{name}");
        if def.num_components < slot_components {
            expr.push('.');
            let component = usize::from(self.intr.index.component);
            expr.extend(
                (0..usize::from(def.num_components)).map(|i| XYZW[(component + i).min(3)]),
            );
        }
        Ok(expr)
    }

    fn atomic(&self, space: &str, shared: bool) -> Result<String, CompileError> {
        let op = atomic_op_name(self.atomic_op()?);
        let ty = self.dest_type()?;
        let addr = self.src(0)?;
        let addr = if shared {
            format!("&shared_data[{addr}]")
        } else {
            addr
        };
        Ok(format!(
            "{op}_explicit(({space} atomic_{ty}*){addr}, {}, {MEMORY_ORDER})",
            self.src(1)?
        ))
    }

    fn reduce(&self) -> Result<String, CompileError> {
        let func = match self.intr.index.reduction_op {
            Some(AluOp::Iadd | AluOp::Fadd) => "simd_sum",
            Some(AluOp::Imul | AluOp::Fmul) => "simd_product",
            Some(AluOp::Imin | AluOp::Umin | AluOp::Fmin) => "simd_min",
            Some(AluOp::Imax | AluOp::Umax | AluOp::Fmax) => "simd_max",
            Some(AluOp::Iand) => "simd_and",
            Some(AluOp::Ior) => "simd_or",
            Some(AluOp::Ixor) => "simd_xor",
            _ => {
                return Err(CompileError::MissingIndex {
                    op: self.intr.op,
                    index: "reduction_op",
                })
            }
        };
        Ok(format!("{func}({})", self.src(0)?))
    }

    /// Right-hand side for intrinsics that assign `tN`.
    fn value(&self) -> Result<Option<String>, CompileError> {
        use IntrinsicOp as I;

        let call1 = |func: &str| -> Result<String, CompileError> {
            Ok(format!("{func}({})", self.src(0)?))
        };
        let call2 = |func: &str| -> Result<String, CompileError> {
            Ok(format!("{func}({}, {})", self.src(0)?, self.src(1)?))
        };

        let expr = match self.intr.op {
            I::LoadSubgroupSize => "gl_SubGroupSize".to_owned(),
            I::LoadSubgroupInvocation => "gl_SubGroupInvocation".to_owned(),
            I::LoadNumSubgroups => "gl_NumSubGroups".to_owned(),
            I::LoadSubgroupId => "gl_SubGroupID".to_owned(),
            I::LoadWorkgroupId => "gl_WorkGroupID".to_owned(),
            I::LoadLocalInvocationId => "gl_LocalInvocationID".to_owned(),
            I::LoadGlobalInvocationId => "gl_GlobalInvocationID".to_owned(),
            I::LoadNumWorkgroups => "gl_NumWorkGroups".to_owned(),
            I::LoadLocalInvocationIndex => "gl_LocalInvocationIndex".to_owned(),
            I::LoadFragCoord => "gl_FragCoord".to_owned(),
            I::LoadPointCoord => "gl_PointCoord".to_owned(),
            I::LoadFirstVertex => "gl_FirstVertex".to_owned(),
            I::LoadVertexId => "gl_VertexID".to_owned(),
            I::LoadInstanceId => "gl_InstanceID".to_owned(),
            I::LoadBaseInstance => "gl_BaseInstance".to_owned(),
            I::LoadHelperInvocation => "gl_HelperInvocation".to_owned(),
            I::IsHelperInvocation => "simd_is_helper_thread()".to_owned(),
            I::LoadFrontFace => "gl_FrontFacing".to_owned(),
            I::LoadLayerId => "gl_Layer".to_owned(),
            I::LoadSampleId => "gl_SampleID".to_owned(),
            I::LoadSampleMaskIn => "gl_SampleMask".to_owned(),
            I::LoadAmplificationId => "mtl_AmplificationID".to_owned(),

            I::Ddx | I::DdxCoarse | I::DdxFine => call1("dfdx")?,
            I::Ddy | I::DdyCoarse | I::DdyFine => call1("dfdy")?,

            I::LoadInterpolatedInput => self.interpolated_input(1)?,
            I::LoadInput => self.interpolated_input(0)?,
            I::LoadOutput => format!("out.{}", self.output_name(self.io_location(0)?)?),

            I::LoadPushConstant => {
                self.require_zero_base()?;
                format!(
                    "*((constant {}*)&buf.push_consts[{}])",
                    self.dest_type()?,
                    self.src(0)?
                )
            }
            I::LoadBufferPtr => format!("(ulong)&buf{}.contents[0]", self.intr.index.binding),
            I::LoadGlobal => self.packed_load(&self.src(0)?, "device")?,
            I::LoadGlobalConstant => self.packed_load(&self.src(0)?, "constant")?,
            I::LoadGlobalConstantBounded => format!(
                "{} < {} ? {} : 0",
                self.src(1)?,
                self.src(2)?,
                self.packed_load_offset("constant")?
            ),
            I::LoadGlobalConstantOffset => self.packed_load_offset("device")?,
            I::GlobalAtomic => self.atomic("device", false)?,
            I::SharedAtomic => self.atomic("threadgroup", true)?,
            I::LoadShared => {
                self.require_zero_base()?;
                format!(
                    "*(threadgroup {}*)&shared_data[{}]",
                    self.dest_type()?,
                    self.src(0)?
                )
            }
            I::LoadScratch => {
                self.require_zero_base()?;
                format!("*(thread {}*)&scratch[{}]", self.dest_type()?, self.src(0)?)
            }
            I::LoadSamplerHandle => format!("sampler_table.handles[{}]", self.src(0)?),

            I::BindlessImageLoad => {
                let mut expr = format!("{}.read({}", self.src(0)?, self.image_coords()?);
                if self.image_dim()? != SamplerDim::Buf {
                    expr.push_str(", ");
                    expr.push_str(&self.src(3)?);
                }
                // `read` always returns four lanes.
                expr.push_str(").");
                let n = usize::from(self.dest()?.num_components).min(4);
                expr.extend(&XYZW[..n]);
                expr
            }
            I::BindlessImageAtomic => format!(
                "{}.{}({}, {}).x",
                self.src(0)?,
                atomic_op_name(self.atomic_op()?),
                self.image_coords()?,
                self.src(3)?
            ),

            I::Ballot => call1("(ulong)simd_ballot")?,
            // Without the ballot term Metal folds a following `simd_ballot(true)` into the
            // `simd_is_first()` branch.
            I::Elect => "simd_is_first() && (ulong)simd_ballot(true)".to_owned(),
            I::ReadFirstInvocation => call1("simd_broadcast_first")?,
            I::ReadInvocation => call2("simd_broadcast")?,
            I::Shuffle => call2("simd_shuffle")?,
            I::ShuffleXor => call2("simd_shuffle_xor")?,
            I::ShuffleUp => call2("simd_shuffle_up")?,
            I::ShuffleDown => call2("simd_shuffle_down")?,
            I::VoteAll => call1("simd_all")?,
            I::VoteAny => call1("simd_any")?,
            I::QuadBroadcast => call2("quad_broadcast")?,
            I::QuadSwapHorizontal => format!("quad_shuffle_xor({}, 1)", self.src(0)?),
            I::QuadSwapVertical => format!("quad_shuffle_xor({}, 2)", self.src(0)?),
            I::QuadSwapDiagonal => format!("quad_shuffle_xor({}, 3)", self.src(0)?),
            I::Reduce => self.reduce()?,
            _ => return Ok(None),
        };
        Ok(Some(expr))
    }

    fn store_reg(&mut self) -> Result<(), CompileError> {
        let reg = super::nth_src(self.instr, 1)?;
        let value = super::nth_src(self.instr, 0)?;
        let value_def = self.ctx.def(value)?;
        let (bits, comps) = (value_def.bit_size, value_def.num_components);
        let mask = self.intr.write_mask_or_full(comps);
        let uint = crate::types::msl_uint_type(bits, comps).ok_or(CompileError::BadBitSize {
            def: value_def.id,
            bits,
        })?;

        let open = if bits == 1 {
            format!("bool{}((", component_suffix(comps))
        } else if self.src_is_const(0)? && comps == 1 {
            format!("as_type<{uint}>({}(", self.ctx.src_type_name(self.instr, 0)?)
        } else {
            format!("as_type<{uint}>((")
        };
        let line = format!(
            "r{}{} = {open}{}));",
            reg.0,
            write_mask_swizzle(mask, comps),
            self.src(0)?
        );
        self.ctx.line(line);
        Ok(())
    }

    fn store_output(&mut self) -> Result<(), CompileError> {
        let location = self.io_location(1)?;
        let name = self.output_name(location)?;
        let comps = self.src_components(0)?;
        let mask = self.intr.write_mask_or_full(comps);
        let component = usize::from(self.intr.index.component);
        let slot_components = self
            .ctx
            .io
            .outputs
            .get(location as usize)
            .map_or(0, |slot| slot.num_components);
        let written = (0..usize::from(comps.min(4))).filter(|i| (mask >> i) & 1 != 0);

        let mut line = format!("out.{name}");
        if slot_components > 1 {
            line.push('.');
            line.extend(written.clone().map(|i| XYZW[(component + i).min(3)]));
        }
        line.push_str(" = ");
        line.push_str(&self.src(0)?);
        if comps > 1 {
            line.push('.');
            line.extend(written.map(|i| XYZW[i]));
        }
        line.push(';');
        self.ctx.line(line);
        Ok(())
    }

    fn store_global(&mut self) -> Result<(), CompileError> {
        let ty = self.ctx.src_type_name(self.instr, 0)?;
        let comps = self.src_components(0)?;
        let mask = self.intr.write_mask_or_full(comps);
        let (pointer, value) = if comps == 1 {
            (format!("*(device {ty}*)"), format!("{ty}({})", self.src(0)?))
        } else {
            (
                format!("*(device packed_{ty}*)"),
                format!("packed_{ty}({})", self.src(0)?),
            )
        };
        let line = format!(
            "{pointer}{}{} = {value};",
            self.src(1)?,
            write_mask_swizzle(mask, comps)
        );
        self.ctx.line(line);
        Ok(())
    }

    /// Stores into `shared_data`/`scratch`, which are byte arrays reinterpreted at the offset.
    fn store_local(&mut self, space: &str, array: &str) -> Result<(), CompileError> {
        self.require_zero_base()?;
        let ty = self.ctx.src_type_name(self.instr, 0)?;
        let comps = self.src_components(0)?;
        let mask = write_mask_swizzle(self.intr.write_mask_or_full(comps), comps);
        let value_mask = if comps > 1 { mask.as_str() } else { "" };
        let line = format!(
            "(*({space} {ty}*)&{array}[{}]){mask} = {}{value_mask};",
            self.src(1)?,
            self.src(0)?
        );
        self.ctx.line(line);
        Ok(())
    }

    /// Compare-exchange mutates its expected-value operand, so it gets a named temporary.
    fn atomic_swap(&mut self, space: &str, shared: bool) -> Result<(), CompileError> {
        let op = atomic_op_name(self.atomic_op()?);
        let ty = self.dest_type()?;
        let n = self.dest()?.id.0;
        let addr = self.src(0)?;
        let addr = if shared {
            format!("&shared_data[{addr}]")
        } else {
            addr
        };
        let line = format!(
            "{ty} ta{n} = {}; {op}_explicit(({space} atomic_{ty}*){addr}, &ta{n}, {}, \
             {MEMORY_ORDER}, {MEMORY_ORDER}); {ty} t{n} = ta{n};",
            self.src(1)?,
            self.src(2)?
        );
        self.ctx.line(line);
        Ok(())
    }

    fn image_atomic_swap(&mut self) -> Result<(), CompileError> {
        let op = atomic_op_name(self.atomic_op()?);
        let ty = self.dest_type()?;
        let n = self.dest()?.id.0;
        let line = format!(
            "{ty}4 ta{n} = {}; {}.{op}({}, &ta{n}, {}); {ty} t{n} = ta{n}.x;",
            self.src(3)?,
            self.src(0)?,
            self.image_coords()?,
            self.src(4)?
        );
        self.ctx.line(line);
        Ok(())
    }

    fn image_store(&mut self) -> Result<(), CompileError> {
        let mut line = format!(
            "{}.write({}, {}",
            self.src(0)?,
            self.src(3)?,
            self.image_coords()?
        );
        if self.image_dim()? != SamplerDim::Buf {
            line.push_str(", ");
            line.push_str(&self.src(4)?);
        }
        line.push_str(");");
        self.ctx.line(line);
        Ok(())
    }

    fn texture_handle(&mut self, depth: bool) -> Result<(), CompileError> {
        let dim = texture_dim(self.image_dim()?);
        let array = if self.intr.index.image_array {
            "_array"
        } else {
            ""
        };
        let ty = if depth {
            format!("depth{dim}{array}<float>")
        } else {
            let elem = self.intr.index.dest_type.ok_or(CompileError::MissingIndex {
                op: self.intr.op,
                index: "dest_type",
            })?;
            let access = match self.intr.index.access {
                Access::None => "",
                Access::Read => ", access::read",
                Access::Write => ", access::write",
                Access::ReadWrite => ", access::read_write",
            };
            format!("texture{dim}{array}<{}{access}>", tex_type_name(elem)?)
        };
        let line = format!(
            "{ty} t{} = *(constant {ty}*){};",
            self.dest()?.id.0,
            self.src(0)?
        );
        self.ctx.line(line);
        Ok(())
    }

    fn barrier(&mut self) -> Result<(), CompileError> {
        let index = &self.intr.index;
        let modes = index.memory_modes;
        let line = match index.execution_scope {
            Scope::Subgroup => format!("simdgroup_barrier({});", memory_modes(modes)),
            Scope::Workgroup => format!("threadgroup_barrier({});", memory_modes(modes)),
            Scope::None => {
                if modes.is_empty() {
                    return Ok(());
                }
                let scope = match index.memory_scope {
                    Scope::Subgroup => "thread_scope::thread_scope_simdgroup",
                    // Workgroup-scoped fences that order device memory still need device
                    // scope in Metal, or device writes are not visible across the group.
                    Scope::Workgroup
                        if modes.intersects(
                            MemoryModes::GLOBAL | MemoryModes::SSBO | MemoryModes::IMAGE,
                        ) =>
                    {
                        "thread_scope::thread_scope_device"
                    }
                    Scope::Workgroup => "thread_scope::thread_scope_threadgroup",
                    Scope::QueueFamily | Scope::Device => "thread_scope::thread_scope_device",
                    scope => return Err(CompileError::BadFenceScope(scope)),
                };
                format!(
                    "atomic_thread_fence({}, memory_order_seq_cst, {scope});",
                    memory_modes(modes)
                )
            }
            scope => return Err(CompileError::BadBarrierScope(scope)),
        };
        self.ctx.line(line);
        Ok(())
    }

    fn discard(&mut self, conditional: bool, terminate: bool) -> Result<(), CompileError> {
        if conditional {
            let cond = self.src(0)?;
            self.ctx.line(format_args!(
                "if ({cond}){}",
                if terminate { " {" } else { "" }
            ));
            self.ctx.indent += 1;
        }
        self.ctx.line("discard_fragment();");
        if terminate {
            self.ctx.line("return {};");
        }
        if conditional {
            self.ctx.indent -= 1;
            if terminate {
                self.ctx.line("}");
            }
        }
        Ok(())
    }

    fn emit(&mut self) -> Result<(), CompileError> {
        use IntrinsicOp as I;

        if self.intr.op.is_barycentric() {
            return Ok(());
        }
        let expected = self.intr.op.info().num_srcs;
        if self.intr.srcs.len() < expected {
            return Err(CompileError::SrcCount {
                op: self.intr.op,
                expected,
                found: self.intr.srcs.len(),
            });
        }

        if needs_dest_type(self.intr) {
            if let Some(expr) = self.value()? {
                let n = self.dest()?.id.0;
                self.ctx.line(format_args!("t{n} = {expr};"));
                return Ok(());
            }
        }

        match self.intr.op {
            I::DeclReg => {
                let index = &self.intr.index;
                let def = self.dest()?;
                let ty = crate::types::msl_uint_type(index.bit_size, index.num_components)
                    .ok_or(CompileError::BadBitSize {
                        def: def.id,
                        bits: index.bit_size,
                    })?;
                let n = def.id.0;
                self.ctx.line(format_args!("{ty} r{n} = {ty}(0);"));
            }
            // Register reads are spelled inline at every use.
            I::LoadReg => {}
            I::StoreReg => self.store_reg()?,
            I::StoreOutput => self.store_output()?,
            I::StoreGlobal => self.store_global()?,
            I::StoreShared => self.store_local("threadgroup", "shared_data")?,
            I::StoreScratch => self.store_local("thread", "scratch")?,
            I::GlobalAtomicSwap => self.atomic_swap("device", false)?,
            I::SharedAtomicSwap => self.atomic_swap("threadgroup", true)?,
            I::BindlessImageAtomicSwap => self.image_atomic_swap()?,
            I::BindlessImageStore => self.image_store()?,
            I::LoadTextureHandle => self.texture_handle(false)?,
            I::LoadDepthTexture => self.texture_handle(true)?,
            I::Barrier => self.barrier()?,
            I::Demote => self.discard(false, false)?,
            I::DemoteIf => self.discard(true, false)?,
            I::Terminate => self.discard(false, true)?,
            I::TerminateIf => self.discard(true, true)?,
            op => {
                warn!(%op, "no MSL rule for intrinsic; emitting placeholder");
                self.ctx.line(format_args!("Unknown intrinsic {op}"));
            }
        }
        Ok(())
    }
}

pub(super) fn emit_intrinsic(
    ctx: &mut Ctx<'_>,
    instr: &Instr,
    intr: &IntrinsicInstr,
) -> Result<(), CompileError> {
    Emitter { ctx, instr, intr }.emit()
}
