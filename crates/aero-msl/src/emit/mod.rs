//! Metal Shading Language text generation.
//!
//! Every SSA def that needs storage becomes a function-local `tN`, declared zero-initialized at
//! the top of the entry point and assigned where the instruction sits. Constants and undefs are
//! never materialized; they are spelled inline at each use with the type the use expects.

mod alu;
mod cf;
mod intrinsic;
mod tex;

use std::fmt::{self, Write as _};

use hashbrown::HashMap;

use aero_msl_ir::{
    Def, DefId, Instr, InstrId, InstrKind, IntrinsicOp, LoadConst, Shader, ShaderStage,
};

use crate::io::{self, IoInfo, SYSVAL_PARAMS};
use crate::types::{msl_type_name, TiType, TypeMap};
use crate::CompileError;

pub(crate) const XYZW: [char; 4] = ['x', 'y', 'z', 'w'];

const INDENT: &str = "    ";

/// State for one emission: the analyses it reads and the text it accumulates.
pub(crate) struct Ctx<'a> {
    pub(crate) shader: &'a Shader,
    pub(crate) types: &'a TypeMap,
    pub(crate) io: &'a IoInfo,
    defs: HashMap<DefId, &'a Instr>,
    pub(crate) out: String,
    pub(crate) indent: usize,
}

impl<'a> Ctx<'a> {
    fn new(shader: &'a Shader, types: &'a TypeMap, io: &'a IoInfo) -> Self {
        let defs = shader
            .entry
            .instrs()
            .into_iter()
            .filter_map(|instr| instr.def().map(|d| (d.id, instr)))
            .collect();
        Self {
            shader,
            types,
            io,
            defs,
            out: String::with_capacity(4096),
            indent: 0,
        }
    }

    pub(crate) fn pad(&self) -> String {
        INDENT.repeat(self.indent)
    }

    /// Writes one indented line.
    pub(crate) fn line(&mut self, text: impl fmt::Display) {
        let pad = self.pad();
        let _ = writeln!(self.out, "{pad}{text}");
    }

    pub(crate) fn parent(&self, id: DefId) -> Result<&'a Instr, CompileError> {
        self.defs
            .get(&id)
            .copied()
            .ok_or(CompileError::UndefinedValue(id))
    }

    pub(crate) fn def(&self, id: DefId) -> Result<&'a Def, CompileError> {
        self.parent(id)?
            .def()
            .ok_or(CompileError::UndefinedValue(id))
    }

    pub(crate) fn def_type_name(&self, def: &Def) -> Result<&'static str, CompileError> {
        self.types
            .def_type_name(def)
            .ok_or(CompileError::Untyped(def.id))
    }

    /// Type operand `src` of `instr` is read as, spelled with the operand's shape.
    pub(crate) fn src_type_name(
        &self,
        instr: &Instr,
        src: usize,
    ) -> Result<&'static str, CompileError> {
        let id = nth_src(instr, src)?;
        let def = self.def(id)?;
        self.types
            .src_type_name(instr.id, src, def)
            .ok_or(CompileError::Untyped(id))
    }

    /// Expression for operand `src` of `instr`.
    pub(crate) fn src(&self, instr: &Instr, src: usize) -> Result<String, CompileError> {
        let id = nth_src(instr, src)?;
        self.value(Some((instr.id, src)), id)
    }

    /// Whether operand `src` of `instr` is read as a float.
    pub(crate) fn src_is_float(&self, instr: &Instr, src: usize) -> bool {
        self.types.src_type(instr.id, src) == TiType::Float
    }

    /// Spells `id` as read at `use_site`, or as its own type when there is no use site (if
    /// conditions).
    pub(crate) fn value(
        &self,
        use_site: Option<(InstrId, usize)>,
        id: DefId,
    ) -> Result<String, CompileError> {
        let parent = self.parent(id)?;
        let def = self.def(id)?;
        let ty = match use_site {
            Some((instr, src)) => self.types.src_type(instr, src),
            None => self.types.def_type(id),
        };

        match &parent.kind {
            InstrKind::LoadConst(load) => return const_expr(load, ty),
            InstrKind::Undef { def } => {
                if def.num_components == 1 {
                    return Ok("00".to_owned());
                }
                let name = msl_type_name(ty, def.bit_size, def.num_components)
                    .ok_or(CompileError::Untyped(def.id))?;
                let zeros = vec!["00"; usize::from(def.num_components)].join(", ");
                return Ok(format!("{name}({zeros})"));
            }
            _ => {}
        }

        let base = match &parent.kind {
            InstrKind::Intrinsic(intr) if intr.op == IntrinsicOp::LoadReg => {
                let reg = intr.srcs.first().ok_or(CompileError::SrcCount {
                    op: intr.op,
                    expected: 1,
                    found: 0,
                })?;
                let name = self.def_type_name(def)?;
                if def.bit_size == 1 {
                    format!("{name}(r{})", reg.0)
                } else {
                    format!("as_type<{name}>(r{})", reg.0)
                }
            }
            _ => format!("t{}", id.0),
        };
        let bitcast = use_site.and_then(|(instr, src)| self.types.bitcast(instr, src, def));
        Ok(match bitcast {
            Some(ty) => format!("as_type<{ty}>({base})"),
            None => base,
        })
    }
}

pub(crate) fn nth_src(instr: &Instr, src: usize) -> Result<DefId, CompileError> {
    let srcs = instr.srcs();
    srcs.get(src).copied().ok_or_else(|| match &instr.kind {
        InstrKind::Alu(alu) => CompileError::AluSrcCount {
            op: alu.op,
            expected: alu.op.info().num_inputs,
            found: srcs.len(),
        },
        InstrKind::Intrinsic(intr) => CompileError::SrcCount {
            op: intr.op,
            expected: src + 1,
            found: srcs.len(),
        },
        _ => CompileError::UndefinedValue(DefId(u32::MAX)),
    })
}

/// `%.17e` as C prints it: mantissa, then a signed exponent of at least two digits.
fn c_exponent(value: f64) -> String {
    let text = format!("{value:.17e}");
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
        }
        None => text,
    }
}

fn sign_extend(bits: u64, width: u8) -> i64 {
    if width >= 64 {
        bits as i64
    } else {
        let shift = 64 - u32::from(width);
        ((bits << shift) as i64) >> shift
    }
}

fn mask_to(bits: u64, width: u8) -> u64 {
    if width >= 64 {
        bits
    } else {
        bits & ((1u64 << width) - 1)
    }
}

fn const_component(load: &LoadConst, component: u8, ty: TiType) -> Result<String, CompileError> {
    let def = &load.def;
    let raw = load.component_bits(component);
    let bad_bits = || CompileError::BadBitSize {
        def: def.id,
        bits: def.bit_size,
    };
    Ok(match ty {
        TiType::Float => {
            let value = match def.bit_size {
                16 => half::f16::from_bits(raw as u16).to_f64(),
                32 => f64::from(f32::from_bits(raw as u32)),
                64 => f64::from_bits(raw),
                _ => return Err(bad_bits()),
            };
            if value.is_nan() {
                "(NAN)".to_owned()
            } else if value.is_infinite() {
                let sign = if value < 0.0 { "-" } else { "" };
                format!("({sign}INFINITY)")
            } else {
                let ctor = if def.bit_size == 16 { "half" } else { "float" };
                format!("{ctor}({})", c_exponent(value))
            }
        }
        TiType::Bool => format!("bool({})", u8::from(raw != 0)),
        TiType::Int => {
            let ctor = match def.bit_size {
                8 => "char",
                16 => "short",
                32 => "int",
                64 => "long",
                _ => return Err(bad_bits()),
            };
            format!("{ctor}({})", sign_extend(raw, def.bit_size))
        }
        TiType::Uint | TiType::GenericData | TiType::GenericInt | TiType::GenericIntOrBool => {
            let ctor = match def.bit_size {
                1 => return Ok(format!("bool({})", raw & 1)),
                8 => "uchar",
                16 => "ushort",
                32 => "uint",
                64 => "ulong",
                _ => return Err(bad_bits()),
            };
            format!("{ctor}({}u)", mask_to(raw, def.bit_size))
        }
        TiType::None | TiType::Sampler => return Err(CompileError::Untyped(def.id)),
    })
}

/// A constant spelled as `ty`; vectors go through their constructor.
fn const_expr(load: &LoadConst, ty: TiType) -> Result<String, CompileError> {
    let def = &load.def;
    if def.num_components == 1 {
        return const_component(load, 0, ty);
    }
    let name = msl_type_name(ty, def.bit_size, def.num_components)
        .ok_or(CompileError::Untyped(def.id))?;
    let parts = (0..def.num_components)
        .map(|c| const_component(load, c, ty))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("{name}({})", parts.join(", ")))
}

fn stage_keyword(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "vertex",
        ShaderStage::Fragment => "fragment",
        ShaderStage::Compute => "kernel",
    }
}

fn return_type(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => io::VERTEX_OUTPUT_TYPE,
        ShaderStage::Fragment => io::FRAGMENT_OUTPUT_TYPE,
        ShaderStage::Compute => "void",
    }
}

fn emit_params(ctx: &mut Ctx<'_>) {
    let shader = ctx.shader;
    let info = &shader.info;
    for (flag, param) in SYSVAL_PARAMS {
        if info.system_values_read.contains(flag) && !param.is_empty() {
            ctx.line(format_args!("{param},"));
        }
    }
    if shader.stage == ShaderStage::Fragment {
        ctx.line("FragmentIn in [[stage_in]],");
    }
    ctx.line("constant Buffer &buf0 [[buffer(0)]],");
    ctx.line("constant SamplerTable &sampler_table [[buffer(1)]]");
}

fn emit_locals(ctx: &mut Ctx<'_>) {
    let shader = ctx.shader;
    let info = &shader.info;
    if info.shared_size != 0 {
        ctx.line(format_args!("threadgroup char shared_data[{}];", info.shared_size));
    }
    if info.scratch_size != 0 {
        ctx.line(format_args!("uchar scratch[{}] = {{0}};", info.scratch_size));
    }
    if info
        .system_values_read
        .contains(aero_msl_ir::SystemValues::HELPER_INVOCATION)
    {
        ctx.line("bool gl_HelperInvocation = simd_is_helper_thread();");
    }
}

/// Declares every `tN` the body assigns, zero-initialized.
fn predeclare_values(ctx: &mut Ctx<'_>) -> Result<(), CompileError> {
    let shader = ctx.shader;
    for instr in shader.entry.instrs() {
        let (def, required) = match &instr.kind {
            InstrKind::Alu(alu) => (&alu.def, true),
            InstrKind::Tex(tex) => (&tex.def, true),
            InstrKind::Intrinsic(intr) if intrinsic::needs_dest_type(intr) => {
                let def = intr
                    .def
                    .as_ref()
                    .ok_or(CompileError::MissingDef { op: intr.op })?;
                (def, intrinsic::has_emission_rule(intr.op))
            }
            _ => continue,
        };
        let Some(ty) = ctx.types.def_type_name(def) else {
            if required {
                return Err(CompileError::Untyped(def.id));
            }
            continue;
        };
        if ctx.types.def_type(def.id) == TiType::Sampler {
            ctx.line(format_args!("{ty} t{};", def.id.0));
        } else {
            ctx.line(format_args!("{ty} t{} = {ty}(0);", def.id.0));
        }
    }
    Ok(())
}

/// Renders the whole translation unit for `shader`.
pub(crate) fn emit_program(
    shader: &Shader,
    types: &TypeMap,
    io_info: &IoInfo,
    banner: &str,
) -> Result<String, CompileError> {
    let mut ctx = Ctx::new(shader, types, io_info);
    let stage = shader.stage;

    if !banner.is_empty() {
        let _ = writeln!(ctx.out, "{banner}");
    }
    if stage == ShaderStage::Compute {
        ctx.out.push_str("#include <metal_compute>\n");
    }
    ctx.out.push_str("#include <metal_stdlib>\n");
    ctx.out.push_str("using namespace metal;\n");

    io::emit_io_blocks(&mut ctx.out, shader, io_info)?;
    if stage == ShaderStage::Fragment && shader.info.early_fragment_tests {
        ctx.out.push_str("[[early_fragment_tests]]\n");
    }
    let _ = writeln!(
        ctx.out,
        "{} {} {}(",
        stage_keyword(stage),
        return_type(stage),
        shader.entry.name
    );
    ctx.indent = 1;
    emit_params(&mut ctx);
    ctx.indent = 0;
    ctx.out.push_str(")\n{\n");

    ctx.indent = 1;
    io::emit_output_var(&mut ctx.out, stage, shader.info.outputs_read);
    emit_locals(&mut ctx);
    predeclare_values(&mut ctx)?;
    cf::emit_cf_list(&mut ctx, &shader.entry.body)?;
    if matches!(stage, ShaderStage::Vertex | ShaderStage::Fragment) {
        ctx.line("return out;");
    }
    ctx.indent = 0;
    ctx.out.push_str("}\n");
    Ok(ctx.out)
}
