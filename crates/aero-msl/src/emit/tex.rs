use tracing::warn;

use aero_msl_ir::{BaseType, Instr, SamplerDim, SizedType, TexInstr, TexOp, TexSrcKind};

use super::{Ctx, XYZW};
use crate::CompileError;

pub(super) fn texture_dim(dim: SamplerDim) -> &'static str {
    match dim {
        SamplerDim::Dim1D => "1d",
        SamplerDim::Dim2D => "2d",
        SamplerDim::Dim3D => "3d",
        SamplerDim::Cube => "cube",
        SamplerDim::Buf => "_buffer",
        SamplerDim::Ms => "2d_ms",
    }
}

/// Element type of a texture template.
pub(super) fn tex_type_name(ty: SizedType) -> Result<&'static str, CompileError> {
    Ok(match (ty.base, ty.bits) {
        (BaseType::Int, 16) => "short",
        (BaseType::Int, 32) => "int",
        (BaseType::Uint, 16) => "ushort",
        (BaseType::Uint, 32) => "uint",
        (BaseType::Float, 16) => "half",
        (BaseType::Float, 32) => "float",
        _ => return Err(CompileError::BadTextureType(ty)),
    })
}

/// Spells operand `src` of `instr` as texture coordinates.
///
/// `num_components` counts the face and layer too. When the operand is wider than the texel
/// coordinates, the face and layer are split off into separate arguments rounded to `uint`.
pub(super) fn texture_src_coord_swizzle(
    ctx: &Ctx<'_>,
    instr: &Instr,
    src: usize,
    num_components: u8,
    cube: bool,
    array: bool,
) -> Result<String, CompileError> {
    let expr = ctx.src(instr, src)?;
    let src_components = ctx.def(super::nth_src(instr, src)?)?.num_components;
    let coord_components = usize::from(num_components)
        .saturating_sub(usize::from(array))
        .saturating_sub(usize::from(cube));
    if coord_components >= usize::from(src_components) {
        return Ok(expr);
    }

    let mut out = format!("{expr}.");
    out.extend(&XYZW[..coord_components.min(4)]);
    let is_float = ctx.src_is_float(instr, src);
    let mut next = coord_components;
    for _ in 0..usize::from(cube) + usize::from(array) {
        let component = XYZW[next.min(3)];
        next += 1;
        if is_float {
            out.push_str(&format!(", uint(rint({expr}.{component}))"));
        } else {
            out.push_str(&format!(", {expr}.{component}"));
        }
    }
    Ok(out)
}

struct TexEmitter<'c, 'a> {
    ctx: &'c Ctx<'a>,
    instr: &'c Instr,
    tex: &'c TexInstr,
}

impl TexEmitter<'_, '_> {
    fn find(&self, kind: TexSrcKind) -> Option<usize> {
        self.tex.srcs.iter().position(|s| s.kind == kind)
    }

    fn optional(&self, kind: TexSrcKind) -> Result<Option<String>, CompileError> {
        self.find(kind).map(|i| self.ctx.src(self.instr, i)).transpose()
    }

    fn required(&self, kind: TexSrcKind) -> Result<String, CompileError> {
        self.optional(kind)?.ok_or(CompileError::MissingTexSrc {
            op: self.tex.op,
            kind,
        })
    }

    fn coord(&self) -> Result<String, CompileError> {
        let index = self.find(TexSrcKind::Coord).ok_or(CompileError::MissingTexSrc {
            op: self.tex.op,
            kind: TexSrcKind::Coord,
        })?;
        texture_src_coord_swizzle(
            self.ctx,
            self.instr,
            index,
            self.tex.coord_components,
            false,
            self.tex.is_array,
        )
    }

    fn sample(&self, handle: &str) -> Result<String, CompileError> {
        let comparator = self.optional(TexSrcKind::Comparator)?;
        let method = if comparator.is_some() {
            "sample_compare"
        } else {
            "sample"
        };
        let mut expr = format!(
            "{handle}.{method}({}, {}",
            self.required(TexSrcKind::SamplerHandle)?,
            self.coord()?
        );
        if let Some(comparator) = comparator {
            expr.push_str(&format!(", {comparator}"));
        }
        if let Some(bias) = self.optional(TexSrcKind::Bias)? {
            expr.push_str(&format!(", bias({bias})"));
        }
        if let Some(lod) = self.optional(TexSrcKind::Lod)? {
            expr.push_str(&format!(", level({lod})"));
        }
        if let Some(ddx) = self.optional(TexSrcKind::Ddx)? {
            let ddy = self.required(TexSrcKind::Ddy)?;
            expr.push_str(&format!(
                ", gradient{}({ddx}, {ddy})",
                texture_dim(self.tex.sampler_dim)
            ));
        }
        if let Some(min_lod) = self.optional(TexSrcKind::MinLod)? {
            expr.push_str(&format!(", min_lod_clamp({min_lod})"));
        }
        if let Some(offset) = self.optional(TexSrcKind::Offset)? {
            expr.push_str(&format!(", {offset}"));
        }
        expr.push(')');
        Ok(expr)
    }

    fn size(&self, handle: &str) -> Result<String, CompileError> {
        let dim = self.tex.sampler_dim;
        let elem = tex_type_name(self.tex.dest_type)?;
        let lod = self.optional(TexSrcKind::Lod)?;
        // Multisampled and buffer textures have no mip levels.
        let level = match (&lod, dim) {
            (Some(lod), d) if d != SamplerDim::Ms && d != SamplerDim::Buf => lod.as_str(),
            _ => "",
        };

        let mut expr = if self.tex.def.num_components > 1 {
            format!("{elem}{}(", self.tex.def.num_components)
        } else {
            format!("{elem}(")
        };
        expr.push_str(&format!("{handle}.get_width({level})"));
        if dim != SamplerDim::Dim1D && dim != SamplerDim::Buf {
            expr.push_str(&format!(", {handle}.get_height({level})"));
        }
        if dim == SamplerDim::Dim3D {
            let depth_level = lod.as_deref().unwrap_or("");
            expr.push_str(&format!(", {handle}.get_depth({depth_level})"));
        }
        if self.tex.is_array {
            expr.push_str(&format!(", {handle}.get_array_size()"));
        }
        expr.push(')');
        Ok(expr)
    }

    fn gather(&self, handle: &str) -> Result<String, CompileError> {
        let comparator = self.optional(TexSrcKind::Comparator)?;
        let method = if comparator.is_some() {
            "gather_compare"
        } else {
            "gather"
        };
        let mut expr = format!(
            "{handle}.{method}({}, {}",
            self.required(TexSrcKind::SamplerHandle)?,
            self.coord()?
        );
        if let Some(comparator) = &comparator {
            expr.push_str(&format!(", {comparator}"));
        }
        let offset = self
            .optional(TexSrcKind::Offset)?
            .unwrap_or_else(|| "int2(0)".to_owned());
        expr.push_str(&format!(", {offset}"));
        // Depth gathers have a single channel; colour gathers must name one.
        if comparator.is_none() {
            let component = XYZW[usize::from(self.tex.component).min(3)];
            expr.push_str(&format!(", component::{component}"));
        }
        expr.push(')');
        Ok(expr)
    }

    fn lod(&self, handle: &str) -> Result<String, CompileError> {
        let sampler = self.required(TexSrcKind::SamplerHandle)?;
        let coord = self.required(TexSrcKind::Coord)?;
        let bias = self.required(TexSrcKind::Bias)?;
        let min = self.required(TexSrcKind::MinLod)?;
        let max = self.required(TexSrcKind::MaxLod)?;
        let unclamped = format!("{handle}.calculate_unclamped_lod({sampler}, {coord})");
        Ok(format!(
            "float2(round(clamp({unclamped} + {bias}, {min}, {max})), {unclamped})"
        ))
    }

    fn emit(&self) -> Result<Option<String>, CompileError> {
        if self.find(TexSrcKind::Projector).is_some() {
            return Err(CompileError::TexProjector);
        }
        let handle = self.required(TexSrcKind::TextureHandle)?;

        let expr = match self.tex.op {
            TexOp::Tex | TexOp::Txb | TexOp::Txl | TexOp::Txd => self.sample(&handle)?,
            TexOp::Txf => match self.optional(TexSrcKind::Lod)? {
                Some(lod) => format!("{handle}.read({}, {lod})", self.coord()?),
                None => format!("{handle}.read({})", self.coord()?),
            },
            TexOp::TxfMs => format!(
                "{handle}.read({}, {})",
                self.coord()?,
                self.required(TexSrcKind::MsIndex)?
            ),
            TexOp::Txs => self.size(&handle)?,
            TexOp::QueryLevels => format!("{handle}.get_num_mip_levels()"),
            TexOp::TextureSamples => format!("{handle}.get_num_samples()"),
            TexOp::Tg4 => self.gather(&handle)?,
            TexOp::Lod => self.lod(&handle)?,
            TexOp::SamplesIdentical | TexOp::FragmentMaskFetch => return Ok(None),
        };
        Ok(Some(expr))
    }
}

pub(super) fn emit_tex(ctx: &mut Ctx<'_>, instr: &Instr, tex: &TexInstr) -> Result<(), CompileError> {
    let expr = TexEmitter {
        ctx: &*ctx,
        instr,
        tex,
    }
    .emit()?;
    match expr {
        Some(expr) => ctx.line(format_args!("t{} = {expr};", tex.def.id.0)),
        None => {
            warn!(op = %tex.op, def = %tex.def.id, "no MSL rule for texture op; emitting placeholder");
            ctx.line(format_args!("Unknown texture op {}", tex.op));
        }
    }
    Ok(())
}
