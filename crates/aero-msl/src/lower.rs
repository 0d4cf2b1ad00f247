//! Stage-specific lowering the caller selects per pipeline.
//!
//! These run between preprocessing and optimization. Each helper checks the stage it applies to
//! and reports whether it changed the program.

use serde::{Deserialize, Serialize};
use tracing::debug;

use aero_msl_ir::{
    frag_result, varying_slot, AluInstr, AluOp, AluSrc, BaseType, CfNode, DefId, DepthLayout,
    Function, Instr, InstrKind, IntrinsicIndices, IntrinsicInstr, IntrinsicOp, IoSemantics,
    LoadConst, Shader, ShaderStage, SizedType, SystemValues,
};

use crate::error::CompileError;

/// Numeric class of a bound render target's format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderTargetClass {
    #[default]
    Float,
    Sint,
    Uint,
}

/// Which stage lowering helpers [`crate::compile`] applies, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageLowering {
    pub remove_point_size_write: bool,
    pub remove_depth_write: bool,
    pub ensure_vertex_position_output: bool,
    pub ensure_depth_write: bool,
    pub sample_mask_as_uint: bool,
    pub layer_id_as_uint: bool,
    pub fix_stencil_type: bool,
    pub static_sample_mask: Option<u32>,
    /// One entry per color attachment; empty leaves color output types alone.
    pub render_target_classes: Vec<RenderTargetClass>,
}

impl StageLowering {
    pub fn apply(&self, shader: &mut Shader) -> Result<bool, CompileError> {
        let mut progress = false;
        if self.remove_point_size_write {
            progress |= remove_point_size_write(shader)?;
        }
        if self.remove_depth_write {
            progress |= remove_depth_write(shader)?;
        }
        if self.ensure_vertex_position_output {
            progress |= ensure_vertex_position_output(shader)?;
        }
        if self.ensure_depth_write {
            progress |= ensure_depth_write(shader)?;
        }
        if self.sample_mask_as_uint {
            progress |= sample_mask_as_uint(shader)?;
        }
        if self.layer_id_as_uint {
            progress |= layer_id_as_uint(shader)?;
        }
        if self.fix_stencil_type {
            progress |= fix_stencil_type(shader)?;
        }
        if let Some(mask) = self.static_sample_mask {
            progress |= static_sample_mask(shader, mask)?;
        }
        if !self.render_target_classes.is_empty() {
            progress |= force_output_signedness(shader, &self.render_target_classes)?;
        }
        Ok(progress)
    }
}

fn require_stage(
    shader: &Shader,
    stage: ShaderStage,
    helper: &'static str,
) -> Result<(), CompileError> {
    if shader.stage == stage {
        Ok(())
    } else {
        Err(CompileError::LoweringStage {
            helper,
            stage: shader.stage,
        })
    }
}

fn io_location(intr: &IntrinsicInstr) -> Option<u32> {
    intr.index.io.map(|io| io.location)
}

fn is_output_access(instr: &Instr, op: IntrinsicOp, location: u32) -> bool {
    instr
        .as_intrinsic()
        .is_some_and(|intr| intr.op == op && io_location(intr) == Some(location))
}

fn remove_output_stores(shader: &mut Shader, location: u32) -> bool {
    let mut removed = false;
    shader.entry.for_each_block_mut(&mut |block| {
        let before = block.instrs.len();
        block
            .instrs
            .retain(|instr| !is_output_access(instr, IntrinsicOp::StoreOutput, location));
        removed |= block.instrs.len() != before;
    });
    let was_written = shader.info.outputs_written.contains(location);
    shader.info.outputs_written.remove(location);
    removed || was_written
}

/// Instructions to run before anything else in the entry function.
fn prepend(func: &mut Function, instrs: Vec<Instr>) {
    if !matches!(func.body.first(), Some(CfNode::Block(_))) {
        let block = func.alloc_block();
        func.body.insert(0, CfNode::Block(block));
    }
    if let Some(CfNode::Block(entry)) = func.body.first_mut() {
        entry.instrs.splice(0..0, instrs);
    }
}

fn constant(func: &mut Function, bit_size: u8, values: Vec<u64>, out: &mut Vec<Instr>) -> DefId {
    let def = func.alloc_def(bit_size, values.len() as u8);
    out.push(func.alloc_instr(InstrKind::LoadConst(LoadConst { def, values })));
    def.id
}

fn store_output(
    func: &mut Function,
    value: DefId,
    num_components: u8,
    location: u32,
    src_type: SizedType,
    out: &mut Vec<Instr>,
) {
    let offset = constant(func, 32, vec![0], out);
    out.push(func.alloc_instr(InstrKind::Intrinsic(IntrinsicInstr {
        op: IntrinsicOp::StoreOutput,
        srcs: vec![value, offset],
        def: None,
        index: IntrinsicIndices {
            io: Some(IoSemantics {
                location,
                num_slots: 1,
            }),
            src_type: Some(src_type),
            write_mask: Some(((1u16 << num_components) - 1) as u8),
            ..Default::default()
        },
    })));
}

/// Drops every point-size store of a vertex shader.
pub fn remove_point_size_write(shader: &mut Shader) -> Result<bool, CompileError> {
    require_stage(shader, ShaderStage::Vertex, "remove_point_size_write")?;
    Ok(remove_output_stores(shader, varying_slot::PSIZ))
}

/// Drops every depth store of a fragment shader.
pub fn remove_depth_write(shader: &mut Shader) -> Result<bool, CompileError> {
    require_stage(shader, ShaderStage::Fragment, "remove_depth_write")?;
    Ok(remove_output_stores(shader, frag_result::DEPTH))
}

/// Metal requires every vertex function to return a position; write zero if the program
/// doesn't.
pub fn ensure_vertex_position_output(shader: &mut Shader) -> Result<bool, CompileError> {
    require_stage(shader, ShaderStage::Vertex, "ensure_vertex_position_output")?;
    if shader.info.outputs_written.contains(varying_slot::POS) {
        return Ok(false);
    }
    let func = &mut shader.entry;
    let mut instrs = Vec::new();
    let zero = u64::from(0.0f32.to_bits());
    let position = constant(func, 32, vec![zero; 4], &mut instrs);
    store_output(
        func,
        position,
        4,
        varying_slot::POS,
        SizedType::float32(),
        &mut instrs,
    );
    prepend(func, instrs);
    shader.info.outputs_written.insert(varying_slot::POS);
    debug!("added zero position output");
    Ok(true)
}

/// Writes the rasterized depth when the program writes none.
pub fn ensure_depth_write(shader: &mut Shader) -> Result<bool, CompileError> {
    require_stage(shader, ShaderStage::Fragment, "ensure_depth_write")?;
    if shader.info.outputs_written.contains(frag_result::DEPTH) {
        return Ok(false);
    }
    let func = &mut shader.entry;
    let mut instrs = Vec::new();
    let coord = func.alloc_def(32, 4);
    instrs.push(func.alloc_instr(InstrKind::Intrinsic(IntrinsicInstr::new(
        IntrinsicOp::LoadFragCoord,
        Vec::new(),
        Some(coord),
    ))));
    let depth = func.alloc_def(32, 1);
    instrs.push(func.alloc_instr(InstrKind::Alu(AluInstr {
        op: AluOp::Mov,
        def: depth,
        srcs: vec![AluSrc::component(coord.id, 2)],
    })));
    store_output(
        func,
        depth.id,
        1,
        frag_result::DEPTH,
        SizedType::float32(),
        &mut instrs,
    );
    prepend(func, instrs);

    let info = &mut shader.info;
    info.outputs_written.insert(frag_result::DEPTH);
    info.system_values_read |= SystemValues::FRAG_COORD;
    info.depth_layout = DepthLayout::Any;
    debug!("added depth output from frag_coord.z");
    Ok(true)
}

/// Retypes output accesses at `location` with `retype`. Returns whether any type changed.
fn retype_outputs(
    shader: &mut Shader,
    location: u32,
    retype: &impl Fn(SizedType) -> SizedType,
) -> bool {
    let mut changed = false;
    shader.entry.for_each_instr_mut(&mut |instr| {
        let InstrKind::Intrinsic(intr) = &mut instr.kind else {
            return;
        };
        if io_location(intr) != Some(location) {
            return;
        }
        let ty = match intr.op {
            IntrinsicOp::StoreOutput => &mut intr.index.src_type,
            IntrinsicOp::LoadOutput => &mut intr.index.dest_type,
            _ => return,
        };
        if let Some(old) = *ty {
            let new = retype(old);
            if new != old {
                *ty = Some(new);
                changed = true;
            }
        }
    });
    changed
}

/// Metal's `[[sample_mask]]` output is a `uint`.
pub fn sample_mask_as_uint(shader: &mut Shader) -> Result<bool, CompileError> {
    require_stage(shader, ShaderStage::Fragment, "sample_mask_as_uint")?;
    Ok(retype_store_outputs(
        shader,
        frag_result::SAMPLE_MASK,
        SizedType::uint32(),
    ))
}

/// Metal's `[[render_target_array_index]]` output is a `uint`.
pub fn layer_id_as_uint(shader: &mut Shader) -> Result<bool, CompileError> {
    require_stage(shader, ShaderStage::Vertex, "layer_id_as_uint")?;
    Ok(retype_store_outputs(
        shader,
        varying_slot::LAYER,
        SizedType::uint32(),
    ))
}

fn retype_store_outputs(shader: &mut Shader, location: u32, ty: SizedType) -> bool {
    let mut changed = false;
    shader.entry.for_each_instr_mut(&mut |instr| {
        if let InstrKind::Intrinsic(intr) = &mut instr.kind {
            if intr.op == IntrinsicOp::StoreOutput
                && io_location(intr) == Some(location)
                && intr.index.src_type != Some(ty)
            {
                intr.index.src_type = Some(ty);
                changed = true;
            }
        }
    });
    changed
}

/// Stencil reference outputs are unsigned, keeping the declared width.
pub fn fix_stencil_type(shader: &mut Shader) -> Result<bool, CompileError> {
    require_stage(shader, ShaderStage::Fragment, "fix_stencil_type")?;
    Ok(retype_outputs(shader, frag_result::STENCIL, &|ty| {
        SizedType::new(BaseType::Uint, ty.bits)
    }))
}

/// Writes a constant sample mask and makes every read of the incoming mask see it.
pub fn static_sample_mask(shader: &mut Shader, mask: u32) -> Result<bool, CompileError> {
    require_stage(shader, ShaderStage::Fragment, "static_sample_mask")?;
    let func = &mut shader.entry;
    let mut instrs = Vec::new();
    let value = constant(func, 32, vec![u64::from(mask)], &mut instrs);
    store_output(
        func,
        value,
        1,
        frag_result::SAMPLE_MASK,
        SizedType::uint32(),
        &mut instrs,
    );
    prepend(func, instrs);

    let mut reads = Vec::new();
    func.for_each_instr(&mut |instr| {
        if instr.is_intrinsic(IntrinsicOp::LoadSampleMaskIn) {
            reads.extend(instr.def().map(|d| d.id));
        }
    });
    for read in reads {
        func.rewrite_uses(read, value);
    }
    shader.info.outputs_written.insert(frag_result::SAMPLE_MASK);
    Ok(true)
}

/// Matches the signedness of integer color outputs to the bound render targets.
pub fn force_output_signedness(
    shader: &mut Shader,
    classes: &[RenderTargetClass],
) -> Result<bool, CompileError> {
    require_stage(shader, ShaderStage::Fragment, "force_output_signedness")?;
    let mut changed = false;
    for (i, class) in classes
        .iter()
        .enumerate()
        .take(frag_result::DATA_COUNT as usize)
    {
        let location = frag_result::DATA0 + i as u32;
        let target = match class {
            RenderTargetClass::Sint => BaseType::Int,
            RenderTargetClass::Uint => BaseType::Uint,
            RenderTargetClass::Float => continue,
        };
        changed |= retype_outputs(shader, location, &|ty| {
            if matches!(ty.base, BaseType::Int | BaseType::Uint) && ty.bits >= 16 {
                SizedType::new(target, ty.bits)
            } else {
                ty
            }
        });
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_msl_ir::Builder;

    fn shader(stage: ShaderStage, build: impl FnOnce(&mut Builder)) -> Shader {
        let mut b = Builder::new("main");
        build(&mut b);
        let mut shader = Shader::new(stage, b.finish().unwrap());
        shader.entry.for_each_instr(&mut |instr| {
            if let Some(loc) = instr
                .as_intrinsic()
                .filter(|i| i.op == IntrinsicOp::StoreOutput)
                .and_then(io_location)
            {
                shader.info.outputs_written.insert(loc);
            }
        });
        shader
    }

    fn store_types(shader: &Shader, location: u32) -> Vec<SizedType> {
        shader
            .entry
            .instrs()
            .into_iter()
            .filter_map(|i| i.as_intrinsic())
            .filter(|i| i.op == IntrinsicOp::StoreOutput && io_location(i) == Some(location))
            .filter_map(|i| i.index.src_type)
            .collect()
    }

    #[test]
    fn point_size_store_is_removed() {
        let mut vs = shader(ShaderStage::Vertex, |b| {
            let one = b.imm_f32(1.0);
            b.store_output(one, varying_slot::PSIZ, SizedType::float32());
        });
        assert!(remove_point_size_write(&mut vs).unwrap());
        assert!(store_types(&vs, varying_slot::PSIZ).is_empty());
        assert!(!vs.info.outputs_written.contains(varying_slot::PSIZ));
        assert!(!remove_point_size_write(&mut vs).unwrap());
    }

    #[test]
    fn position_is_added_once() {
        let mut vs = shader(ShaderStage::Vertex, |_| {});
        assert!(ensure_vertex_position_output(&mut vs).unwrap());
        assert_eq!(
            store_types(&vs, varying_slot::POS),
            vec![SizedType::float32()]
        );
        assert!(vs.info.outputs_written.contains(varying_slot::POS));
        assert!(!ensure_vertex_position_output(&mut vs).unwrap());
    }

    #[test]
    fn depth_comes_from_frag_coord() {
        let mut fs = shader(ShaderStage::Fragment, |_| {});
        assert!(ensure_depth_write(&mut fs).unwrap());
        let instrs = fs.entry.instrs();
        assert!(instrs[0].is_intrinsic(IntrinsicOp::LoadFragCoord));
        assert_eq!(instrs[1].as_alu().unwrap().srcs[0].swizzle, [2; 4]);
        assert_eq!(fs.info.depth_layout, DepthLayout::Any);
        assert!(fs.info.system_values_read.contains(SystemValues::FRAG_COORD));
    }

    #[test]
    fn helpers_check_the_stage() {
        let mut fs = shader(ShaderStage::Fragment, |_| {});
        assert_eq!(
            ensure_vertex_position_output(&mut fs),
            Err(CompileError::LoweringStage {
                helper: "ensure_vertex_position_output",
                stage: ShaderStage::Fragment,
            })
        );
    }

    #[test]
    fn static_mask_replaces_sample_mask_reads() {
        let mut fs = shader(ShaderStage::Fragment, |b| {
            let mask = b.load_sysval(IntrinsicOp::LoadSampleMaskIn, 32, 1);
            b.store_output(mask, frag_result::DATA0, SizedType::uint32());
        });
        assert!(static_sample_mask(&mut fs, 0b101).unwrap());
        let instrs = fs.entry.instrs();
        let constant = instrs[0].as_load_const().unwrap();
        assert_eq!(constant.values, vec![0b101]);
        let color_store = instrs
            .iter()
            .filter_map(|i| i.as_intrinsic())
            .find(|i| io_location(i) == Some(frag_result::DATA0))
            .unwrap();
        assert_eq!(color_store.srcs[0], constant.def.id);
        assert!(fs.info.outputs_written.contains(frag_result::SAMPLE_MASK));
    }

    #[test]
    fn integer_outputs_follow_render_targets() {
        let mut fs = shader(ShaderStage::Fragment, |b| {
            let v = b.imm_u32(1);
            b.store_output(v, frag_result::DATA0, SizedType::uint32());
            b.store_output(v, frag_result::DATA0 + 1, SizedType::uint32());
            let f = b.imm_f32(1.0);
            b.store_output(f, frag_result::DATA0 + 2, SizedType::float32());
        });
        let classes = [
            RenderTargetClass::Sint,
            RenderTargetClass::Uint,
            RenderTargetClass::Sint,
        ];
        assert!(force_output_signedness(&mut fs, &classes).unwrap());
        assert_eq!(
            store_types(&fs, frag_result::DATA0),
            vec![SizedType::int32()]
        );
        assert_eq!(
            store_types(&fs, frag_result::DATA0 + 1),
            vec![SizedType::uint32()]
        );
        assert_eq!(
            store_types(&fs, frag_result::DATA0 + 2),
            vec![SizedType::float32()]
        );
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let lowering: StageLowering =
            serde_json::from_str(r#"{"ensure_depth_write": true, "render_target_classes": ["uint"]}"#)
                .unwrap();
        assert!(lowering.ensure_depth_write);
        assert!(!lowering.remove_depth_write);
        assert_eq!(lowering.render_target_classes, vec![RenderTargetClass::Uint]);
    }
}
