//! Stage I/O: per-slot metadata gathering and the Metal structs that carry varyings and
//! fragment results across the entry point boundary.

use std::fmt::Write as _;

use hashbrown::HashMap;
use tracing::debug;

use aero_msl_ir::{
    frag_result, varying_slot, BaseType, DefId, DepthLayout, Instr, InstrKind,
    IntrinsicInstr, IntrinsicOp, InterpMode, Shader, ShaderStage, SizedType, SlotSet,
    SystemValues,
};

use crate::CompileError;

pub(crate) const VERTEX_OUTPUT_TYPE: &str = "VertexOut";
pub(crate) const FRAGMENT_OUTPUT_TYPE: &str = "FragmentOut";

const NUM_SLOTS: usize = 64;

const VARY_NAMES: [&str; varying_slot::VAR_COUNT as usize] = [
    "vary_00", "vary_01", "vary_02", "vary_03", "vary_04", "vary_05", "vary_06", "vary_07",
    "vary_08", "vary_09", "vary_10", "vary_11", "vary_12", "vary_13", "vary_14", "vary_15",
    "vary_16", "vary_17", "vary_18", "vary_19", "vary_20", "vary_21", "vary_22", "vary_23",
    "vary_24", "vary_25", "vary_26", "vary_27", "vary_28", "vary_29", "vary_30", "vary_31",
];

const VARY_SEMANTICS: [&str; varying_slot::VAR_COUNT as usize] = [
    "[[user(vary_00)]]", "[[user(vary_01)]]", "[[user(vary_02)]]", "[[user(vary_03)]]",
    "[[user(vary_04)]]", "[[user(vary_05)]]", "[[user(vary_06)]]", "[[user(vary_07)]]",
    "[[user(vary_08)]]", "[[user(vary_09)]]", "[[user(vary_10)]]", "[[user(vary_11)]]",
    "[[user(vary_12)]]", "[[user(vary_13)]]", "[[user(vary_14)]]", "[[user(vary_15)]]",
    "[[user(vary_16)]]", "[[user(vary_17)]]", "[[user(vary_18)]]", "[[user(vary_19)]]",
    "[[user(vary_20)]]", "[[user(vary_21)]]", "[[user(vary_22)]]", "[[user(vary_23)]]",
    "[[user(vary_24)]]", "[[user(vary_25)]]", "[[user(vary_26)]]", "[[user(vary_27)]]",
    "[[user(vary_28)]]", "[[user(vary_29)]]", "[[user(vary_30)]]", "[[user(vary_31)]]",
];

const COLOR_NAMES: [&str; frag_result::DATA_COUNT as usize] = [
    "color_0", "color_1", "color_2", "color_3", "color_4", "color_5", "color_6", "color_7",
];

const COLOR_SEMANTICS: [&str; frag_result::DATA_COUNT as usize] = [
    "color(0)", "color(1)", "color(2)", "color(3)", "color(4)", "color(5)", "color(6)",
    "color(7)",
];

/// Entry point parameters for built-in inputs, in system-value bit order.
///
/// Helper invocation is a function call in Metal rather than a parameter, so its entry is
/// empty and it is materialized as a local instead.
pub(crate) const SYSVAL_PARAMS: [(SystemValues, &str); 21] = [
    (SystemValues::SUBGROUP_SIZE, "uint gl_SubGroupSize [[threads_per_simdgroup]]"),
    (
        SystemValues::SUBGROUP_INVOCATION,
        "uint gl_SubGroupInvocation [[thread_index_in_simdgroup]]",
    ),
    (SystemValues::NUM_SUBGROUPS, "uint gl_NumSubGroups [[simdgroups_per_threadgroup]]"),
    (SystemValues::SUBGROUP_ID, "uint gl_SubGroupID [[simdgroup_index_in_threadgroup]]"),
    (SystemValues::WORKGROUP_ID, "uint3 gl_WorkGroupID [[threadgroup_position_in_grid]]"),
    (
        SystemValues::LOCAL_INVOCATION_ID,
        "uint3 gl_LocalInvocationID [[thread_position_in_threadgroup]]",
    ),
    (
        SystemValues::GLOBAL_INVOCATION_ID,
        "uint3 gl_GlobalInvocationID [[thread_position_in_grid]]",
    ),
    (SystemValues::NUM_WORKGROUPS, "uint3 gl_NumWorkGroups [[threadgroups_per_grid]]"),
    (
        SystemValues::LOCAL_INVOCATION_INDEX,
        "uint gl_LocalInvocationIndex [[thread_index_in_threadgroup]]",
    ),
    (SystemValues::VERTEX_ID, "uint gl_VertexID [[vertex_id]]"),
    (SystemValues::INSTANCE_ID, "uint gl_InstanceID [[instance_id]]"),
    (SystemValues::BASE_INSTANCE, "uint gl_BaseInstance [[base_instance]]"),
    (SystemValues::FRAG_COORD, "float4 gl_FragCoord [[position]]"),
    (SystemValues::POINT_COORD, "float2 gl_PointCoord [[point_coord]]"),
    (SystemValues::FRONT_FACE, "bool gl_FrontFacing [[front_facing]]"),
    (SystemValues::LAYER_ID, "uint gl_Layer [[render_target_array_index]]"),
    (SystemValues::SAMPLE_ID, "uint gl_SampleID [[sample_id]]"),
    (SystemValues::SAMPLE_MASK_IN, "uint gl_SampleMask [[sample_mask]]"),
    (SystemValues::AMPLIFICATION_ID, "uint mtl_AmplificationID [[amplification_id]]"),
    (SystemValues::FIRST_VERTEX, "uint gl_FirstVertex [[base_vertex]]"),
    (SystemValues::HELPER_INVOCATION, ""),
];

/// Struct member name of a vertex output / fragment input slot.
pub fn varying_slot_name(location: u32) -> Option<&'static str> {
    match location {
        varying_slot::POS => Some("position"),
        varying_slot::PSIZ => Some("point_size"),
        varying_slot::PRIMITIVE_ID => Some("primitive_id"),
        varying_slot::LAYER => Some("layer"),
        _ => location
            .checked_sub(varying_slot::VAR0)
            .and_then(|i| VARY_NAMES.get(i as usize).copied()),
    }
}

/// Metal attribute tagging a vertex output / fragment input slot.
pub fn varying_slot_semantic(location: u32) -> Option<&'static str> {
    match location {
        varying_slot::POS => Some("[[position]]"),
        varying_slot::PSIZ => Some("[[point_size]]"),
        varying_slot::PRIMITIVE_ID => Some("[[primitive_id]]"),
        varying_slot::LAYER => Some("[[render_target_array_index]]"),
        _ => location
            .checked_sub(varying_slot::VAR0)
            .and_then(|i| VARY_SEMANTICS.get(i as usize).copied()),
    }
}

/// Struct member name of a fragment result slot.
pub fn frag_output_name(location: u32) -> Option<&'static str> {
    match location {
        frag_result::DEPTH => Some("depth_out"),
        frag_result::STENCIL => Some("stencil_out"),
        frag_result::SAMPLE_MASK => Some("sample_mask_out"),
        _ => location
            .checked_sub(frag_result::DATA0)
            .and_then(|i| COLOR_NAMES.get(i as usize).copied()),
    }
}

/// Attribute body (without brackets) of a fragment result slot. Depth is spelled separately
/// because it carries the depth layout.
fn frag_output_semantic(location: u32) -> Option<&'static str> {
    match location {
        frag_result::DEPTH => Some(""),
        frag_result::STENCIL => Some("stencil"),
        frag_result::SAMPLE_MASK => Some("sample_mask"),
        _ => location
            .checked_sub(frag_result::DATA0)
            .and_then(|i| COLOR_SEMANTICS.get(i as usize).copied()),
    }
}

fn depth_layout_arg(layout: DepthLayout) -> &'static str {
    match layout {
        DepthLayout::Greater => "greater",
        DepthLayout::Less => "less",
        DepthLayout::None | DepthLayout::Any | DepthLayout::Unchanged => "any",
    }
}

/// Name used for `out.<name>` in `stage`.
pub(crate) fn output_name(stage: ShaderStage, location: u32) -> Option<&'static str> {
    match stage {
        ShaderStage::Vertex => varying_slot_name(location),
        ShaderStage::Fragment => frag_output_name(location),
        ShaderStage::Compute => None,
    }
}

/// Name used for `in.<name>` in `stage`. Only fragment shaders have a stage input struct.
pub(crate) fn input_name(stage: ShaderStage, location: u32) -> Option<&'static str> {
    match stage {
        ShaderStage::Fragment => varying_slot_name(location),
        ShaderStage::Vertex | ShaderStage::Compute => None,
    }
}

/// What the shader does with one I/O slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoSlotInfo {
    pub ty: Option<SizedType>,
    pub num_components: u8,
    pub interpolation: InterpMode,
    pub centroid: bool,
    pub sample: bool,
}

/// Per-location slot info for stage inputs and outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoInfo {
    pub inputs: [IoSlotInfo; NUM_SLOTS],
    pub outputs: [IoSlotInfo; NUM_SLOTS],
}

impl Default for IoInfo {
    fn default() -> Self {
        Self {
            inputs: [IoSlotInfo::default(); NUM_SLOTS],
            outputs: [IoSlotInfo::default(); NUM_SLOTS],
        }
    }
}

struct Gather<'a> {
    stage: ShaderStage,
    defs: HashMap<DefId, &'a Instr>,
    info: IoInfo,
}

impl<'a> Gather<'a> {
    fn location(&self, intr: &IntrinsicInstr, offset_src: usize) -> Result<u32, CompileError> {
        let io = intr.index.io.ok_or(CompileError::MissingIndex {
            op: intr.op,
            index: "io",
        })?;
        if io.num_slots != 1 {
            return Err(CompileError::IndexedIo {
                location: io.location,
                num_slots: io.num_slots,
            });
        }
        let offset = intr
            .srcs
            .get(offset_src)
            .and_then(|src| self.defs.get(src))
            .and_then(|instr| instr.as_load_const())
            .ok_or(CompileError::NonConstantIoOffset { op: intr.op })?;
        let location = offset_location(self.stage, io.location, offset.component_bits(0))?;
        if location as usize >= NUM_SLOTS {
            return Err(unknown_slot(self.stage, location));
        }
        Ok(location)
    }

    fn grow(slot: &mut IoSlotInfo, location: u32, components: u32) -> Result<(), CompileError> {
        let components = components.max(u32::from(slot.num_components));
        if components > 4 {
            return Err(CompileError::SlotTooWide {
                location,
                components,
            });
        }
        slot.num_components = components as u8;
        Ok(())
    }

    fn visit(&mut self, intr: &IntrinsicInstr) -> Result<(), CompileError> {
        let component = u32::from(intr.index.component);
        let n = u32::from(intr.def.map_or(0, |d| d.num_components));
        match intr.op {
            IntrinsicOp::LoadInterpolatedInput => {
                let location = self.location(intr, 1)?;
                let bary = intr
                    .srcs
                    .first()
                    .and_then(|src| self.defs.get(src))
                    .and_then(|instr| instr.as_intrinsic())
                    .filter(|b| b.op.is_barycentric())
                    .ok_or_else(|| {
                        CompileError::BadBarycentric(intr.def.map_or(DefId(0), |d| d.id))
                    })?;
                let interpolation = bary.index.interp_mode;
                let centroid = bary.op == IntrinsicOp::LoadBarycentricCentroid;
                let sample = bary.op == IntrinsicOp::LoadBarycentricSample;

                let slot = &mut self.info.inputs[location as usize];
                slot.ty = intr.index.dest_type;
                Self::grow(slot, location, n + component)?;
                slot.interpolation = interpolation;
                slot.centroid = centroid;
                slot.sample = sample;
            }
            IntrinsicOp::LoadInput => {
                let location = self.location(intr, 0)?;
                let slot = &mut self.info.inputs[location as usize];
                slot.ty = intr.index.dest_type;
                slot.interpolation = InterpMode::Flat;
                Self::grow(slot, location, n + component)?;
            }
            IntrinsicOp::LoadOutput => {
                let location = self.location(intr, 0)?;
                let slot = &mut self.info.outputs[location as usize];
                slot.ty = intr.index.dest_type;
                Self::grow(slot, location, n + component)?;
            }
            IntrinsicOp::StoreOutput => {
                let location = self.location(intr, 1)?;
                let value_components = intr
                    .srcs
                    .first()
                    .and_then(|src| self.defs.get(src))
                    .and_then(|instr| instr.def())
                    .map_or(0, |d| d.num_components);
                // Stores may write fewer lanes than the slot holds; the slot must still cover
                // the highest lane the mask touches.
                let mask = intr.write_mask_or_full(value_components);
                let highest = (0..value_components)
                    .filter(|i| (mask >> i) & 1 != 0)
                    .max()
                    .unwrap_or(0);
                let stored = component + 1 + u32::from(highest);

                let slot = &mut self.info.outputs[location as usize];
                slot.ty = intr.index.src_type;
                Self::grow(slot, location, stored.max(u32::from(value_components)))?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Records type, width and interpolation of every I/O slot the entry function touches.
pub fn gather_io_info(shader: &Shader) -> Result<IoInfo, CompileError> {
    let instrs = shader.entry.instrs();
    let mut gather = Gather {
        stage: shader.stage,
        defs: instrs
            .iter()
            .filter_map(|instr| instr.def().map(|d| (d.id, *instr)))
            .collect(),
        info: IoInfo::default(),
    };
    for instr in &instrs {
        if let InstrKind::Intrinsic(intr) = &instr.kind {
            gather.visit(intr)?;
        }
    }
    for (location, slot) in gather.info.inputs.iter().enumerate() {
        if let Some(ty) = slot.ty {
            debug!(location, %ty, components = slot.num_components, "stage input");
        }
    }
    for (location, slot) in gather.info.outputs.iter().enumerate() {
        if let Some(ty) = slot.ty {
            debug!(location, %ty, components = slot.num_components, "stage output");
        }
    }
    Ok(gather.info)
}

fn io_type_name(ty: SizedType) -> Option<&'static str> {
    Some(match (ty.base, ty.bits) {
        (BaseType::Uint, 8) => "uchar",
        (BaseType::Uint, 16) => "ushort",
        (BaseType::Uint, 32) => "uint",
        (BaseType::Uint, 64) => "ulong",
        (BaseType::Int, 8) => "char",
        (BaseType::Int, 16) => "short",
        (BaseType::Int, 32) => "int",
        (BaseType::Int, 64) => "long",
        (BaseType::Float, 16) => "half",
        (BaseType::Float, 32) => "float",
        (BaseType::Bool, _) => "bool",
        _ => return None,
    })
}

fn vector_suffix(num_components: u8) -> &'static str {
    match num_components {
        2 => "2",
        3 => "3",
        4 => "4",
        _ => "",
    }
}

/// `<scalar><N>` for a slot, e.g. `float4`.
fn slot_type(slot: &IoSlotInfo, location: u32) -> Result<String, CompileError> {
    let ty = slot.ty.ok_or(CompileError::UntypedSlot { location })?;
    let scalar = io_type_name(ty).ok_or(CompileError::UnsupportedIoType { location, ty })?;
    Ok(format!("{scalar}{}", vector_suffix(slot.num_components)))
}

fn interpolation_attr(slot: &IoSlotInfo) -> &'static str {
    match slot.interpolation {
        InterpMode::NoPerspective if slot.centroid => "[[centroid_no_perspective]]",
        InterpMode::NoPerspective if slot.sample => "[[sample_no_perspective]]",
        InterpMode::NoPerspective => "[[center_no_perspective]]",
        InterpMode::Flat => "[[flat]]",
        InterpMode::None | InterpMode::Smooth if slot.centroid => "[[centroid_perspective]]",
        InterpMode::None | InterpMode::Smooth if slot.sample => "[[sample_perspective]]",
        InterpMode::None | InterpMode::Smooth => "",
    }
}

fn unknown_slot(stage: ShaderStage, location: u32) -> CompileError {
    CompileError::UnknownSlot { stage, location }
}

/// `base` plus a constant slot offset. Offsets that leave the `u32` range name no slot.
pub(crate) fn offset_location(
    stage: ShaderStage,
    base: u32,
    offset: u64,
) -> Result<u32, CompileError> {
    u32::try_from(offset)
        .ok()
        .and_then(|offset| base.checked_add(offset))
        .ok_or_else(|| unknown_slot(stage, base))
}

fn vertex_output_block(out: &mut String, shader: &Shader, io: &IoInfo) -> Result<(), CompileError> {
    let _ = writeln!(out, "struct {VERTEX_OUTPUT_TYPE} {{");
    for location in shader.info.outputs_written.iter() {
        let slot = &io.outputs[location as usize];
        let name = varying_slot_name(location).ok_or_else(|| unknown_slot(shader.stage, location))?;
        let semantic =
            varying_slot_semantic(location).ok_or_else(|| unknown_slot(shader.stage, location))?;
        let _ = writeln!(out, "    {} {name} {semantic};", slot_type(slot, location)?);
    }
    out.push_str("};\n");
    Ok(())
}

fn fragment_input_block(out: &mut String, shader: &Shader, io: &IoInfo) -> Result<(), CompileError> {
    out.push_str("struct FragmentIn {\n");
    for location in shader.info.inputs_read.iter() {
        let slot = &io.inputs[location as usize];
        let name = varying_slot_name(location).ok_or_else(|| unknown_slot(shader.stage, location))?;
        let semantic =
            varying_slot_semantic(location).ok_or_else(|| unknown_slot(shader.stage, location))?;
        let _ = writeln!(
            out,
            "    {} {name} {semantic} {};",
            slot_type(slot, location)?,
            interpolation_attr(slot)
        );
    }
    // Framebuffer fetch: previous color values arrive through the stage input.
    for location in shader.info.outputs_read.iter() {
        let slot = &io.outputs[location as usize];
        let name = frag_output_name(location).ok_or_else(|| unknown_slot(shader.stage, location))?;
        let semantic =
            frag_output_semantic(location).ok_or_else(|| unknown_slot(shader.stage, location))?;
        let _ = writeln!(
            out,
            "    {} {name} [[{semantic}, raster_order_group(0)]];",
            slot_type(slot, location)?
        );
    }
    out.push_str("};\n");
    Ok(())
}

fn fragment_output_block(out: &mut String, shader: &Shader, io: &IoInfo) -> Result<(), CompileError> {
    let _ = writeln!(out, "struct {FRAGMENT_OUTPUT_TYPE} {{");
    for location in shader.info.outputs_written.iter() {
        let slot = &io.outputs[location as usize];
        let ty = slot_type(slot, location)?;
        let name = frag_output_name(location).ok_or_else(|| unknown_slot(shader.stage, location))?;
        if location == frag_result::DEPTH {
            let layout = depth_layout_arg(shader.info.depth_layout);
            let _ = writeln!(out, "    {ty} {name} [[depth({layout})]];");
        } else {
            let semantic =
                frag_output_semantic(location).ok_or_else(|| unknown_slot(shader.stage, location))?;
            let _ = writeln!(out, "    {ty} {name} [[{semantic}]];");
        }
    }
    out.push_str("};\n");
    Ok(())
}

/// Emits the stage I/O structs followed by the resource table structs every stage binds.
pub(crate) fn emit_io_blocks(
    out: &mut String,
    shader: &Shader,
    io: &IoInfo,
) -> Result<(), CompileError> {
    match shader.stage {
        ShaderStage::Vertex => vertex_output_block(out, shader, io)?,
        ShaderStage::Fragment => {
            fragment_input_block(out, shader, io)?;
            fragment_output_block(out, shader, io)?;
        }
        ShaderStage::Compute => {}
    }
    out.push_str("struct Buffer {\n    uint64_t contents[1];\n};\n");
    out.push_str("struct SamplerTable {\n    sampler handles[1024];\n};\n");
    Ok(())
}

/// Declares the returned struct and seeds framebuffer-fetched colors into it.
pub(crate) fn emit_output_var(out: &mut String, stage: ShaderStage, outputs_read: SlotSet) {
    match stage {
        ShaderStage::Vertex => {
            let _ = writeln!(out, "    {VERTEX_OUTPUT_TYPE} out = {{}};");
        }
        ShaderStage::Fragment => {
            let _ = writeln!(out, "    {FRAGMENT_OUTPUT_TYPE} out = {{}};");
            for location in outputs_read.iter() {
                if let Some(name) = frag_output_name(location) {
                    let _ = writeln!(out, "    out.{name} = in.{name};");
                }
            }
        }
        ShaderStage::Compute => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_msl_ir::{Builder, IoSemantics, IntrinsicIndices};
    use pretty_assertions::assert_eq;

    #[test]
    fn slot_tables_cover_user_varyings() {
        assert_eq!(varying_slot_name(varying_slot::VAR0), Some("vary_00"));
        assert_eq!(varying_slot_name(varying_slot::VAR0 + 31), Some("vary_31"));
        assert_eq!(varying_slot_name(varying_slot::VAR0 + 32), None);
        assert_eq!(varying_slot_name(3), None);
        assert_eq!(varying_slot_semantic(varying_slot::VAR0 + 7), Some("[[user(vary_07)]]"));
        assert_eq!(frag_output_name(frag_result::DATA0 + 7), Some("color_7"));
        assert_eq!(frag_output_name(3), None);
    }

    #[test]
    fn store_with_partial_mask_widens_to_highest_lane() {
        let mut b = Builder::new("main");
        let value = b.imm_vec_f32(&[1.0, 2.0]);
        let offset = b.imm_u32(0);
        b.intrinsic_effect(
            IntrinsicOp::StoreOutput,
            &[value, offset],
            IntrinsicIndices {
                io: Some(IoSemantics {
                    location: varying_slot::VAR0,
                    num_slots: 1,
                }),
                component: 1,
                write_mask: Some(0b10),
                src_type: Some(SizedType::float32()),
                ..Default::default()
            },
        );
        let shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        let io = gather_io_info(&shader).unwrap();
        let slot = io.outputs[varying_slot::VAR0 as usize];
        assert_eq!(slot.num_components, 3);
        assert_eq!(slot.ty, Some(SizedType::float32()));
    }

    #[test]
    fn array_io_is_rejected() {
        let mut b = Builder::new("main");
        let offset = b.imm_u32(0);
        b.intrinsic_value(
            IntrinsicOp::LoadInput,
            &[offset],
            32,
            4,
            IntrinsicIndices {
                io: Some(IoSemantics {
                    location: varying_slot::VAR0,
                    num_slots: 2,
                }),
                dest_type: Some(SizedType::float32()),
                ..Default::default()
            },
        );
        let shader = Shader::new(ShaderStage::Fragment, b.finish().unwrap());
        assert!(matches!(
            gather_io_info(&shader),
            Err(CompileError::IndexedIo { num_slots: 2, .. })
        ));
    }

    #[test]
    fn offsets_past_the_location_range_name_no_slot() {
        assert_eq!(offset_location(ShaderStage::Vertex, 4, 3).unwrap(), 7);
        for (base, offset) in [(u32::MAX, 2), (0, u64::from(u32::MAX) + 1), (1, u64::MAX)] {
            assert!(matches!(
                offset_location(ShaderStage::Vertex, base, offset),
                Err(CompileError::UnknownSlot { location, .. }) if location == base
            ));
        }

        let mut b = Builder::new("main");
        let value = b.imm_vec_f32(&[1.0, 2.0, 3.0, 4.0]);
        let offset = b.imm_u32(2);
        b.intrinsic_effect(
            IntrinsicOp::StoreOutput,
            &[value, offset],
            IntrinsicIndices {
                io: Some(IoSemantics {
                    location: u32::MAX,
                    num_slots: 1,
                }),
                src_type: Some(SizedType::float32()),
                ..Default::default()
            },
        );
        let shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());
        assert!(matches!(
            gather_io_info(&shader),
            Err(CompileError::UnknownSlot {
                stage: ShaderStage::Vertex,
                location: u32::MAX,
            })
        ));
    }

    #[test]
    fn interpolation_comes_from_the_barycentric() {
        let mut b = Builder::new("main");
        b.load_interpolated_input(
            varying_slot::VAR0 + 1,
            2,
            SizedType::float32(),
            IntrinsicOp::LoadBarycentricCentroid,
            InterpMode::NoPerspective,
        );
        let shader = Shader::new(ShaderStage::Fragment, b.finish().unwrap());
        let io = gather_io_info(&shader).unwrap();
        let slot = io.inputs[varying_slot::VAR0 as usize + 1];
        assert_eq!(slot.num_components, 2);
        assert!(slot.centroid);
        assert_eq!(interpolation_attr(&slot), "[[centroid_no_perspective]]");
    }
}
