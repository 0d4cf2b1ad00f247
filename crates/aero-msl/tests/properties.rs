use aero_msl::{compile, infer_types, optimize_to_fixpoint, preprocess, CompileOptions, TiType};
use aero_msl_ir::{
    frag_result, varying_slot, AluOp, Builder, IntrinsicOp, JumpKind, Shader, ShaderStage,
    SizedType, SystemValues,
};
use pretty_assertions::assert_eq;

fn compile_default(shader: &mut Shader) -> String {
    compile(shader, &CompileOptions::default()).unwrap().msl
}

/// Text between the opening `{` of the entry point and its closing `}`.
fn entry_body(msl: &str) -> &str {
    let start = msl.find(")\n{\n").unwrap() + 4;
    let end = msl.rfind("}\n").unwrap();
    &msl[start..end]
}

fn store_global(b: &mut Builder, value: aero_msl_ir::DefId, addr: aero_msl_ir::DefId) {
    b.intrinsic_effect(IntrinsicOp::StoreGlobal, &[value, addr], Default::default());
}

#[test]
fn every_consumed_value_is_typed() {
    let mut b = Builder::new("main");
    let index = b.load_sysval(IntrinsicOp::LoadLocalInvocationIndex, 32, 1);
    let base = b.imm_u64(4096);
    let loaded = b.intrinsic_value(IntrinsicOp::LoadGlobal, &[base], 32, 1, Default::default());
    let sum = b.alu(AluOp::Iadd, 32, 1, &[index, loaded]);
    let shifted = b.alu(AluOp::Ishl, 32, 1, &[sum, index]);
    let as_float = b.alu(AluOp::U2f32, 32, 1, &[shifted]);
    let half = b.imm_f32(0.5);
    let scaled = b.alu(AluOp::Fmul, 32, 1, &[as_float, half]);
    let less = b.alu(AluOp::Flt, 1, 1, &[scaled, half]);
    let picked = b.alu(AluOp::Bcsel, 32, 1, &[less, scaled, half]);
    store_global(&mut b, picked, base);
    let mut shader = Shader::new(ShaderStage::Compute, b.finish().unwrap());

    preprocess(&mut shader);
    optimize_to_fixpoint(&mut shader);
    let types = infer_types(&shader.entry);
    for instr in shader.entry.instrs() {
        for (i, src) in instr.srcs().into_iter().enumerate() {
            assert_ne!(
                types.src_type(instr.id, i),
                TiType::None,
                "source {i} ({src}) of {:?} is untyped",
                instr.id
            );
        }
    }

    let msl = compile_default(&mut shader);
    assert!(msl.contains("kernel void main_entrypoint(\n"));
}

#[test]
fn vertex_outputs_follow_location_order() {
    let mut b = Builder::new("main");
    let color = b.imm_vec_f32(&[0.25, 0.5, 0.75, 1.0]);
    let position = b.imm_vec_f32(&[0.0, 0.0, 0.5, 1.0]);
    // Stored out of order on purpose.
    b.store_output(color, varying_slot::VAR0, SizedType::float32());
    b.store_output(position, varying_slot::POS, SizedType::float32());
    let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());
    shader.info.outputs_written.insert(varying_slot::POS);
    shader.info.outputs_written.insert(varying_slot::VAR0);

    let msl = compile_default(&mut shader);
    assert!(
        msl.contains(
            "struct VertexOut {\n\
             \x20   float4 position [[position]];\n\
             \x20   float4 vary_00 [[user(vary_00)]];\n\
             };\n"
        ),
        "{msl}"
    );
    assert!(msl.contains("vertex VertexOut main_entrypoint(\n"));
}

#[test]
fn optimizing_twice_makes_no_progress() {
    let mut b = Builder::new("main");
    let index = b.load_sysval(IntrinsicOp::LoadLocalInvocationIndex, 32, 1);
    let zero = b.imm_u32(0);
    let one = b.imm_u32(1);
    let same = b.alu(AluOp::Imul, 32, 1, &[index, one]);
    let again = b.alu(AluOp::Iadd, 32, 1, &[same, zero]);
    let _unused = b.alu(AluOp::Ixor, 32, 1, &[again, index]);
    let addr = b.imm_u64(0);
    store_global(&mut b, again, addr);
    let mut shader = Shader::new(ShaderStage::Compute, b.finish().unwrap());

    preprocess(&mut shader);
    assert!(optimize_to_fixpoint(&mut shader) > 0);
    let settled = shader.clone();
    assert_eq!(optimize_to_fixpoint(&mut shader), 0);
    assert_eq!(shader, settled);
}

#[test]
fn loops_become_bounded_counters_that_keep_their_break() {
    let mut b = Builder::new("main");
    let index = b.load_sysval(IntrinsicOp::LoadLocalInvocationIndex, 32, 1);
    let addr = b.imm_u64(0);
    b.begin_loop();
    let loaded = b.intrinsic_value(IntrinsicOp::LoadGlobal, &[addr], 32, 1, Default::default());
    let done = b.alu(AluOp::Ieq, 1, 1, &[loaded, index]);
    b.begin_if(done);
    b.jump(JumpKind::Break);
    b.end_if().unwrap();
    store_global(&mut b, index, addr);
    b.end_loop().unwrap();
    let mut shader = Shader::new(ShaderStage::Compute, b.finish().unwrap());

    let msl = compile_default(&mut shader);
    let body = entry_body(&msl);
    let header = "    for (uint64_t no_crash = 0u; no_crash < 18446744073709551615; ++no_crash) {\n";
    let loop_start = body.find(header).unwrap_or_else(|| panic!("{msl}"));
    let inner = &body[loop_start + header.len()..];
    let if_at = inner.find("        if (").unwrap();
    let break_at = inner.find("            break;\n").unwrap();
    assert!(if_at < break_at);
    assert_eq!(body.matches("break;").count(), 1);
    assert!(!body.contains("while"));
}

fn load_global_msl(num_components: u8) -> String {
    let mut b = Builder::new("main");
    let addr = b.imm_u64(64);
    let value = b.intrinsic_value(
        IntrinsicOp::LoadGlobal,
        &[addr],
        32,
        num_components,
        Default::default(),
    );
    let out = b.imm_u64(128);
    store_global(&mut b, value, out);
    let mut shader = Shader::new(ShaderStage::Compute, b.finish().unwrap());
    compile_default(&mut shader)
}

#[test]
fn scalar_loads_use_direct_pointers() {
    let msl = load_global_msl(1);
    assert!(msl.contains("*(device uint*)("), "{msl}");
    assert!(!msl.contains("packed_"), "{msl}");
}

#[test]
fn vector_loads_use_packed_pointers() {
    for (components, ty) in [(2, "uint2"), (3, "uint3"), (4, "uint4")] {
        let msl = load_global_msl(components);
        assert!(
            msl.contains(&format!("{ty}(*(device packed_{ty}*)")),
            "{components} components:\n{msl}"
        );
    }
}

#[test]
fn fragment_writing_one_color() {
    let mut b = Builder::new("main");
    let red = b.imm_vec_f32(&[1.0, 0.0, 0.0, 1.0]);
    b.store_output(red, frag_result::DATA0, SizedType::float32());
    let mut shader = Shader::new(ShaderStage::Fragment, b.finish().unwrap());
    shader.info.outputs_written.insert(frag_result::DATA0);

    let msl = compile_default(&mut shader);
    assert!(
        msl.contains("struct FragmentOut {\n    float4 color_0 [[color(0)]];\n};\n"),
        "{msl}"
    );
    assert!(msl.contains("struct FragmentIn {\n};\n"), "{msl}");
    assert!(msl.contains("fragment FragmentOut main_entrypoint(\n"));

    let body = entry_body(&msl);
    let statements: Vec<&str> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    assert_eq!(statements.first(), Some(&"    FragmentOut out = {};"));
    assert_eq!(statements.last(), Some(&"    return out;"));
    let assignments: Vec<&&str> = statements
        .iter()
        .filter(|line| line.trim_start().starts_with("out."))
        .collect();
    assert_eq!(assignments.len(), 1, "{msl}");
    // Multi-component slots are written through a lane swizzle.
    let target = assignments[0].split(" = ").next().unwrap();
    assert!(
        target == "    out.color_0" || target == "    out.color_0.xyzw",
        "{msl}"
    );
}

#[test]
fn compute_system_values_become_parameters() {
    let mut b = Builder::new("main");
    let global = b.load_sysval(IntrinsicOp::LoadGlobalInvocationId, 32, 3);
    let local = b.load_sysval(IntrinsicOp::LoadLocalInvocationId, 32, 3);
    let sum = b.alu(AluOp::Iadd, 32, 3, &[global, local]);
    let addr = b.imm_u64(0);
    store_global(&mut b, sum, addr);
    let mut shader = Shader::new(ShaderStage::Compute, b.finish().unwrap());

    let msl = compile_default(&mut shader);
    assert_eq!(
        shader.info.system_values_read,
        SystemValues::LOCAL_INVOCATION_ID | SystemValues::GLOBAL_INVOCATION_ID
    );
    assert!(
        msl.contains(
            "kernel void main_entrypoint(\n\
             \x20   uint3 gl_LocalInvocationID [[thread_position_in_threadgroup]],\n\
             \x20   uint3 gl_GlobalInvocationID [[thread_position_in_grid]],\n\
             \x20   constant Buffer &buf0 [[buffer(0)]],\n"
        ),
        "{msl}"
    );
    assert!(!msl.contains("struct VertexOut"));
    assert!(!msl.contains("struct FragmentIn"));
    assert!(!msl.contains("struct FragmentOut"));
}
