use aero_msl::{compile, CompileOptions};
use aero_msl_ir::{
    AtomicOp, Builder, DefId, IntrinsicIndices, IntrinsicOp, MemoryModes, SamplerDim, Scope,
    Shader, ShaderStage, SizedType, TexInstr, TexOp, TexSrc, TexSrcKind,
};

/// Compiles a kernel whose body is `build`, storing the value it returns to memory.
fn kernel_msl(build: impl FnOnce(&mut Builder) -> DefId) -> String {
    let mut b = Builder::new("main");
    let value = build(&mut b);
    let addr = b.imm_u64(256);
    b.intrinsic_effect(IntrinsicOp::StoreGlobal, &[value, addr], Default::default());
    let mut shader = Shader::new(ShaderStage::Compute, b.finish().unwrap());
    compile(&mut shader, &CompileOptions::default())
        .unwrap_or_else(|err| panic!("{err}"))
        .msl
}

/// The one body line containing `needle`.
fn line_with<'a>(msl: &'a str, needle: &str) -> &'a str {
    let mut lines = msl.lines().filter(|line| line.contains(needle));
    let line = lines.next().unwrap_or_else(|| panic!("no `{needle}` in\n{msl}"));
    assert!(lines.next().is_none(), "`{needle}` appears twice in\n{msl}");
    line.trim()
}

fn fence(b: &mut Builder, memory_scope: Scope, memory_modes: MemoryModes) {
    b.intrinsic_effect(
        IntrinsicOp::Barrier,
        &[],
        IntrinsicIndices {
            execution_scope: Scope::None,
            memory_scope,
            memory_modes,
            ..Default::default()
        },
    );
}

#[test]
fn workgroup_fences_over_device_memory_use_device_scope() {
    let msl = kernel_msl(|b| {
        fence(b, Scope::Workgroup, MemoryModes::SSBO | MemoryModes::SHARED);
        b.imm_u32(1)
    });
    let line = line_with(&msl, "atomic_thread_fence(");
    assert!(line.contains("mem_flags::mem_device"), "{line}");
    assert!(line.contains("mem_flags::mem_threadgroup"), "{line}");
    assert!(
        line.ends_with(", memory_order_seq_cst, thread_scope::thread_scope_device);"),
        "{line}"
    );

    let msl = kernel_msl(|b| {
        fence(b, Scope::Workgroup, MemoryModes::SHARED);
        b.imm_u32(1)
    });
    assert_eq!(
        line_with(&msl, "atomic_thread_fence("),
        "atomic_thread_fence(mem_flags::mem_threadgroup, memory_order_seq_cst, \
         thread_scope::thread_scope_threadgroup);"
    );
}

#[test]
fn fences_without_memory_modes_emit_nothing() {
    let msl = kernel_msl(|b| {
        fence(b, Scope::Device, MemoryModes::empty());
        b.imm_u32(1)
    });
    assert!(!msl.contains("atomic_thread_fence"), "{msl}");
}

#[test]
fn compare_and_swap_goes_through_a_temporary() {
    let msl = kernel_msl(|b| {
        let addr = b.imm_u64(64);
        let expected = b.imm_u32(0);
        let desired = b.imm_u32(7);
        b.intrinsic_value(
            IntrinsicOp::GlobalAtomicSwap,
            &[addr, expected, desired],
            32,
            1,
            IntrinsicIndices {
                atomic_op: Some(AtomicOp::Cmpxchg),
                ..Default::default()
            },
        )
    });
    let line = line_with(&msl, "atomic_compare_exchange_weak_explicit(");
    let n = line
        .strip_prefix("uint ta")
        .and_then(|rest| rest.split_once(' '))
        .map(|(n, _)| n)
        .unwrap_or_else(|| panic!("{line}"));
    assert!(n.parse::<u32>().is_ok(), "{line}");

    assert!(line.starts_with(&format!("uint ta{n} = uint(0u); ")), "{line}");
    assert!(
        line.contains("atomic_compare_exchange_weak_explicit((device atomic_uint*)"),
        "{line}"
    );
    assert!(line.contains(&format!(", &ta{n}, uint(7u), ")), "{line}");
    assert!(
        line.ends_with(&format!(
            "memory_order_relaxed, memory_order_relaxed); uint t{n} = ta{n};"
        )),
        "{line}"
    );
    // The result is declared by the swap itself.
    assert!(!msl.contains(&format!("uint t{n} = uint(0);")), "{msl}");
}

fn texture(b: &mut Builder, dim: SamplerDim, dest_type: SizedType) -> DefId {
    let slot = b.imm_u64(0);
    b.intrinsic_value(
        IntrinsicOp::LoadTextureHandle,
        &[slot],
        64,
        1,
        IntrinsicIndices {
            image_dim: Some(dim),
            dest_type: Some(dest_type),
            ..Default::default()
        },
    )
}

fn sampler(b: &mut Builder) -> DefId {
    let slot = b.imm_u32(3);
    b.intrinsic_value(IntrinsicOp::LoadSamplerHandle, &[slot], 32, 1, Default::default())
}

struct TexCall {
    op: TexOp,
    dim: SamplerDim,
    num_components: u8,
    dest_type: SizedType,
    component: u8,
}

impl TexCall {
    fn new(op: TexOp, dim: SamplerDim) -> Self {
        Self {
            op,
            dim,
            num_components: 4,
            dest_type: SizedType::float32(),
            component: 0,
        }
    }

    /// Compiles the texture op with a bound texture, `sampled` adding a sampler and a
    /// float coordinate, plus the `extra` operands.
    fn msl(
        &self,
        sampled: bool,
        extra: impl FnOnce(&mut Builder) -> Vec<(TexSrcKind, DefId)>,
    ) -> String {
        kernel_msl(|b| {
            let handle = texture(b, self.dim, self.dest_type);
            let mut srcs = vec![TexSrc {
                kind: TexSrcKind::TextureHandle,
                src: handle,
            }];
            if sampled {
                let sampler = sampler(b);
                let coord = b.imm_vec_f32(&[0.25, 0.75]);
                srcs.push(TexSrc {
                    kind: TexSrcKind::SamplerHandle,
                    src: sampler,
                });
                srcs.push(TexSrc {
                    kind: TexSrcKind::Coord,
                    src: coord,
                });
            }
            srcs.extend(extra(b).into_iter().map(|(kind, src)| TexSrc { kind, src }));
            let def = b.new_def(32, self.num_components);
            b.tex(TexInstr {
                op: self.op,
                def,
                srcs,
                sampler_dim: self.dim,
                is_array: false,
                coord_components: 2,
                component: self.component,
                dest_type: self.dest_type,
            })
        })
    }
}

/// `int2(1, -1)`.
fn texel_offset(b: &mut Builder) -> DefId {
    b.imm(32, &[1, u64::from((-1i32) as u32)])
}

#[test]
fn sampling_picks_the_method_and_its_options() {
    let plain = TexCall::new(TexOp::Tex, SamplerDim::Dim2D).msl(true, |_| vec![]);
    let line = line_with(&plain, ".sample(");
    assert!(!line.contains("bias("), "{line}");
    assert!(plain.contains("texture2d<float> t"), "{plain}");

    let mut depth = TexCall::new(TexOp::Tex, SamplerDim::Dim2D);
    depth.num_components = 1;
    let compare = depth.msl(true, |b| vec![(TexSrcKind::Comparator, b.imm_f32(0.5))]);
    assert!(line_with(&compare, ".sample_compare(").ends_with("float(5.00000000000000000e-01));"));

    let biased = TexCall::new(TexOp::Txb, SamplerDim::Dim2D)
        .msl(true, |b| vec![(TexSrcKind::Bias, b.imm_f32(1.0))]);
    assert!(line_with(&biased, ".sample(").contains(", bias(float(1.00000000000000000e+00)))"));

    let explicit = TexCall::new(TexOp::Txl, SamplerDim::Dim2D)
        .msl(true, |b| vec![(TexSrcKind::Lod, b.imm_f32(2.0))]);
    assert!(line_with(&explicit, ".sample(").contains(", level(float(2.00000000000000000e+00)))"));

    let graded = TexCall::new(TexOp::Txd, SamplerDim::Dim2D).msl(true, |b| {
        let ddx = b.imm_vec_f32(&[1.0, 0.0]);
        let ddy = b.imm_vec_f32(&[0.0, 1.0]);
        vec![(TexSrcKind::Ddx, ddx), (TexSrcKind::Ddy, ddy)]
    });
    assert!(line_with(&graded, ".sample(").contains(", gradient2d(float2("));

    let clamped = TexCall::new(TexOp::Tex, SamplerDim::Dim2D)
        .msl(true, |b| vec![(TexSrcKind::MinLod, b.imm_f32(1.0))]);
    assert!(line_with(&clamped, ".sample(").contains(", min_lod_clamp(float(1.00000000000000000e+00)))"));

    let offset = TexCall::new(TexOp::Tex, SamplerDim::Dim2D)
        .msl(true, |b| vec![(TexSrcKind::Offset, texel_offset(b))]);
    assert!(line_with(&offset, ".sample(").ends_with(", int2(int(1), int(-1)));"));
}

#[test]
fn fetches_read_by_level_or_sample() {
    let by_level = TexCall::new(TexOp::Txf, SamplerDim::Dim2D).msl(false, |b| {
        let coord = b.imm(32, &[3, 4]);
        vec![(TexSrcKind::Coord, coord), (TexSrcKind::Lod, b.imm_u32(1))]
    });
    assert!(line_with(&by_level, ".read(").ends_with(".read(uint2(uint(3u), uint(4u)), uint(1u));"));

    let by_sample = TexCall::new(TexOp::TxfMs, SamplerDim::Ms).msl(false, |b| {
        let coord = b.imm(32, &[3, 4]);
        vec![(TexSrcKind::Coord, coord), (TexSrcKind::MsIndex, b.imm_u32(2))]
    });
    assert!(line_with(&by_sample, ".read(").ends_with(".read(uint2(uint(3u), uint(4u)), uint(2u));"));
    assert!(by_sample.contains("texture2d_ms<float> t"), "{by_sample}");
}

#[test]
fn size_queries_ask_each_dimension() {
    let mut call = TexCall::new(TexOp::Txs, SamplerDim::Dim3D);
    call.num_components = 3;
    call.dest_type = SizedType::uint32();
    let msl = call.msl(false, |b| vec![(TexSrcKind::Lod, b.imm_u32(0))]);
    let line = line_with(&msl, ".get_width(");
    assert!(line.contains(" = uint3("), "{line}");
    for query in [".get_width(uint(0u))", ".get_height(uint(0u))", ".get_depth(uint(0u))"] {
        assert!(line.contains(query), "{query}: {line}");
    }
    assert!(!line.contains("get_array_size"), "{line}");

    let mut flat = TexCall::new(TexOp::Txs, SamplerDim::Dim2D);
    flat.num_components = 2;
    flat.dest_type = SizedType::uint32();
    let msl = flat.msl(false, |_| vec![]);
    let line = line_with(&msl, ".get_width(");
    assert!(line.contains(" = uint2(t"), "{line}");
    assert!(line.contains(".get_width(), t"), "{line}");
    assert!(line.ends_with(".get_height());"), "{line}");
    assert!(!line.contains("get_depth"), "{line}");
}

#[test]
fn gathers_name_their_channel_unless_comparing() {
    let mut call = TexCall::new(TexOp::Tg4, SamplerDim::Dim2D);
    call.component = 2;
    let msl = call.msl(true, |_| vec![]);
    assert!(line_with(&msl, ".gather(").ends_with(", int2(0), component::z);"));

    let msl = call.msl(true, |b| {
        vec![
            (TexSrcKind::Comparator, b.imm_f32(0.5)),
            (TexSrcKind::Offset, texel_offset(b)),
        ]
    });
    let line = line_with(&msl, ".gather_compare(");
    assert!(line.ends_with(", int2(int(1), int(-1)));"), "{line}");
    assert!(!line.contains("component::"), "{line}");
}

#[test]
fn lod_queries_report_clamped_and_unclamped_levels() {
    let mut call = TexCall::new(TexOp::Lod, SamplerDim::Dim2D);
    call.num_components = 2;
    let msl = call.msl(true, |b| {
        vec![
            (TexSrcKind::Bias, b.imm_f32(0.0)),
            (TexSrcKind::MinLod, b.imm_f32(1.0)),
            (TexSrcKind::MaxLod, b.imm_f32(8.0)),
        ]
    });
    let line = line_with(&msl, "float2(round(clamp(");
    assert_eq!(line.matches(".calculate_unclamped_lod(t").count(), 2, "{line}");
    assert!(line.contains("float(8.00000000000000000e+00))"), "{line}");
}
