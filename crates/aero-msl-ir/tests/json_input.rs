use aero_msl_ir::{
    frag_result, AluOp, CfNode, DefId, InstrKind, IntrinsicOp, Shader, ShaderStage, SizedType,
};
use pretty_assertions::assert_eq;

const FRAGMENT_JSON: &str = r#"{
  "stage": "fragment",
  "info": { "outputs_written": [4] },
  "entry": {
    "name": "main",
    "body": [
      { "node": "block", "instrs": [
        { "kind": "load_const", "def": { "id": 7, "bit_size": 32, "num_components": 4 },
          "values": [1065353216, 0, 0, 1065353216] },
        { "kind": "load_const", "def": { "id": 9, "bit_size": 32, "num_components": 1 },
          "values": [0] },
        { "kind": "alu", "op": "fmul", "def": { "id": 12, "bit_size": 32, "num_components": 4 },
          "srcs": [ { "src": 7 }, { "src": 7, "swizzle": [3, 2, 1, 0] } ] },
        { "kind": "intrinsic", "op": "store_output", "srcs": [12, 9],
          "index": { "io": { "location": 4 }, "src_type": "float32" } }
      ] }
    ]
  }
}"#;

#[test]
fn parses_a_fragment_program() {
    let mut shader: Shader = serde_json::from_str(FRAGMENT_JSON).unwrap();
    shader.prepare();

    assert_eq!(shader.stage, ShaderStage::Fragment);
    assert!(shader.info.outputs_written.contains(frag_result::DATA0));

    let CfNode::Block(block) = &shader.entry.body[0] else {
        panic!("expected a block");
    };
    assert_ne!(block.id.0, 0);
    assert_eq!(block.instrs.len(), 4);

    let InstrKind::Alu(alu) = &block.instrs[2].kind else {
        panic!("expected alu");
    };
    assert_eq!(alu.op, AluOp::Fmul);
    assert_eq!(alu.srcs[1].swizzle, [3, 2, 1, 0]);
    assert_eq!(alu.srcs[0].swizzle, [0, 1, 2, 3]);

    let InstrKind::Intrinsic(store) = &block.instrs[3].kind else {
        panic!("expected intrinsic");
    };
    assert_eq!(store.op, IntrinsicOp::StoreOutput);
    assert_eq!(store.index.src_type, Some(SizedType::float32()));
    assert_eq!(store.index.io.map(|io| io.num_slots), Some(1));
}

#[test]
fn reindex_numbers_defs_in_program_order() {
    let mut shader: Shader = serde_json::from_str(FRAGMENT_JSON).unwrap();
    shader.prepare();
    shader.entry.reindex_defs();

    let mut defs = Vec::new();
    let mut uses = Vec::new();
    shader.entry.for_each_instr(&mut |instr| {
        if let Some(def) = instr.def() {
            defs.push(def.id);
        }
        uses.extend(instr.srcs());
    });
    assert_eq!(defs, vec![DefId(0), DefId(1), DefId(2)]);
    assert_eq!(uses, vec![DefId(0), DefId(0), DefId(2), DefId(1)]);
    assert_eq!(shader.entry.def_count(), 3);
}

#[test]
fn rejects_unknown_ops() {
    let text = FRAGMENT_JSON.replace("\"fmul\"", "\"fmulx\"");
    let err = serde_json::from_str::<Shader>(&text).unwrap_err();
    assert!(err.to_string().contains("fmulx"), "{err}");
}

#[test]
fn rejects_malformed_value_shapes() {
    let shapes = [
        r#""id": 9, "bit_size": 7, "num_components": 1"#,
        r#""id": 9, "bit_size": 32, "num_components": 16"#,
        r#""id": 9, "bit_size": 32, "num_components": 0"#,
    ];
    for shape in shapes {
        let text = FRAGMENT_JSON.replace(r#""id": 9, "bit_size": 32, "num_components": 1"#, shape);
        let err = serde_json::from_str::<Shader>(&text).unwrap_err();
        assert!(err.to_string().contains("has shape"), "{shape}: {err}");
    }
}

#[test]
fn dump_mentions_every_instruction() {
    let mut shader: Shader = serde_json::from_str(FRAGMENT_JSON).unwrap();
    shader.prepare();
    let text = shader.entry.dump();
    assert!(text.contains("= fmul %7, %7.wzyx"), "{text}");
    assert!(text.contains("@store_output (%12, %9) {location=4, src_type=float32}"), "{text}");
}
