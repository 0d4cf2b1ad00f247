#![cfg(not(target_arch = "wasm32"))]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn prints_msl_to_stdout() {
    cargo_bin_cmd!("aero-msl-compile")
        .arg(fixture("solid_red.json"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("// Generated by aero-msl\n"))
        .stdout(predicate::str::contains(
            "fragment FragmentOut main_entrypoint(\n",
        ))
        .stdout(predicate::str::contains("    float4 color_0 [[color(0)]];\n"));
}

#[test]
fn writes_the_output_file() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("solid_red.metal");

    cargo_bin_cmd!("aero-msl-compile")
        .arg(fixture("solid_red.json"))
        .arg("-o")
        .arg(&out_path)
        .args(["--entry-point", "ps_main"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let msl = fs::read_to_string(&out_path).unwrap();
    assert!(msl.contains("fragment FragmentOut ps_main(\n"), "{msl}");
}

#[test]
fn flags_override_the_config_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("options.json");
    fs::write(
        &config,
        r#"{ "entry_point": "from_config", "banner": "// custom banner" }"#,
    )
    .unwrap();

    cargo_bin_cmd!("aero-msl-compile")
        .arg(fixture("vertex_id.json"))
        .arg("--config")
        .arg(&config)
        .args(["--entry-point", "from_flag", "--ensure-position"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("// custom banner\n"))
        .stdout(predicate::str::contains("vertex VertexOut from_flag(\n"))
        .stdout(predicate::str::contains("    float4 position [[position]];\n"))
        .stdout(predicate::str::contains("uint gl_VertexID [[vertex_id]],\n"));
}

#[test]
fn config_can_enable_stage_lowering() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("options.json");
    fs::write(
        &config,
        r#"{ "stage_lowering": { "ensure_vertex_position_output": true } }"#,
    )
    .unwrap();

    cargo_bin_cmd!("aero-msl-compile")
        .arg(fixture("vertex_id.json"))
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("    float4 position [[position]];\n"));
}

#[test]
fn dumps_the_optimized_ir() {
    cargo_bin_cmd!("aero-msl-compile")
        .arg(fixture("solid_red.json"))
        .arg("--dump-ir")
        .assert()
        .success()
        .stderr(predicate::str::contains("store_output"))
        .stderr(predicate::str::contains("main_entrypoint"));
}

#[test]
fn stage_mismatches_fail() {
    cargo_bin_cmd!("aero-msl-compile")
        .arg(fixture("solid_red.json"))
        .arg("--ensure-position")
        .assert()
        .failure()
        .stderr(predicate::str::contains("compile"))
        .stderr(predicate::str::contains(
            "stage lowering `ensure_vertex_position_output` does not apply to a fragment shader",
        ));
}

#[test]
fn malformed_input_is_reported() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.json");
    fs::write(&input, r#"{ "stage": "geometry" }"#).unwrap();

    cargo_bin_cmd!("aero-msl-compile")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse shader"));
}

#[test]
fn missing_input_is_reported() {
    cargo_bin_cmd!("aero-msl-compile")
        .arg("/nonexistent/shader.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("read shader"));
}
