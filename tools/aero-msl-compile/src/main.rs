use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use aero_msl::{compile, CompileOptions};
use aero_msl_ir::Shader;
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "aero-msl-compile",
    about = "Compile a JSON-serialized aero-msl-ir shader program to Metal Shading Language."
)]
struct Args {
    /// Input shader program (JSON)
    input: PathBuf,

    /// Write MSL to this path instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Compile options (JSON); command-line flags take precedence
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Name of the generated entry point
    #[arg(long, value_name = "NAME")]
    entry_point: Option<String>,

    /// Print the optimized IR to stderr
    #[arg(long, action = clap::ArgAction::SetTrue)]
    dump_ir: bool,

    /// Vertex: write a zero position when the program writes none
    #[arg(long, action = clap::ArgAction::SetTrue)]
    ensure_position: bool,

    /// Vertex: drop point size writes
    #[arg(long, action = clap::ArgAction::SetTrue)]
    remove_point_size: bool,

    /// Fragment: write the rasterized depth when the program writes none
    #[arg(long, action = clap::ArgAction::SetTrue)]
    ensure_depth: bool,

    /// Fragment: drop depth writes
    #[arg(long, action = clap::ArgAction::SetTrue)]
    remove_depth: bool,

    /// Fragment: replace the sample mask with a constant
    #[arg(long, value_name = "MASK", value_parser = parse_mask)]
    static_sample_mask: Option<u32>,
}

fn parse_mask(text: &str) -> Result<u32, String> {
    let parsed = match text.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|err| format!("invalid sample mask {text:?}: {err}"))
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    run(args)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("read {what} {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {what} {}", path.display()))
}

fn options(args: &Args) -> anyhow::Result<CompileOptions> {
    let mut options: CompileOptions = match &args.config {
        Some(path) => read_json(path, "config")?,
        None => CompileOptions::default(),
    };
    if let Some(name) = &args.entry_point {
        options.entry_point.clone_from(name);
    }
    let lowering = &mut options.stage_lowering;
    lowering.ensure_vertex_position_output |= args.ensure_position;
    lowering.remove_point_size_write |= args.remove_point_size;
    lowering.ensure_depth_write |= args.ensure_depth;
    lowering.remove_depth_write |= args.remove_depth;
    if args.static_sample_mask.is_some() {
        lowering.static_sample_mask = args.static_sample_mask;
    }
    Ok(options)
}

fn run(args: Args) -> anyhow::Result<()> {
    let options = options(&args)?;
    let mut shader: Shader = read_json(&args.input, "shader")?;
    tracing::debug!(stage = %shader.stage, input = %args.input.display(), "loaded shader");

    let output = compile(&mut shader, &options)
        .with_context(|| format!("compile {}", args.input.display()))?;

    if args.dump_ir {
        eprint!("{}", shader.entry);
    }

    match &args.output {
        Some(path) => fs::write(path, &output.msl)
            .with_context(|| format!("write output {}", path.display()))?,
        None => io::stdout()
            .lock()
            .write_all(output.msl.as_bytes())
            .context("write MSL to stdout")?,
    }
    Ok(())
}
