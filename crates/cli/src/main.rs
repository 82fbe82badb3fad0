//! Vector timing simulator CLI.
//!
//! Loads `Config.txt` and `Resolved_Code.txt` (and, if present,
//! `SDMEM.txt`/`VDMEM.txt`) from `--iodir`, runs the pipeline to
//! completion, and prints the total cycle count.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vtsim_core::config::Config;
use vtsim_core::loader;
use vtsim_core::pipeline::Pipeline;
use vtsim_core::SimError;

#[derive(Parser, Debug)]
#[command(
    name = "vtsim",
    author,
    version,
    about = "Cycle-accurate timing simulator for an in-order, vector-extended processor"
)]
struct Cli {
    /// Directory holding `Config.txt`, `Resolved_Code.txt`, and the
    /// optional `SDMEM.txt`/`VDMEM.txt` data files.
    #[arg(long)]
    iodir: PathBuf,

    /// Reject any instruction whose mnemonic or operands cannot be
    /// decoded, instead of logging a warning and treating it as a
    /// scalar no-op.
    #[arg(long)]
    strict_decode: bool,

    /// Enable per-cycle fetch/dispatch/issue/complete tracing at the
    /// `trace` level (equivalent to `RUST_LOG=vtsim_core=trace`).
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.trace);

    match run(&cli) {
        Ok(cycles) => {
            println!("Total Cycles: {cycles}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("vtsim: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(trace: bool) {
    let default_directive = if trace { "trace" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: &Cli) -> Result<i64, SimError> {
    let config = Config::load_file(&cli.iodir.join("Config.txt"))?;
    config.log_summary();

    let program = loader::load_instructions(&cli.iodir.join("Resolved_Code.txt"))?;
    tracing::info!(instructions = program.len(), "loaded instruction stream");

    for name in ["SDMEM.txt", "VDMEM.txt"] {
        let path = cli.iodir.join(name);
        if path.exists() {
            let values = loader::load_data_file(&path)?;
            tracing::info!(file = name, lines = values.len(), "validated data file");
        }
    }

    let mut pipeline = Pipeline::new(config, program, cli.strict_decode);
    pipeline.run()
}
