//! cosmix CLI: run a parameter file.
//!
//! # Usage
//!
//! ```text
//! cosmix params.toml
//! cosmix params.toml -p runtime.sampler=grid -p grid.nsample_dimension=10
//! cosmix params.toml -v cosmological_parameters.h0=0.7 --threads 8
//! cosmix params.toml --postprocess summary/
//! ```
//!
//! # Output streams
//!
//! - stdout: report lines (`Likelihood = ...`)
//! - stderr: logs and `[CODE] message` errors
//!
//! # Environment Variables
//!
//! - `COSMIX_<SECTION>__<KEY>`: override an existing option
//! - `RUST_LOG`: log filter when neither `-d` nor `--verbose` is given
//!
//! Ctrl-C cancels the run; modules are cleaned up and the chain file is
//! closed before exiting.

use anyhow::Result;
use clap::Parser;
use cosmix_app::{CancelToken, ErrorCode, Overrides, Postprocessor, RunBuilder, RunError, Variables};
use cosmix_runtime::config::Assignment;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status for a cancelled run (128 + SIGINT).
const EXIT_CANCELLED: u8 = 130;

/// cosmix: cosmological parameter estimation pipelines
#[derive(Parser, Debug)]
#[command(name = "cosmix")]
#[command(version, about, long_about = None)]
struct Args {
    /// Parameter file
    params: PathBuf,

    /// Override an option: section.key=value (repeatable)
    #[arg(short = 'p', long = "param", value_name = "SECTION.KEY=VALUE")]
    overrides: Vec<Assignment>,

    /// Fix a declared parameter: section.key=value (repeatable)
    #[arg(short = 'v', long = "variable", value_name = "SECTION.KEY=VALUE")]
    variables: Vec<Assignment>,

    /// Worker threads (overrides [runtime] threads)
    #[arg(long)]
    threads: Option<usize>,

    /// Summarise the chain into DIR after the run
    #[arg(long, value_name = "DIR")]
    postprocess: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable info logging
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(args: &Args) {
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn report(err: &RunError) -> ExitCode {
    eprintln!("[{}] {}", err.code(), err);
    match err {
        RunError::Cancelled => ExitCode::from(EXIT_CANCELLED),
        _ => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(&args);

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping after the current evaluations");
            on_signal.cancel();
        }
    });

    let mut builder = RunBuilder::new(&args.params)
        .overrides(args.overrides.iter().cloned().collect::<Overrides>())
        .variables(args.variables.iter().cloned().collect::<Variables>())
        .cancel_token(cancel);
    if let Some(n) = args.threads {
        builder = builder.threads(n);
    }

    // Modules and samplers are synchronous; keep them off the runtime threads.
    let summary = match tokio::task::spawn_blocking(move || builder.run()).await? {
        Ok(summary) => summary,
        Err(e) => return Ok(report(&e)),
    };
    info!(
        run_id = %summary.run_id,
        sampler = %summary.sampler,
        samples = summary.samples,
        valid = summary.valid,
        "Run finished"
    );

    if let Some(dir) = args.postprocess {
        let params = args.params.clone();
        let result = tokio::task::spawn_blocking(move || {
            Postprocessor::from_run(&params, dir).and_then(|pp| pp.save())
        })
        .await?;
        match result {
            Ok(files) => info!(files = files.len(), "Postprocessing written"),
            Err(e) => return Ok(report(&e)),
        }
    }

    Ok(ExitCode::SUCCESS)
}
