//! graybatch CLI - convert a directory of images to grayscale.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use graybatch::config::{DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR};
use graybatch::{BatchConfig, BatchOrchestrator};
use graybatch_gpu::{Backend, HostRuntime, Runtime};

/// Convert every .png, .jpg and .jpeg image in a directory to grayscale.
#[derive(Parser, Debug)]
#[command(name = "graybatch")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory scanned for input images.
    #[arg(long, default_value = DEFAULT_INPUT_DIR, value_name = "DIR")]
    input_dir: PathBuf,

    /// Directory grayscale images are written to.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, value_name = "DIR")]
    output_dir: PathBuf,

    /// Compute backend: host, cuda or wgpu.
    #[arg(long, default_value = "host", value_name = "BACKEND")]
    backend: Backend,

    /// Exit with a failure status if any image was skipped.
    #[arg(long)]
    strict: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("graybatch={log_level},graybatch_gpu={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let config = BatchConfig::new(&args.input_dir, &args.output_dir);

    match args.backend {
        Backend::Host => run_batch(config, HostRuntime::new(), args.strict),
        #[cfg(feature = "cuda")]
        Backend::Cuda => {
            let runtime = graybatch_gpu::init_cuda_runtime().context("Failed to initialize CUDA")?;
            run_batch(config, runtime, args.strict)
        }
        #[cfg(feature = "wgpu")]
        Backend::Wgpu => {
            let runtime = graybatch_gpu::init_wgpu_runtime().context("Failed to initialize WGPU")?;
            run_batch(config, runtime, args.strict)
        }
        #[allow(unreachable_patterns)]
        other => {
            other.ensure_available()?;
            anyhow::bail!("backend '{other}' has no runtime in this build")
        }
    }
}

fn run_batch<R: Runtime>(config: BatchConfig, runtime: R, strict: bool) -> Result<ExitCode> {
    let input_dir = config.input_dir.clone();
    let batch = BatchOrchestrator::new(config, runtime).context("Failed to configure batch")?;

    let report = batch.run().map_err(|err| {
        if matches!(&err, graybatch::Error::Directory { path, .. } if *path == input_dir) {
            tracing::error!(
                "Please create '{}' and place image files (png, jpg, jpeg) inside.",
                input_dir.display()
            );
        }
        anyhow::Error::new(err).context("Batch aborted")
    })?;

    if strict && !report.is_clean() {
        tracing::warn!("{} of {} images were skipped", report.skipped(), report.candidates());
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
