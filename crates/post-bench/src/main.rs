//! postbench - proof-of-space parameter-sweep benchmark.

// Use mimalloc for reduced allocation latency (enabled by default).
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Result;
use clap::Parser;
use post_bench::{
    bench::{run_and_publish, BenchRunner},
    cli::Cli,
    config::BenchConfig,
    metadata,
    profile::{write_memory_snapshot, CpuProfiler},
    results::format_size,
    sweep,
};
use post_core::DiskEngineFactory;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise use default based on verbose flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config()?;
    tracing::info!(
        "Bench config: mode {}, datadir {}, space {}",
        config.mode,
        config.base.data_dir().display(),
        format_size(config.base.space_per_unit())
    );

    let profiler = config
        .cpu_profile
        .as_deref()
        .map(CpuProfiler::start)
        .transpose()?;

    run_sweep(&config)?;

    if let Some(profiler) = profiler {
        profiler.finish()?;
    }
    if let Some(path) = &config.mem_profile {
        write_memory_snapshot(path)?;
    }

    Ok(())
}

fn run_sweep(config: &BenchConfig) -> Result<()> {
    let cases = sweep::generate_for_host(config.mode, &config.base);
    tracing::info!("Running {} case(s)", cases.len());

    let runner = BenchRunner::new(DiskEngineFactory::new());
    run_and_publish(
        &runner,
        config,
        &cases,
        &mut std::io::stdout().lock(),
        metadata::collect,
    )?;
    Ok(())
}
