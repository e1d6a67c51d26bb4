//! Command-line interface for the benchmark driver.

use crate::config::{BenchConfig, BenchMode, ReportAnnotations, DEFAULT_REPORT_PATH};
use anyhow::Result;
use clap::Parser;
use post_core::config::{default_data_dir, DEFAULT_FILE_SIZE, DEFAULT_SPACE_PER_UNIT};
use post_core::Config;
use std::path::PathBuf;

/// Parameter-sweep benchmark for proof-of-space initialization and proving.
///
/// Runs a set of engine configurations, measuring initialization, proof
/// generation and validation for each, then prints a table and writes a
/// CSV report.
#[derive(Parser, Debug)]
#[command(name = "postbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Data directory.
    ///
    /// Defaults to a `postbench` directory under the platform data directory.
    #[arg(long, env = "POSTBENCH_DATADIR", value_name = "PATH")]
    pub datadir: Option<PathBuf>,

    /// Space per unit, in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_SPACE_PER_UNIT)]
    pub space: u64,

    /// File size, in bytes. Only used in single mode.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_FILE_SIZE)]
    pub filesize: u64,

    /// Max degree of files write parallelism.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub pfiles: usize,

    /// Max degree of in-file write parallelism.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub pinfile: usize,

    /// Max degree of files read parallelism.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub pread: usize,

    /// Benchmark mode: 1 = single, 2 = mid, 3 = full.
    #[arg(long, default_value_t = BenchMode::default().index(), allow_negative_numbers = true)]
    pub mode: i64,

    /// Disk type, recorded in the report.
    #[arg(long, value_name = "TYPE", default_value = "")]
    pub disktype: String,

    /// Filesystem type, recorded in the report.
    #[arg(long, value_name = "TYPE", default_value = "")]
    pub fstype: String,

    /// Free-text description, recorded in the report.
    #[arg(long, default_value = "")]
    pub desc: String,

    /// Write a CPU profile to this path (`.svg` for a flamegraph).
    #[arg(long, value_name = "PATH")]
    pub cpuprof: Option<PathBuf>,

    /// Write a memory snapshot to this path after the run.
    #[arg(long, value_name = "PATH")]
    pub memprof: Option<PathBuf>,

    /// CSV report path.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_REPORT_PATH)]
    pub report: PathBuf,

    /// Verbose output.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the arguments into a [`BenchConfig`].
    pub fn into_config(self) -> Result<BenchConfig> {
        let mode = BenchMode::try_from(self.mode)?;

        let base = Config::new(self.datadir.unwrap_or_else(default_data_dir))
            .with_space_per_unit(self.space)
            .with_file_size(self.filesize)
            .with_max_write_files_parallelism(self.pfiles)
            .with_max_write_infile_parallelism(self.pinfile)
            .with_max_read_files_parallelism(self.pread);

        Ok(BenchConfig {
            base,
            mode,
            annotations: ReportAnnotations {
                description: self.desc,
                disk_type: self.disktype,
                fs_type: self.fstype,
            },
            report_path: self.report,
            cpu_profile: self.cpuprof,
            mem_profile: self.memprof,
        })
    }
}
