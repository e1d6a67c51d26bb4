//! Benchmark execution.

mod runner;

pub use runner::{BenchRunner, DEFAULT_CHALLENGE, DEFAULT_IDENTITY};

use crate::config::{BenchConfig, ReportAnnotations};
use crate::error::BenchError;
use crate::metadata::Metadata;
use crate::results::{format_duration, publish};
use post_core::{Config, EngineFactory};
use std::io::Write;
use std::time::Duration;

/// Column labels, in [`ResultRow::to_record`] order.
pub const RESULT_HEADER: [&str; 8] = [
    "NUMFILES", "P-FILES", "P-INFILE", "INIT", "INIT-V", "P-READ", "EXEC", "EXEC-V",
];

/// Granularity of reported generation timings (initialize, prove).
pub const GENERATION_PRECISION: Duration = Duration::from_millis(1);

/// Granularity of reported validation timings.
pub const VALIDATION_PRECISION: Duration = Duration::from_micros(1);

/// Engine phase of a benchmark case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Creating the engine for the case config.
    Open,
    Initialize,
    ValidateInit,
    Prove,
    ValidateProof,
    Reset,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Open => "engine setup",
            Self::Initialize => "initialization",
            Self::ValidateInit => "initialization validation",
            Self::Prove => "proof generation",
            Self::ValidateProof => "proof validation",
            Self::Reset => "reset",
        };
        write!(f, "{name}")
    }
}

/// Measurements for one benchmark case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    /// Files the space was split into.
    pub num_files: usize,
    /// Write-files parallelism the engine resolved.
    pub write_files_parallelism: usize,
    /// Write-in-file parallelism the engine resolved.
    pub write_infile_parallelism: usize,
    pub init: Duration,
    pub init_validation: Duration,
    /// Read parallelism the engine resolved.
    pub read_parallelism: usize,
    pub proof: Duration,
    pub proof_validation: Duration,
}

impl ResultRow {
    /// Fields as display strings, matching [`RESULT_HEADER`].
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.num_files.to_string(),
            self.write_files_parallelism.to_string(),
            self.write_infile_parallelism.to_string(),
            format_duration(self.init),
            format_duration(self.init_validation),
            self.read_parallelism.to_string(),
            format_duration(self.proof),
            format_duration(self.proof_validation),
        ]
    }
}

/// Run every case, then collect metadata and publish the report.
///
/// Metadata is collected and the table and CSV are written only once all
/// cases succeeded. A failed case leaves `config.report_path` untouched.
pub fn run_and_publish<F, W, M>(
    runner: &BenchRunner<F>,
    config: &BenchConfig,
    cases: &[Config],
    console: &mut W,
    collect_metadata: M,
) -> anyhow::Result<Vec<ResultRow>>
where
    F: EngineFactory,
    W: Write,
    M: FnOnce(&Config, &ReportAnnotations) -> Result<Metadata, BenchError>,
{
    let rows = runner.run(cases)?;
    let metadata = collect_metadata(&config.base, &config.annotations)?;
    publish(console, &config.report_path, &metadata, &rows)?;
    Ok(rows)
}

/// Round `duration` to the nearest multiple of `precision`, halves away from zero.
pub fn round_duration(duration: Duration, precision: Duration) -> Duration {
    let unit = precision.as_nanos();
    if unit == 0 {
        return duration;
    }
    let rounded = (duration.as_nanos() + unit / 2) / unit * unit;
    Duration::from_nanos(u64::try_from(rounded).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_duration() {
        let ms = GENERATION_PRECISION;
        assert_eq!(round_duration(Duration::from_micros(1499), ms), Duration::from_millis(1));
        assert_eq!(round_duration(Duration::from_micros(1500), ms), Duration::from_millis(2));
        assert_eq!(round_duration(Duration::from_micros(400), ms), Duration::ZERO);
        assert_eq!(
            round_duration(Duration::from_nanos(12_345_678), VALIDATION_PRECISION),
            Duration::from_micros(12_346)
        );
        assert_eq!(round_duration(Duration::from_nanos(7), Duration::ZERO), Duration::from_nanos(7));
    }

    #[test]
    fn test_record_matches_header() {
        let row = ResultRow {
            num_files: 4,
            write_files_parallelism: 2,
            write_infile_parallelism: 1,
            init: Duration::from_millis(1234),
            init_validation: Duration::from_micros(85),
            read_parallelism: 2,
            proof: Duration::from_millis(12),
            proof_validation: Duration::from_micros(1500),
        };
        let record = row.to_record();
        assert_eq!(record.len(), RESULT_HEADER.len());
        assert_eq!(
            record,
            vec!["4", "2", "1", "1.234s", "85µs", "2", "12ms", "1.5ms"]
        );
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::ValidateProof.to_string(), "proof validation");
        assert_eq!(Phase::Initialize.to_string(), "initialization");
    }
}
