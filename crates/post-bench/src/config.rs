//! Configuration types for the benchmark driver.

use crate::error::BenchError;
use post_core::Config;
use std::path::PathBuf;

/// Default report path.
pub const DEFAULT_REPORT_PATH: &str = "report.csv";

const MODE_NAMES: [&str; 3] = ["single", "mid", "full"];

/// Sweep breadth, ordered `Single < Mid < Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BenchMode {
    /// One case: the baseline config as given.
    Single = 1,
    /// Endpoints of each sweep axis.
    #[default]
    Mid = 2,
    /// Every step of each sweep axis.
    Full = 3,
}

impl BenchMode {
    /// All modes in ascending order.
    pub const ALL: [Self; 3] = [Self::Single, Self::Mid, Self::Full];

    /// Numeric value used on the command line.
    pub fn index(self) -> i64 {
        self as i64
    }

    /// Lowercase label.
    pub fn name(self) -> &'static str {
        MODE_NAMES[self as usize - 1]
    }
}

impl TryFrom<i64> for BenchMode {
    type Error = BenchError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.index() == value)
            .ok_or(BenchError::InvalidMode(value))
    }
}

impl std::fmt::Display for BenchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Free-text labels attached to the report. Empty values are omitted from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportAnnotations {
    pub description: String,
    pub disk_type: String,
    pub fs_type: String,
}

/// Everything a benchmark invocation needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Baseline engine config the sweep expands.
    pub base: Config,
    pub mode: BenchMode,
    pub annotations: ReportAnnotations,
    /// CSV report destination.
    pub report_path: PathBuf,
    /// CPU profile destination, if profiling is requested.
    pub cpu_profile: Option<PathBuf>,
    /// Memory snapshot destination, if requested.
    pub mem_profile: Option<PathBuf>,
}

impl BenchConfig {
    /// Config with default report path, no annotations and no profiling.
    pub fn new(base: Config, mode: BenchMode) -> Self {
        Self {
            base,
            mode,
            annotations: ReportAnnotations::default(),
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            cpu_profile: None,
            mem_profile: None,
        }
    }
}
