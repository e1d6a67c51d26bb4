//! Error types for the benchmark driver.

use crate::bench::Phase;
use post_core::PostError;
use std::path::PathBuf;

/// Fatal conditions raised while preparing or running a benchmark.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The requested mode is outside `1..=3`.
    #[error("invalid mode: {0} (valid: 1=single, 2=mid, 3=full)")]
    InvalidMode(i64),

    /// An engine call failed; the run stops at this case.
    #[error("case {case}/{total} failed during {phase}: {source}")]
    Phase {
        case: usize,
        total: usize,
        phase: Phase,
        #[source]
        source: PostError,
    },

    /// Host introspection returned nothing usable.
    #[error("system info unavailable: {0}")]
    SystemInfo(String),

    /// Host introspection failed to read a system file.
    #[error("failed to read {}: {source}", path.display())]
    SystemFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
