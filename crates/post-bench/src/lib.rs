//! Parameter-sweep benchmark driver for proof-of-space engines.
//!
//! A run expands a baseline [`post_core::Config`] into an ordered list of
//! cases ([`sweep`]), executes each one against an engine ([`bench`]),
//! tags the results with host metadata ([`metadata`]) and reports them as a
//! console table and a CSV file ([`results`]).

pub mod bench;
pub mod cli;
pub mod config;
pub mod error;
pub mod metadata;
pub mod profile;
pub mod results;
pub mod sweep;

pub use bench::{BenchRunner, Phase, ResultRow, RESULT_HEADER};
pub use config::{BenchConfig, BenchMode, ReportAnnotations};
pub use error::BenchError;
pub use metadata::Metadata;
