//! Report output: formatting helpers, the console table and the CSV export.

pub mod export;
pub mod format;
pub mod table;

pub use export::{export_csv, write_csv};
pub use format::{format_duration, format_size};
pub use table::render_table;

use crate::bench::{ResultRow, RESULT_HEADER};
use crate::metadata::Metadata;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Render the results table to `console`, then write the CSV report to `path`.
pub fn publish<W: Write>(
    console: &mut W,
    path: &Path,
    metadata: &Metadata,
    rows: &[ResultRow],
) -> Result<()> {
    let records: Vec<Vec<String>> = rows.iter().map(ResultRow::to_record).collect();

    render_table(console, metadata, &RESULT_HEADER, &records)
        .context("Failed to print results table")?;
    export_csv(path, metadata, &RESULT_HEADER, &records)
}
