//! CSV report export.
//!
//! Layout: metadata keys, metadata values, a blank row, the column header,
//! then one record per case. Record lengths differ, so the writer is
//! flexible.

use crate::metadata::Metadata;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write a report to `writer`.
pub fn write_csv<W: Write>(
    writer: W,
    metadata: &Metadata,
    header: &[&str],
    rows: &[Vec<String>],
) -> Result<(), csv::Error> {
    let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    csv.write_record(metadata.keys())?;
    csv.write_record(metadata.values())?;
    csv.write_record([""])?;
    csv.write_record(header)?;
    for row in rows {
        csv.write_record(row)?;
    }

    csv.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and write a report to it.
pub fn export_csv(
    path: &Path,
    metadata: &Metadata,
    header: &[&str],
    rows: &[Vec<String>],
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    write_csv(file, metadata, header, rows)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}
