//! Console rendering of a finished run.

use crate::metadata::{Metadata, CPU_FLAGS_KEY};
use comfy_table::{presets::UTF8_FULL, Table};
use std::io::{self, Write};

/// Write the metadata listing followed by a bordered results table.
///
/// `CPU_FLAGS` is left out of the listing; it only goes to the CSV.
pub fn render_table<W: Write>(
    writer: &mut W,
    metadata: &Metadata,
    header: &[&str],
    rows: &[Vec<String>],
) -> io::Result<()> {
    writeln!(writer, "\n- Results -")?;
    for (key, value) in metadata.entries() {
        if key == CPU_FLAGS_KEY {
            continue;
        }
        writeln!(writer, "{key}: {value}")?;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header.to_vec());
    for row in rows {
        table.add_row(row.clone());
    }
    writeln!(writer, "{table}")
}
