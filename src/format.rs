//! Text and JSON rendering of result sets for the command line.
//!
//! Rows of one entry are grouped under the entry's label, mirroring the
//! results panel: a symbol with several definitions shows once, followed by
//! one line per place it occurs.

use crate::index::CatalogManifest;
use crate::search::{DisplayRow, RankedResultSet};
use std::fmt::{self, Write as _};

/// Render a result set as a grouped text listing.
pub fn render_results(results: &RankedResultSet) -> Result<String, fmt::Error> {
    let mut output = String::new();

    if results.is_empty() {
        writeln!(output, "No results for '{}'.", results.query())?;
        if !results.suggestions().is_empty() {
            writeln!(output, "\nDid you mean:")?;
            for suggestion in results.suggestions() {
                writeln!(output, "  • {}", suggestion)?;
            }
        }
        return Ok(output);
    }

    writeln!(
        output,
        "Results for '{}' ({} rows, {} symbols):\n",
        results.query(),
        results.len(),
        results.total_entries()
    )?;

    for group in results.rows().chunk_by(|a, b| a.entry_rank == b.entry_rank) {
        render_group(&mut output, group)?;
    }

    if results.truncated() {
        writeln!(output, "\n(more results not shown; refine the query)")?;
    }

    Ok(output)
}

fn render_group(output: &mut String, group: &[DisplayRow]) -> fmt::Result {
    let Some(first) = group.first() else {
        return Ok(());
    };

    write!(output, "{}. ", first.entry_rank + 1)?;
    write_label(output, first)?;
    writeln!(output, "  [{}]", first.match_kind.as_str())?;

    for row in group {
        output.push_str("   ");
        if let Some(kind) = row.kind_hint {
            write!(output, "({}) ", kind)?;
        }
        if row.container_label.is_empty() {
            writeln!(output, "{}", row.anchor_url)?;
        } else {
            writeln!(output, "{} -> {}", row.container_label, row.anchor_url)?;
        }
    }

    Ok(())
}

/// The label with the matched span bracketed.
fn write_label(output: &mut String, row: &DisplayRow) -> fmt::Result {
    match &row.highlight {
        Some(range) if row.label.is_char_boundary(range.start) && row.label.is_char_boundary(range.end) => {
            write!(
                output,
                "{}[{}]{}",
                &row.label[..range.start],
                &row.label[range.clone()],
                &row.label[range.end..]
            )
        }
        _ => output.write_str(&row.label),
    }
}

/// Render a result set as pretty JSON.
pub fn render_results_json(results: &RankedResultSet) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}

/// List the sections of a manifest with their partitions.
pub fn render_sections(manifest: &CatalogManifest) -> Result<String, fmt::Error> {
    let mut output = String::new();

    if manifest.is_empty() {
        writeln!(output, "No search sections.")?;
        return Ok(output);
    }

    let width = manifest
        .sections()
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0);
    for section in manifest.sections() {
        let partitions: String = section.partitions().iter().collect();
        writeln!(
            output,
            "{:width$}  {:<12}  {}",
            section.name,
            section.label,
            partitions,
            width = width
        )?;
    }

    Ok(output)
}
