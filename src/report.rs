//! Comma-delimited report rendering.
//!
//! Section layout, in order: record count, configured ignore selectors,
//! configured alterations, unaccounted differences (descending by count),
//! accounted differences with reasons (descending), per-record detail, the
//! path rollup (ascending by count), and the records that produced no target
//! document. Values never need quoting because every difference key has
//! already had its commas flattened by the classifier.

use std::io::{self, Write};

use crate::aggregate::BatchSummary;

/// Configured inputs echoed at the top of the report.
#[derive(Debug, Default)]
pub struct ReportInputs {
    /// Ignore selectors with their reasons.
    pub ignored: Vec<(String, String)>,
    /// Human-readable alteration descriptions.
    pub alterations: Vec<String>,
}

/// Render the finished batch summary to a writer.
pub fn write_report<W: Write>(
    out: &mut W,
    summary: &BatchSummary,
    inputs: &ReportInputs,
) -> io::Result<()> {
    writeln!(out, "Records: {}", summary.record_count())?;

    writeln!(out, "---------------")?;
    writeln!(out, "Ignored paths")?;
    for (selector, reason) in &inputs.ignored {
        writeln!(out, "{selector}, {reason}")?;
    }

    writeln!(out, "---------------")?;
    writeln!(out, "Alterations")?;
    for description in &inputs.alterations {
        writeln!(out, "{description}")?;
    }

    writeln!(out)?;
    writeln!(out, "Unaccounted differences, {}", summary.unknown_total())?;
    writeln!(out, "Difference, Count")?;
    let mut unknown = summary.unknown().to_vec();
    unknown.sort_by(|a, b| b.count.cmp(&a.count));
    for entry in &unknown {
        writeln!(out, "{}, {}", entry.difference, entry.count)?;
    }

    writeln!(out)?;
    writeln!(out, "Accounted differences, {}", summary.known_total())?;
    writeln!(out, "Difference, Reason, Count")?;
    let mut known = summary.known().to_vec();
    known.sort_by(|a, b| b.count.cmp(&a.count));
    for entry in &known {
        writeln!(out, "{}, {}, {}", entry.difference, entry.reason, entry.count)?;
    }

    writeln!(out)?;
    writeln!(out, "Difference, Control path, Target path")?;
    for record in summary.records() {
        writeln!(out, "Record id: {}", record.id)?;
        for detail in &record.details {
            writeln!(
                out,
                "{}, {}, {}",
                detail.difference.key,
                detail.difference.control_location.as_deref().unwrap_or(""),
                detail.difference.target_location.as_deref().unwrap_or(""),
            )?;
        }
        writeln!(out)?;
    }

    writeln!(out, "Count of differences by path")?;
    writeln!(out, "Path, Count")?;
    let mut rollup = summary.path_rollup();
    rollup.sort_by_key(|p| p.count);
    for entry in &rollup {
        writeln!(out, "{}, {}", entry.path, entry.count)?;
    }

    writeln!(out)?;
    writeln!(out, "Records with no target document")?;
    let missing: Vec<&str> = summary
        .records()
        .iter()
        .filter(|r| r.missing_target)
        .map(|r| r.id.as_str())
        .collect();
    writeln!(out, "{}", missing.join(" "))?;

    Ok(())
}
