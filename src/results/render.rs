use std::fmt::Write as _;

use crate::error::ResultsError;
use crate::job::{FORMAT_OBJECT, MeasurementMetadata};

use super::aggregate::MeasurementSummary;
use super::format::format_value;

/// Renders summaries grouped by metadata source. Object-valued entries
/// and entries without a summary are left out.
///
/// # Errors
///
/// Returns an error if writing to the output buffer fails.
pub fn render_measures(
    metadata: &[MeasurementMetadata],
    summaries: &[MeasurementSummary],
) -> Result<String, ResultsError> {
    let rows: Vec<(&MeasurementMetadata, &MeasurementSummary)> = metadata
        .iter()
        .filter(|entry| entry.format != FORMAT_OBJECT)
        .filter_map(|entry| {
            summaries
                .iter()
                .find(|summary| summary.name == entry.name)
                .map(|summary| (entry, summary))
        })
        .collect();

    let width = rows
        .iter()
        .map(|(entry, _)| label(entry).len())
        .max()
        .unwrap_or(0);

    let mut sources: Vec<&str> = Vec::new();
    for (entry, _) in &rows {
        if !sources.contains(&entry.source.as_str()) {
            sources.push(entry.source.as_str());
        }
    }

    let mut out = String::new();
    for group in sources {
        if !out.is_empty() {
            writeln!(out).map_err(|source| ResultsError::WriteLine { source })?;
        }
        writeln!(out, "## {}:", group).map_err(|source| ResultsError::WriteLine { source })?;
        for (entry, summary) in rows.iter().filter(|(entry, _)| entry.source == group) {
            let caption = format!("{}:", label(entry));
            writeln!(
                out,
                "{:<pad$} {}",
                caption,
                format_value(&entry.format, &summary.value),
                pad = width.saturating_add(1)
            )
            .map_err(|source| ResultsError::WriteLine { source })?;
        }
    }
    Ok(out)
}

fn label(entry: &MeasurementMetadata) -> &str {
    if entry.short_description.is_empty() {
        &entry.name
    } else {
        &entry.short_description
    }
}
