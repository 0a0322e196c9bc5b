//! Plain text rendering of an aggregation result for the terminal.

use std::fmt::Write;

use tickchart_capture::{aggregate::AggregationResult, observer::SkipCounts};

/// Render `result` as one block per chart followed by the total and the
/// tally of skipped lines and values. An unreadable source never gets this
/// far, see [`tickchart_capture::aggregate::aggregate_path`].
///
/// # Errors
///
/// Only if writing to a `String` fails, which it does not.
pub fn render(result: &AggregationResult, skips: &SkipCounts) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "source: {}", result.source)?;
    for chart in &result.charts {
        writeln!(out, "{title} ({id})", title = chart.title, id = chart.id)?;
        let width = chart.labels().iter().map(String::len).max().unwrap_or(0);
        for (label, value) in chart.labels().iter().zip(chart.values()) {
            writeln!(out, "  {label:>width$} = {value}")?;
        }
    }
    writeln!(out, "total: {}", result.total)?;
    writeln!(
        out,
        "skipped: {decode} undecodable, {schema} malformed, {coercion} non-numeric",
        decode = skips.line_decode,
        schema = skips.schema_mismatch,
        coercion = skips.value_coercion,
    )?;
    Ok(out)
}
