//! HTML rendering of an aggregation result.
//!
//! The page is a single document: a form to pick a tick log, the error if
//! the log could not be read, and otherwise one canvas per chart. Chart data
//! is embedded as JSON and drawn client-side.

use std::fmt::Write;

use tickchart_capture::aggregate::AggregationResult;

const CHART_LIBRARY: &str = "https://cdn.jsdelivr.net/npm/chart.js@4";

/// Errors produced by [`render`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapper for [`std::fmt::Error`].
    #[error(transparent)]
    Fmt(#[from] std::fmt::Error),
    /// Wrapper for [`serde_json::Error`].
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Escape `text` for use in HTML text and quoted attribute values.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Render the viewer page. `None` renders the landing page.
///
/// # Errors
///
/// Returns an error if the chart data cannot be serialized.
pub fn render(result: Option<&AggregationResult>) -> Result<String, Error> {
    let mut html = String::new();
    let source = result.map(|r| r.source.as_str()).unwrap_or_default();

    write!(
        &mut html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>tickchart</title>\
         <script src=\"{CHART_LIBRARY}\"></script></head><body>\
         <form method=\"get\" action=\"/\">\
         <input type=\"text\" name=\"file\" size=\"80\" value=\"{source}\">\
         <button type=\"submit\">Load</button></form>",
        source = escape(source),
    )?;

    if let Some(result) = result {
        if result.is_error() {
            write!(
                &mut html,
                "<p class=\"error\">Could not read {source}: {msg}</p>",
                source = escape(&result.source),
                msg = escape(&result.error_msg),
            )?;
        } else {
            write!(&mut html, "<p>Total: {total}</p>", total = result.total)?;
            for chart in &result.charts {
                write!(
                    &mut html,
                    "<h2>{title}</h2><canvas id=\"chart-{id}\"></canvas>",
                    title = escape(&chart.title),
                    id = chart.id,
                )?;
            }
            // `</` inside a script element would end it early.
            let data = serde_json::to_string(&result.charts)?.replace("</", "<\\/");
            write!(
                &mut html,
                "<script>const charts = {data};\
                 for (const c of charts) {{\
                 new Chart(document.getElementById(`chart-${{c.id}}`), {{\
                 type: 'bar',\
                 data: {{ labels: c.labels, datasets: [{{ label: c.title, data: c.values }}] }}\
                 }});\
                 }}</script>"
            )?;
        }
    }

    html.push_str("</body></html>");
    Ok(html)
}
