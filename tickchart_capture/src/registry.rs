//! Per-run collection of charts
//!
//! A [`ChartRegistry`] exists for exactly one aggregation run. It holds the
//! tick summary chart plus one chart per distinct general title, in the order
//! titles were first seen. [`ChartRegistry::finalize`] consumes it, so a
//! finalized registry cannot accumulate further.

use rustc_hash::FxHashMap;

use crate::{
    chart::Chart,
    record::{GeneralMetric, SUMMARY_TITLE, TickOutcome},
};

/// Charts accumulated by one run, frozen and sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    /// The tick summary chart, if any tick outcome was merged.
    pub summary: Option<Chart>,
    /// General charts in first-seen title order.
    pub charts: Vec<Chart>,
    /// Sum of every value of every general chart.
    pub total: i64,
}

impl Finalized {
    /// All charts, summary first.
    #[must_use]
    pub fn into_charts(self) -> Vec<Chart> {
        self.summary.into_iter().chain(self.charts).collect()
    }
}

/// Mutable chart state of a run in its accumulation phase.
#[derive(Debug)]
pub struct ChartRegistry {
    summary: Chart,
    charts: Vec<Chart>,
    by_title: FxHashMap<String, usize>,
}

impl Default for ChartRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRegistry {
    /// Create an empty registry. The summary chart is preallocated with
    /// identity 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            summary: Chart::new(0, SUMMARY_TITLE),
            charts: Vec::new(),
            by_title: FxHashMap::default(),
        }
    }

    /// The chart for `title`, created with the next identity on first sight.
    pub fn chart_mut(&mut self, title: &str) -> &mut Chart {
        let idx = match self.by_title.get(title) {
            Some(&idx) => idx,
            None => {
                let idx = self.charts.len();
                let id = u32::try_from(idx + 1).unwrap_or(u32::MAX);
                self.charts.push(Chart::new(id, title));
                self.by_title.insert(title.to_string(), idx);
                idx
            }
        };
        &mut self.charts[idx]
    }

    /// The chart for `title`, if one has been created.
    #[must_use]
    pub fn get(&self, title: &str) -> Option<&Chart> {
        self.by_title.get(title).map(|&idx| &self.charts[idx])
    }

    /// The tick summary chart as accumulated so far.
    #[must_use]
    pub fn summary(&self) -> &Chart {
        &self.summary
    }

    /// Merge a general metric into the chart named by its title. Labels whose
    /// value is not numeric are passed to `on_reject`.
    pub fn merge<F>(&mut self, metric: &GeneralMetric, on_reject: F)
    where
        F: FnMut(&str),
    {
        self.chart_mut(&metric.title).add_line(metric, on_reject);
    }

    /// Add a tick outcome count into its summary slot.
    pub fn merge_tick(&mut self, outcome: TickOutcome, count: i64) {
        self.summary.add_point(outcome.slot(), outcome.title(), count);
    }

    /// End the accumulation phase.
    ///
    /// General charts are sorted by label, the summary chart is padded to one
    /// slot per outcome but keeps its fixed order, and the total over general
    /// charts is computed.
    #[must_use]
    pub fn finalize(self) -> Finalized {
        let mut charts = self.charts;
        for chart in &mut charts {
            chart.sort_labels();
        }
        let total = charts
            .iter()
            .fold(0i64, |acc, chart| acc.saturating_add(chart.sum()));

        let mut summary = self.summary;
        let summary = if summary.is_empty() {
            None
        } else {
            summary.pad_to(TickOutcome::ALL.len());
            Some(summary)
        };

        Finalized {
            summary,
            charts,
            total,
        }
    }
}
