//! Aggregation of a tick log into charts
//!
//! The pipeline is strictly one-directional:
//!
//! ```text
//! bytes -> Lines -> Record::classify -> ChartRegistry -> Finalized
//! ```
//!
//! Only failing to read the source ends a run early. Every other problem is
//! reported to the run's [`Observer`] and the offending line, or value, is
//! left out.

use std::{io, path::Path};

use serde::Serialize;

use crate::{
    chart::Chart,
    line::Lines,
    observer::{Observer, Skip},
    record::Record,
    registry::{ChartRegistry, Finalized},
};

/// Errors produced by [`aggregate_path`] and friends.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The source could not be read at all.
    #[error("{id}: {source}")]
    SourceUnavailable {
        /// The identifier the caller requested
        id: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
}

/// Aggregate the full content of a tick log.
pub fn aggregate<O>(content: &[u8], mut observer: O) -> Finalized
where
    O: Observer,
{
    let mut registry = ChartRegistry::new();

    for (line, decoded) in Lines::new(content) {
        let record = match decoded.map_err(Skip::from).and_then(Record::classify) {
            Ok(record) => record,
            Err(skip) => {
                observer.skipped(line, &skip);
                continue;
            }
        };

        match record {
            Record::Tick { outcome, count } => registry.merge_tick(outcome, count),
            Record::General(metric) => {
                registry.merge(&metric, |label| {
                    observer.skipped(
                        line,
                        &Skip::NonNumericValue {
                            title: metric.title.clone(),
                            label: label.to_string(),
                        },
                    );
                });
            }
        }
    }

    registry.finalize()
}

/// The outcome of aggregating one source, shaped for display.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AggregationResult {
    /// Summary chart first, if present, then general charts in first-seen
    /// order. Empty when the source could not be read.
    pub charts: Vec<Chart>,
    /// Empty unless the source could not be read.
    pub error_msg: String,
    /// The source identifier as requested.
    pub source: String,
    /// Sum of every value of every general chart.
    pub total: i64,
}

impl AggregationResult {
    /// Result of a run that read its source.
    #[must_use]
    pub fn completed(source: impl Into<String>, finalized: Finalized) -> Self {
        let total = finalized.total;
        Self {
            charts: finalized.into_charts(),
            error_msg: String::new(),
            source: source.into(),
            total,
        }
    }

    /// Result of a run that could not read its source.
    #[must_use]
    pub fn failed(source: impl Into<String>, error: &Error) -> Self {
        Self {
            charts: Vec::new(),
            error_msg: error.to_string(),
            source: source.into(),
            total: 0,
        }
    }

    /// Build the result from the outcome of reading `source`.
    pub fn from_read<O>(source: &str, read: io::Result<Vec<u8>>, observer: O) -> Self
    where
        O: Observer,
    {
        match read {
            Ok(content) => Self::completed(source, aggregate(&content, observer)),
            Err(err) => Self::failed(
                source,
                &Error::SourceUnavailable {
                    id: source.to_string(),
                    source: err,
                },
            ),
        }
    }

    /// Whether the source could not be read.
    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.error_msg.is_empty()
    }
}

/// Read the file at `path` and aggregate it.
///
/// # Errors
///
/// Returns [`Error::SourceUnavailable`] if the file cannot be read.
pub fn aggregate_path<O>(path: &Path, observer: O) -> Result<Finalized, Error>
where
    O: Observer,
{
    let content = std::fs::read(path).map_err(|source| Error::SourceUnavailable {
        id: path.display().to_string(),
        source,
    })?;
    Ok(aggregate(&content, observer))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use proptest::prelude::*;

    use super::*;
    use crate::{observer::SkipCounts, record::SUMMARY_TITLE};

    #[test]
    fn single_line_sorted_numerically() {
        let finalized = aggregate(br#"{"title":"foo","pointSet":{"10":1,"2":3}}"#, ());
        assert!(finalized.summary.is_none());
        assert_eq!(finalized.charts.len(), 1);
        let chart = &finalized.charts[0];
        assert_eq!(chart.id, 1);
        assert_eq!(chart.title, "foo");
        assert_eq!(chart.labels(), ["2", "10"]);
        assert_eq!(chart.values(), [3, 1]);
        assert_eq!(finalized.total, 4);
    }

    #[test]
    fn repeated_label_is_additive() {
        let content = b"{\"title\":\"foo\",\"pointSet\":{\"5\":2}}\n{\"title\":\"foo\",\"pointSet\":{\"5\":3}}\n";
        let finalized = aggregate(content, ());
        assert_eq!(finalized.charts.len(), 1);
        assert_eq!(finalized.charts[0].labels(), ["5"]);
        assert_eq!(finalized.charts[0].values(), [5]);
    }

    #[test]
    fn tick_outcomes_fill_summary() {
        let content = b"{\"title\":\"tickOnTime\",\"count\":4}\n{\"title\":\"tickIntervalOverrun\",\"count\":1}";
        let charts = aggregate(content, ()).into_charts();
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].id, 0);
        assert_eq!(charts[0].title, SUMMARY_TITLE);
        assert_eq!(charts[0].labels(), ["tickOnTime", "tickIntervalOverrun", ""]);
        assert_eq!(charts[0].values(), [4, 1, 0]);
    }

    #[test]
    fn invalid_lines_are_absorbed() {
        let content = b"{\"title\":\"foo\",\"pointSet\":{\"1\":7}}\n{not json\n";
        let mut counts = SkipCounts::default();
        let finalized = aggregate(content, &mut counts);
        assert_eq!(finalized.charts.len(), 1);
        assert_eq!(finalized.total, 7);
        // The broken line and the empty trailing segment.
        assert_eq!(counts.line_decode, 2);
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn every_skip_kind_is_reported() {
        let content = concat!(
            "{\"pointSet\":{\"1\":1}}\n",
            "{\"title\":\"foo\"}\n",
            "{\"title\":\"tickOnTime\"}\n",
            "{\"title\":\"foo\",\"pointSet\":{\"1\":\"x\",\"2\":2}}",
        );
        let mut counts = SkipCounts::default();
        let finalized = aggregate(content.as_bytes(), &mut counts);
        assert_eq!(counts.schema_mismatch, 2);
        assert_eq!(counts.value_coercion, 2);
        assert_eq!(counts.line_decode, 0);
        assert!(finalized.summary.is_none());
        assert_eq!(finalized.charts[0].labels(), ["2"]);
    }

    #[test]
    fn unreadable_source_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.jsonl");
        let err = aggregate_path(&missing, ()).expect_err("file does not exist");
        assert!(matches!(err, Error::SourceUnavailable { .. }));

        let source = missing.display().to_string();
        let result = AggregationResult::from_read(&source, std::fs::read(&missing), ());
        assert!(result.is_error());
        assert!(result.charts.is_empty());
        assert_eq!(result.source, source);
        assert_eq!(result.total, 0);
    }

    #[test]
    fn reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, r#"{{"title":"tickInterval","pointSet":{{"16":10,"17":2}}}}"#)
            .expect("write");
        writeln!(file, r#"{{"title":"tickOnTime","count":10}}"#).expect("write");

        let finalized = aggregate_path(file.path(), ()).expect("readable");
        let result = AggregationResult::completed("capture", finalized);
        assert!(!result.is_error());
        assert_eq!(result.charts.len(), 2);
        assert_eq!(result.charts[1].title, "tickInterval");
        assert_eq!(result.total, 12);
    }

    proptest! {
        #[test]
        fn total_is_independent_of_line_order(
            lines in prop::collection::vec(
                (
                    prop::sample::select(vec!["a", "b", "c"]),
                    prop::collection::hash_map(0u32..20, -100i64..100, 0..5),
                ),
                0..30,
            ),
            seed in any::<u64>(),
        ) {
            let render = |lines: &[(&str, std::collections::HashMap<u32, i64>)]| {
                lines
                    .iter()
                    .map(|(title, points)| {
                        serde_json::json!({"title": title, "pointSet": points}).to_string()
                    })
                    .collect::<Vec<String>>()
                    .join("\n")
            };

            let forward = aggregate(render(&lines).as_bytes(), ());

            let mut shuffled = lines.clone();
            let len = shuffled.len();
            if len > 1 {
                shuffled.rotate_left(usize::try_from(seed % len as u64).unwrap_or(0));
                shuffled.reverse();
            }
            let backward = aggregate(render(&shuffled).as_bytes(), ());

            prop_assert_eq!(forward.total, backward.total);
            let expected: i64 = lines.iter().flat_map(|(_, p)| p.values()).sum();
            prop_assert_eq!(forward.total, expected);
            for chart in &forward.charts {
                prop_assert_eq!(chart.labels().len(), chart.values().len());
            }
        }
    }
}
