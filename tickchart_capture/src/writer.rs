//! Periodic writer of tick log lines
//!
//! The [`Writer`] buffers raw observations and counters in memory and, once
//! per report interval, condenses them into tick log lines:
//!
//! * every title with observations becomes one point set line mapping each
//!   observed value to the number of times it was seen, and
//! * every counter becomes one count line.
//!
//! Both buffers are cleared after a flush, so each line covers exactly one
//! report interval. Readers sum the lines back together, see
//! [`crate::aggregate`].

use std::{collections::BTreeMap, io};

use serde::Serialize;
use tracing::trace;

use crate::clock::{Clock, RealClock};

/// Default milliseconds between flushes.
pub const DEFAULT_REPORT_INTERVAL_MS: u64 = 1_000;

/// Errors produced by [`Writer`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapper for [`std::io::Error`].
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Wrapper for [`serde_json::Error`].
    #[error("Failed to serialize line: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct PointSetLine<'a> {
    title: &'a str,
    #[serde(rename = "pointSet")]
    point_set: BTreeMap<u64, u64>,
}

#[derive(Serialize)]
struct CountLine<'a> {
    title: &'a str,
    count: u64,
}

/// Buffers observations and writes them out as tick log lines.
#[derive(Debug)]
pub struct Writer<W, C = RealClock> {
    sink: W,
    clock: C,
    report_interval_ms: u64,
    points: BTreeMap<String, Vec<u64>>,
    counters: BTreeMap<String, u64>,
    last_flush: Option<u64>,
}

impl<W> Writer<W, RealClock>
where
    W: io::Write,
{
    /// Create a new [`Writer`] with a real-time clock.
    #[must_use]
    pub fn new(sink: W, report_interval_ms: u64) -> Self {
        Self::with_clock(sink, RealClock::default(), report_interval_ms)
    }
}

impl<W, C> Writer<W, C>
where
    W: io::Write,
    C: Clock,
{
    /// Create a new [`Writer`] with the given clock.
    #[must_use]
    pub fn with_clock(sink: W, clock: C, report_interval_ms: u64) -> Self {
        Self {
            sink,
            clock,
            report_interval_ms,
            points: BTreeMap::new(),
            counters: BTreeMap::new(),
            last_flush: None,
        }
    }

    /// Record one observation of `value` under `title`.
    ///
    /// # Errors
    ///
    /// Returns an error if this call triggers a flush and the flush fails.
    pub fn write(&mut self, title: &str, value: u64) -> Result<(), Error> {
        self.points.entry(title.to_string()).or_default().push(value);
        self.flush_if_due()
    }

    /// Increment the counter for `title`.
    ///
    /// # Errors
    ///
    /// Returns an error if this call triggers a flush and the flush fails.
    pub fn count(&mut self, title: &str) -> Result<(), Error> {
        *self.counters.entry(title.to_string()).or_default() += 1;
        self.flush_if_due()
    }

    fn flush_if_due(&mut self) -> Result<(), Error> {
        let now = self.clock.now_ms();
        let last = *self.last_flush.get_or_insert(now);
        if last.saturating_add(self.report_interval_ms) > now {
            return Ok(());
        }
        self.flush()
    }

    /// Write every buffered observation and counter, regardless of when the
    /// previous flush happened, and restart the report interval.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing to the sink fails.
    pub fn flush(&mut self) -> Result<(), Error> {
        let points = std::mem::take(&mut self.points);
        for (title, observations) in &points {
            let mut point_set: BTreeMap<u64, u64> = BTreeMap::new();
            for value in observations {
                *point_set.entry(*value).or_default() += 1;
            }
            self.emit(&PointSetLine { title, point_set })?;
        }

        let counters = std::mem::take(&mut self.counters);
        for (title, count) in &counters {
            self.emit(&CountLine {
                title,
                count: *count,
            })?;
        }

        trace!(
            "flushed {points} point sets and {counters} counters",
            points = points.len(),
            counters = counters.len()
        );
        self.sink.flush()?;
        self.last_flush = Some(self.clock.now_ms());
        Ok(())
    }

    fn emit<T>(&mut self, line: &T) -> Result<(), Error>
    where
        T: Serialize,
    {
        serde_json::to_writer(&mut self.sink, line)?;
        self.sink.write_all(b"\n")?;
        Ok(())
    }

    /// The sink lines are written to. Taking what has been written so far
    /// out of an in-memory sink lets a caller move it on asynchronously.
    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Flush anything buffered and return the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn drain(mut self) -> Result<W, Error> {
        self.flush()?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregate::aggregate, clock::test::ManualClock};

    fn lines(bytes: &[u8]) -> Vec<String> {
        String::from_utf8(bytes.to_vec())
            .expect("utf8")
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn nothing_written_before_interval() {
        let clock = ManualClock::default();
        let mut writer = Writer::with_clock(Vec::new(), &clock, 1_000);
        writer.write("tickInterval", 16).expect("write");
        clock.advance(999);
        writer.count("tickOnTime").expect("count");
        assert!(writer.sink.is_empty());
    }

    #[test]
    fn flush_condenses_observations() {
        let clock = ManualClock::default();
        let mut writer = Writer::with_clock(Vec::new(), &clock, 1_000);
        writer.write("tickInterval", 16).expect("write");
        writer.write("tickInterval", 17).expect("write");
        writer.write("tickInterval", 16).expect("write");
        writer.count("tickOnTime").expect("count");
        clock.advance(1_000);
        writer.count("tickOnTime").expect("count");

        assert_eq!(
            lines(&writer.sink),
            vec![
                r#"{"title":"tickInterval","pointSet":{"16":2,"17":1}}"#.to_string(),
                r#"{"title":"tickOnTime","count":2}"#.to_string(),
            ]
        );
    }

    #[test]
    fn buffers_clear_between_intervals() {
        let clock = ManualClock::default();
        let mut writer = Writer::with_clock(Vec::new(), &clock, 100);
        writer.count("tickOnTime").expect("count");
        clock.set(100);
        writer.count("tickOnTime").expect("count");
        clock.set(150);
        writer.count("tickIntervalOverrun").expect("count");
        let sink = writer.drain().expect("drain");

        assert_eq!(
            lines(&sink),
            vec![
                r#"{"title":"tickOnTime","count":2}"#.to_string(),
                r#"{"title":"tickIntervalOverrun","count":1}"#.to_string(),
            ]
        );
    }

    #[test]
    fn sink_can_be_emptied_between_flushes() {
        let clock = ManualClock::default();
        let mut writer = Writer::with_clock(Vec::new(), &clock, 10);
        writer.count("tickOnTime").expect("count");
        clock.set(10);
        writer.count("tickOnTime").expect("count");

        let first = std::mem::take(writer.sink_mut());
        assert_eq!(lines(&first), vec![r#"{"title":"tickOnTime","count":2}"#.to_string()]);

        writer.count("tickIntervalOverrun").expect("count");
        let rest = writer.drain().expect("drain");
        assert_eq!(
            lines(&rest),
            vec![r#"{"title":"tickIntervalOverrun","count":1}"#.to_string()]
        );
    }

    #[test]
    fn written_log_aggregates_back() {
        let clock = ManualClock::default();
        let mut writer = Writer::with_clock(Vec::new(), &clock, 10);
        for (step, interval) in [16u64, 16, 20, 16, 12, 17].into_iter().enumerate() {
            clock.set(step as u64 * 6);
            writer.write("tickInterval", interval).expect("write");
        }
        let sink = writer.drain().expect("drain");

        let finalized = aggregate(&sink, ());
        assert_eq!(finalized.charts.len(), 1);
        let chart = &finalized.charts[0];
        assert_eq!(chart.labels(), ["12", "16", "17", "20"]);
        assert_eq!(chart.values(), [1, 3, 1, 1]);
        assert_eq!(finalized.total, 6);
    }
}
