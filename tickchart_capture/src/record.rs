//! Classification of decoded lines into records
//!
//! A decoded line is either a [`GeneralMetric`] feeding the chart named by
//! its title, or a tick outcome count feeding the fixed summary chart. The
//! three reserved titles are known only to [`TickOutcome`]; nothing else in
//! this crate compares titles against them.

use serde_json::{Map, Value};

use crate::{line::Object, observer::Skip};

/// Title of the chart that summarizes tick outcomes.
pub const SUMMARY_TITLE: &str = "Tick Classification";

/// Key of the record field holding the chart title.
pub const TITLE_KEY: &str = "title";
/// Key of the record field holding the label/value map.
pub const POINT_SET_KEY: &str = "pointSet";
/// Key of the record field holding a tick outcome count.
pub const COUNT_KEY: &str = "count";

/// The outcome of a single tick relative to its scheduled rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickOutcome {
    /// The tick arrived within a millisecond of schedule.
    OnTime,
    /// The interval since the previous tick was longer than the rate.
    IntervalOverrun,
    /// The interval since the previous tick was shorter than the rate.
    IntervalUnderrun,
}

impl TickOutcome {
    /// Every outcome, in summary chart slot order.
    pub const ALL: [TickOutcome; 3] = [
        TickOutcome::OnTime,
        TickOutcome::IntervalOverrun,
        TickOutcome::IntervalUnderrun,
    ];

    /// The reserved title this outcome is logged under.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            TickOutcome::OnTime => "tickOnTime",
            TickOutcome::IntervalOverrun => "tickIntervalOverrun",
            TickOutcome::IntervalUnderrun => "tickIntervalUnderrun",
        }
    }

    /// The fixed position of this outcome in the summary chart.
    #[must_use]
    pub const fn slot(self) -> usize {
        match self {
            TickOutcome::OnTime => 0,
            TickOutcome::IntervalOverrun => 1,
            TickOutcome::IntervalUnderrun => 2,
        }
    }

    /// Map a title to its outcome, `None` if the title is not reserved.
    #[must_use]
    pub fn from_title(title: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|outcome| outcome.title() == title)
    }

    /// Classify an observed tick interval against the expected rate, both in
    /// milliseconds.
    ///
    /// An interval more than a millisecond over the rate is an overrun, one
    /// under `floor(rate - 1)` is an underrun.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn classify(interval_ms: u64, rate_ms: f64) -> Self {
        let interval = interval_ms as f64;
        if interval > rate_ms + 1.0 {
            TickOutcome::IntervalOverrun
        } else if interval < (rate_ms - 1.0).floor() {
            TickOutcome::IntervalUnderrun
        } else {
            TickOutcome::OnTime
        }
    }
}

/// A line feeding a general, title-keyed chart.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralMetric {
    /// The chart this line feeds.
    pub title: String,
    /// Label to value map. Values are unvalidated JSON, see
    /// [`crate::chart::Chart::add_line`].
    pub point_set: Map<String, Value>,
}

/// A classified line.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A point set for a general chart.
    General(GeneralMetric),
    /// A count for one summary chart slot.
    Tick {
        /// Which slot the count feeds
        outcome: TickOutcome,
        /// The count, truncated toward zero
        count: i64,
    },
}

/// Interpret a JSON value as an integer, truncating toward zero. `None` if
/// the value is not a number.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn coerce(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float as i64)),
        _ => None,
    }
}

impl Record {
    /// Classify a decoded line.
    ///
    /// # Errors
    ///
    /// Returns the reason the whole line must be dropped: no string `title`,
    /// a reserved title without a numeric `count`, or any other title without
    /// a `pointSet` object.
    pub fn classify(mut object: Object) -> Result<Self, Skip> {
        let title = match object.remove(TITLE_KEY) {
            Some(Value::String(title)) => title,
            _ => return Err(Skip::MissingTitle),
        };

        if let Some(outcome) = TickOutcome::from_title(&title) {
            return match object.get(COUNT_KEY).and_then(coerce) {
                Some(count) => Ok(Record::Tick { outcome, count }),
                None => Err(Skip::NonNumericCount { title }),
            };
        }

        match object.remove(POINT_SET_KEY) {
            Some(Value::Object(point_set)) => Ok(Record::General(GeneralMetric { title, point_set })),
            _ => Err(Skip::MissingPointSet { title }),
        }
    }
}
