//! A single chart: one metric's labels and their accumulated values
//!
//! Labels and values are kept as two parallel sequences, which is the shape
//! charting front-ends consume. A side index maps each label to its position
//! so merges do not scan.
//!
//! # Invariants
//!
//! * `labels.len() == values.len()` at all times.
//! * No label appears twice.
//! * A value changes only by addition. [`Chart::sort_labels`] is the single
//!   exception and it only permutes.

use std::num::IntErrorKind;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::record::{GeneralMetric, coerce};

/// One metric's accumulated series.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Chart {
    /// 0 for the tick summary, first-seen order from 1 otherwise.
    pub id: u32,
    /// The grouping key.
    pub title: String,
    labels: Vec<String>,
    values: Vec<i64>,
    #[serde(skip)]
    positions: FxHashMap<String, usize>,
}

impl Chart {
    /// Create an empty chart.
    #[must_use]
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            labels: Vec::new(),
            values: Vec::new(),
            positions: FxHashMap::default(),
        }
    }

    /// The labels, positionally paired with [`Chart::values`].
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The values, positionally paired with [`Chart::labels`].
    #[must_use]
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Number of label/value slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the chart holds no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The value accumulated under `label`, if any.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<i64> {
        self.positions.get(label).map(|&idx| self.values[idx])
    }

    /// Sum of every value, saturating.
    #[must_use]
    pub fn sum(&self) -> i64 {
        self.values.iter().fold(0i64, |acc, v| acc.saturating_add(*v))
    }

    /// Add `value` under `label`, appending the label if it is new.
    pub fn add(&mut self, label: &str, value: i64) {
        if let Some(&idx) = self.positions.get(label) {
            self.values[idx] = self.values[idx].saturating_add(value);
        } else {
            self.positions.insert(label.to_string(), self.labels.len());
            self.labels.push(label.to_string());
            self.values.push(value);
        }
    }

    /// Merge a general metric line into this chart.
    ///
    /// Every numeric entry of the point set is added under its label. Entries
    /// whose value is not a number are passed to `on_reject` and otherwise
    /// ignored. A line titled for some other chart is not merged at all.
    pub fn add_line<F>(&mut self, metric: &GeneralMetric, mut on_reject: F)
    where
        F: FnMut(&str),
    {
        if metric.title != self.title {
            return;
        }

        for (label, value) in &metric.point_set {
            match coerce(value) {
                Some(value) => self.add(label, value),
                None => on_reject(label),
            }
        }
    }

    /// Add `value` into the fixed slot `idx`, labelling that slot `title`.
    ///
    /// Slots up to `idx` that do not exist yet are created with an empty
    /// label and a zero value.
    pub fn add_point(&mut self, idx: usize, title: &str, value: i64) {
        self.pad_to(idx + 1);
        if self.labels[idx] != title {
            if self.positions.get(&self.labels[idx]) == Some(&idx) {
                self.positions.remove(&self.labels[idx]);
            }
            title.clone_into(&mut self.labels[idx]);
            self.positions.insert(title.to_string(), idx);
        }
        self.values[idx] = self.values[idx].saturating_add(value);
    }

    /// Grow to at least `len` slots with empty labels and zero values.
    pub(crate) fn pad_to(&mut self, len: usize) {
        while self.labels.len() < len {
            self.labels.push(String::new());
            self.values.push(0);
        }
    }

    /// Reorder labels by their numeric interpretation, ascending, carrying
    /// each value along with its label. Labels of equal rank keep their
    /// relative order. See [`label_rank`].
    ///
    /// # Panics
    ///
    /// Panics if labels and values have diverged in length, which the
    /// methods of this type never allow.
    pub fn sort_labels(&mut self) {
        assert_eq!(
            self.labels.len(),
            self.values.len(),
            "chart {title:?} labels and values diverged",
            title = self.title
        );

        let mut order: Vec<usize> = (0..self.labels.len()).collect();
        order.sort_by_key(|&idx| label_rank(&self.labels[idx]));

        let mut labels = std::mem::take(&mut self.labels);
        let values = std::mem::take(&mut self.values);
        self.labels = order.iter().map(|&idx| std::mem::take(&mut labels[idx])).collect();
        self.values = order.iter().map(|&idx| values[idx]).collect();

        self.positions.clear();
        for (idx, label) in self.labels.iter().enumerate() {
            self.positions.entry(label.clone()).or_insert(idx);
        }
    }
}

/// The numeric interpretation of a label used for sorting.
///
/// A label that parses as a base-10 integer ranks as that integer, clamped
/// to the `i64` range. Every other label ranks as `0`.
#[must_use]
pub fn label_rank(label: &str) -> i64 {
    match label.parse::<i64>() {
        Ok(rank) => rank,
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            IntErrorKind::NegOverflow => i64::MIN,
            _ => 0,
        },
    }
}
