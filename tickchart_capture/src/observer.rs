//! Diagnostics for an aggregation run
//!
//! Aggregation never fails because of a single bad line. Instead every
//! dropped line, and every dropped value within a line, is reported to an
//! [`Observer`] supplied by the caller. What the caller does with that is up
//! to them: [`LogObserver`] logs, [`SkipCounts`] tallies, `()` ignores.

use tracing::debug;

/// Reasons a line, or a single value of a line, was left out of the
/// aggregation.
#[derive(thiserror::Error, Debug)]
pub enum Skip {
    /// The line is not a JSON object.
    #[error("line is not a JSON object: {0}")]
    Decode(#[from] serde_json::Error),
    /// The line has no string `title`.
    #[error("line has no string title")]
    MissingTitle,
    /// A general line whose `pointSet` is absent or not an object.
    #[error("line titled {title:?} has no pointSet object")]
    MissingPointSet {
        /// Title of the offending line
        title: String,
    },
    /// A tick outcome line whose `count` is absent or not a number.
    #[error("tick outcome {title:?} has no numeric count")]
    NonNumericCount {
        /// Title of the offending line
        title: String,
    },
    /// A `pointSet` entry whose value is not a number. Only this entry is
    /// dropped, the rest of the line is merged.
    #[error("value for label {label:?} of {title:?} is not a number")]
    NonNumericValue {
        /// Title of the line holding the value
        title: String,
        /// Label of the dropped entry
        label: String,
    },
}

/// The category of a [`Skip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipKind {
    /// The line could not be decoded at all.
    LineDecode,
    /// The line decoded but lacks a field its role requires.
    SchemaMismatch,
    /// A value that should be numeric is not.
    ValueCoercion,
}

impl Skip {
    /// Categorize this skip.
    #[must_use]
    pub fn kind(&self) -> SkipKind {
        match self {
            Skip::Decode(_) => SkipKind::LineDecode,
            Skip::MissingTitle | Skip::MissingPointSet { .. } => SkipKind::SchemaMismatch,
            Skip::NonNumericCount { .. } | Skip::NonNumericValue { .. } => SkipKind::ValueCoercion,
        }
    }
}

/// Receiver of aggregation diagnostics.
pub trait Observer {
    /// Called once per dropped line or dropped value. `line` is 1-based.
    fn skipped(&mut self, line: usize, skip: &Skip);
}

impl Observer for () {
    fn skipped(&mut self, _line: usize, _skip: &Skip) {}
}

impl<O> Observer for &mut O
where
    O: Observer + ?Sized,
{
    fn skipped(&mut self, line: usize, skip: &Skip) {
        (**self).skipped(line, skip);
    }
}

impl<A, B> Observer for (A, B)
where
    A: Observer,
    B: Observer,
{
    fn skipped(&mut self, line: usize, skip: &Skip) {
        self.0.skipped(line, skip);
        self.1.skipped(line, skip);
    }
}

/// An [`Observer`] that logs every skip at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn skipped(&mut self, line: usize, skip: &Skip) {
        debug!("skipping line {line}: {skip}");
    }
}

/// An [`Observer`] that counts skips by [`SkipKind`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkipCounts {
    /// Lines that were not JSON objects
    pub line_decode: u64,
    /// Lines missing a required field
    pub schema_mismatch: u64,
    /// Counts or values that were not numbers
    pub value_coercion: u64,
}

impl SkipCounts {
    /// Total number of skips recorded.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.line_decode + self.schema_mismatch + self.value_coercion
    }
}

impl Observer for SkipCounts {
    fn skipped(&mut self, _line: usize, skip: &Skip) {
        match skip.kind() {
            SkipKind::LineDecode => self.line_decode += 1,
            SkipKind::SchemaMismatch => self.schema_mismatch += 1,
            SkipKind::ValueCoercion => self.value_coercion += 1,
        }
    }
}
