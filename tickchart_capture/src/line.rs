//! Splitting of raw tick log content into decoded JSON objects
//!
//! Content is split on the newline byte and every segment is decoded on its
//! own. A segment that is not a JSON object yields an error for that line
//! only; iteration always continues with the next segment. This module does
//! no semantic validation, see [`crate::record`] for that.

use serde_json::{Map, Value};

/// A decoded line: a string-keyed map of arbitrary JSON values.
pub type Object = Map<String, Value>;

/// Lazy iterator over the lines of a tick log.
///
/// Yields `(line_number, result)` pairs, `line_number` being 1-based. An
/// empty trailing segment -- the consequence of a final newline -- is yielded
/// like any other and fails to decode.
#[derive(Debug)]
pub struct Lines<'a> {
    segments: std::slice::Split<'a, u8, fn(&u8) -> bool>,
    line_number: usize,
}

fn is_newline(byte: &u8) -> bool {
    *byte == b'\n'
}

impl<'a> Lines<'a> {
    /// Create a new [`Lines`] over `content`.
    #[must_use]
    pub fn new(content: &'a [u8]) -> Self {
        Self {
            segments: content.split(is_newline as fn(&u8) -> bool),
            line_number: 0,
        }
    }
}

impl Iterator for Lines<'_> {
    type Item = (usize, Result<Object, serde_json::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.segments.next()?;
        self.line_number += 1;
        Some((self.line_number, serde_json::from_slice::<Object>(segment)))
    }
}
