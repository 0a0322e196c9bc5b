//! Crate regarding tick log files
//!
//! A tick log is newline delimited JSON. Every line is either a point set --
//! a histogram-like map of label to value recorded under a `title` -- or a
//! tick outcome count. This crate owns both ends of that format: the
//! [`writer`] and [`ticker`] that produce it and the [`aggregate`] pipeline
//! that folds a log back into [`chart::Chart`] instances for display.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]

pub mod aggregate;
pub mod chart;
pub mod clock;
pub mod line;
pub mod observer;
pub mod record;
pub mod registry;
pub mod ticker;
pub mod writer;
