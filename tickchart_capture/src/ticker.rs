//! Fixed-rate tick scheduling with interval accounting
//!
//! A [`Ticker`] hands out deadlines `rate` milliseconds apart and, on every
//! tick after the first, records how long it actually was since the previous
//! tick. The observed interval goes to the `tickInterval` point set, its
//! [`TickOutcome`] to the matching reserved counter.

use std::io;

use crate::{
    clock::{Clock, RealClock},
    record::TickOutcome,
    writer::{self, Writer},
};

/// Title under which observed tick intervals are written.
pub const INTERVAL_TITLE: &str = "tickInterval";

/// Schedules ticks at a fixed rate and accounts for their timeliness.
#[derive(Debug)]
pub struct Ticker<C = RealClock> {
    clock: C,
    rate_ms: f64,
    next: f64,
    previous: Option<u64>,
}

impl Ticker<RealClock> {
    /// Create a new [`Ticker`] with a real-time clock.
    #[must_use]
    pub fn new(rate_ms: f64) -> Self {
        Self::with_clock(RealClock::default(), rate_ms)
    }
}

impl<C> Ticker<C>
where
    C: Clock,
{
    /// Create a new [`Ticker`] with the given clock. The first deadline is
    /// one rate after the clock's current time.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn with_clock(clock: C, rate_ms: f64) -> Self {
        let next = clock.now_ms() as f64 + rate_ms;
        Self {
            clock,
            rate_ms,
            next,
            previous: None,
        }
    }

    /// The clock this ticker reads.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Take one tick.
    ///
    /// Unless this is the first tick, the interval since the previous tick is
    /// written to `writer` along with its outcome. Returns the deadline for
    /// the caller to wait until, in whole clock milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn tick<W, WC>(&mut self, writer: &mut Writer<W, WC>) -> Result<u64, writer::Error>
    where
        W: io::Write,
        WC: Clock,
    {
        let now = self.clock.now_ms();
        if let Some(previous) = self.previous {
            let interval = now.saturating_sub(previous);
            writer.write(INTERVAL_TITLE, interval)?;
            writer.count(TickOutcome::classify(interval, self.rate_ms).title())?;
        }

        let deadline = self.next.floor().max(0.0) as u64;
        self.next += self.rate_ms;
        self.previous = Some(now);
        Ok(deadline)
    }
}
