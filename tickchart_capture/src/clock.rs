//! Time sources for the producing side of tick logs

use std::time::Instant;

/// The `Clock` used by [`crate::ticker::Ticker`] and [`crate::writer::Writer`].
pub trait Clock {
    /// Milliseconds elapsed since this clock's origin.
    fn now_ms(&self) -> u64;
}

impl<C> Clock for &C
where
    C: Clock + ?Sized,
{
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

#[derive(Debug, Clone, Copy)]
/// A clock that operates with respect to real-clock time.
pub struct RealClock {
    start: Instant,
}

impl Default for RealClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl RealClock {
    /// The instant this clock counts from.
    #[must_use]
    pub fn start(&self) -> Instant {
        self.start
    }
}

impl Clock for RealClock {
    /// Return the number of milliseconds since `RealClock` was created.
    ///
    /// # Panics
    ///
    /// Function will panic if the number of milliseconds elapsed is greater
    /// than `u64::MAX`.
    #[allow(clippy::cast_possible_truncation)]
    fn now_ms(&self) -> u64 {
        let millis: u128 = self.start.elapsed().as_millis();
        assert!(
            millis <= u128::from(u64::MAX),
            "584,554,049 years elapsed since clock creation!"
        );
        millis as u64
    }
}
