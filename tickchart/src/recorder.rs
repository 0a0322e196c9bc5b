//! The tick recorder.
//!
//! Runs a [`Ticker`] against real time and writes the resulting tick log to
//! a file. Useful both to produce sample logs for the viewer and to measure
//! how well this host keeps a fixed tick rate.

use std::{io, path::Path};

use serde::{Deserialize, Serialize};
use tickchart_capture::{
    ticker::Ticker,
    writer::{self, Writer},
};
use tokio::{
    fs::File,
    io::AsyncWriteExt,
    time::{Duration, Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

fn default_rate_milliseconds() -> f64 {
    16.0
}

fn default_report_interval_milliseconds() -> u64 {
    writer::DEFAULT_REPORT_INTERVAL_MS
}

/// Errors produced by [`run`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapper for [`std::io::Error`].
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Wrapper for [`tickchart_capture::writer::Error`].
    #[error(transparent)]
    Writer(#[from] writer::Error),
    /// The configured rate is not a positive, finite number of milliseconds.
    #[error("Tick rate must be positive, got {0}")]
    InvalidRate(f64),
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
/// Configuration for the recorder
pub struct Config {
    /// milliseconds between scheduled ticks, fractions allowed
    #[serde(default = "default_rate_milliseconds")]
    pub rate_milliseconds: f64,
    /// milliseconds between flushes of the tick log
    #[serde(default = "default_report_interval_milliseconds")]
    pub report_interval_milliseconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rate_milliseconds: default_rate_milliseconds(),
            report_interval_milliseconds: default_report_interval_milliseconds(),
        }
    }
}

/// Record ticks into the file at `path` until `ticks` ticks have been taken
/// or `shutdown` is cancelled. Returns the number of ticks taken.
///
/// Lines are produced in memory and appended to the file asynchronously
/// after each tick that flushed.
///
/// # Errors
///
/// Returns an error if the rate is invalid or the tick log cannot be written.
pub async fn run(
    path: &Path,
    config: &Config,
    ticks: Option<u64>,
    shutdown: CancellationToken,
) -> Result<u64, Error> {
    if !(config.rate_milliseconds.is_finite() && config.rate_milliseconds > 0.0) {
        return Err(Error::InvalidRate(config.rate_milliseconds));
    }

    let mut file = File::create(path).await?;
    let mut writer = Writer::new(Vec::new(), config.report_interval_milliseconds);
    let mut ticker = Ticker::new(config.rate_milliseconds);
    let start = Instant::from_std(ticker.clock().start());
    info!(
        "recording ticks every {rate}ms to {path}",
        rate = config.rate_milliseconds,
        path = path.display()
    );

    let mut taken = 0u64;
    let mut deadline = None;
    while ticks.is_none_or(|limit| taken < limit) {
        if let Some(deadline) = deadline {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    info!("shutdown signal received");
                    break;
                }
                () = sleep_until(start + Duration::from_millis(deadline)) => {}
            }
        }

        deadline = Some(ticker.tick(&mut writer)?);
        taken += 1;

        let written = std::mem::take(writer.sink_mut());
        if !written.is_empty() {
            file.write_all(&written).await?;
        }
    }

    file.write_all(&writer.drain()?).await?;
    file.flush().await?;
    info!("recorded {taken} ticks");
    Ok(taken)
}
