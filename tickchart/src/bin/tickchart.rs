//! Command line entry point for tickchart.
//!
//! `summarize` aggregates a tick log and prints it, `serve` runs the chart
//! viewer and `record` produces a tick log from a real ticker.

#![allow(clippy::print_stdout)]

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tickchart::{
    config::{self, Config, Telemetry},
    recorder, server, summary,
};
use tickchart_capture::{
    aggregate::{self, AggregationResult, aggregate_path},
    observer::{LogObserver, SkipCounts},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Aggregate(#[from] aggregate::Error),
    #[error(transparent)]
    Server(#[from] server::Error),
    #[error(transparent)]
    Recorder(#[from] recorder::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Fmt(#[from] std::fmt::Error),
    #[error("Failed to install prometheus exporter: {0}")]
    Prometheus(#[from] BuildError),
}

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// path on disk to the YAML configuration file
    #[clap(long)]
    config_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate a tick log and print the charts
    Summarize {
        /// path on disk to the tick log
        path: PathBuf,
        /// print the aggregation result as JSON
        #[clap(long)]
        json: bool,
    },
    /// Serve the chart viewer over HTTP until interrupted
    Serve {
        /// address -- IP plus port -- to bind to, overrides configuration
        #[clap(long)]
        binding_addr: Option<SocketAddr>,
    },
    /// Run a ticker and record its tick log
    Record {
        /// path on disk to write the tick log to
        #[clap(long)]
        output: PathBuf,
        /// stop after this many ticks, run until interrupted otherwise
        #[clap(long)]
        ticks: Option<u64>,
        /// milliseconds between ticks, overrides configuration
        #[clap(long)]
        rate_milliseconds: Option<f64>,
        /// milliseconds between flushes, overrides configuration
        #[clap(long)]
        report_interval_milliseconds: Option<u64>,
    },
}

fn install_telemetry(telemetry: Option<Telemetry>) -> Result<(), Error> {
    if let Some(Telemetry::Prometheus { prometheus_addr }) = telemetry {
        PrometheusBuilder::new()
            .with_http_listener(prometheus_addr)
            .install()?;
        info!("prometheus exporter listening on {prometheus_addr}");
    }
    Ok(())
}

/// Cancel the returned token on ctrl-c.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("received ctrl-c"),
            Err(e) => error!("Failed to listen for ctrl-c: {e}"),
        }
        token.cancel();
    });
    shutdown
}

fn summarize(path: &Path, json: bool) -> Result<(), Error> {
    let mut skips = SkipCounts::default();
    let finalized = aggregate_path(path, (LogObserver, &mut skips))?;
    let result = AggregationResult::completed(path.display().to_string(), finalized);
    if skips.total() > 0 {
        info!(
            "skipped {count} entries in {path}",
            count = skips.total(),
            path = path.display()
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", summary::render(&result, &skips)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .finish()
        .init();

    let args = Args::parse();
    let mut config = match &args.config_path {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    match args.command {
        Command::Summarize { path, json } => summarize(&path, json)?,
        Command::Serve { binding_addr } => {
            if let Some(addr) = binding_addr {
                config.server.binding_addr = addr;
            }
            install_telemetry(config.telemetry)?;
            let shutdown = shutdown_on_ctrl_c();
            server::Viewer::new(&config.server, shutdown).run().await?;
        }
        Command::Record {
            output,
            ticks,
            rate_milliseconds,
            report_interval_milliseconds,
        } => {
            if let Some(rate) = rate_milliseconds {
                config.recorder.rate_milliseconds = rate;
            }
            if let Some(interval) = report_interval_milliseconds {
                config.recorder.report_interval_milliseconds = interval;
            }
            install_telemetry(config.telemetry)?;
            let shutdown = shutdown_on_ctrl_c();
            recorder::run(&output, &config.recorder, ticks, shutdown).await?;
        }
    }

    Ok(())
}
