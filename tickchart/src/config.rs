//! This module controls configuration parsing from the end user, providing a
//! convenience mechanism for the rest of the program. Every field has a
//! default, so an absent configuration file is the same as an empty one.

use std::{
    fs, io,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{recorder, server};

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
}

/// Main configuration struct for this program
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The chart viewer
    #[serde(default)]
    pub server: server::Config,
    /// The tick recorder
    #[serde(default)]
    pub recorder: recorder::Config,
    /// The method by which to express telemetry, none by default
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub telemetry: Option<Telemetry>,
}

/// Defines the manner of tickchart's own telemetry.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum Telemetry {
    /// In prometheus mode tickchart will emit its internal telemetry for
    /// scraping at a prometheus poll endpoint.
    Prometheus {
        /// Address and port for prometheus exporter
        prometheus_addr: SocketAddr,
    },
}

impl Config {
    /// Parse a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// configuration.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        Self::from_yaml(&contents)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn empty_config_is_default() {
        let config = Config::from_yaml("{}").expect("empty config");
        assert_eq!(config, Config::default());
        assert_eq!(
            config.server.binding_addr,
            SocketAddr::from_str("127.0.0.1:8080").expect("addr")
        );
        assert_eq!(config.server.concurrent_requests_max, 100);
        assert!((config.recorder.rate_milliseconds - 16.0).abs() < f64::EPSILON);
        assert_eq!(config.recorder.report_interval_milliseconds, 1_000);
    }

    #[test]
    fn config_deserializes_all_sections() {
        let contents = r#"
server:
  binding_addr: "0.0.0.0:9090"
  concurrent_requests_max: 4
recorder:
  rate_milliseconds: 33.3
  report_interval_milliseconds: 500
telemetry:
  prometheus:
    prometheus_addr: "0.0.0.0:9000"
"#;
        let config = Config::from_yaml(contents).expect("valid config");
        assert_eq!(
            config.server,
            server::Config {
                binding_addr: SocketAddr::from_str("0.0.0.0:9090").expect("addr"),
                concurrent_requests_max: 4,
            }
        );
        assert_eq!(
            config.recorder,
            recorder::Config {
                rate_milliseconds: 33.3,
                report_interval_milliseconds: 500,
            }
        );
        assert_eq!(
            config.telemetry,
            Some(Telemetry::Prometheus {
                prometheus_addr: SocketAddr::from_str("0.0.0.0:9000").expect("addr"),
            })
        );
    }

    #[test]
    fn telemetry_is_a_single_keyed_section() {
        let contents = r#"
telemetry:
  prometheus:
    prometheus_addr: "127.0.0.1:9000"
"#;
        let config = Config::from_yaml(contents).expect("prometheus telemetry");
        assert_eq!(
            config.telemetry,
            Some(Telemetry::Prometheus {
                prometheus_addr: SocketAddr::from_str("127.0.0.1:9000").expect("addr"),
            })
        );
        assert_eq!(config.server, server::Config::default());

        let unknown_kind = "telemetry:\n  statsd:\n    addr: \"127.0.0.1:9000\"\n";
        assert!(Config::from_yaml(unknown_kind).is_err());
        let unknown_field = "telemetry:\n  prometheus:\n    addr: \"127.0.0.1:9000\"\n";
        assert!(Config::from_yaml(unknown_field).is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::from_yaml("viewer: {}").is_err());
        assert!(Config::from_yaml("server:\n  port: 80\n").is_err());
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.yaml");
        match Config::from_path(&path) {
            Err(Error::ReadFile { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
