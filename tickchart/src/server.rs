//! The HTTP chart viewer.
//!
//! Each request names a tick log with the `file` query parameter. The file
//! is read and aggregated for that request alone; nothing is cached or
//! shared between requests.
//!
//! ## Routes
//!
//! `GET /`: HTML page, a landing form when `file` is absent
//! `GET /api/charts`: the aggregation result as JSON, `file` required
//!
//! ## Metrics
//!
//! `requests_received`: Total requests received
//! `aggregations_failed`: Total requests whose file could not be read
//!

use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Method, Request, Response, StatusCode, Uri};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tickchart_capture::{aggregate::AggregationResult, observer::LogObserver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{common, page};

fn default_concurrent_requests_max() -> usize {
    100
}

fn default_binding_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Errors produced by [`Viewer`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The viewer could not bind or listen.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
/// Configuration for [`Viewer`]
pub struct Config {
    /// number of concurrent HTTP connections to allow
    #[serde(default = "default_concurrent_requests_max")]
    pub concurrent_requests_max: usize,
    /// address -- IP plus port -- to bind to
    #[serde(default = "default_binding_addr")]
    pub binding_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrent_requests_max: default_concurrent_requests_max(),
            binding_addr: default_binding_addr(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Query {
    file: Option<String>,
}

#[derive(Debug)]
/// The chart viewer.
pub struct Viewer {
    httpd_addr: SocketAddr,
    concurrency_limit: usize,
    shutdown: CancellationToken,
}

impl Viewer {
    /// Create a new [`Viewer`] server instance
    #[must_use]
    pub fn new(config: &Config, shutdown: CancellationToken) -> Self {
        Self {
            httpd_addr: config.binding_addr,
            concurrency_limit: config.concurrent_requests_max,
            shutdown,
        }
    }

    /// Run [`Viewer`] to completion
    ///
    /// This function runs the viewer forever, unless the shutdown token is
    /// cancelled or an unrecoverable error is encountered.
    ///
    /// # Errors
    ///
    /// Function will return an error if the binding address cannot be bound.
    pub async fn run(self) -> Result<(), Error> {
        common::run_httpd(
            self.httpd_addr,
            self.concurrency_limit,
            self.shutdown,
            || hyper::service::service_fn(srv),
        )
        .await?;

        Ok(())
    }
}

async fn srv(
    req: Request<hyper::body::Incoming>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, hyper::Error> {
    counter!("requests_received").increment(1);
    debug!("REQUEST: {} {}", req.method(), req.uri());
    Ok(route(req.method(), req.uri()).await)
}

async fn route(method: &Method, uri: &Uri) -> Response<BoxBody<Bytes, hyper::Error>> {
    let path = uri.path();
    if path != "/" && path != "/api/charts" {
        return build_response(StatusCode::NOT_FOUND, "text/plain", "not found");
    }
    if *method != Method::GET {
        return build_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "text/plain",
            "method not allowed",
        );
    }

    let query = match serde_qs::from_str::<Query>(uri.query().unwrap_or_default()) {
        Ok(query) => query,
        Err(e) => {
            return build_response(
                StatusCode::BAD_REQUEST,
                "text/plain",
                format!("query parse error: {e}"),
            );
        }
    };
    let file = query.file.filter(|file| !file.is_empty());

    if path == "/api/charts" {
        let Some(file) = file else {
            return build_response(
                StatusCode::BAD_REQUEST,
                "text/plain",
                "missing file query parameter",
            );
        };
        let result = load(&file).await;
        return match serde_json::to_vec(&result) {
            Ok(body) => build_response(StatusCode::OK, "application/json", body),
            Err(e) => {
                error!("Failed to serialize charts: {e}");
                build_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "text/plain",
                    "failed to serialize charts",
                )
            }
        };
    }

    let result = match file {
        Some(file) => Some(load(&file).await),
        None => None,
    };
    match page::render(result.as_ref()) {
        Ok(html) => build_response(StatusCode::OK, "text/html; charset=utf-8", html),
        Err(e) => {
            error!("Failed to render page: {e}");
            build_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                "failed to render page",
            )
        }
    }
}

async fn load(file: &str) -> AggregationResult {
    let read = tokio::fs::read(file).await;
    let result = AggregationResult::from_read(file, read, LogObserver);
    if result.is_error() {
        counter!("aggregations_failed").increment(1);
        warn!("Could not aggregate {file}: {msg}", msg = result.error_msg);
    } else {
        debug!(
            "Aggregated {file} into {charts} charts, total {total}",
            charts = result.charts.len(),
            total = result.total
        );
    }
    result
}

fn build_response(
    status: StatusCode,
    content_type: &str,
    body: impl Into<Bytes>,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    match Response::builder()
        .status(status)
        .header("content-type", content_type)
        .body(crate::full(body))
    {
        Ok(resp) => resp,
        Err(e) => {
            error!("Error building response: {e}");
            let mut fallback = Response::new(crate::full("Internal error building response"));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use http_body_util::BodyExt;

    use super::*;

    async fn body_of(resp: Response<BoxBody<Bytes, hyper::Error>>) -> String {
        let bytes = resp
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    fn uri(s: &str) -> Uri {
        s.parse().expect("valid uri")
    }

    fn tick_log() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, r#"{{"title":"tickInterval","pointSet":{{"17":1,"16":4}}}}"#)
            .expect("write");
        writeln!(file, r#"{{"title":"tickOnTime","count":4}}"#).expect("write");
        writeln!(file, "garbage").expect("write");
        file
    }

    #[test]
    fn config_deserializes_defaults() {
        let config: Config = serde_yaml::from_str("{}").expect("empty config");
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn api_returns_charts_as_json() {
        let file = tick_log();
        let path = file.path().display().to_string();
        let resp = route(&Method::GET, &uri(&format!("/api/charts?file={path}"))).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value =
            serde_json::from_str(&body_of(resp).await).expect("json body");
        assert_eq!(body["error_msg"], "");
        assert_eq!(body["source"], path.as_str());
        assert_eq!(body["total"], 5);
        assert_eq!(body["charts"][0]["id"], 0);
        assert_eq!(body["charts"][1]["title"], "tickInterval");
        assert_eq!(body["charts"][1]["labels"], serde_json::json!(["16", "17"]));
        assert_eq!(body["charts"][1]["values"], serde_json::json!([4, 1]));
    }

    #[tokio::test]
    async fn api_reports_unreadable_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nope.jsonl").display().to_string();
        let resp = route(&Method::GET, &uri(&format!("/api/charts?file={path}"))).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value =
            serde_json::from_str(&body_of(resp).await).expect("json body");
        assert_ne!(body["error_msg"], "");
        assert_eq!(body["source"], path.as_str());
        assert_eq!(body["charts"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn api_requires_file() {
        let resp = route(&Method::GET, &uri("/api/charts")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = route(&Method::GET, &uri("/api/charts?file=")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn index_without_file_is_landing_page() {
        let resp = route(&Method::GET, &uri("/")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_of(resp).await;
        assert!(body.contains("<form"));
        assert!(!body.contains("<canvas"));
    }

    #[tokio::test]
    async fn index_with_file_renders_charts() {
        let file = tick_log();
        let path = file.path().display().to_string();
        let resp = route(&Method::GET, &uri(&format!("/?file={path}"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_of(resp).await;
        assert!(body.contains("chart-0"));
        assert!(body.contains("chart-1"));
        assert!(body.contains("tickInterval"));
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let config = Config {
            concurrent_requests_max: 1,
            binding_addr: occupied.local_addr().expect("local addr"),
        };
        let err = Viewer::new(&config, CancellationToken::new())
            .run()
            .await
            .expect_err("address in use");
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn unknown_routes_and_methods() {
        assert_eq!(
            route(&Method::GET, &uri("/nope")).await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            route(&Method::POST, &uri("/")).await.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
