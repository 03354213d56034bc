//! HTTP API - analytics reports, health and Prometheus metrics
//!
//! Routes (analytics prefix from config, default `/api`):
//! - GET {prefix}/analytics/tail?store_id=&date_start=&date_end=&category_id=&search=
//! - GET {prefix}/analytics/space?store_id=&date_start=&date_end=
//! - GET {prefix}/analytics/heatmap?store_id=
//! - GET /health
//! - GET /metrics
//!
//! Uses hyper for the HTTP server. Bad query parameters answer 400 with a
//! `{"detail": ...}` body; aggregation failures answer 500.

use crate::domain::types::{AnalysisKind, CategoryId, DateRange, StoreId, TailFilter};
use crate::infra::config::Config;
use crate::infra::metrics::{Metrics, MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS};
use crate::services::aggregator::AnalyticsSource;
use crate::services::analytics::AnalyticsService;
use anyhow::{anyhow, Context};
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_PROMETHEUS: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared state for all connections
pub struct ApiState<S> {
    service: AnalyticsService<S>,
    api_prefix: String,
    cors_origin: String,
    site: String,
}

impl<S: AnalyticsSource> ApiState<S> {
    pub fn new(service: AnalyticsService<S>, config: &Config) -> Self {
        Self {
            service,
            api_prefix: config.api_prefix().to_string(),
            cors_origin: config.cors_origin().to_string(),
            site: config.app_name().to_string(),
        }
    }

    pub fn service(&self) -> &AnalyticsService<S> {
        &self.service
    }
}

/// Response before it is turned into a hyper body
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status: StatusCode::OK, content_type: CONTENT_TYPE_JSON, body },
            Err(e) => Self::error(StatusCode::INTERNAL_SERVER_ERROR, &format!("serialization failed: {e}")),
        }
    }

    fn error(status: StatusCode, detail: &str) -> Self {
        Self { status, content_type: CONTENT_TYPE_JSON, body: json!({ "detail": detail }).to_string() }
    }

    fn bad_request(e: &anyhow::Error) -> Self {
        Self::error(StatusCode::BAD_REQUEST, &format!("{e:#}"))
    }

    fn empty(status: StatusCode) -> Self {
        Self { status, content_type: CONTENT_TYPE_JSON, body: String::new() }
    }
}

/// Decoded query string; later duplicates win
fn parse_query(uri: &Uri) -> FxHashMap<String, String> {
    uri.query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Query value, treating an empty string as absent
fn param<'a>(params: &'a FxHashMap<String, String>, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

fn parse_i64(params: &FxHashMap<String, String>, name: &str) -> anyhow::Result<Option<i64>> {
    param(params, name)
        .map(|v| v.parse::<i64>().with_context(|| format!("{name} must be an integer, got '{v}'")))
        .transpose()
}

fn store_id_param(params: &FxHashMap<String, String>) -> anyhow::Result<StoreId> {
    parse_i64(params, "store_id")?
        .map(StoreId)
        .ok_or_else(|| anyhow!("store_id is required"))
}

fn date_range_param(params: &FxHashMap<String, String>) -> anyhow::Result<DateRange> {
    DateRange::parse(param(params, "date_start"), param(params, "date_end"))
}

/// Build the tail filter from query parameters
fn tail_filter(params: &FxHashMap<String, String>) -> anyhow::Result<TailFilter> {
    Ok(TailFilter {
        store_id: store_id_param(params)?,
        date_range: date_range_param(params)?,
        category_id: parse_i64(params, "category_id")?.map(CategoryId),
        search: param(params, "search").map(str::to_string),
    })
}

fn run_analysis<S: AnalyticsSource>(
    state: &ApiState<S>,
    kind: AnalysisKind,
    params: &FxHashMap<String, String>,
) -> Reply {
    let outcome = match kind {
        AnalysisKind::Tail => match tail_filter(params) {
            Ok(filter) => state.service.tail(&filter).map(|r| Reply::json(&r)),
            Err(e) => return Reply::bad_request(&e),
        },
        AnalysisKind::Space => {
            let parsed = store_id_param(params).and_then(|s| Ok((s, date_range_param(params)?)));
            match parsed {
                Ok((store_id, range)) => state.service.space(store_id, &range).map(|r| Reply::json(&r)),
                Err(e) => return Reply::bad_request(&e),
            }
        }
        AnalysisKind::Heatmap => match store_id_param(params) {
            // Date bounds are accepted for symmetry with the other routes but zones are not dated
            Ok(store_id) => state.service.heatmap(store_id).map(|r| Reply::json(&r)),
            Err(e) => return Reply::bad_request(&e),
        },
    };

    outcome.unwrap_or_else(|e| Reply::error(StatusCode::INTERNAL_SERVER_ERROR, &format!("{e:#}")))
}

/// Dispatch a request to its handler
pub fn route<S: AnalyticsSource>(state: &ApiState<S>, method: &Method, uri: &Uri) -> Reply {
    let path = uri.path();

    match (method, path) {
        (&Method::GET, "/health") => Reply::json(&json!({ "status": "ok" })),
        (&Method::GET, "/metrics") => Reply {
            status: StatusCode::OK,
            content_type: CONTENT_TYPE_PROMETHEUS,
            body: format_prometheus_metrics(state.service.metrics(), &state.site),
        },
        (&Method::OPTIONS, _) => Reply::empty(StatusCode::NO_CONTENT),
        _ => {
            let kind = path
                .strip_prefix(state.api_prefix.as_str())
                .and_then(|rest| rest.strip_prefix("/analytics/"))
                .and_then(|name| name.parse::<AnalysisKind>().ok());

            match (method, kind) {
                (&Method::GET, Some(kind)) => run_analysis(state, kind, &parse_query(uri)),
                (_, Some(_)) => Reply::error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
                (_, None) => Reply::error(StatusCode::NOT_FOUND, "Not Found"),
            }
        }
    }
}

/// Run `route` on the blocking pool; analytics scan the whole dataset
pub async fn dispatch<S: AnalyticsSource + 'static>(
    state: Arc<ApiState<S>>,
    method: Method,
    uri: Uri,
) -> Reply {
    match tokio::task::spawn_blocking(move || route(&state, &method, &uri)).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(error = %e, "http_handler_failed");
            Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// Handle HTTP requests
async fn handle_request<S: AnalyticsSource + 'static>(
    req: Request<hyper::body::Incoming>,
    state: Arc<ApiState<S>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let start = Instant::now();
    let reply = dispatch(state.clone(), req.method().clone(), req.uri().clone()).await;

    debug!(
        method = %req.method(),
        path = %req.uri().path(),
        status = reply.status.as_u16(),
        latency_us = start.elapsed().as_micros() as u64,
        "http_request"
    );

    let response = Response::builder()
        .status(reply.status)
        .header("Content-Type", reply.content_type)
        .header("Access-Control-Allow-Origin", state.cors_origin.as_str())
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(Full::new(Bytes::from(reply.body)));

    // Only a malformed cors_origin from config can fail here
    Ok(response.unwrap_or_else(|e| {
        error!(error = %e, "http_response_build_failed");
        let mut fallback = Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    }))
}

/// Start the HTTP API server
pub async fn start_http_server<S: AnalyticsSource + 'static>(
    addr: SocketAddr,
    state: Arc<ApiState<S>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    info!(addr = %addr, prefix = %state.api_prefix, "http_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "http_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "http_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("http_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with site label
fn write_metric(output: &mut String, name: &str, help: &str, typ: MetricType, site: &str, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Write a counter split by analysis kind
fn write_kind_counter(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    values: &[u64; AnalysisKind::ALL.len()],
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} counter");
    for kind in AnalysisKind::ALL {
        let _ = writeln!(
            output,
            "{name}{{site=\"{site}\",kind=\"{}\"}} {}",
            kind.as_str(),
            values[kind.index()]
        );
    }
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    bounds: &[u64; 10],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in bounds.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"+Inf\"}} {cumulative}");

    let count: u64 = buckets.iter().sum();
    let _ = writeln!(output, "{name}_sum{{site=\"{site}\"}} {sum}");
    let _ = writeln!(output, "{name}_count{{site=\"{site}\"}} {count}");
}

/// Format metrics in Prometheus text exposition format
fn format_prometheus_metrics(metrics: &Metrics, site: &str) -> String {
    let summary = metrics.snapshot();
    let mut output = String::with_capacity(4096);

    write_analysis_metrics(&mut output, site, &summary);
    write_result_metrics(&mut output, site, &summary);

    output
}

fn write_analysis_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_kind_counter(
        output,
        "shelfiq_analyses_total",
        "Completed analyses",
        site,
        &summary.analyses_total,
    );
    write_kind_counter(
        output,
        "shelfiq_analysis_failures_total",
        "Analyses whose aggregation failed",
        site,
        &summary.failures_total,
    );
    write_metric(
        output,
        "shelfiq_rows_total",
        "Aggregated rows fed to the classifiers",
        MetricType::Counter,
        site,
        summary.rows_total,
    );
    write_histogram(
        output,
        "shelfiq_analysis_latency_us",
        "Analysis latency in microseconds since startup",
        site,
        &summary.lifetime_lat_buckets,
        &METRICS_BUCKET_BOUNDS,
        summary.lifetime_latency_sum_us,
    );
    write_metric(
        output,
        "shelfiq_analysis_latency_p99_us",
        "99th percentile analysis latency (current report window)",
        MetricType::Gauge,
        site,
        summary.lat_p99_us,
    );
}

fn write_result_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "shelfiq_results_written_total",
        "Analysis results appended to the result log",
        MetricType::Counter,
        site,
        summary.results_written_total,
    );
    write_metric(
        output,
        "shelfiq_results_failed_total",
        "Result log appends that failed",
        MetricType::Counter,
        site,
        summary.results_failed_total,
    );
}
