//! Prometheus request metrics and the `/metrics` scrape endpoint.

use std::time::{Duration, Instant};

use axum::{
  extract::{MatchedPath, Request, State},
  http::header,
  middleware::Next,
  response::{IntoResponse, Response},
};
use pharmacy_core::store::PharmacyStore;
use prometheus::{
  Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
  TextEncoder,
};

use crate::{AppState, error::ApiError};

/// Request counters and latency histograms, registered in a registry owned
/// by this value rather than the process-global one.
pub struct Metrics {
  registry: Registry,
  requests: IntCounterVec,
  duration: HistogramVec,
}

impl Metrics {
  pub fn new() -> prometheus::Result<Self> {
    let registry = Registry::new();

    let requests = IntCounterVec::new(
      Opts::new("http_requests_total", "Total number of HTTP requests"),
      &["method", "route", "status"],
    )?;
    let duration = HistogramVec::new(
      HistogramOpts::new(
        "http_request_duration_seconds",
        "HTTP request latency in seconds",
      ),
      &["method", "route"],
    )?;

    registry.register(Box::new(requests.clone()))?;
    registry.register(Box::new(duration.clone()))?;

    Ok(Self { registry, requests, duration })
  }

  pub fn observe(&self, method: &str, route: &str, status: u16, elapsed: Duration) {
    self
      .requests
      .with_label_values(&[method, route, &status.to_string()])
      .inc();
    self
      .duration
      .with_label_values(&[method, route])
      .observe(elapsed.as_secs_f64());
  }

  /// Text exposition format of everything registered.
  pub fn render(&self) -> prometheus::Result<String> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
  }
}

/// Middleware recording every request. The route label is the matched
/// template (`/api/medicines/{id}`), or the raw path when nothing matched.
pub async fn track<S>(
  State(state): State<AppState<S>>,
  req: Request,
  next: Next,
) -> Response
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  let method = req.method().as_str().to_owned();
  let route = req
    .extensions()
    .get::<MatchedPath>()
    .map(|p| p.as_str().to_owned())
    .unwrap_or_else(|| req.uri().path().to_owned());

  let start = Instant::now();
  let response = next.run(req).await;
  state
    .metrics
    .observe(&method, &route, response.status().as_u16(), start.elapsed());
  response
}

/// `GET /metrics`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  let body = state.metrics.render()?;
  Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
