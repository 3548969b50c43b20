//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counters track pipeline outcomes; the latency gauge holds the most recent remote call.

use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    core::Collector,
};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    pipeline_runs_total: IntCounterVec,
    pipeline_failures_total: IntCounterVec,
    uploaded_bytes_total: IntCounter,
    remote_call_latency_ms: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Pipeline runs that reached `Done`.
    pub runs_completed: u64,
    /// Pipeline runs that reached `Aborted`.
    pub runs_aborted: u64,
    /// Bytes written by the ingestion store.
    pub uploaded_bytes_total: u64,
    /// Latency of the most recent remote call (ms).
    pub remote_call_latency_ms: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )
        .map_err(|err| TelemetryError::register("http_requests_total", err))?;
        let pipeline_runs_total = IntCounterVec::new(
            Opts::new("pipeline_runs_total", "Pipeline runs by terminal outcome"),
            &["outcome"],
        )
        .map_err(|err| TelemetryError::register("pipeline_runs_total", err))?;
        let pipeline_failures_total = IntCounterVec::new(
            Opts::new(
                "pipeline_failures_total",
                "Pipeline failures by classified error kind",
            ),
            &["kind"],
        )
        .map_err(|err| TelemetryError::register("pipeline_failures_total", err))?;
        let uploaded_bytes_total = IntCounter::with_opts(Opts::new(
            "uploaded_bytes_total",
            "Bytes persisted by the ingestion store",
        ))
        .map_err(|err| TelemetryError::register("uploaded_bytes_total", err))?;
        let remote_call_latency_ms = IntGauge::with_opts(Opts::new(
            "remote_call_latency_ms",
            "Duration of the most recent remote processing call (ms)",
        ))
        .map_err(|err| TelemetryError::register("remote_call_latency_ms", err))?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "pipeline_runs_total", &pipeline_runs_total)?;
        register(&registry, "pipeline_failures_total", &pipeline_failures_total)?;
        register(&registry, "uploaded_bytes_total", &uploaded_bytes_total)?;
        register(&registry, "remote_call_latency_ms", &remote_call_latency_ms)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                pipeline_runs_total,
                pipeline_failures_total,
                uploaded_bytes_total,
                remote_call_latency_ms,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, code.as_str()])
            .inc();
    }

    /// Count a pipeline run by its terminal outcome (`done` or `aborted`).
    pub fn inc_pipeline_run(&self, outcome: &str) {
        self.inner
            .pipeline_runs_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Count a pipeline failure by its error kind.
    pub fn inc_pipeline_failure(&self, kind: &str) {
        self.inner
            .pipeline_failures_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Add to the persisted upload byte counter.
    pub fn add_uploaded_bytes(&self, bytes: u64) {
        self.inner.uploaded_bytes_total.inc_by(bytes);
    }

    /// Record the latency of a remote processing call.
    pub fn observe_remote_call(&self, duration: Duration) {
        self.inner
            .remote_call_latency_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the pipeline counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let runs = &self.inner.pipeline_runs_total;
        MetricsSnapshot {
            runs_completed: runs.with_label_values(&["done"]).get(),
            runs_aborted: runs.with_label_values(&["aborted"]).get(),
            uploaded_bytes_total: self.inner.uploaded_bytes_total.get(),
            remote_call_latency_ms: self.inner.remote_call_latency_ms.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|err| TelemetryError::register(name, err))
}
