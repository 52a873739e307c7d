//! Prometheus metrics.
//!
//! Installs the global `metrics` recorder and exposes its rendered output for
//! the `/metrics` endpoint.

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::{Error, Result};

/// Handle to the installed Prometheus recorder.
#[derive(Clone)]
pub struct MetricsService {
    handle: PrometheusHandle,
}

impl MetricsService {
    /// Install the process-wide recorder. Fails if one is already installed.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| Error::Config(format!("failed to install metrics recorder: {}", e)))?;

        describe_counter!(
            "ragquery_queries_total",
            "Query requests by outcome (ok or error kind)"
        );
        describe_histogram!(
            "ragquery_query_duration_seconds",
            Unit::Seconds,
            "End-to-end query handling time"
        );
        describe_histogram!(
            "ragquery_retrieved_records",
            Unit::Count,
            "Records returned per successful query"
        );

        Ok(Self { handle })
    }

    /// Prometheus text exposition.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
