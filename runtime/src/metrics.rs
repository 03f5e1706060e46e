//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for:
//! - Store action processing and effect execution
//! - Ticket purchases and rejections
//! - Balance charges
//! - HTTP requests
//!
//! # Example
//!
//! ```rust,no_run
//! use raceticket_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Render for a `/metrics` endpoint
//! let body = server.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder plus the address it should be scraped on.
///
/// The server binary mounts [`MetricsServer::render`] on `GET /metrics` at
/// [`MetricsServer::addr`].
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to expose metrics on (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address metrics should be exposed on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by another test), this logs a
    /// warning and succeeds without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Store Metrics
    describe_counter!(
        "store_actions_processed_total",
        "Total number of actions processed by stores"
    );
    describe_histogram!(
        "store_reducer_duration_seconds",
        "Time taken to execute reducers"
    );
    describe_counter!(
        "store_effects_executed_total",
        "Total number of effects executed, by type"
    );

    // Betting Metrics
    describe_counter!(
        "tickets_purchased_total",
        "Total number of betting tickets sold"
    );
    describe_counter!(
        "ticket_purchase_rejected_total",
        "Total number of rejected ticket purchases, by reason"
    );
    describe_counter!(
        "user_charges_total",
        "Total number of balance charges"
    );

    // HTTP Metrics
    describe_counter!(
        "http_requests_total",
        "Total number of HTTP requests, by method and status"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        "Time taken to serve HTTP requests"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record an action processed by a reducer.
    pub fn record_action(duration: Duration) {
        counter!("store_actions_processed_total").increment(1);
        histogram!("store_reducer_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an effect execution.
    pub fn record_effect(kind: &'static str) {
        counter!("store_effects_executed_total", "type" => kind).increment(1);
    }
}

/// Betting metrics recorder.
pub struct BettingMetrics;

impl BettingMetrics {
    /// Record a sold ticket.
    pub fn record_purchase() {
        counter!("tickets_purchased_total").increment(1);
    }

    /// Record a rejected purchase.
    pub fn record_rejection(reason: &'static str) {
        counter!("ticket_purchase_rejected_total", "reason" => reason).increment(1);
    }

    /// Record a balance charge.
    pub fn record_charge() {
        counter!("user_charges_total").increment(1);
    }
}

/// HTTP metrics recorder.
pub struct HttpMetrics;

impl HttpMetrics {
    /// Record a served request.
    pub fn record_request(method: &str, status: u16, duration: Duration) {
        counter!(
            "http_requests_total",
            "method" => method.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
        histogram!("http_request_duration_seconds").record(duration.as_secs_f64());
    }
}
