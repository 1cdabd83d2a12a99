//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Transaction submissions and resends
//! - Confirmation polling and outcomes
//! - Ledger RPC health

use crate::error::{SwapError, SwapResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Submission metrics
    pub static ref TX_SUBMITTED: Counter = register_counter!(
        "swap_sender_transactions_submitted_total",
        "Total first submissions accepted by a node"
    ).unwrap();

    pub static ref TX_SUBMIT_FAILED: Counter = register_counter!(
        "swap_sender_transactions_submit_failed_total",
        "Total first submissions rejected"
    ).unwrap();

    pub static ref TX_RESENT: Counter = register_counter!(
        "swap_sender_resends_total",
        "Total re-broadcasts of already submitted transactions"
    ).unwrap();

    pub static ref TX_RESEND_FAILED: Counter = register_counter!(
        "swap_sender_resend_failures_total",
        "Total re-broadcasts rejected by a node"
    ).unwrap();

    // Confirmation metrics
    pub static ref CONFIRMATION_POLLS: Counter = register_counter!(
        "swap_sender_confirmation_polls_total",
        "Total confirmation ticks"
    ).unwrap();

    pub static ref TX_OUTCOMES: CounterVec = register_counter_vec!(
        "swap_sender_outcomes_total",
        "Terminal send outcomes by kind",
        &["outcome"]
    ).unwrap();

    pub static ref TX_LATENCY: Histogram = register_histogram!(
        "swap_sender_send_latency_seconds",
        "Time from first submission to terminal outcome",
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]
    ).unwrap();

    // Ledger metrics
    pub static ref BLOCK_HEIGHT: Gauge = register_gauge!(
        "swap_sender_block_height",
        "Last observed block height"
    ).unwrap();

    pub static ref RPC_FAILOVERS: Counter = register_counter!(
        "swap_sender_rpc_failovers_total",
        "Total RPC endpoint failovers"
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> SwapResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| SwapError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| SwapError::Internal(format!("Metrics server failed: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    render().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Render all registered metrics in the text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

// Helper functions to record metrics

pub fn record_tx_submitted() {
    TX_SUBMITTED.inc();
}

pub fn record_tx_submit_failed() {
    TX_SUBMIT_FAILED.inc();
}

pub fn record_resend() {
    TX_RESENT.inc();
}

pub fn record_resend_failure() {
    TX_RESEND_FAILED.inc();
}

pub fn record_confirmation_poll() {
    CONFIRMATION_POLLS.inc();
}

pub fn record_outcome(outcome: &str) {
    TX_OUTCOMES.with_label_values(&[outcome]).inc();
}

pub fn record_send_latency(latency_secs: f64) {
    TX_LATENCY.observe(latency_secs);
}

pub fn record_block_height(height: u64) {
    BLOCK_HEIGHT.set(height as f64);
}

pub fn record_rpc_failover() {
    RPC_FAILOVERS.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_metrics() {
        record_outcome("confirmed");
        record_block_height(42);

        let text = render().unwrap();
        assert!(text.contains("swap_sender_outcomes_total"));
        assert!(text.contains("swap_sender_block_height"));
    }
}
