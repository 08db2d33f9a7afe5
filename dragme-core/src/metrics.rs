// ABOUTME: Prometheus metrics for commands, move-request outcomes and errors
// ABOUTME: Installs a global recorder once; render output is served by the keep-alive server

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder, or return the already installed handle
pub fn init_metrics() -> Result<PrometheusHandle> {
    if let Some(handle) = HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    Ok(HANDLE.get_or_init(|| handle).clone())
}

/// Count an invoked slash command
pub fn record_command(command: &'static str) {
    metrics::counter!("dragme_commands_total", "command" => command).increment(1);
}

/// Count a move-request reaching a terminal outcome
pub fn record_move_outcome(outcome: &'static str) {
    metrics::counter!("dragme_move_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_error(kind: &'static str) {
    metrics::counter!("dragme_errors_total", "kind" => kind).increment(1);
}

pub fn set_outstanding_requests(count: usize) {
    metrics::gauge!("dragme_outstanding_requests").set(count as f64);
}

pub fn set_registered_channels(count: usize) {
    metrics::gauge!("dragme_registered_channels").set(count as f64);
}
