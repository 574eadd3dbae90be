//! Metrics collection and exposition.
//!
//! # Metrics
//! - `node_closes_total` (counter): node connections closed
//! - `node_commands_handed_off_total` (counter): commands moved to the router
//! - `node_commands_failed_in_place_total` (counter): failed with ConnectionClosed
//! - `node_handoff_rejected_total` (counter): router refused a hand-off
//! - `node_reconnect_suspended_total` (counter): watchdogs suspended on teardown
//!
//! Every counter carries a `node` label. Without an installed recorder the
//! macros are no-ops.

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::node::connection::NodeId;
use crate::node::handler::CloseReport;

/// Install the Prometheus recorder and its HTTP scrape endpoint.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_close(node: NodeId, report: &CloseReport) {
    let node = node.to_string();
    counter!("node_closes_total", "node" => node.clone()).increment(1);
    counter!("node_commands_handed_off_total", "node" => node.clone())
        .increment(report.handed_off as u64);
    counter!("node_commands_failed_in_place_total", "node" => node.clone())
        .increment(report.failed_in_place as u64);
    counter!("node_handoff_rejected_total", "node" => node).increment(report.rejected as u64);
}

pub fn record_reconnect_suspended(node: NodeId) {
    counter!("node_reconnect_suspended_total", "node" => node.to_string()).increment(1);
}
