//! Metrics collection and exposition.
//!
//! # Metrics
//! - `age_gate_connect_total` (counter): connect attempts by outcome
//! - `age_gate_operations_total` (counter): submissions by kind, outcome
//! - `age_gate_events_total` (counter): observed events by classification
//!
//! Recording is a no-op until an exporter is installed.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

use crate::orchestrator::codec::Classification;
use crate::orchestrator::operation::OperationKind;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_connect(outcome: &'static str) {
    metrics::counter!("age_gate_connect_total", "outcome" => outcome).increment(1);
}

pub fn record_operation(kind: OperationKind, outcome: &'static str) {
    metrics::counter!(
        "age_gate_operations_total",
        "kind" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_event(classification: Classification) {
    metrics::counter!(
        "age_gate_events_total",
        "classification" => classification.as_str()
    )
    .increment(1);
}
