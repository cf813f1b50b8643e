//! Prometheus Metrics
//!
//! Installs the Prometheus recorder with its own HTTP listener so the engine's
//! counters (see `neolaas_lifecycle::observability::metrics`) can be scraped
//! while the provisioner runs periodically.

use metrics_exporter_prometheus::PrometheusBuilder;
use neolaas_lifecycle::observability::metrics::register_metric_descriptions;
use std::net::SocketAddr;
use tracing::info;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    register_metric_descriptions();

    info!(addr = %addr, "Prometheus metrics exporter listening");
    Ok(())
}
