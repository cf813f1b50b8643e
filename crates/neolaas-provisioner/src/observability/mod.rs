//! Observability Module
//!
//! - `tracing`: subscriber setup (text or JSON, `RUST_LOG` filtering)
//! - `metrics`: Prometheus exporter for the engine's metrics

pub mod metrics;
pub mod tracing;

pub use metrics::init_metrics;
pub use tracing::{init_tracing, TracingConfig};
