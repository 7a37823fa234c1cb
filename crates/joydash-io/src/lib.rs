pub mod metrics;
pub mod serial;

pub use metrics::{init_metrics, record_outcome, serve_metrics, MetricsError, MetricsServer};
pub use serial::{available_ports, SerialConfig, SerialLink};
