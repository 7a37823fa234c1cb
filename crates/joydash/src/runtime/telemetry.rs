use joydash_core::FrameOutcome;
use joydash_io::metrics::{init_metrics, record_outcome, serve_metrics, MetricsServer};
use tracing::error;

pub fn init() {
    init_metrics();
}

/// Metrics stay optional: a port that cannot be bound is logged and the relay
/// carries on without them.
pub fn start_metrics_server(addr: Option<&str>) -> Option<MetricsServer> {
    match serve_metrics(addr?) {
        Ok(server) => Some(server),
        Err(e) => {
            error!(error = %e, "Metrics server disabled");
            None
        }
    }
}

pub fn record(outcome: &FrameOutcome) {
    record_outcome(outcome);
}
