//! Prometheus metrics for the joystick relay.
//!
//! Frame counters and the latest vehicle readings, served over plain HTTP.

use joydash_core::{tags, FrameOutcome};
use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::thread;
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server};
use tracing::{debug, info, warn};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn counter(tag: tags::Tag) -> IntCounter {
    let counter = IntCounter::new(tag.metric, tag.help).unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
}

fn gauge(tag: tags::Tag) -> Gauge {
    let gauge = Gauge::new(tag.metric, tag.help).unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
}

// ============================================================================
// Frame Metrics
// ============================================================================

pub static FRAMES_APPLIED: LazyLock<IntCounter> =
    LazyLock::new(|| counter(tags::FRAMES_APPLIED));

pub static FRAMES_REJECTED: LazyLock<IntCounter> =
    LazyLock::new(|| counter(tags::FRAMES_REJECTED));

pub static LINES_IGNORED: LazyLock<IntCounter> = LazyLock::new(|| counter(tags::LINES_IGNORED));

pub static REPLIES_SENT: LazyLock<IntCounter> = LazyLock::new(|| counter(tags::REPLIES_SENT));

/// Seconds between consecutive applied frames
pub static UPDATE_INTERVAL_S: LazyLock<Histogram> = LazyLock::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(tags::UPDATE_INTERVAL_S.metric, tags::UPDATE_INTERVAL_S.help)
            .buckets(vec![0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0]),
    )
    .unwrap();
    REGISTRY.register(Box::new(histogram.clone())).unwrap();
    histogram
});

// ============================================================================
// Vehicle Metrics
// ============================================================================

pub static VEHICLE_SPEED: LazyLock<Gauge> = LazyLock::new(|| gauge(tags::VEHICLE_SPEED));

pub static VEHICLE_FUEL: LazyLock<Gauge> = LazyLock::new(|| gauge(tags::VEHICLE_FUEL));

pub static VEHICLE_TEMP_C: LazyLock<Gauge> = LazyLock::new(|| gauge(tags::VEHICLE_TEMP_C));

/// Fold one relay outcome into the metrics.
pub fn record_outcome(outcome: &FrameOutcome) {
    match outcome {
        FrameOutcome::Applied {
            elapsed_us,
            reading,
            ..
        } => {
            FRAMES_APPLIED.inc();
            REPLIES_SENT.inc();
            UPDATE_INTERVAL_S.observe(*elapsed_us as f64 / 1_000_000.0);
            VEHICLE_SPEED.set(reading.speed);
            VEHICLE_FUEL.set(reading.fuel);
            VEHICLE_TEMP_C.set(reading.temperature);
        }
        FrameOutcome::Ignored => LINES_IGNORED.inc(),
        FrameOutcome::Rejected(_) => FRAMES_REJECTED.inc(),
    }
}

// ============================================================================
// Metrics HTTP Server
// ============================================================================

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("cannot serve metrics on {addr}: {message}")]
    Bind { addr: String, message: String },
}

/// Running metrics endpoint.
pub struct MetricsServer {
    /// Address actually bound; differs from the request when it used port 0.
    pub local_addr: Option<SocketAddr>,
    pub handle: thread::JoinHandle<()>,
}

/// Bind `bind_addr` and answer `/metrics`, `/health` and `/ready` from a
/// background thread.
pub fn serve_metrics(bind_addr: &str) -> Result<MetricsServer, MetricsError> {
    let server = Server::http(bind_addr).map_err(|e| MetricsError::Bind {
        addr: bind_addr.to_string(),
        message: e.to_string(),
    })?;
    let local_addr = server.server_addr().to_ip();
    info!(addr = ?local_addr, "Metrics server listening");

    let handle = thread::spawn(move || {
        for request in server.incoming_requests() {
            handle_request(request);
        }
    });
    Ok(MetricsServer { local_addr, handle })
}

fn handle_request(request: Request) {
    let response = match request.url() {
        "/metrics" => match encode_registry() {
            Ok((body, content_type)) => {
                let mut response = Response::from_data(body);
                if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], content_type) {
                    response.add_header(header);
                }
                response
            }
            Err(e) => {
                warn!(error = %e, "Failed to encode metrics");
                Response::from_string("Internal Server Error").with_status_code(500)
            }
        },
        "/health" => Response::from_string("OK"),
        "/ready" if FRAMES_APPLIED.get() > 0 => Response::from_string("Ready"),
        "/ready" => Response::from_string("No frame applied yet").with_status_code(503),
        _ => Response::from_string("Not Found").with_status_code(404),
    };
    if let Err(e) = request.respond(response) {
        debug!(error = %e, "Metrics client went away");
    }
}

fn encode_registry() -> Result<(Vec<u8>, String), prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut body = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut body)?;
    Ok((body, encoder.format_type().to_string()))
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = FRAMES_APPLIED.get();
    let _ = FRAMES_REJECTED.get();
    let _ = LINES_IGNORED.get();
    let _ = REPLIES_SENT.get();
    let _ = UPDATE_INTERVAL_S.get_sample_count();
    let _ = VEHICLE_SPEED.get();
    let _ = VEHICLE_FUEL.get();
    let _ = VEHICLE_TEMP_C.get();
}
