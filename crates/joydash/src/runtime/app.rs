use crate::infra::recorder::{SessionEventType, SessionRecorder};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry;
use joydash_core::{
    FrameLink, LinkError, LinkStats, RelayConfig, RelayLoop, RelayStats, SimulatedController,
    TimeBase,
};
use joydash_io::serial::{self, SerialConfig, SerialLink};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("failed to open session recording {path}: {source}")]
    Recorder {
        path: PathBuf,
        source: std::io::Error,
    },
}

enum DashLink {
    Serial(SerialLink),
    Simulated(SimulatedController),
}

impl FrameLink for DashLink {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, LinkError> {
        match self {
            Self::Serial(l) => l.read_line(),
            Self::Simulated(l) => l.read_line(),
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        match self {
            Self::Serial(l) => l.write_line(line),
            Self::Simulated(l) => l.write_line(line),
        }
    }

    fn stats(&self) -> LinkStats {
        match self {
            Self::Serial(l) => l.stats(),
            Self::Simulated(l) => l.stats(),
        }
    }
}

pub fn run_from_args() -> ExitCode {
    let config = match RuntimeConfig::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("joydash: {e}");
            eprintln!("Try 'joydash --help' for usage.");
            return ExitCode::from(2);
        }
    };
    if config.show_help {
        RuntimeConfig::print_help();
        return ExitCode::SUCCESS;
    }

    let _log_guard = match init_tracing(config.json_logs, config.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("joydash: failed to open log directory: {e}");
            return ExitCode::from(2);
        }
    };

    if config.list_ports {
        return list_ports();
    }

    match run(config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Relay stopped");
            ExitCode::from(1)
        }
    }
}

pub fn run(config: RuntimeConfig) -> Result<RelayStats, AppError> {
    telemetry::init();
    let _metrics_server = telemetry::start_metrics_server(config.metrics_addr.as_deref());

    let timebase = TimeBase::new();

    let stop = Arc::new(AtomicBool::new(false));
    let stop_signal = Arc::clone(&stop);
    ctrlc::set_handler(move || stop_signal.store(true, Ordering::Relaxed))?;

    if let Some(seconds) = config.run_seconds {
        info!(seconds, "Running for limited duration");
        let stop_timer = Arc::clone(&stop);
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            stop_timer.store(true, Ordering::Relaxed);
        });
    }

    // A recording only starts once there is a link to record.
    let link = open_link(&config)?;
    let mut recorder = init_recorder(config.record_path.as_deref())?;

    let relay_config = RelayConfig {
        invert_y: config.invert_y,
        ..Default::default()
    };

    if let Some(rec) = recorder.as_mut() {
        let link_kind = if config.simulate { "simulated" } else { "serial" };
        let details = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "link": link_kind,
            "port": config.port,
            "baud_rate": config.baud_rate,
            "invert_y": relay_config.invert_y,
            "model": relay_config.model,
        });
        if let Err(e) = rec.log_event(
            timebase.now_us(),
            timebase.unix_us(),
            SessionEventType::SessionStart,
            details,
        ) {
            warn!(error = %e, "Failed to record session start");
        }
    }

    info!(
        invert_y = relay_config.invert_y,
        dead_band = relay_config.model.dead_band,
        coast_decay = relay_config.model.coast_decay,
        "Starting relay loop"
    );

    let mut relay = RelayLoop::new(link, relay_config, timebase);
    let result = relay.run_with(&stop, |outcome, _| {
        telemetry::record(outcome);
        if let Some(rec) = recorder.as_mut() {
            if let Err(e) = rec.record_outcome(timebase.now_us(), timebase.unix_us(), outcome) {
                warn!(error = %e, "Failed to record frame");
            }
        }
    });

    if stop.load(Ordering::Relaxed) {
        info!("Program terminated");
    }

    let stats = relay.stats().clone();
    let link_stats = relay.link().stats();
    info!(
        frames_applied = stats.frames_applied,
        frames_rejected = stats.frames_rejected,
        lines_ignored = stats.lines_ignored,
        bytes_read = link_stats.bytes_read,
        bytes_written = link_stats.bytes_written,
        speed = relay.state().speed(),
        fuel = relay.state().fuel(),
        "Relay finished"
    );
    if let DashLink::Simulated(sim) = relay.link() {
        if let Some(dash) = sim.dashboard() {
            info!(
                temperature = dash.temperature,
                speed = dash.speed,
                fuel = dash.fuel,
                "Simulated dashboard"
            );
        }
    }

    if let Some(rec) = recorder.as_mut() {
        let details = serde_json::json!({
            "stats": stats,
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        if let Err(e) = rec.log_event(
            timebase.now_us(),
            timebase.unix_us(),
            SessionEventType::SessionEnd,
            details,
        ) {
            warn!(error = %e, "Failed to record session end");
        }
    }

    result?;
    Ok(stats)
}

fn open_link(config: &RuntimeConfig) -> Result<DashLink, AppError> {
    if config.simulate {
        info!(
            interval_ms = config.sim_interval.as_millis() as u64,
            "Using simulated controller"
        );
        return Ok(DashLink::Simulated(SimulatedController::drive_script(
            config.sim_interval,
        )));
    }

    // validate() guarantees a port when not simulating
    let port = config.port.clone().unwrap_or_default();
    let serial_config = SerialConfig {
        port,
        baud_rate: config.baud_rate,
        read_timeout: config.read_timeout,
    };
    Ok(DashLink::Serial(SerialLink::open(&serial_config)?))
}

fn init_recorder(path: Option<&Path>) -> Result<Option<SessionRecorder>, AppError> {
    path.map(|path| match SessionRecorder::new(path) {
        Ok(recorder) => {
            info!(path = %path.display(), "Session recording enabled");
            Ok(recorder)
        }
        Err(source) => Err(AppError::Recorder {
            path: path.to_path_buf(),
            source,
        }),
    })
    .transpose()
}

fn list_ports() -> ExitCode {
    match serial::available_ports() {
        Ok(ports) if ports.is_empty() => {
            println!("No serial ports found");
            ExitCode::SUCCESS
        }
        Ok(ports) => {
            for port in ports {
                println!("{port}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Failed to enumerate serial ports");
            ExitCode::from(1)
        }
    }
}
