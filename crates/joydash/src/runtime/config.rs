use joydash_io::serial::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable consulted when `--port` is not given.
pub const PORT_ENV: &str = "JOYDASH_PORT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("invalid value {value:?} for {flag}")]
    InvalidValue { flag: String, value: String },
    #[error("unknown option {0}")]
    UnknownOption(String),
    #[error("no serial port given (use --port, set JOYDASH_PORT, or pass --simulate)")]
    MissingPort,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub list_ports: bool,
    pub port: Option<String>,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub invert_y: bool,
    pub simulate: bool,
    pub sim_interval: Duration,
    pub run_seconds: Option<u64>,
    pub json_logs: bool,
    pub log_dir: Option<PathBuf>,
    pub metrics_addr: Option<String>,
    pub record_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            list_ports: false,
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            invert_y: true,
            simulate: false,
            sim_interval: Duration::from_millis(100),
            run_seconds: None,
            json_logs: false,
            log_dir: None,
            metrics_addr: None,
            record_path: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        let mut cfg = Self::from_args(&args)?;
        if cfg.port.is_none() {
            cfg.port = std::env::var(PORT_ENV).ok().filter(|p| !p.trim().is_empty());
        }
        Ok(cfg)
    }

    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--port" => {
                    cfg.port = Some(value_of(args, &mut i)?.to_string());
                }
                "--baud" => {
                    cfg.baud_rate = parse_value(args, &mut i)?;
                }
                "--read-timeout-ms" => {
                    cfg.read_timeout = Duration::from_millis(parse_value(args, &mut i)?);
                }
                "--no-invert-y" => {
                    cfg.invert_y = false;
                }
                "--simulate" => {
                    cfg.simulate = true;
                }
                "--sim-interval-ms" => {
                    cfg.sim_interval = Duration::from_millis(parse_value(args, &mut i)?);
                }
                "--run-seconds" => {
                    cfg.run_seconds = Some(parse_value(args, &mut i)?);
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--log-dir" => {
                    cfg.log_dir = Some(PathBuf::from(value_of(args, &mut i)?));
                }
                "--metrics-addr" => {
                    cfg.metrics_addr = Some(value_of(args, &mut i)?.to_string());
                }
                "--record" => {
                    cfg.record_path = Some(PathBuf::from(value_of(args, &mut i)?));
                }
                "--list-ports" => {
                    cfg.list_ports = true;
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                other => return Err(ConfigError::UnknownOption(other.to_string())),
            }
            i += 1;
        }
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.show_help || self.list_ports {
            return Ok(());
        }
        if !self.simulate && self.port.is_none() {
            return Err(ConfigError::MissingPort);
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Zero("--baud"));
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::Zero("--read-timeout-ms"));
        }
        Ok(())
    }

    pub fn print_help() {
        println!(
            r#"joydash - joystick-to-dashboard vehicle relay

USAGE:
    joydash --port <NAME> [OPTIONS]
    joydash --simulate [OPTIONS]

OPTIONS:
    --port <NAME>            Serial port of the handheld controller (e.g. /dev/ttyACM0, COM20)
    --baud <N>               Baud rate [default: 115200]
    --read-timeout-ms <MS>   Serial read timeout [default: 1000]
    --no-invert-y            Pass the Y axis through without flipping its sign
    --simulate               Drive the relay from a built-in simulated controller
    --sim-interval-ms <MS>   Frame pacing of the simulated controller [default: 100]
    --run-seconds <SECS>     Stop after a fixed duration
    --json-logs              Output logs in JSON format
    --log-dir <DIR>          Also write daily-rolling log files to DIR
    --metrics-addr <ADDR>    Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --record <PATH>          Append a JSONL recording of the session to PATH
    --list-ports             List available serial ports and exit
    -h, --help               Print this help message

ENVIRONMENT VARIABLES:
    JOYDASH_PORT             Serial port used when --port is not given
    RUST_LOG                 Set log filter (e.g., RUST_LOG=debug,joydash_core=trace)

EXAMPLES:
    # Relay a controller on the first USB serial port
    joydash --port /dev/ttyACM0

    # Dry run without hardware, with metrics and a session recording
    joydash --simulate --metrics-addr 127.0.0.1:9090 --record session.jsonl
"#
        );
    }
}

fn value_of<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str, ConfigError> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingValue(flag.clone()))
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: &mut usize) -> Result<T, ConfigError> {
    let flag = args[*i].clone();
    let value = value_of(args, i)?;
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag,
        value: value.to_string(),
    })
}
