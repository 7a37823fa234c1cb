use std::fs;
use std::process::{Command, Output};
use std::time::{Duration, Instant};

const MISSING_PORT: &str = "/dev/joydash-does-not-exist";

fn command(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_joydash"));
    cmd.args(args)
        .env_remove("JOYDASH_PORT")
        .env("RUST_LOG", "warn");
    cmd
}

fn joydash(args: &[&str]) -> Output {
    command(args).output().expect("Failed to run joydash")
}

fn recorded_events(path: &std::path::Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .expect("recording should exist")
        .lines()
        .map(|line| serde_json::from_str(line).expect("recording lines are JSON"))
        .collect()
}

#[test]
fn simulated_drive_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("session.jsonl");

    let output = joydash(&[
        "--simulate",
        "--sim-interval-ms",
        "0",
        "--record",
        record.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{output:?}");

    let events = recorded_events(&record);
    assert_eq!(events.first().unwrap()["event_type"], "session_start");
    assert_eq!(events.last().unwrap()["event_type"], "session_end");

    let applied: Vec<_> = events
        .iter()
        .filter(|e| e["event_type"] == "frame_applied")
        .collect();
    assert_eq!(applied.len(), 65);

    for event in &applied {
        let details = &event["details"];
        let speed = details["speed"].as_f64().unwrap();
        let fuel = details["fuel"].as_f64().unwrap();
        let temperature = details["temperature"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&speed));
        assert!((0.0..=100.0).contains(&fuel));
        assert!((temperature - (20.0 + speed / 2.0)).abs() < 1e-9);
    }

    // Pulling away: stick forward reads -64 on the wire, +6.4 speed per frame.
    assert_eq!(applied[0]["details"]["input"]["y"], -64);
    assert_eq!(applied[0]["details"]["y"], 64);
    let first_reply = applied[0]["details"]["reply"].as_str().unwrap();
    assert!(first_reply.starts_with("23,6,"), "{first_reply}");

    let end = &events.last().unwrap()["details"];
    assert_eq!(end["stats"]["frames_applied"], 65);
    assert!(end["error"].is_null());
}

#[test]
fn run_seconds_stops_a_paced_simulation() {
    let start = Instant::now();
    let output = joydash(&["--simulate", "--run-seconds", "1"]);

    assert!(output.status.success(), "{output:?}");
    // The paced drive script alone would take over six seconds.
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn missing_port_is_a_usage_error() {
    let output = joydash(&[]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no serial port given"), "{stderr}");
}

#[test]
fn unopenable_port_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("session.jsonl");

    let output = joydash(&["--port", MISSING_PORT, "--record", record.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!record.exists(), "no session was recorded without a link");
}

#[test]
fn port_from_environment_logs_to_file() {
    let dir = tempfile::tempdir().unwrap();

    let output = command(&["--log-dir", dir.path().to_str().unwrap()])
        .env("JOYDASH_PORT", MISSING_PORT)
        .output()
        .expect("Failed to run joydash");
    // The environment supplied the port, so the run got as far as opening it.
    assert_eq!(output.status.code(), Some(1), "{output:?}");

    let log_files: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            let name = path.file_name().unwrap().to_string_lossy();
            name.starts_with("joydash") && name.ends_with(".log")
        })
        .collect();
    assert_eq!(log_files.len(), 1, "{log_files:?}");

    let contents = fs::read_to_string(&log_files[0]).unwrap();
    assert!(contents.contains(MISSING_PORT), "{contents}");
}

#[test]
fn help_lists_options() {
    let output = joydash(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--port <NAME>"));
    assert!(stdout.contains("--simulate"));
}
