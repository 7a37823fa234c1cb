//! Session recording.
//!
//! Appends one JSON object per line for every frame the relay applies or
//! rejects, bracketed by session start and end markers, so a drive can be
//! inspected or replayed after the fact.

use joydash_core::{FrameOutcome, InputFrame, Reading};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Types of events that appear in a session recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventType {
    SessionStart,
    FrameApplied,
    FrameRejected,
    SessionEnd,
}

/// A single recording entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Monotonic timestamp in microseconds
    pub timestamp_us: u64,
    /// Wall-clock Unix timestamp in microseconds
    pub unix_us: u64,
    pub event_type: SessionEventType,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameAppliedDetails {
    /// Axes as they arrived on the wire.
    pub input: InputFrame,
    /// Axes as the vehicle model saw them.
    pub x: i64,
    pub y: i64,
    pub elapsed_us: u64,
    #[serde(flatten)]
    pub reading: Reading,
    pub reply: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameRejectedDetails {
    pub error: String,
}

/// JSONL writer for one relay session
pub struct SessionRecorder {
    writer: BufWriter<File>,
}

impl SessionRecorder {
    /// Open `path` in append mode, creating parent directories as needed.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(8192, file),
        })
    }

    pub fn log(&mut self, entry: &SessionEntry) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    pub fn log_event(
        &mut self,
        timestamp_us: u64,
        unix_us: u64,
        event_type: SessionEventType,
        details: serde_json::Value,
    ) -> std::io::Result<()> {
        self.log(&SessionEntry {
            timestamp_us,
            unix_us,
            event_type,
            details,
        })
    }

    /// Record a relay outcome. Ignored lines are not recorded.
    pub fn record_outcome(
        &mut self,
        now_us: u64,
        unix_us: u64,
        outcome: &FrameOutcome,
    ) -> std::io::Result<()> {
        match outcome {
            FrameOutcome::Applied {
                timestamp_us,
                elapsed_us,
                input,
                x,
                y,
                reading,
                reply,
            } => {
                let details = FrameAppliedDetails {
                    input: *input,
                    x: *x,
                    y: *y,
                    elapsed_us: *elapsed_us,
                    reading: *reading,
                    reply: reply.to_string(),
                };
                self.log_event(
                    *timestamp_us,
                    unix_us,
                    SessionEventType::FrameApplied,
                    serde_json::to_value(details)?,
                )
            }
            FrameOutcome::Rejected(err) => self.log_event(
                now_us,
                unix_us,
                SessionEventType::FrameRejected,
                serde_json::to_value(FrameRejectedDetails {
                    error: err.to_string(),
                })?,
            ),
            FrameOutcome::Ignored => Ok(()),
        }
    }
}
