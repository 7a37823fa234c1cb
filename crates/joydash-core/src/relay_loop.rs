use crate::frame::{FrameError, InputFrame, OutputFrame};
use crate::link::{FrameLink, LinkError};
use crate::timebase::Clock;
use crate::vehicle::{Reading, VehicleModel, VehicleState};
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Flip the sign of the Y axis before it reaches the vehicle model.
    pub invert_y: bool,
    pub model: VehicleModel,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            invert_y: true,
            model: VehicleModel::default(),
        }
    }
}

#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub frames_applied: u64,
    pub frames_rejected: u64,
    pub lines_ignored: u64,
    pub replies_sent: u64,
    pub idle_polls: u64,
}

/// What happened to one inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Applied {
        timestamp_us: u64,
        elapsed_us: u64,
        input: InputFrame,
        x: i64,
        y: i64,
        reading: Reading,
        reply: OutputFrame,
    },
    /// Not an axis frame; dropped without complaint.
    Ignored,
    /// Malformed axis frame; dropped, vehicle state untouched.
    Rejected(FrameError),
}

/// Single-threaded loop relaying joystick frames into the vehicle model and
/// dashboard values back out.
pub struct RelayLoop<L: FrameLink, C: Clock> {
    link: L,
    clock: C,
    config: RelayConfig,
    state: VehicleState,
    stats: RelayStats,
}

impl<L: FrameLink, C: Clock> RelayLoop<L, C> {
    pub fn new(link: L, config: RelayConfig, clock: C) -> Self {
        let state = VehicleState::new(clock.now_us());
        Self {
            link,
            clock,
            config,
            state,
            stats: RelayStats::default(),
        }
    }

    /// Run until `stop` is raised or the link closes.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), LinkError> {
        self.run_with(stop, |_, _| {})
    }

    /// Like [`run`](Self::run), reporting every processed line to `observe`.
    pub fn run_with<F>(&mut self, stop: &AtomicBool, mut observe: F) -> Result<(), LinkError>
    where
        F: FnMut(&FrameOutcome, &RelayStats),
    {
        while !stop.load(Ordering::Relaxed) {
            match self.poll_once() {
                Ok(Some(outcome)) => observe(&outcome, &self.stats),
                Ok(None) => {}
                Err(LinkError::Closed) => {
                    info!("Link closed after {} frames", self.stats.frames_applied);
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Read at most one line and process it. `None` means the read timed
    /// out with nothing to do.
    pub fn poll_once(&mut self) -> Result<Option<FrameOutcome>, LinkError> {
        match self.link.read_line()? {
            Some(raw) => self.handle_line(&raw).map(Some),
            None => {
                self.stats.idle_polls += 1;
                Ok(None)
            }
        }
    }

    /// Parse one raw line, update the vehicle and send the dashboard reply.
    pub fn handle_line(&mut self, raw: &[u8]) -> Result<FrameOutcome, LinkError> {
        let input = match InputFrame::from_bytes(raw) {
            Ok(frame) => frame,
            Err(err) if err.is_malformed() => {
                warn!("Error parsing the values: {err}");
                self.stats.frames_rejected += 1;
                return Ok(FrameOutcome::Rejected(err));
            }
            Err(err) => {
                debug!("Skipping line: {err}");
                self.stats.lines_ignored += 1;
                return Ok(FrameOutcome::Ignored);
            }
        };

        let (x, y) = input.axes(self.config.invert_y);
        debug!("Received X: {x}, Y: {y}");

        let timestamp_us = self.clock.now_us();
        let elapsed_us = timestamp_us.saturating_sub(self.state.last_update_us());
        let reading = self.config.model.update(&mut self.state, x, y, timestamp_us);
        self.stats.frames_applied += 1;

        let reply = reading.to_frame();
        self.link.write_line(&reply.to_line())?;
        self.stats.replies_sent += 1;
        trace!("Sent {reply}");

        Ok(FrameOutcome::Applied {
            timestamp_us,
            elapsed_us,
            input,
            x,
            y,
            reading,
            reply,
        })
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}
