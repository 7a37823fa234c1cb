use crate::frame::{InputFrame, OutputFrame};
use crate::link::{FrameLink, LinkError, LinkStats};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Mid-scale reading of the handheld's 12-bit joystick ADC.
pub const ADC_CENTER: u16 = 2048;
pub const ADC_MAX: u16 = 4095;
/// The handheld divides the centred ADC reading by this before sending.
pub const ADC_SCALE: i64 = 16;

/// One raw joystick sample as the handheld's ADC sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickSample {
    pub adc_x: u16,
    pub adc_y: u16,
}

impl JoystickSample {
    pub fn new(adc_x: u16, adc_y: u16) -> Self {
        Self {
            adc_x: adc_x.min(ADC_MAX),
            adc_y: adc_y.min(ADC_MAX),
        }
    }

    pub fn centered() -> Self {
        Self::new(ADC_CENTER, ADC_CENTER)
    }

    /// Scale to wire units; integer division truncates toward zero.
    pub fn to_frame(&self) -> InputFrame {
        InputFrame {
            x: (i64::from(self.adc_x) - i64::from(ADC_CENTER)) / ADC_SCALE,
            y: (i64::from(self.adc_y) - i64::from(ADC_CENTER)) / ADC_SCALE,
        }
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Sample(JoystickSample),
    Raw(Vec<u8>),
}

/// In-process stand-in for the handheld controller.
///
/// Emits scripted joystick frames, paced like the device, and keeps the
/// dashboard lines it receives back. Reading past the end of the script
/// reports [`LinkError::Closed`].
#[derive(Debug)]
pub struct SimulatedController {
    script: VecDeque<Scripted>,
    replies: Vec<OutputFrame>,
    frame_interval: Duration,
    last_emit: Option<Instant>,
    stats: LinkStats,
}

impl SimulatedController {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            script: VecDeque::new(),
            replies: Vec::new(),
            frame_interval,
            last_emit: None,
            stats: LinkStats::default(),
        }
    }

    /// A short drive: pull away, cruise, turn under throttle, coast, brake.
    pub fn drive_script(frame_interval: Duration) -> Self {
        let mut sim = Self::new(frame_interval);
        let forward = JoystickSample::new(ADC_CENTER, 1024);
        let cruise = JoystickSample::centered();
        let turn = JoystickSample::new(3072, 1024);
        let brake = JoystickSample::new(ADC_CENTER, 3072);

        sim.push_repeated(forward, 20);
        sim.push_repeated(cruise, 10);
        sim.push_repeated(turn, 10);
        sim.push_repeated(cruise, 20);
        sim.push_repeated(brake, 5);
        sim
    }

    pub fn push_sample(&mut self, sample: JoystickSample) {
        self.script.push_back(Scripted::Sample(sample));
    }

    pub fn push_repeated(&mut self, sample: JoystickSample, count: usize) {
        for _ in 0..count {
            self.push_sample(sample);
        }
    }

    /// Queue a line verbatim, for noise and malformed-input scenarios.
    pub fn push_raw(&mut self, line: impl Into<Vec<u8>>) {
        self.script.push_back(Scripted::Raw(line.into()));
    }

    pub fn pending(&self) -> usize {
        self.script.len()
    }

    /// Last values the handheld would display.
    pub fn dashboard(&self) -> Option<OutputFrame> {
        self.replies.last().copied()
    }

    pub fn replies(&self) -> &[OutputFrame] {
        &self.replies
    }

    fn pace(&mut self) {
        if self.frame_interval.is_zero() {
            return;
        }
        if let Some(last) = self.last_emit {
            let elapsed = last.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }
        self.last_emit = Some(Instant::now());
    }
}

impl FrameLink for SimulatedController {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, LinkError> {
        let next = self.script.pop_front().ok_or(LinkError::Closed)?;
        self.pace();

        let line = match next {
            Scripted::Sample(sample) => sample.to_frame().to_string().into_bytes(),
            Scripted::Raw(mut raw) => {
                while matches!(raw.last(), Some(b'\n' | b'\r')) {
                    raw.pop();
                }
                raw
            }
        };

        self.stats.lines_read += 1;
        self.stats.bytes_read += line.len() as u64 + 1;
        Ok(Some(line))
    }

    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        self.stats.bytes_written += line.len() as u64;
        match line.parse::<OutputFrame>() {
            Ok(frame) => {
                self.stats.lines_written += 1;
                self.replies.push(frame);
            }
            Err(_) => self.stats.lines_discarded += 1,
        }
        Ok(())
    }

    fn stats(&self) -> LinkStats {
        self.stats.clone()
    }
}
