//! Line codec for the joystick link.
//!
//! Inbound lines carry the two joystick axes as `X<int>,Y<int>`; outbound
//! lines carry the dashboard values as `<temperature>,<speed>,<fuel>`. Both
//! directions are newline terminated.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Longest line either side is expected to send.
pub const MAX_LINE_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputFrame {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFrame {
    pub temperature: i64,
    pub speed: i64,
    pub fuel: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The line is not shaped like an axis frame at all (noise, banners).
    #[error("not an axis frame: {line:?}")]
    NotAFrame { line: String },
    #[error("expected {expected} comma-separated fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid {field} field {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("line is not valid UTF-8")]
    Encoding,
}

impl FrameError {
    /// Lines that are simply not frames are skipped quietly; everything else
    /// is a malformed frame worth reporting.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, FrameError::NotAFrame { .. })
    }
}

impl InputFrame {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Decode raw bytes read off the link.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, FrameError> {
        let text = std::str::from_utf8(raw).map_err(|_| FrameError::Encoding)?;
        text.parse()
    }

    /// Axes as the vehicle model sees them. The handheld reports pushing the
    /// stick forward as negative Y, hence the optional inversion.
    pub fn axes(&self, invert_y: bool) -> (i64, i64) {
        let y = if invert_y { self.y.saturating_neg() } else { self.y };
        (self.x, y)
    }
}

impl FromStr for InputFrame {
    type Err = FrameError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if !line.starts_with('X') || !line.contains('Y') {
            return Err(FrameError::NotAFrame {
                line: line.to_string(),
            });
        }

        let fields: Vec<&str> = line.split(',').collect();
        let [x_field, y_field] = fields.as_slice() else {
            return Err(FrameError::FieldCount {
                expected: 2,
                found: fields.len(),
            });
        };

        Ok(Self {
            x: parse_tagged(x_field, 'X', "x")?,
            y: parse_tagged(y_field, 'Y', "y")?,
        })
    }
}

impl fmt::Display for InputFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X{},Y{}", self.x, self.y)
    }
}

impl OutputFrame {
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl FromStr for OutputFrame {
    type Err = FrameError;

    /// Controller-side decoding of a dashboard line.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        let [temperature, speed, fuel] = fields.as_slice() else {
            return Err(FrameError::FieldCount {
                expected: 3,
                found: fields.len(),
            });
        };

        Ok(Self {
            temperature: parse_number(temperature, "temperature")?,
            speed: parse_number(speed, "speed")?,
            fuel: parse_number(fuel, "fuel")?,
        })
    }
}

impl fmt::Display for OutputFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.temperature, self.speed, self.fuel)
    }
}

/// The tag must open the field; only the number after it may be padded.
fn parse_tagged(field: &str, tag: char, name: &'static str) -> Result<i64, FrameError> {
    match field.strip_prefix(tag) {
        Some(value) => parse_number(value, name),
        None => Err(FrameError::InvalidField {
            field: name,
            value: field.to_string(),
        }),
    }
}

fn parse_number(value: &str, name: &'static str) -> Result<i64, FrameError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| FrameError::InvalidField {
            field: name,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_axes() {
        let frame: InputFrame = "X-12,Y+40".parse().unwrap();
        assert_eq!(frame, InputFrame::new(-12, 40));
    }

    #[test]
    fn tolerates_line_endings_and_padded_numbers() {
        let frame: InputFrame = "  X 3 ,Y -2 \r\n".parse().unwrap();
        assert_eq!(frame, InputFrame::new(3, -2));
    }

    #[test]
    fn rejects_padding_before_a_tag() {
        let err = "X3, Y 2".parse::<InputFrame>().unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidField {
                field: "y",
                value: " Y 2".to_string()
            }
        );
        assert!(err.is_malformed());
    }

    #[test]
    fn inverts_y_only_when_asked() {
        let frame = InputFrame::new(3, 2);
        assert_eq!(frame.axes(true), (3, -2));
        assert_eq!(frame.axes(false), (3, 2));
        assert_eq!(InputFrame::new(0, i64::MIN).axes(true), (0, i64::MAX));
    }

    #[test]
    fn non_frames_are_not_malformed() {
        for line in ["", "hello", "Received: 1, 2, 3", "X12"] {
            let err = line.parse::<InputFrame>().unwrap_err();
            assert!(!err.is_malformed(), "{line:?} gave {err:?}");
        }
    }

    #[test]
    fn rejects_non_numeric_axis() {
        let err = "X5,YZ".parse::<InputFrame>().unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidField {
                field: "y",
                value: "Z".to_string()
            }
        );
        assert!(err.is_malformed());
    }

    #[test]
    fn rejects_extra_fields() {
        let err = "X1,Y2,3".parse::<InputFrame>().unwrap_err();
        assert_eq!(
            err,
            FrameError::FieldCount {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn rejects_untagged_second_field() {
        let err = "X1,5Y".parse::<InputFrame>().unwrap_err();
        assert!(matches!(err, FrameError::InvalidField { field: "y", .. }));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = InputFrame::from_bytes(&[b'X', 0xff, b',', b'Y']).unwrap_err();
        assert_eq!(err, FrameError::Encoding);
    }

    #[test]
    fn encodes_dashboard_line() {
        let frame = OutputFrame {
            temperature: 22,
            speed: 5,
            fuel: 99,
        };
        assert_eq!(frame.to_line(), "22,5,99\n");
        assert_eq!("22,5,99\r\n".parse::<OutputFrame>().unwrap(), frame);
    }
}
