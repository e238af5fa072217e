use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_FRAME_RATE: FrameRate = FrameRate {
    num: 30,
    den: 1,
};

/// Rational frame rate, as carried in the y4m stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: usize,
    pub den: usize,
}

impl FrameRate {
    #[inline]
    pub fn new(num: usize, den: usize) -> Result<Self, TimecodeError> {
        if num == 0 || den == 0 {
            return Err(TimecodeError::InvalidFrameRate(format!("{num}/{den}")));
        }
        let divisor = gcd(num, den);
        Ok(Self {
            num: num / divisor,
            den: den / divisor,
        })
    }

    /// Approximate a decimal rate with millisecond precision, e.g. `29.97`
    /// becomes `2997/100`.
    #[inline]
    pub fn from_fps(fps: f64) -> Result<Self, TimecodeError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(TimecodeError::InvalidFrameRate(fps.to_string()));
        }
        let num = (fps * 1000.0).round() as usize;
        Self::new(num, 1000)
    }

    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl Default for FrameRate {
    #[inline]
    fn default() -> Self {
        DEFAULT_FRAME_RATE
    }
}

impl fmt::Display for FrameRate {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// A position in a frame sequence, expressed as a frame number at a frame
/// rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timecode {
    frame:      usize,
    frame_rate: FrameRate,
}

impl Timecode {
    #[inline]
    pub fn new(frame: usize, frame_rate: FrameRate) -> Self {
        Self {
            frame,
            frame_rate,
        }
    }

    /// Nearest frame to a time offset. Negative offsets map to frame 0.
    #[inline]
    pub fn from_seconds(seconds: f64, frame_rate: FrameRate) -> Self {
        let frame = (seconds.max(0.0) * frame_rate.as_f64()).round() as usize;
        Self::new(frame, frame_rate)
    }

    #[inline]
    pub fn frame_num(&self) -> usize {
        self.frame
    }

    #[inline]
    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    #[inline]
    pub fn seconds(&self) -> f64 {
        self.frame as f64 / self.frame_rate.as_f64()
    }
}

impl fmt::Display for Timecode {
    /// `HH:MM:SS.mmm`
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = (self.seconds() * 1000.0).round() as u64;
        let (hours, rest) = (millis / 3_600_000, millis % 3_600_000);
        let (minutes, rest) = (rest / 60_000, rest % 60_000);
        let (seconds, millis) = (rest / 1000, rest % 1000);
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[derive(Debug, Error)]
pub enum TimecodeError {
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(String),
}
