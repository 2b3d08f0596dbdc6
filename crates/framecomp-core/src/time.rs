//! Time coordinate systems for frame-accurate caching and composition.
//!
//! Three coordinate systems are kept distinct and convertible:
//! wall-clock seconds (`f64`), frame index (integer, local to a frame rate),
//! and stream pts (integer ticks of a rational time base). Conversions use
//! rational arithmetic so that index/pts round-trips are exact whenever the
//! frame interval is an exact multiple of the time base.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FramecompError, Result};

/// Rational seconds-per-tick for one stream (e.g. 1/30000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBase {
    value: Rational64,
}

impl TimeBase {
    /// Create a time base of `numerator / denominator` seconds per tick.
    /// Both values must be positive.
    pub fn new(numerator: i64, denominator: i64) -> Result<Self> {
        if numerator <= 0 || denominator <= 0 {
            return Err(FramecompError::InvalidArgument(format!(
                "time base must be positive, got {}/{}",
                numerator, denominator
            )));
        }
        Ok(Self {
            value: Rational64::new(numerator, denominator),
        })
    }

    /// The underlying rational value (seconds per tick).
    #[inline]
    pub fn as_rational(self) -> Rational64 {
        self.value
    }

    /// 1/30000 seconds per tick, common for 30 and 29.97 fps video.
    pub const TICKS_30K: Self = Self {
        value: Rational64::new_raw(1, 30000),
    };

    /// 1/48000 seconds per tick: one tick per audio sample at 48 kHz.
    pub const TICKS_48K: Self = Self {
        value: Rational64::new_raw(1, 48000),
    };

    /// Seconds per tick as f64.
    #[inline]
    pub fn seconds_per_tick(self) -> f64 {
        *self.value.numer() as f64 / *self.value.denom() as f64
    }

    /// Convert a pts in this time base to wall-clock seconds.
    #[inline]
    pub fn pts_to_seconds(self, pts: i64) -> f64 {
        pts as f64 * self.seconds_per_tick()
    }

    /// Convert wall-clock seconds to the nearest pts in this time base.
    #[inline]
    pub fn seconds_to_pts(self, seconds: f64) -> i64 {
        (seconds / self.seconds_per_tick()).round() as i64
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value.numer(), self.value.denom())
    }
}

/// Frame rate as a rational number (e.g. 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g. 30000)
    pub numerator: u32,
    /// Denominator (e.g. 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of one frame in seconds.
    #[inline]
    pub fn interval(self) -> f64 {
        self.denominator as f64 / self.numerator as f64
    }

    /// Common frame rates
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// A validated (time base, frame rate) pairing for one stream.
///
/// All conversions round to nearest in both directions, so
/// `pts_to_index(index_to_pts(i)) == i` holds whenever the frame interval
/// is an exact multiple of the time base. For non-exact rational
/// combinations integer rounding can lose information; this is a known
/// limitation, not a defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeMap {
    time_base: TimeBase,
    frame_rate: FrameRate,
}

impl TimeMap {
    /// Pair a time base with a frame rate. The frame rate must be positive.
    pub fn new(time_base: TimeBase, frame_rate: FrameRate) -> Result<Self> {
        if frame_rate.numerator == 0 || frame_rate.denominator == 0 {
            return Err(FramecompError::InvalidArgument(format!(
                "frame rate must be positive, got {}/{}",
                frame_rate.numerator, frame_rate.denominator
            )));
        }
        Ok(Self {
            time_base,
            frame_rate,
        })
    }

    #[inline]
    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    #[inline]
    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// Wall-clock seconds to the nearest pts.
    #[inline]
    pub fn t_to_pts(&self, t: f64) -> i64 {
        self.time_base.seconds_to_pts(t)
    }

    /// Pts to wall-clock seconds.
    #[inline]
    pub fn pts_to_t(&self, pts: i64) -> f64 {
        self.time_base.pts_to_seconds(pts)
    }

    /// Frame index to pts: `round((index / fps) / time_base)`, computed
    /// exactly in rational arithmetic.
    pub fn index_to_pts(&self, index: i64) -> i64 {
        let tb = self.time_base.as_rational();
        let seconds = Rational64::new(
            index * self.frame_rate.denominator as i64,
            self.frame_rate.numerator as i64,
        );
        (seconds / tb).round().to_integer()
    }

    /// Pts to frame index: `round((pts * time_base) * fps)`, computed
    /// exactly in rational arithmetic.
    pub fn pts_to_index(&self, pts: i64) -> i64 {
        let tb = self.time_base.as_rational();
        let fps = Rational64::new(
            self.frame_rate.numerator as i64,
            self.frame_rate.denominator as i64,
        );
        (tb * pts * fps).round().to_integer()
    }

    /// Wall-clock seconds to frame index: `floor(t * fps)`.
    #[inline]
    pub fn t_to_index(&self, t: f64) -> i64 {
        (t * self.frame_rate.to_fps_f64()).floor() as i64
    }

    /// Frame index to wall-clock seconds.
    #[inline]
    pub fn index_to_t(&self, index: i64) -> f64 {
        index as f64 * self.frame_rate.interval()
    }
}
