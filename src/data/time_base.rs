//! Sampling-rate context shared by compared sortings.

use crate::error::{CompareError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relative tolerance when comparing sampling frequencies.
const FREQUENCY_TOLERANCE: f64 = 1e-9;

/// The time base of a sorting: spike frames are sample indices at
/// `sampling_frequency` Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBase {
    sampling_frequency: f64,
}

impl TimeBase {
    /// Create a time base. The frequency must be finite and positive.
    pub fn new(sampling_frequency: f64) -> Result<Self> {
        if !sampling_frequency.is_finite() || sampling_frequency <= 0.0 {
            return Err(CompareError::InvalidTimeBase(format!(
                "sampling frequency must be finite and > 0, got {}",
                sampling_frequency
            )));
        }
        Ok(Self { sampling_frequency })
    }

    /// Sampling frequency in Hz.
    #[inline]
    pub fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    /// Whether two time bases describe the same clock.
    pub fn is_compatible(&self, other: &TimeBase) -> bool {
        let a = self.sampling_frequency;
        let b = other.sampling_frequency;
        (a - b).abs() <= FREQUENCY_TOLERANCE * a.max(b)
    }

    /// Fail with `IncompatibleSamplingContext` unless compatible.
    pub fn ensure_compatible(&self, other: &TimeBase) -> Result<()> {
        if self.is_compatible(other) {
            Ok(())
        } else {
            Err(CompareError::IncompatibleSamplingContext {
                left: self.sampling_frequency,
                right: other.sampling_frequency,
            })
        }
    }

    /// Convert a duration to a whole number of frames (rounded).
    pub fn duration_to_frames(&self, duration: Duration) -> i64 {
        (duration.as_secs_f64() * self.sampling_frequency).round() as i64
    }

    /// Convert milliseconds to a whole number of frames (rounded).
    pub fn ms_to_frames(&self, ms: f64) -> i64 {
        (ms * self.sampling_frequency / 1000.0).round() as i64
    }

    /// Frame index to seconds.
    pub fn frames_to_seconds(&self, frame: i64) -> f64 {
        frame as f64 / self.sampling_frequency
    }

    /// Seconds to the nearest frame index.
    pub fn seconds_to_frame(&self, seconds: f64) -> i64 {
        (seconds * self.sampling_frequency).round() as i64
    }
}
