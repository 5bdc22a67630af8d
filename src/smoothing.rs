//! Exponential-approach smoothing of playback position
//!
//! Writing the target time directly on every frame makes playback stutter
//! because each seek costs a decode. Instead each tick moves the position a
//! fixed fraction of the remaining distance (a first-order lag), which settles
//! within a handful of frames at 60 Hz.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Calibration for the per-frame smoothing step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    /// Fraction of the remaining time difference applied per tick
    pub easing: f64,
    /// Differences at or below this many seconds are left alone
    pub write_threshold: f64,
    /// Progress changes at or below this are not turned into a new target
    pub progress_epsilon: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            easing: 0.2,
            write_threshold: 0.005,
            progress_epsilon: 1e-4,
        }
    }
}

impl SmoothingParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.easing > 0.0 && self.easing <= 1.0) {
            return Err(Error::ConfigError(format!(
                "easing must be in (0, 1], got {}",
                self.easing
            )));
        }
        if !(self.write_threshold >= 0.0 && self.write_threshold.is_finite()) {
            return Err(Error::ConfigError(format!(
                "write_threshold must be a non-negative number, got {}",
                self.write_threshold
            )));
        }
        if !(self.progress_epsilon >= 0.0 && self.progress_epsilon < 1.0) {
            return Err(Error::ConfigError(format!(
                "progress_epsilon must be in [0, 1), got {}",
                self.progress_epsilon
            )));
        }
        Ok(())
    }

    /// Whether `progress` moved far enough from the last applied value.
    /// `None` means nothing has been applied yet.
    pub fn progress_changed(&self, progress: f64, last: Option<f64>) -> bool {
        match last {
            Some(last) => (progress - last).abs() > self.progress_epsilon,
            None => true,
        }
    }

    /// Next playback position on the way from `current` to `target`, or
    /// `None` when the two are already close enough.
    pub fn step(&self, target: f64, current: f64) -> Option<f64> {
        let diff = target - current;
        if !diff.is_finite() || diff.abs() <= self.write_threshold {
            return None;
        }
        Some(current + diff * self.easing)
    }
}

/// A duration that target times can be derived from: finite and positive.
pub fn known_duration(duration: f64) -> Option<f64> {
    (duration.is_finite() && duration > 0.0).then_some(duration)
}
