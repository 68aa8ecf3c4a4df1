//! Signed playback rate

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback rate; positive plays forward, negative plays in reverse
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct PlaybackRate(f64);

impl PlaybackRate {
    pub const MIN_MAGNITUDE: f64 = 0.25;
    pub const MAX_MAGNITUDE: f64 = 4.0;
    pub const NORMAL: Self = Self(1.0);

    /// Creates a rate within the default magnitude bounds
    pub fn new(rate: f64) -> Result<Self> {
        Self::with_bounds(rate, Self::MIN_MAGNITUDE, Self::MAX_MAGNITUDE)
    }

    /// Creates a rate whose magnitude lies within `[min, max]`
    pub fn with_bounds(rate: f64, min: f64, max: f64) -> Result<Self> {
        if !rate.is_finite() {
            return Err(CoreError::InvalidRate {
                rate,
                reason: "rate must be a finite number".to_string(),
            });
        }
        if rate == 0.0 {
            return Err(CoreError::InvalidRate {
                rate,
                reason: "rate must not be zero".to_string(),
            });
        }
        let magnitude = rate.abs();
        if magnitude < min || magnitude > max {
            return Err(CoreError::InvalidRate {
                rate,
                reason: format!("magnitude must be between {} and {}", min, max),
            });
        }
        Ok(Self(rate))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_forward(&self) -> bool {
        self.0 > 0.0
    }

    /// Returns true if both rates play in the same direction
    pub fn same_direction(&self, other: PlaybackRate) -> bool {
        self.is_forward() == other.is_forward()
    }

    /// Same magnitude, opposite direction
    pub fn reversed(&self) -> Self {
        Self(-self.0)
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x", self.0)
    }
}
