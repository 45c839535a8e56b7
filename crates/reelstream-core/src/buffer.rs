//! Buffer health estimation
//!
//! The engine does not expose its network buffer directly, so health is a
//! coarse proxy:
//! - With a playable-until position from the engine, buffered-ahead seconds
//!   are measured against a target
//! - Otherwise playback progress (position over duration) is used

use serde::{Deserialize, Serialize};

/// Coarse buffer health buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferHealth {
    Starved,
    Low,
    Healthy,
}

/// Buffer estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Buffered-ahead seconds that count as 100%
    pub target_ahead_secs: f64,
    /// Ratio below which the buffer is starved
    pub starved_ratio: f64,
    /// Ratio below which the buffer is low
    pub low_ratio: f64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            target_ahead_secs: 30.0,
            starved_ratio: 10.0,
            low_ratio: 40.0,
        }
    }
}

/// Derives the buffer-health ratio reported to the UI
#[derive(Debug, Clone, Default)]
pub struct BufferEstimator {
    config: BufferConfig,
}

impl BufferEstimator {
    pub fn new(config: BufferConfig) -> Self {
        Self { config }
    }

    /// Percentage of position over duration, clamped to 0..=100
    pub fn ratio(&self, position: f64, duration: f64) -> f64 {
        if !position.is_finite() || !duration.is_finite() || duration <= 0.0 {
            return 0.0;
        }
        (position / duration * 100.0).clamp(0.0, 100.0)
    }

    /// Ratio using the engine's playable-until position when available
    pub fn estimate(&self, position: f64, duration: f64, playable_until: Option<f64>) -> f64 {
        match playable_until {
            Some(playable) if playable.is_finite() && self.config.target_ahead_secs > 0.0 => {
                let mut ahead = (playable - position).max(0.0);
                // Everything up to the end is buffered
                if duration > 0.0 && playable >= duration {
                    ahead = self.config.target_ahead_secs;
                }
                (ahead / self.config.target_ahead_secs * 100.0).clamp(0.0, 100.0)
            }
            _ => self.ratio(position, duration),
        }
    }

    /// Bucket a ratio
    pub fn health(&self, ratio: f64) -> BufferHealth {
        if ratio < self.config.starved_ratio {
            BufferHealth::Starved
        } else if ratio < self.config.low_ratio {
            BufferHealth::Low
        } else {
            BufferHealth::Healthy
        }
    }
}
