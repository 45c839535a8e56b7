//! Player configuration

use crate::{buffer::BufferConfig, error::Error, types::DeviceProfile, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Delay growth between automatic retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    Fixed,
    Exponential,
}

/// Automatic retry policy for retryable failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Automatic retries before the error is surfaced
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds
    pub base_delay_ms: u64,
    pub backoff: Backoff,
    /// Upper bound for exponential delays in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay_ms: 3_000,
            backoff: Backoff::Fixed,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let millis = match self.backoff {
            Backoff::Fixed => self.base_delay_ms,
            Backoff::Exponential => {
                let exponent = attempt.saturating_sub(1).min(16);
                self.base_delay_ms
                    .saturating_mul(1u64 << exponent)
                    .min(self.max_delay_ms)
            }
        };
        Duration::from_millis(millis)
    }

    pub fn allows(&self, retries_so_far: u32) -> bool {
        retries_so_far < self.max_retries
    }
}

/// Player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Platform segment of the streaming endpoints
    pub platform: String,
    /// Start playback as soon as the stream is ready
    pub autoplay: bool,
    pub retry: RetryPolicy,
    /// Upper bound on Buffering after a seek or stall
    pub seek_settle_timeout_ms: u64,
    /// Upper bound on waiting for the new stream during a quality switch
    pub switch_settle_timeout_ms: u64,
    /// Minimum spacing of processed time updates
    pub time_update_interval_ms: u64,
    /// Minimum spacing of processed time updates on low-performance devices
    pub low_performance_time_update_interval_ms: u64,
    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Fetch the selected variant playlist to learn the duration up front
    pub probe_variant_duration: bool,
    pub buffer: BufferConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            platform: "android".to_string(),
            autoplay: true,
            retry: RetryPolicy::default(),
            seek_settle_timeout_ms: 5_000,
            switch_settle_timeout_ms: 8_000,
            time_update_interval_ms: 500,
            low_performance_time_update_interval_ms: 1_000,
            request_timeout_ms: 10_000,
            probe_variant_duration: true,
            buffer: BufferConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Reject values that would stall the controller
    pub fn validate(&self) -> Result<()> {
        if self.platform.trim().is_empty() {
            return Err(Error::InvalidConfig("platform must not be empty".into()));
        }
        if self.seek_settle_timeout_ms == 0 || self.switch_settle_timeout_ms == 0 {
            return Err(Error::InvalidConfig("settle timeouts must be positive".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig("request timeout must be positive".into()));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(Error::InvalidConfig(format!(
                "retry max_delay_ms ({}) is below base_delay_ms ({})",
                self.retry.max_delay_ms, self.retry.base_delay_ms
            )));
        }
        if self.buffer.target_ahead_secs <= 0.0 {
            return Err(Error::InvalidConfig("buffer target must be positive".into()));
        }
        Ok(())
    }

    pub fn seek_settle_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_settle_timeout_ms)
    }

    pub fn switch_settle_timeout(&self) -> Duration {
        Duration::from_millis(self.switch_settle_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Time update throttle for the given device
    pub fn time_update_interval(&self, device: DeviceProfile) -> Duration {
        if device.low_performance {
            Duration::from_millis(self.low_performance_time_update_interval_ms)
        } else {
            Duration::from_millis(self.time_update_interval_ms)
        }
    }
}
