//! # Session Configuration
//!
//! Timing and policy knobs for the playback session controller.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::navigator::ShufflePolicy;

/// Session controller configuration.
///
/// Every field has a serde default, so a host can deserialize a partial
/// settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How often progress is read from the engine and published while
    /// playing.
    ///
    /// Default: 250 ms.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: Duration,

    /// Minimum spacing between position store writes during playback.
    /// Teardown always writes regardless of this throttle.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_position_write_interval")]
    pub position_write_interval: Duration,

    /// Position records older than this are ignored and pruned.
    ///
    /// Default: 30 days.
    #[serde(default = "default_position_retention")]
    pub position_retention: Duration,

    /// Shuffle draw policy.
    ///
    /// Default: memoryless.
    #[serde(default)]
    pub shuffle_policy: ShufflePolicy,

    /// Whether a selection starts playing as soon as it is loaded.
    ///
    /// Default: true.
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,

    /// Capacity of the command queue between handles and the controller.
    ///
    /// Default: 64.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
            position_write_interval: default_position_write_interval(),
            position_retention: default_position_retention(),
            shuffle_policy: ShufflePolicy::default(),
            autoplay: default_autoplay(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_position_write_interval(mut self, interval: Duration) -> Self {
        self.position_write_interval = interval;
        self
    }

    pub fn with_position_retention(mut self, retention: Duration) -> Self {
        self.position_retention = retention;
        self
    }

    pub fn with_shuffle_policy(mut self, policy: ShufflePolicy) -> Self {
        self.shuffle_policy = policy;
        self
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.progress_interval.is_zero() {
            return Err("progress_interval must be > 0".to_string());
        }

        if self.position_write_interval < self.progress_interval {
            return Err(
                "position_write_interval cannot be shorter than progress_interval".to_string(),
            );
        }

        if self.position_retention.is_zero() {
            return Err("position_retention must be > 0".to_string());
        }

        if self.command_buffer == 0 {
            return Err("command_buffer must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_progress_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_position_write_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_position_retention() -> Duration {
    Duration::from_secs(30 * 24 * 60 * 60)
}

fn default_autoplay() -> bool {
    true
}

fn default_command_buffer() -> usize {
    64
}
