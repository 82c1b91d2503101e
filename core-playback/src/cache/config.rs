//! Cache configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the media resource cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Upper bound on persisted payload bytes (default: 512 MiB)
    #[serde(default = "default_budget_bytes")]
    pub budget_bytes: u64,

    /// How long an unused handle stays resolvable before it is revoked
    /// (default: 5s)
    #[serde(default = "default_handle_cooldown")]
    pub handle_cooldown: Duration,

    /// Timeout for one network fetch attempt (default: 30s)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: Duration,

    /// Transport attempts per fetch, including the first (default: 1)
    #[serde(default = "default_max_fetch_attempts")]
    pub max_fetch_attempts: u32,

    /// Delay before the second attempt; doubles on each further attempt
    /// (default: 250ms)
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: Duration,

    /// Check persisted bytes against their recorded SHA-256 (default: true)
    #[serde(default = "default_verify_integrity")]
    pub verify_integrity: bool,

    /// Prefix for every key written to the byte store, so several caches can
    /// share one store (default: empty)
    #[serde(default)]
    pub key_namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            budget_bytes: default_budget_bytes(),
            handle_cooldown: default_handle_cooldown(),
            fetch_timeout: default_fetch_timeout(),
            max_fetch_attempts: default_max_fetch_attempts(),
            retry_backoff: default_retry_backoff(),
            verify_integrity: default_verify_integrity(),
            key_namespace: String::new(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the persisted size budget.
    pub fn with_budget(mut self, bytes: u64) -> Self {
        self.budget_bytes = bytes;
        self
    }

    /// Set the idle grace period before a handle is revoked.
    pub fn with_handle_cooldown(mut self, cooldown: Duration) -> Self {
        self.handle_cooldown = cooldown;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_max_fetch_attempts(mut self, attempts: u32) -> Self {
        self.max_fetch_attempts = attempts;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_integrity_check(mut self, verify: bool) -> Self {
        self.verify_integrity = verify;
        self
    }

    pub fn with_key_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.key_namespace = namespace.into();
        self
    }

    /// Delay before attempt `attempt + 1` (attempts are 1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_backoff.saturating_mul(factor)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.budget_bytes == 0 {
            return Err("budget_bytes must be > 0".to_string());
        }

        if self.handle_cooldown.is_zero() {
            return Err("handle_cooldown must be > 0".to_string());
        }

        if self.fetch_timeout.is_zero() {
            return Err("fetch_timeout must be > 0".to_string());
        }

        if self.max_fetch_attempts == 0 {
            return Err("max_fetch_attempts must be at least 1".to_string());
        }

        if self.key_namespace.contains(':') {
            return Err("key_namespace cannot contain ':'".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_budget_bytes() -> u64 {
    512 * 1024 * 1024
}

fn default_handle_cooldown() -> Duration {
    Duration::from_secs(5)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_fetch_attempts() -> u32 {
    1
}

fn default_retry_backoff() -> Duration {
    Duration::from_millis(250)
}

fn default_verify_integrity() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.budget_bytes, 512 * 1024 * 1024);
        assert_eq!(config.max_fetch_attempts, 1);
        assert!(config.verify_integrity);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::new()
            .with_budget(10)
            .with_handle_cooldown(Duration::from_millis(50))
            .with_max_fetch_attempts(3)
            .with_integrity_check(false)
            .with_key_namespace("music");

        assert_eq!(config.budget_bytes, 10);
        assert_eq!(config.handle_cooldown, Duration::from_millis(50));
        assert_eq!(config.max_fetch_attempts, 3);
        assert!(!config.verify_integrity);
        assert_eq!(config.key_namespace, "music");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(CacheConfig::new().with_budget(0).validate().is_err());
        assert!(CacheConfig::new()
            .with_handle_cooldown(Duration::ZERO)
            .validate()
            .is_err());
        assert!(CacheConfig::new()
            .with_fetch_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(CacheConfig::new()
            .with_max_fetch_attempts(0)
            .validate()
            .is_err());
        assert!(CacheConfig::new()
            .with_key_namespace("a:b")
            .validate()
            .is_err());
    }

    #[test]
    fn test_exponential_backoff() {
        let config = CacheConfig::new().with_retry_backoff(Duration::from_millis(100));
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(400));
    }
}
