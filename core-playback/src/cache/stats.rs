//! Cache statistics and monitoring

use serde::{Deserialize, Serialize};

/// Snapshot of the resource cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of persisted entries
    pub entries: usize,

    /// Bytes held by persisted entries
    pub total_bytes: u64,

    /// Configured upper bound for `total_bytes`
    pub budget_bytes: u64,

    /// Handles that are still resolvable (in use or cooling down)
    pub live_handles: usize,

    /// Resolves served from the in-memory handle table
    pub hits_memory: u64,

    /// Resolves served from the persistent byte store
    pub hits_persistent: u64,

    /// Resolves that went to the network
    pub misses: u64,

    /// Persisted entries removed to make room
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate cache usage as a percentage of the budget.
    pub fn usage_percentage(&self) -> f64 {
        if self.budget_bytes == 0 {
            return 0.0;
        }

        (self.total_bytes as f64 / self.budget_bytes as f64) * 100.0
    }

    /// Returns true if the cache is near capacity (>90%).
    pub fn is_near_capacity(&self) -> bool {
        self.usage_percentage() > 90.0
    }

    /// Fraction of resolves that avoided the network.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits_memory + self.hits_persistent;
        let total = hits + self.misses;
        if total == 0 {
            return 0.0;
        }

        hits as f64 / total as f64
    }

    /// Bytes still available before eviction kicks in.
    pub fn headroom(&self) -> u64 {
        self.budget_bytes.saturating_sub(self.total_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_and_headroom() {
        let stats = CacheStats {
            entries: 2,
            total_bytes: 95,
            budget_bytes: 100,
            ..Default::default()
        };

        assert_eq!(stats.usage_percentage(), 95.0);
        assert!(stats.is_near_capacity());
        assert_eq!(stats.headroom(), 5);
    }

    #[test]
    fn test_hit_ratio() {
        let stats = CacheStats {
            hits_memory: 2,
            hits_persistent: 1,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_ratio(), 0.75);
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }
}
