//! # Position Store
//!
//! Remembers where each track was last left off so playback can resume.
//!
//! Records are small JSON documents under `position:<track id>` in a
//! [`KeyValueStore`]. Nothing here is allowed to break playback: read
//! failures degrade to "no saved position" and write failures are logged and
//! dropped.

use bridge_traits::{Clock, KeyValueStore};
use bytes::Bytes;
use core_library::TrackId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::Result;

const KEY_PREFIX: &str = "position:";

/// Persisted resume point for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub track_key: String,
    pub offset_seconds: f64,
    /// Unix milliseconds when the record was written.
    pub timestamp: i64,
}

/// Per-track resume offsets with a retention window.
#[derive(Clone)]
pub struct PositionStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl PositionStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self {
            store,
            clock,
            retention,
        }
    }

    fn key(track: &TrackId) -> String {
        format!("{}{}", KEY_PREFIX, track)
    }

    fn is_expired(&self, record: &PositionRecord) -> bool {
        let age_ms = self.clock.unix_timestamp_millis() - record.timestamp;
        age_ms > 0 && age_ms as u128 > self.retention.as_millis()
    }

    /// Record `offset_seconds` for `track`. Failures are logged, never returned.
    #[instrument(skip(self), fields(track = %track))]
    pub async fn save(&self, track: &TrackId, offset_seconds: f64) {
        if let Err(e) = self.try_save(track, offset_seconds).await {
            warn!(error = %e, "Failed to save playback position");
        }
    }

    async fn try_save(&self, track: &TrackId, offset_seconds: f64) -> Result<()> {
        if !offset_seconds.is_finite() || offset_seconds < 0.0 {
            debug!(offset_seconds, "Ignoring invalid playback position");
            return Ok(());
        }

        let record = PositionRecord {
            track_key: track.to_string(),
            offset_seconds,
            timestamp: self.clock.unix_timestamp_millis(),
        };
        let payload = serde_json::to_vec(&record)?;
        self.store.put(&Self::key(track), Bytes::from(payload)).await?;
        debug!(offset_seconds, "Saved playback position");
        Ok(())
    }

    /// Saved offset for `track`, if a fresh record exists.
    ///
    /// Expired or unreadable records are deleted on the way out.
    #[instrument(skip(self), fields(track = %track))]
    pub async fn load(&self, track: &TrackId) -> Option<f64> {
        let key = Self::key(track);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read playback position");
                return None;
            }
        };

        let record: PositionRecord = match serde_json::from_slice(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable playback position");
                self.delete_quietly(&key).await;
                return None;
            }
        };

        if self.is_expired(&record) {
            debug!("Discarding expired playback position");
            self.delete_quietly(&key).await;
            return None;
        }

        Some(record.offset_seconds)
    }

    /// Forget the saved offset for `track`.
    #[instrument(skip(self), fields(track = %track))]
    pub async fn clear(&self, track: &TrackId) {
        self.delete_quietly(&Self::key(track)).await;
    }

    /// Delete every record older than the retention window. Returns how many
    /// were removed.
    #[instrument(skip(self))]
    pub async fn prune(&self) -> usize {
        let keys = match self.store.keys_with_prefix(KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate playback positions");
                return 0;
            }
        };

        let mut pruned = 0;
        for key in keys {
            let stale = match self.store.get(&key).await {
                Ok(Some(raw)) => serde_json::from_slice::<PositionRecord>(&raw)
                    .map(|record| self.is_expired(&record))
                    .unwrap_or(true),
                Ok(None) => false,
                Err(e) => {
                    warn!(error = %e, key = %key, "Failed to read playback position");
                    false
                }
            };

            if stale {
                self.delete_quietly(&key).await;
                pruned += 1;
            }
        }

        debug!(pruned, "Pruned playback positions");
        pruned
    }

    async fn delete_quietly(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            warn!(error = %e, key, "Failed to delete playback position");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::MemoryKeyValueStore;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::ManualClock;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use mockall::mock;

    mock! {
        Store {}

        #[async_trait]
        impl KeyValueStore for Store {
            async fn get(&self, key: &str) -> BridgeResult<Option<Bytes>>;
            async fn put(&self, key: &str, value: Bytes) -> BridgeResult<()>;
            async fn delete(&self, key: &str) -> BridgeResult<()>;
            async fn keys(&self) -> BridgeResult<Vec<String>>;
        }
    }

    const DAY: u64 = 24 * 60 * 60;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn positions(store: Arc<dyn KeyValueStore>, clock: Arc<ManualClock>) -> PositionStore {
        PositionStore::new(store, clock, Duration::from_secs(30 * DAY))
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let positions = positions(store.clone(), clock());
        let track = TrackId::new("a.mp3");

        assert_eq!(positions.load(&track).await, None);
        positions.save(&track, 42.0).await;
        assert_eq!(positions.load(&track).await, Some(42.0));

        let raw = store.get("position:a.mp3").await.unwrap().unwrap();
        let record: PositionRecord = serde_json::from_slice(&raw).unwrap();
        assert_eq!(record.track_key, "a.mp3");
    }

    #[tokio::test]
    async fn test_clear_removes_record() {
        let positions = positions(Arc::new(MemoryKeyValueStore::new()), clock());
        let track = TrackId::new("a.mp3");

        positions.save(&track, 10.0).await;
        positions.clear(&track).await;
        assert_eq!(positions.load(&track).await, None);
    }

    #[tokio::test]
    async fn test_expired_record_is_ignored_and_deleted() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let clock = clock();
        let positions = positions(store.clone(), clock.clone());
        let track = TrackId::new("a.mp3");

        positions.save(&track, 10.0).await;
        clock.advance(ChronoDuration::days(31));

        assert_eq!(positions.load(&track).await, None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_prune_only_removes_stale_records() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let clock = clock();
        let positions = positions(store.clone(), clock.clone());

        positions.save(&TrackId::new("old.mp3"), 1.0).await;
        clock.advance(ChronoDuration::days(20));
        positions.save(&TrackId::new("new.mp3"), 2.0).await;
        store
            .put("position:broken.mp3", Bytes::from_static(b"{"))
            .await
            .unwrap();
        store
            .put("payload:a.mp3", Bytes::from_static(b"ID3"))
            .await
            .unwrap();
        clock.advance(ChronoDuration::days(15));

        assert_eq!(positions.prune().await, 2);

        let keys = store.keys().await.unwrap();
        assert_eq!(keys, vec!["payload:a.mp3", "position:new.mp3"]);
    }

    #[tokio::test]
    async fn test_invalid_offsets_are_not_written() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let positions = positions(store.clone(), clock());

        positions.save(&TrackId::new("a.mp3"), f64::NAN).await;
        positions.save(&TrackId::new("a.mp3"), -1.0).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_store_failures_are_non_fatal() {
        let mut store = MockStore::new();
        store
            .expect_get()
            .returning(|_| Err(BridgeError::Storage("disk unplugged".to_string())));
        store
            .expect_put()
            .returning(|_, _| Err(BridgeError::Storage("disk unplugged".to_string())));
        store
            .expect_keys()
            .returning(|| Err(BridgeError::Storage("disk unplugged".to_string())));

        let positions = positions(Arc::new(store), clock());
        let track = TrackId::new("a.mp3");

        positions.save(&track, 5.0).await;
        assert_eq!(positions.load(&track).await, None);
        assert_eq!(positions.prune().await, 0);
    }
}
