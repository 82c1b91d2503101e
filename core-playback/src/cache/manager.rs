//! # Resource Cache
//!
//! Turns a catalogue entry into play-ready payload bytes.
//!
//! Lookup order on `resolve`:
//! 1. the in-memory handle table (no I/O),
//! 2. the persistent byte store,
//! 3. the network, through a [`PayloadFetcher`].
//!
//! Fetched bytes are written to the byte store only after the fetch
//! succeeded. Persisted entries are tracked in an LRU index whose total
//! never exceeds the configured budget; least recently used entries are
//! evicted until an incoming entry fits. Every persistence failure is logged
//! and swallowed: the caller still gets its handle.

use bridge_traits::{Clock, KeyValueStore};
use bytes::Bytes;
use core_async::sync::Mutex as AsyncMutex;
use core_async::time::{sleep, timeout};
use core_library::{CatalogueEntry, TrackId};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_locator;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

use crate::cache::config::CacheConfig;
use crate::cache::fetch::PayloadFetcher;
use crate::cache::handle::{HandleTable, ResolvedHandle};
use crate::cache::stats::CacheStats;
use crate::error::{FetchError, PlaybackError, Result};

/// Metadata persisted next to every payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct EntryMeta {
    size_bytes: u64,
    last_access_ms: i64,
    content_hash: String,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    size_bytes: u64,
    content_hash: String,
}

/// LRU view of the persistent byte store, built lazily.
struct PersistentIndex {
    loaded: bool,
    entries: LruCache<TrackId, IndexEntry>,
    total_bytes: u64,
}

impl PersistentIndex {
    fn new() -> Self {
        Self {
            loaded: false,
            entries: LruCache::unbounded(),
            total_bytes: 0,
        }
    }

    fn insert(&mut self, track: TrackId, entry: IndexEntry) {
        let size = entry.size_bytes;
        if let Some(previous) = self.entries.put(track, entry) {
            self.total_bytes = self.total_bytes.saturating_sub(previous.size_bytes);
        }
        self.total_bytes += size;
    }

    fn remove(&mut self, track: &TrackId) -> Option<IndexEntry> {
        let entry = self.entries.pop(track)?;
        self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    fn pop_oldest(&mut self) -> Option<(TrackId, IndexEntry)> {
        let (track, entry) = self.entries.pop_lru()?;
        self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
        Some((track, entry))
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits_memory: AtomicU64,
    hits_persistent: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Fetches, persists and hands out track payloads under a size budget.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct ResourceCache {
    config: CacheConfig,
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn PayloadFetcher>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
    handles: Arc<Mutex<HandleTable>>,
    index: Mutex<PersistentIndex>,
    /// Serialises index bootstrap, eviction and writes to the byte store.
    persist_lock: AsyncMutex<()>,
    counters: Counters,
}

impl ResourceCache {
    /// Create a cache over `store`, fetching misses through `fetcher`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidConfig`] if `config` does not validate.
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn PayloadFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate().map_err(|e| {
            PlaybackError::InvalidConfig(format!("Invalid cache configuration: {}", e))
        })?;

        Ok(Self {
            config,
            store,
            fetcher,
            clock,
            event_bus: None,
            handles: Arc::new(Mutex::new(HandleTable::default())),
            index: Mutex::new(PersistentIndex::new()),
            persist_lock: AsyncMutex::new(()),
            counters: Counters::default(),
        })
    }

    /// Publish [`CacheEvent`]s on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // ========================================================================
    // Public API
    // ========================================================================

    /// Resolve `entry` to a play-ready handle.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the payload is neither cached nor
    /// fetchable. A zero-length payload is always an error.
    #[instrument(skip(self, entry), fields(track = %entry.id))]
    pub async fn resolve(
        &self,
        entry: &CatalogueEntry,
    ) -> std::result::Result<ResolvedHandle, FetchError> {
        let hit = self.handles.lock().acquire(&entry.id);
        if let Some(handle) = hit {
            self.index.lock().entries.promote(&entry.id);
            self.counters.hits_memory.fetch_add(1, Ordering::Relaxed);
            trace!("Served from handle table");
            return Ok(handle);
        }

        self.ensure_index().await;

        if let Some(payload) = self.read_persisted(&entry.id).await {
            self.counters.hits_persistent.fetch_add(1, Ordering::Relaxed);
            debug!(size_bytes = payload.len(), "Served from persistent cache");
            return Ok(self.handles.lock().insert(&entry.id, payload));
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let payload = self.fetch_with_retry(&entry.locator).await?;
        let size_bytes = payload.len() as u64;
        let persisted = self.persist(&entry.id, &payload).await;

        info!(size_bytes, persisted, "Fetched payload");
        self.emit(CacheEvent::Fetched {
            track_id: entry.id.to_string(),
            size_bytes,
            persisted,
        });

        Ok(self.handles.lock().insert(&entry.id, payload))
    }

    /// Give back a handle obtained from [`resolve`](Self::resolve).
    ///
    /// When the last use of a track's handle is released, the handle stays
    /// resolvable for `handle_cooldown` and is then revoked. Must be called
    /// from within the async runtime.
    pub fn release(&self, handle: ResolvedHandle) {
        let pending = self.handles.lock().release(&handle);
        let Some(pending) = pending else {
            return;
        };

        let handles = Arc::clone(&self.handles);
        let cooldown = self.config.handle_cooldown;
        core_async::spawn(async move {
            sleep(cooldown).await;
            if handles.lock().revoke_if_idle(&pending) {
                trace!(track = %pending.track, "Revoked idle handle");
            }
        });
    }

    /// Delete every persisted entry and revoke idle handles. Handles still in
    /// use keep working. Returns the number of persisted entries removed.
    #[instrument(skip(self))]
    pub async fn purge(&self) -> usize {
        self.ensure_index().await;
        let _guard = self.persist_lock.lock().await;

        let drained: Vec<TrackId> = {
            let mut index = self.index.lock();
            let mut drained = Vec::with_capacity(index.entries.len());
            while let Some((track, _)) = index.pop_oldest() {
                drained.push(track);
            }
            drained
        };

        for track in &drained {
            self.delete_keys(track).await;
        }

        let revoked = self.handles.lock().revoke_idle();
        info!(removed = drained.len(), revoked, "Purged resource cache");
        drained.len()
    }

    /// Delete one persisted entry. Returns `true` if it existed.
    #[instrument(skip(self), fields(track = %track))]
    pub async fn remove(&self, track: &TrackId) -> bool {
        self.ensure_index().await;
        let _guard = self.persist_lock.lock().await;

        let removed = self.index.lock().remove(track);
        match removed {
            Some(_) => {
                self.delete_keys(track).await;
                debug!("Removed persisted entry");
                true
            }
            None => false,
        }
    }

    /// Outstanding handles for `track`.
    pub fn handle_usage(&self, track: &TrackId) -> usize {
        self.handles.lock().usage(track)
    }

    /// Bytes currently held in the persistent cache.
    pub async fn current_size(&self) -> u64 {
        self.ensure_index().await;
        self.index.lock().total_bytes
    }

    pub async fn stats(&self) -> CacheStats {
        self.ensure_index().await;
        let (entries, total_bytes) = {
            let index = self.index.lock();
            (index.entries.len(), index.total_bytes)
        };

        CacheStats {
            entries,
            total_bytes,
            budget_bytes: self.config.budget_bytes,
            live_handles: self.handles.lock().live(),
            hits_memory: self.counters.hits_memory.load(Ordering::Relaxed),
            hits_persistent: self.counters.hits_persistent.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    // ========================================================================
    // Keys
    // ========================================================================

    fn prefix(&self, kind: &str) -> String {
        if self.config.key_namespace.is_empty() {
            format!("{}:", kind)
        } else {
            format!("{}:{}:", self.config.key_namespace, kind)
        }
    }

    fn payload_key(&self, track: &TrackId) -> String {
        format!("{}{}", self.prefix("payload"), track)
    }

    fn meta_key(&self, track: &TrackId) -> String {
        format!("{}{}", self.prefix("meta"), track)
    }

    // ========================================================================
    // Persistent index
    // ========================================================================

    async fn ensure_index(&self) {
        if self.index.lock().loaded {
            return;
        }

        let _guard = self.persist_lock.lock().await;
        if self.index.lock().loaded {
            return;
        }

        let mut entries = self.scan_store().await;
        entries.sort_by_key(|(_, meta)| meta.last_access_ms);

        {
            let mut index = self.index.lock();
            for (track, meta) in entries {
                index.insert(
                    track,
                    IndexEntry {
                        size_bytes: meta.size_bytes,
                        content_hash: meta.content_hash,
                    },
                );
            }
            index.loaded = true;
            debug!(
                entries = index.entries.len(),
                total_bytes = index.total_bytes,
                "Loaded persistent cache index"
            );
        }

        self.evict_until_fits(0).await;
    }

    /// Read every metadata record and delete payloads that have none.
    async fn scan_store(&self) -> Vec<(TrackId, EntryMeta)> {
        let meta_prefix = self.prefix("meta");
        let meta_keys = match self.store.keys_with_prefix(&meta_prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate cache metadata, starting empty");
                return Vec::new();
            }
        };

        let mut entries = Vec::with_capacity(meta_keys.len());
        for key in meta_keys {
            let Some(id) = key.strip_prefix(&meta_prefix) else {
                continue;
            };
            let track = TrackId::new(id);

            match self.store.get(&key).await {
                Ok(Some(raw)) => match serde_json::from_slice::<EntryMeta>(&raw) {
                    Ok(meta) => entries.push((track, meta)),
                    Err(e) => {
                        warn!(error = %e, track = %track, "Dropping unreadable cache metadata");
                        self.delete_keys(&track).await;
                    }
                },
                Ok(None) => {}
                Err(e) => warn!(error = %e, track = %track, "Failed to read cache metadata"),
            }
        }

        let payload_prefix = self.prefix("payload");
        match self.store.keys_with_prefix(&payload_prefix).await {
            Ok(keys) => {
                for key in keys {
                    let orphan = key
                        .strip_prefix(&payload_prefix)
                        .map_or(false, |id| !entries.iter().any(|(t, _)| t.as_str() == id));
                    if orphan {
                        debug!("Deleting orphaned payload");
                        if let Err(e) = self.store.delete(&key).await {
                            warn!(error = %e, "Failed to delete orphaned payload");
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, "Failed to enumerate cached payloads"),
        }

        entries
    }

    async fn read_persisted(&self, track: &TrackId) -> Option<Bytes> {
        let expected_hash = {
            let index = self.index.lock();
            index.entries.peek(track)?.content_hash.clone()
        };

        let payload = match self.store.get(&self.payload_key(track)).await {
            Ok(Some(payload)) if !payload.is_empty() => payload,
            Ok(_) => {
                debug!(track = %track, "Persisted payload missing, dropping entry");
                self.forget(track).await;
                return None;
            }
            Err(e) => {
                warn!(error = %e, track = %track, "Failed to read persisted payload");
                return None;
            }
        };

        if self.config.verify_integrity && content_hash(&payload) != expected_hash {
            warn!(track = %track, "Persisted payload failed integrity check, refetching");
            self.forget(track).await;
            return None;
        }

        self.touch(track, &payload, expected_hash).await;
        Some(payload)
    }

    /// Mark `track` as most recently used, in memory and on disk.
    async fn touch(&self, track: &TrackId, payload: &Bytes, content_hash: String) {
        let known = self.index.lock().entries.get(track).is_some();
        if !known {
            return;
        }

        let meta = EntryMeta {
            size_bytes: payload.len() as u64,
            last_access_ms: self.clock.unix_timestamp_millis(),
            content_hash,
        };
        if let Err(e) = self.write_meta(track, &meta).await {
            debug!(error = %e, track = %track, "Failed to update last access");
        }
    }

    async fn forget(&self, track: &TrackId) {
        self.index.lock().remove(track);
        self.delete_keys(track).await;
    }

    async fn delete_keys(&self, track: &TrackId) {
        for key in [self.payload_key(track), self.meta_key(track)] {
            if let Err(e) = self.store.delete(&key).await {
                warn!(error = %e, track = %track, "Failed to delete cache entry");
            }
        }
    }

    async fn write_meta(&self, track: &TrackId, meta: &EntryMeta) -> Result<()> {
        let raw = serde_json::to_vec(meta)?;
        self.store.put(&self.meta_key(track), Bytes::from(raw)).await?;
        Ok(())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write `payload` to the byte store, evicting as needed. Returns whether
    /// the payload ended up persisted.
    async fn persist(&self, track: &TrackId, payload: &Bytes) -> bool {
        let size_bytes = payload.len() as u64;
        let budget_bytes = self.config.budget_bytes;

        if size_bytes > budget_bytes {
            info!(size_bytes, budget_bytes, "Payload exceeds cache budget, not persisting");
            self.emit(CacheEvent::PersistSkipped {
                track_id: track.to_string(),
                size_bytes,
                budget_bytes,
            });
            return false;
        }

        let _guard = self.persist_lock.lock().await;
        if self.index.lock().entries.contains(track) {
            return true;
        }

        self.evict_until_fits(size_bytes).await;

        let meta = EntryMeta {
            size_bytes,
            last_access_ms: self.clock.unix_timestamp_millis(),
            content_hash: content_hash(payload),
        };

        if let Err(e) = self.store.put(&self.payload_key(track), payload.clone()).await {
            warn!(error = %e, "Failed to persist payload");
            return false;
        }

        if let Err(e) = self.write_meta(track, &meta).await {
            warn!(error = %e, "Failed to persist cache metadata");
            if let Err(e) = self.store.delete(&self.payload_key(track)).await {
                warn!(error = %e, "Failed to roll back persisted payload");
            }
            return false;
        }

        self.index.lock().insert(
            track.clone(),
            IndexEntry {
                size_bytes,
                content_hash: meta.content_hash,
            },
        );
        true
    }

    /// Evict least recently used entries until `incoming` more bytes fit in
    /// the budget. Callers hold `persist_lock`.
    async fn evict_until_fits(&self, incoming: u64) {
        loop {
            let victim = {
                let mut index = self.index.lock();
                if index.total_bytes + incoming <= self.config.budget_bytes {
                    return;
                }
                index.pop_oldest()
            };

            let Some((track, entry)) = victim else {
                return;
            };

            self.delete_keys(&track).await;
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(track = %track, size_bytes = entry.size_bytes, "Evicted cache entry");
            self.emit(CacheEvent::Evicted {
                track_id: track.to_string(),
                size_bytes: entry.size_bytes,
            });
        }
    }

    // ========================================================================
    // Network
    // ========================================================================

    async fn fetch_with_retry(&self, locator: &str) -> std::result::Result<Bytes, FetchError> {
        let attempts = self.config.max_fetch_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = match timeout(self.config.fetch_timeout, self.fetcher.fetch(locator)).await
            {
                Ok(Ok(payload)) if payload.is_empty() => Err(FetchError::EmptyPayload {
                    locator: redact_locator(locator),
                }),
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    locator: redact_locator(locator),
                    timeout_ms: self.config.fetch_timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(payload) => return Ok(payload),
                Err(e) if attempt < attempts && e.is_transient() => {
                    warn!(attempt, attempts, error = %e, "Fetch attempt failed, retrying");
                    sleep(self.config.backoff_for(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Fetch failed");
                    return Err(e);
                }
            }
        }
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Cache(event));
        }
    }
}

/// SHA-256 of `data`, lowercase hex.
fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
