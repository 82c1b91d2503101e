//! Storage Abstractions
//!
//! The playback core persists two kinds of data: opaque audio payload bytes
//! keyed by track locator, and small position records keyed by track id.
//! Both go through the same storage-agnostic key/value contract so a host can
//! back them with files, IndexedDB, SQLite, or memory.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Async key/value store with key enumeration.
///
/// Keys are UTF-8 strings chosen by the caller; values are opaque bytes.
/// Implementations must make `put` atomic per key: a concurrent `get` sees
/// either the old value or the new one, never a partial write.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember(store: &dyn KeyValueStore) -> Result<()> {
///     store.put("position:track-1", Bytes::from_static(b"42.0")).await?;
///     assert!(store.get("position:track-1").await?.is_some());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Returns `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Insert or replace a value.
    async fn put(&self, key: &str, value: Bytes) -> Result<()>;

    /// Remove a value. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Enumerate every key currently stored.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Enumerate keys starting with `prefix`.
    ///
    /// The default implementation filters [`KeyValueStore::keys`]; stores with
    /// an ordered index should override it.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .keys()
            .await?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    /// Check whether a key exists.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
