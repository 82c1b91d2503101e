//! In-memory key/value store

use async_trait::async_trait;
use bridge_traits::{error::Result, storage::KeyValueStore};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Volatile store for hosts without durable storage, and for tests.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prefix_scan_uses_ordering() {
        let store = MemoryKeyValueStore::new();
        store.put("meta:a", Bytes::from_static(b"1")).await.unwrap();
        store.put("payload:a", Bytes::from_static(b"2")).await.unwrap();
        store.put("payload:b", Bytes::from_static(b"3")).await.unwrap();
        store.put("position:a", Bytes::from_static(b"4")).await.unwrap();

        assert_eq!(
            store.keys_with_prefix("payload:").await.unwrap(),
            vec!["payload:a".to_string(), "payload:b".to_string()]
        );
        assert_eq!(store.len(), 4);

        store.delete("payload:a").await.unwrap();
        assert!(!store.contains("payload:a").await.unwrap());
    }
}
