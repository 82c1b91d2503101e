//! File-backed key/value store
//!
//! Each key is stored as its own file. File names are the hex encoding of
//! the key bytes so arbitrary keys (URLs, `payload:` prefixes) map to safe,
//! reversible names on every desktop filesystem.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::KeyValueStore,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const APP_DIR_NAME: &str = "encore";
const TEMP_SUFFIX: &str = ".tmp";

/// Key/value store rooted at a directory, one file per key.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written value.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Store rooted at an explicit directory. The directory is created lazily
    /// on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the platform cache directory, e.g.
    /// `~/.cache/encore/<namespace>` on Linux. Suitable for payloads that
    /// may be discarded.
    pub fn in_cache_dir(namespace: &str) -> Self {
        let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(base.join(APP_DIR_NAME).join(namespace))
    }

    /// Store under the platform data directory. Suitable for records the
    /// user would notice losing, such as resume positions.
    pub fn in_data_dir(namespace: &str) -> Self {
        let base = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(base.join(APP_DIR_NAME).join(namespace))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(hex::encode(key.as_bytes()))
    }

    fn decode_file_name(name: &str) -> Option<String> {
        if name.ends_with(TEMP_SUFFIX) {
            return None;
        }
        let bytes = hex::decode(name).ok()?;
        String::from_utf8(bytes).ok()
    }

    fn map_io_error(error: std::io::Error, context: &str) -> BridgeError {
        BridgeError::Storage(format!("{}: {}", context, error))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(data) => {
                debug!(key, size = data.len(), "Read value from disk");
                Ok(Some(Bytes::from(data)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io_error(e, &format!("Failed to read {}", key))),
        }
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Self::map_io_error(e, "Failed to create store directory"))?;

        let path = self.path_for(key);
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(TEMP_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, &value)
            .await
            .map_err(|e| Self::map_io_error(e, &format!("Failed to write {}", key)))?;

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Self::map_io_error(e, &format!("Failed to commit {}", key)));
        }

        debug!(key, size = value.len(), "Wrote value to disk");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => {
                debug!(key, "Deleted value from disk");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::map_io_error(e, &format!("Failed to delete {}", key))),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::map_io_error(e, "Failed to list store directory")),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::map_io_error(e, "Failed to read directory entry"))?
        {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            match Self::decode_file_name(name) {
                Some(key) => keys.push(key),
                None if name.ends_with(TEMP_SUFFIX) => {}
                None => warn!(file = name, "Ignoring unrecognised file in store directory"),
            }
        }

        keys.sort();
        Ok(keys)
    }
}
