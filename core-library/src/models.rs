//! Catalogue models
//!
//! A track is referenced by an opaque, stable identifier. In most
//! collections the identifier is simply the track's source locator (a URL or
//! a path), which is why [`CatalogueEntry::from_locator`] exists.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LibraryError, Result};

// =============================================================================
// ID Types
// =============================================================================

/// Stable identifier of a track. Used as the payload cache key, the position
/// record key and the navigation ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for TrackId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Catalogue Entry
// =============================================================================

/// One track in the ordered catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    pub id: TrackId,
    /// Where the payload bytes come from.
    pub locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl CatalogueEntry {
    pub fn new(id: impl Into<TrackId>, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locator: locator.into(),
            title: None,
        }
    }

    /// Entry whose identifier is its locator.
    pub fn from_locator(locator: impl Into<String>) -> Self {
        let locator = locator.into();
        Self {
            id: TrackId::new(locator.clone()),
            locator,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "id".to_string(),
                message: "Track id cannot be empty".to_string(),
            });
        }
        if self.locator.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "locator".to_string(),
                message: format!("Track {} has no locator", self.id),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_locator_uses_locator_as_id() {
        let entry = CatalogueEntry::from_locator("https://cdn.example.com/a.mp3");
        assert_eq!(entry.id.as_str(), "https://cdn.example.com/a.mp3");
        assert_eq!(entry.locator, "https://cdn.example.com/a.mp3");
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert!(CatalogueEntry::new("", "a.mp3").validate().is_err());
        assert!(CatalogueEntry::new("a", " ").validate().is_err());
        assert!(CatalogueEntry::new("a", "a.mp3").validate().is_ok());
    }

    #[test]
    fn test_track_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&TrackId::new("a.mp3")).unwrap();
        assert_eq!(json, "\"a.mp3\"");
    }
}
