//! Catalogue provider contract and an in-memory implementation.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::debug;

use crate::error::{LibraryError, Result};
use crate::models::{CatalogueEntry, TrackId};

/// Source of the ordered track list.
///
/// The player asks for a fresh list on every navigation decision, so
/// implementations should reflect reorders and removals immediately.
#[async_trait]
pub trait CatalogueProvider: Send + Sync {
    /// Current tracks in display order. Identifiers are unique within one
    /// returned list.
    async fn load_ordered_tracks(&self) -> Result<Vec<CatalogueEntry>>;

    /// Find the entry for `id` in the current list.
    async fn find(&self, id: &TrackId) -> Result<Option<CatalogueEntry>> {
        Ok(self
            .load_ordered_tracks()
            .await?
            .into_iter()
            .find(|entry| &entry.id == id))
    }
}

/// Catalogue held in memory behind a lock.
#[derive(Debug, Default)]
pub struct InMemoryCatalogue {
    entries: RwLock<Vec<CatalogueEntry>>,
}

impl InMemoryCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalogue from entries, rejecting duplicates and blanks.
    pub fn with_entries(entries: Vec<CatalogueEntry>) -> Result<Self> {
        let catalogue = Self::new();
        catalogue.replace(entries)?;
        Ok(catalogue)
    }

    /// Build a catalogue whose ids are the given locators.
    pub fn from_locators<I, S>(locators: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_entries(
            locators
                .into_iter()
                .map(CatalogueEntry::from_locator)
                .collect(),
        )
    }

    /// Swap in a new ordering.
    pub fn replace(&self, entries: Vec<CatalogueEntry>) -> Result<()> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            entry.validate()?;
            if !seen.insert(entry.id.clone()) {
                return Err(LibraryError::InvalidInput {
                    field: "id".to_string(),
                    message: format!("Duplicate track id {}", entry.id),
                });
            }
        }

        debug!(count = entries.len(), "Catalogue replaced");
        *self.entries.write() = entries;
        Ok(())
    }

    pub fn push(&self, entry: CatalogueEntry) -> Result<()> {
        entry.validate()?;
        let mut entries = self.entries.write();
        if entries.iter().any(|existing| existing.id == entry.id) {
            return Err(LibraryError::InvalidInput {
                field: "id".to_string(),
                message: format!("Duplicate track id {}", entry.id),
            });
        }
        entries.push(entry);
        Ok(())
    }

    /// Remove a track. Returns the removed entry.
    pub fn remove(&self, id: &TrackId) -> Result<CatalogueEntry> {
        let mut entries = self.entries.write();
        let index = entries
            .iter()
            .position(|entry| &entry.id == id)
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "Track".to_string(),
                id: id.to_string(),
            })?;
        Ok(entries.remove(index))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CatalogueProvider for InMemoryCatalogue {
    async fn load_ordered_tracks(&self) -> Result<Vec<CatalogueEntry>> {
        Ok(self.entries.read().clone())
    }

    async fn find(&self, id: &TrackId) -> Result<Option<CatalogueEntry>> {
        Ok(self.entries.read().iter().find(|entry| &entry.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_preserves_order() {
        let catalogue = InMemoryCatalogue::from_locators(["c.mp3", "a.mp3", "b.mp3"]).unwrap();

        let ids: Vec<String> = catalogue
            .load_ordered_tracks()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.id.into_inner())
            .collect();

        assert_eq!(ids, vec!["c.mp3", "a.mp3", "b.mp3"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = InMemoryCatalogue::from_locators(["a.mp3", "a.mp3"]);
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));

        let catalogue = InMemoryCatalogue::from_locators(["a.mp3"]).unwrap();
        assert!(catalogue
            .push(CatalogueEntry::from_locator("a.mp3"))
            .is_err());
        assert_eq!(catalogue.len(), 1);
    }

    #[tokio::test]
    async fn test_find_and_remove() {
        let catalogue = InMemoryCatalogue::with_entries(vec![
            CatalogueEntry::new("one", "https://cdn.example.com/1.mp3").with_title("One"),
            CatalogueEntry::new("two", "https://cdn.example.com/2.mp3"),
        ])
        .unwrap();

        let found = catalogue.find(&TrackId::new("two")).await.unwrap();
        assert_eq!(
            found.map(|entry| entry.locator),
            Some("https://cdn.example.com/2.mp3".to_string())
        );

        let removed = catalogue.remove(&TrackId::new("one")).unwrap();
        assert_eq!(removed.title.as_deref(), Some("One"));
        assert!(catalogue.find(&TrackId::new("one")).await.unwrap().is_none());
        assert!(matches!(
            catalogue.remove(&TrackId::new("one")),
            Err(LibraryError::NotFound { .. })
        ));
    }
}
