//! # Track Navigator
//!
//! Picks the next or previous track from an ordered catalogue snapshot.
//!
//! In order mode navigation wraps around the ends of the list. In shuffle
//! mode it draws uniformly from the other tracks. The catalogue is passed in
//! on every call, so reorders and removals take effect immediately. Repeat-one
//! is not handled here: the session controller replays the current engine
//! instead of asking for a next track.

use core_library::{CatalogueEntry, TrackId};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::trace;

/// How shuffle draws the next track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShufflePolicy {
    /// Every draw is independent; a track may come up again soon.
    #[default]
    Memoryless,
    /// Tracks already played this session are skipped until every track
    /// has been played, then the history starts over.
    NoRepeatUntilExhausted,
}

/// Shuffle/repeat-aware next/previous selection.
pub struct TrackNavigator {
    policy: ShufflePolicy,
    rng: Box<dyn RngCore + Send>,
    seen: HashSet<TrackId>,
}

impl fmt::Debug for TrackNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackNavigator")
            .field("policy", &self.policy)
            .field("seen", &self.seen.len())
            .finish()
    }
}

impl TrackNavigator {
    pub fn new(policy: ShufflePolicy) -> Self {
        Self::with_rng(policy, StdRng::from_entropy())
    }

    /// Navigator drawing from a caller-supplied random source.
    pub fn with_rng(policy: ShufflePolicy, rng: impl RngCore + Send + 'static) -> Self {
        Self {
            policy,
            rng: Box::new(rng),
            seen: HashSet::new(),
        }
    }

    pub fn policy(&self) -> ShufflePolicy {
        self.policy
    }

    /// Forget shuffle history.
    pub fn reset_history(&mut self) {
        self.seen.clear();
    }

    /// Track that `id` was played, for [`ShufflePolicy::NoRepeatUntilExhausted`].
    pub fn note_played(&mut self, id: &TrackId) {
        if self.policy == ShufflePolicy::NoRepeatUntilExhausted {
            self.seen.insert(id.clone());
        }
    }

    /// The track after `current`. `None` only for an empty catalogue.
    pub fn next(
        &mut self,
        catalogue: &[CatalogueEntry],
        current: Option<&TrackId>,
        shuffle: bool,
    ) -> Option<TrackId> {
        if catalogue.is_empty() {
            return None;
        }
        if shuffle {
            return self.draw(catalogue, current);
        }

        let next_index = match position_of(catalogue, current) {
            Some(index) => (index + 1) % catalogue.len(),
            None => 0,
        };
        Some(catalogue[next_index].id.clone())
    }

    /// The track before `current`. `None` only for an empty catalogue.
    pub fn previous(
        &mut self,
        catalogue: &[CatalogueEntry],
        current: Option<&TrackId>,
        shuffle: bool,
    ) -> Option<TrackId> {
        if catalogue.is_empty() {
            return None;
        }
        if shuffle {
            return self.draw(catalogue, current);
        }

        let len = catalogue.len();
        let previous_index = match position_of(catalogue, current) {
            Some(index) => (index + len - 1) % len,
            None => len - 1,
        };
        Some(catalogue[previous_index].id.clone())
    }

    fn draw(&mut self, catalogue: &[CatalogueEntry], current: Option<&TrackId>) -> Option<TrackId> {
        if catalogue.len() == 1 {
            return Some(catalogue[0].id.clone());
        }

        if let Some(current) = current {
            self.note_played(current);
        }

        let others = |entry: &&CatalogueEntry| Some(&entry.id) != current;
        let mut candidates: Vec<&CatalogueEntry> = match self.policy {
            ShufflePolicy::Memoryless => catalogue.iter().filter(others).collect(),
            ShufflePolicy::NoRepeatUntilExhausted => catalogue
                .iter()
                .filter(others)
                .filter(|entry| !self.seen.contains(&entry.id))
                .collect(),
        };

        if candidates.is_empty() {
            trace!("Shuffle history exhausted, starting over");
            self.seen.clear();
            if let Some(current) = current {
                self.seen.insert(current.clone());
            }
            candidates = catalogue.iter().filter(others).collect();
        }

        let index = self.rng.gen_range(0..candidates.len());
        let pick = candidates[index].id.clone();
        self.note_played(&pick);
        Some(pick)
    }
}

impl Default for TrackNavigator {
    fn default() -> Self {
        Self::new(ShufflePolicy::default())
    }
}

fn position_of(catalogue: &[CatalogueEntry], current: Option<&TrackId>) -> Option<usize> {
    let current = current?;
    catalogue.iter().position(|entry| &entry.id == current)
}
