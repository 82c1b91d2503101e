//! # Playback Core
//!
//! The playback session controller and its collaborators.
//!
//! ## Overview
//!
//! This crate handles:
//! - [`cache`]: fetching, persisting and handing out track payloads under a
//!   size budget, with usage-counted revocable handles
//! - [`position`]: per-track resume offsets with a retention window
//! - [`navigator`]: shuffle-aware next/previous selection
//! - [`session`]: the controller actor that owns the single audio engine,
//!   plus the [`PlayerHandle`] and [`PlayerStore`] the UI talks to
//!
//! ## Flow
//!
//! ```text
//! select_track ─► teardown ─► ResourceCache::resolve ─► EngineFactory::create
//!      ▲                                                        │
//!      │                                     PositionStore::load + seek
//!      │                                                        ▼
//!  TrackNavigator::next ◄── natural end ◄── progress ticks ◄── play
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod navigator;
pub mod position;
pub mod session;

pub use cache::{
    CacheConfig, CacheStats, HttpPayloadFetcher, PayloadFetcher, ResolvedHandle, ResourceCache,
};
pub use config::SessionConfig;
pub use error::{CatalogueEmptyError, DecodeError, FetchError, PlaybackError, Result};
pub use navigator::{ShufflePolicy, TrackNavigator};
pub use position::{PositionRecord, PositionStore};
pub use session::{
    PlaybackProgress, PlayerCommand, PlayerHandle, PlayerSnapshot, PlayerStore, SessionController,
    SessionDependencies, SessionPhase,
};
