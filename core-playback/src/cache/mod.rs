//! # Media Resource Cache
//!
//! Fetches, persists and hands out track payloads.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     ResourceCache                      │
//! │  - resolve() / release()               │
//! │  - purge() / remove()                  │
//! │  - current_size() / stats()            │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> HandleTable (in-memory, usage counted)
//!          ├──> KeyValueStore (persisted payloads + metadata, LRU)
//!          └──> PayloadFetcher (network, with timeout and retry)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheConfig, HttpPayloadFetcher, ResourceCache};
//!
//! let cache = ResourceCache::new(
//!     CacheConfig::default().with_budget(256 * 1024 * 1024),
//!     payload_store,
//!     Arc::new(HttpPayloadFetcher::new(http_client)),
//!     clock,
//! )?;
//!
//! let handle = cache.resolve(&entry).await?;
//! // ... hand handle.payload() to the engine ...
//! cache.release(handle);
//! ```

pub mod config;
pub mod fetch;
pub mod handle;
pub mod manager;
pub mod stats;

pub use config::CacheConfig;
pub use fetch::{HttpPayloadFetcher, PayloadFetcher};
pub use handle::ResolvedHandle;
pub use manager::ResourceCache;
pub use stats::CacheStats;
