//! # Host Bridge Traits
//!
//! Capability traits that a host platform implements for the playback core.
//!
//! ## Overview
//!
//! The core needs a handful of things it cannot do portably on its own:
//! fetch bytes over the network, persist small key/value records, read the
//! wall clock, forward logs, and turn encoded audio into sound. Each of those
//! is a trait here; desktop implementations live in `bridge-desktop`.
//!
//! ## Traits
//!
//! ### Networking & storage
//! - [`HttpClient`](http::HttpClient) - fetch audio payloads by locator
//! - [`KeyValueStore`](storage::KeyValueStore) - persistent payload cache and position records
//!
//! ### Playback
//! - [`EngineFactory`](playback::EngineFactory) - build an [`AudioEngine`](playback::AudioEngine) per track
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - wall-clock source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with enough context (key, URL,
//! device) for the core to log something actionable.
//!
//! ## Thread Safety
//!
//! Bridges are shared across tasks behind `Arc`, so every trait except
//! [`AudioEngine`](playback::AudioEngine) requires `Send + Sync`. Engines are
//! owned by a single controller and only need `Send`.

pub mod error;
pub mod http;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use playback::{
    AudioEngine, EngineEvent, EngineEventSink, EngineFactory, EngineNotification, EngineRequest,
    ListenerRegistration,
};
pub use storage::KeyValueStore;
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
