//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `KeyValueStore` backed by one file per key under an app directory
//!   (`FileKeyValueStore`), or by memory (`MemoryKeyValueStore`)
//!
//! Audio engines are not provided here; hosts plug in whatever output
//! backend they ship with through `bridge_traits::EngineFactory`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileKeyValueStore, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let payloads = FileKeyValueStore::in_cache_dir("payloads");
//!     let positions = FileKeyValueStore::in_data_dir("positions");
//!     // Hand these to core_runtime::config::CoreConfig::builder()
//!     Ok(())
//! }
//! ```

mod http;
mod kv_store;
mod memory;

pub use http::ReqwestHttpClient;
pub use kv_store::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
