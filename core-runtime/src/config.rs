//! # Core Configuration
//!
//! Collects the host bridges the playback core runs on and validates them
//! before anything starts.
//!
//! ## Overview
//!
//! [`CoreConfig`] is built through [`CoreConfig::builder`]. Required
//! capabilities without a default fail fast with
//! [`Error::CapabilityMissing`] naming the missing bridge, so a host finds
//! out at start-up rather than on the first track selection.
//!
//! With the `desktop-shims` feature, HTTP and storage bridges fall back to
//! the `bridge-desktop` implementations. The engine factory and the
//! catalogue never have defaults: every host brings its own audio output and
//! its own track list.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .engine_factory(Arc::new(MyEngineFactory::new()))
//!     .catalogue(Arc::new(my_catalogue))
//!     .storage_dir("/var/lib/encore")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, EngineFactory, HttpClient, KeyValueStore, SystemClock};
use core_library::CatalogueProvider;
use std::path::PathBuf;
use std::sync::Arc;

/// Wired host capabilities for one player instance.
#[derive(Clone)]
pub struct CoreConfig {
    /// Fetches payloads from their locators.
    pub http_client: Arc<dyn HttpClient>,

    /// Persistent byte cache for audio payloads.
    pub payload_store: Arc<dyn KeyValueStore>,

    /// Persistent store for resume positions.
    pub position_store: Arc<dyn KeyValueStore>,

    /// Builds audio engine instances.
    pub engine_factory: Arc<dyn EngineFactory>,

    /// Wall clock for persisted timestamps.
    pub clock: Arc<dyn Clock>,

    /// Ordered track list consulted on every navigation decision.
    pub catalogue: Arc<dyn CatalogueProvider>,

    /// Capacity of the event bus channel.
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("payload_store", &"KeyValueStore { ... }")
            .field("position_store", &"KeyValueStore { ... }")
            .field("engine_factory", &"EngineFactory { ... }")
            .field("clock", &"Clock { ... }")
            .field("catalogue", &"CatalogueProvider { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > 65_536 {
            return Err(Error::Config(
                "Event buffer size exceeds maximum of 65,536 events".to_string(),
            ));
        }

        Ok(())
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| Error::DefaultBridge {
        bridge: "HttpClient".to_string(),
        message: e.to_string(),
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing(
        "HttpClient",
        "HttpClient implementation is required to fetch audio payloads. \
         Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
         Mobile/Web: inject the platform HTTP stack.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_store(
    storage_dir: Option<&PathBuf>,
    namespace: &str,
    persistent: bool,
) -> Result<Arc<dyn KeyValueStore>> {
    use bridge_desktop::FileKeyValueStore;

    let store = match storage_dir {
        Some(dir) => FileKeyValueStore::new(dir.join(namespace)),
        None if persistent => FileKeyValueStore::in_data_dir(namespace),
        None => FileKeyValueStore::in_cache_dir(namespace),
    };
    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_store(
    _storage_dir: Option<&PathBuf>,
    namespace: &str,
    _persistent: bool,
) -> Result<Arc<dyn KeyValueStore>> {
    Err(capability_missing(
        "KeyValueStore",
        &format!(
            "KeyValueStore implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use FileKeyValueStore. \
             Mobile/Web: inject platform storage (files, IndexedDB).",
            namespace
        ),
    ))
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    payload_store: Option<Arc<dyn KeyValueStore>>,
    position_store: Option<Arc<dyn KeyValueStore>>,
    engine_factory: Option<Arc<dyn EngineFactory>>,
    clock: Option<Arc<dyn Clock>>,
    catalogue: Option<Arc<dyn CatalogueProvider>>,
    storage_dir: Option<PathBuf>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn payload_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.payload_store = Some(store);
        self
    }

    pub fn position_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.position_store = Some(store);
        self
    }

    pub fn engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn catalogue(mut self, catalogue: Arc<dyn CatalogueProvider>) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    /// Root directory for the default desktop stores (`payloads/` and
    /// `positions/` beneath it). Ignored for stores injected explicitly.
    pub fn storage_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.storage_dir = Some(path.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn build(self) -> Result<CoreConfig> {
        let engine_factory = self.engine_factory.ok_or_else(|| {
            capability_missing(
                "EngineFactory",
                "EngineFactory implementation is required to play audio. \
                 Inject the host audio backend with .engine_factory().",
            )
        })?;

        let catalogue = self.catalogue.ok_or_else(|| {
            capability_missing(
                "CatalogueProvider",
                "CatalogueProvider implementation is required for track navigation. \
                 Use core_library::InMemoryCatalogue or inject the host library.",
            )
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let payload_store = match self.payload_store {
            Some(store) => store,
            None => provide_default_store(self.storage_dir.as_ref(), "payloads", false)?,
        };

        let position_store = match self.position_store {
            Some(store) => store,
            None => provide_default_store(self.storage_dir.as_ref(), "positions", true)?,
        };

        let config = CoreConfig {
            http_client,
            payload_store,
            position_store,
            engine_factory,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            catalogue,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
