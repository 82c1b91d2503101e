//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, payload and
//! position storage, audio engines, catalogue) into a running playback
//! controller. Desktop apps typically enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`) so that missing HTTP and storage
//! bridges fall back to the desktop defaults.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::PlayerService;
//!
//! let config = CoreConfig::builder()
//!     .engine_factory(engines)
//!     .catalogue(catalogue)
//!     .build()?;
//! let service = PlayerService::start(config, Default::default(), Default::default()).await?;
//! service.handle().select_track("https://cdn.example/intro.mp3").await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{FileKeyValueStore, MemoryKeyValueStore, ReqwestHttpClient};

use std::sync::Arc;

use core_async::task::JoinHandle;
use core_library::CatalogueProvider;
use core_playback::{
    CacheConfig, HttpPayloadFetcher, PlayerHandle, PlayerStore, PositionStore, ResourceCache,
    SessionConfig, SessionController, SessionDependencies,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use tracing::{info, warn};

/// Primary façade exposed to host applications.
///
/// Owns the background controller task. Commands go through
/// [`handle`](Self::handle), state is observed through [`store`](Self::store)
/// and events through [`events`](Self::events).
pub struct PlayerService {
    handle: PlayerHandle,
    store: PlayerStore,
    event_bus: EventBus,
    cache: Arc<ResourceCache>,
    positions: PositionStore,
    catalogue: Arc<dyn CatalogueProvider>,
    controller: JoinHandle<()>,
}

impl PlayerService {
    /// Validate the configuration, assemble the playback core and spawn the
    /// session controller.
    ///
    /// Expired resume positions are pruned once before the controller starts.
    pub async fn start(
        config: CoreConfig,
        cache_config: CacheConfig,
        session_config: SessionConfig,
    ) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);

        let fetcher = Arc::new(HttpPayloadFetcher::new(Arc::clone(&config.http_client)));
        let cache = Arc::new(
            ResourceCache::new(
                cache_config,
                Arc::clone(&config.payload_store),
                fetcher,
                Arc::clone(&config.clock),
            )?
            .with_event_bus(event_bus.clone()),
        );

        let positions = PositionStore::new(
            Arc::clone(&config.position_store),
            Arc::clone(&config.clock),
            session_config.position_retention,
        );
        let pruned = positions.prune().await;
        if pruned > 0 {
            info!(pruned, "Pruned expired playback positions");
        }

        let (controller, handle, store) = SessionController::new(
            session_config,
            SessionDependencies {
                cache: Arc::clone(&cache),
                positions: positions.clone(),
                engines: Arc::clone(&config.engine_factory),
                catalogue: Arc::clone(&config.catalogue),
            },
        )?;
        let controller = controller.with_event_bus(event_bus.clone()).spawn();

        info!("Player service started");

        Ok(Self {
            handle,
            store,
            event_bus,
            cache,
            positions,
            catalogue: config.catalogue,
            controller,
        })
    }

    /// Command channel into the controller. Cheap to clone.
    pub fn handle(&self) -> PlayerHandle {
        self.handle.clone()
    }

    /// Read-only view of the player state.
    pub fn store(&self) -> PlayerStore {
        self.store.clone()
    }

    /// Subscribe to playback and cache events emitted from now on.
    pub fn events(&self) -> EventStream {
        self.event_bus.stream()
    }

    pub fn cache(&self) -> Arc<ResourceCache> {
        Arc::clone(&self.cache)
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    pub fn catalogue(&self) -> Arc<dyn CatalogueProvider> {
        Arc::clone(&self.catalogue)
    }

    /// Stop playback, save the current position and wait for the controller
    /// task to exit.
    pub async fn shutdown(self) -> Result<()> {
        if !self.handle.is_closed() {
            self.handle.shutdown().await?;
        }
        if let Err(e) = self.controller.await {
            warn!(error = %e, "Playback controller task ended abnormally");
        }
        info!("Player service stopped");
        Ok(())
    }
}
