//! # Playback Session Example
//!
//! Drives a session controller end to end with an in-memory catalogue, a
//! synthetic payload source and an engine that only logs what it is told.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use anyhow::Context;
use async_trait::async_trait;
use bridge_desktop::MemoryKeyValueStore;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{AudioEngine, EngineEvent, EngineEventSink, EngineFactory, EngineRequest};
use bridge_traits::SystemClock;
use bytes::Bytes;
use core_library::InMemoryCatalogue;
use core_playback::{
    CacheConfig, FetchError, PayloadFetcher, PositionStore, ResourceCache, SessionConfig,
    SessionController, SessionDependencies,
};
use core_runtime::events::{CoreEvent, EventBus};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Synthetic payloads
// ============================================================================

/// Pretends to download a few kilobytes per track.
struct SyntheticFetcher;

#[async_trait]
impl PayloadFetcher for SyntheticFetcher {
    async fn fetch(&self, locator: &str) -> Result<Bytes, FetchError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(Bytes::from(locator.repeat(256)))
    }
}

// ============================================================================
// Logging engine
// ============================================================================

/// Reports every call and a fixed 90 second duration.
struct LoggingEngine {
    track: String,
    offset: f64,
    events: EngineEventSink,
}

#[async_trait]
impl AudioEngine for LoggingEngine {
    async fn play(&mut self) -> BridgeResult<()> {
        println!("  [engine] play {} from {:.1}s", self.track, self.offset);
        self.events.emit(EngineEvent::Started);
        Ok(())
    }

    async fn pause(&mut self) -> BridgeResult<()> {
        println!("  [engine] pause {}", self.track);
        self.events.emit(EngineEvent::Paused);
        Ok(())
    }

    async fn seek(&mut self, seconds: f64) -> BridgeResult<()> {
        println!("  [engine] seek {} to {:.1}s", self.track, seconds);
        self.offset = seconds;
        Ok(())
    }

    async fn stop(&mut self) -> BridgeResult<()> {
        println!("  [engine] stop {}", self.track);
        Ok(())
    }

    async fn unload(self: Box<Self>) -> BridgeResult<()> {
        println!("  [engine] unload {}", self.track);
        Ok(())
    }

    fn current_offset(&self) -> f64 {
        self.offset
    }

    fn duration(&self) -> Option<f64> {
        Some(90.0)
    }
}

struct LoggingEngineFactory;

#[async_trait]
impl EngineFactory for LoggingEngineFactory {
    async fn create(
        &self,
        request: EngineRequest,
        events: EngineEventSink,
    ) -> BridgeResult<Box<dyn AudioEngine>> {
        println!(
            "  [engine] decode {} ({} bytes)",
            request.track_id,
            request.payload.len()
        );
        Ok(Box::new(LoggingEngine {
            track: request.track_id,
            offset: 0.0,
            events,
        }))
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))
        .context("failed to initialise logging")?;

    println!("=== Playback Session Demo ===\n");

    let clock = Arc::new(SystemClock);
    let events = EventBus::new(64);
    let mut stream = events.stream();

    let cache = Arc::new(
        ResourceCache::new(
            CacheConfig::new().with_budget(64 * 1024),
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(SyntheticFetcher),
            clock.clone(),
        )?
        .with_event_bus(events.clone()),
    );
    let session_config = SessionConfig::default();
    let positions = PositionStore::new(
        Arc::new(MemoryKeyValueStore::new()),
        clock,
        session_config.position_retention,
    );
    let catalogue = Arc::new(InMemoryCatalogue::from_locators([
        "https://cdn.example/morning.mp3",
        "https://cdn.example/noon.mp3",
        "https://cdn.example/night.mp3",
    ])?);

    let (controller, player, mut store) = SessionController::new(
        session_config,
        SessionDependencies {
            cache: cache.clone(),
            positions,
            engines: Arc::new(LoggingEngineFactory),
            catalogue,
        },
    )?;
    let task = controller.with_event_bus(events).spawn();

    println!("1. Selecting the first track");
    player.select_track("https://cdn.example/morning.mp3").await?;
    store.wait_for(|s| s.is_playing).await?;

    println!("\n2. Seeking halfway and pausing");
    player.seek_to(0.5).await?;
    player.pause().await?;
    let paused = store.wait_for(|s| !s.is_playing).await?;
    println!(
        "   paused at {:.1}s of {:?}",
        paused.progress.offset_seconds, paused.progress.duration_seconds
    );

    println!("\n3. Skipping to the next track");
    player.next_track().await?;
    let next = store
        .wait_for(|s| {
            s.is_playing
                && s.current_track.as_ref().map(|t| t.as_str())
                    == Some("https://cdn.example/noon.mp3")
        })
        .await?;
    println!("   now playing {:?}", next.current_track);

    println!("\n4. Shutting down");
    player.shutdown().await?;
    task.await?;

    let stats = cache.stats().await;
    println!(
        "\nCache: {} entries, {} bytes ({:.1}% of budget), hit ratio {:.2}",
        stats.entries,
        stats.total_bytes,
        stats.usage_percentage(),
        stats.hit_ratio()
    );

    println!("\nEvents:");
    while let Some(Ok(event)) = stream.try_recv() {
        match event {
            CoreEvent::Playback(e) => println!("  playback: {:?}", e),
            CoreEvent::Cache(e) => println!("  cache:    {:?}", e),
        }
    }

    Ok(())
}
