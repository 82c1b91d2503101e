//! Fakes shared by the playback integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::MemoryKeyValueStore;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{AudioEngine, EngineEvent, EngineEventSink, EngineFactory, EngineRequest};
use bridge_traits::{KeyValueStore, SystemClock};
use bytes::Bytes;
use core_library::{InMemoryCatalogue, TrackId};
use core_playback::{
    CacheConfig, FetchError, PayloadFetcher, PlayerHandle, PlayerSnapshot, PlayerStore,
    PositionStore, ResourceCache, SessionConfig, SessionController, SessionDependencies,
};
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Fetcher
// ============================================================================

/// Serves `bytes-of-<locator>` for every locator, optionally holding some
/// fetches until their gate is opened or failing them outright.
#[derive(Default)]
pub struct GatedFetcher {
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl GatedFetcher {
    pub fn gate(&self, locator: &str) {
        self.gates
            .lock()
            .insert(locator.to_string(), Arc::new(Notify::new()));
    }

    pub fn open(&self, locator: &str) {
        if let Some(gate) = self.gates.lock().get(locator) {
            gate.notify_one();
        }
    }

    pub fn fail(&self, locator: &str) {
        self.failing.lock().insert(locator.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PayloadFetcher for GatedFetcher {
    async fn fetch(&self, locator: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().get(locator).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing.lock().contains(locator) {
            return Err(FetchError::Network {
                locator: locator.to_string(),
                message: "connection reset".to_string(),
            });
        }

        Ok(Bytes::from(format!("bytes-of-{}", locator)))
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Records every engine call and lets tests drive engine events.
pub struct FakeEngineFactory {
    duration: Option<f64>,
    log: Arc<Mutex<Vec<String>>>,
    created: Mutex<Vec<String>>,
    rejected: Mutex<HashSet<String>>,
    sinks: Mutex<HashMap<String, EngineEventSink>>,
    offsets: Mutex<HashMap<String, Arc<Mutex<f64>>>>,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
    defer_acks: Arc<AtomicBool>,
}

impl FakeEngineFactory {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            duration,
            log: Arc::new(Mutex::new(Vec::new())),
            created: Mutex::new(Vec::new()),
            rejected: Mutex::new(HashSet::new()),
            sinks: Mutex::new(HashMap::new()),
            offsets: Mutex::new(HashMap::new()),
            live: Arc::new(AtomicUsize::new(0)),
            max_live: Arc::new(AtomicUsize::new(0)),
            defer_acks: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop engines from acknowledging play and pause. Tests deliver the
    /// acknowledgements themselves through [`emit`](Self::emit).
    pub fn defer_acks(&self) {
        self.defer_acks.store(true, Ordering::SeqCst);
    }

    /// Make `create` fail for `track`, as if the payload could not be decoded.
    pub fn reject(&self, track: &str) {
        self.rejected.lock().insert(track.to_string());
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.log.lock().iter().filter(|e| e.as_str() == entry).count()
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    /// Raise `event` from the engine most recently built for `track`.
    pub fn emit(&self, track: &str, event: EngineEvent) -> bool {
        match self.sinks.lock().get(track) {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }

    /// Move the playback offset of the engine for `track`.
    pub fn set_offset(&self, track: &str, seconds: f64) {
        if let Some(offset) = self.offsets.lock().get(track) {
            *offset.lock() = seconds;
        }
    }
}

#[async_trait]
impl EngineFactory for FakeEngineFactory {
    async fn create(
        &self,
        request: EngineRequest,
        events: EngineEventSink,
    ) -> BridgeResult<Box<dyn AudioEngine>> {
        let track = request.track_id.clone();
        if self.rejected.lock().contains(&track) {
            return Err(BridgeError::Engine("unsupported format".to_string()));
        }
        assert!(!request.payload.is_empty(), "engine given an empty payload");

        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
        self.created.lock().push(track.clone());
        self.log.lock().push(format!("create:{}", track));

        let offset = Arc::new(Mutex::new(0.0));
        self.offsets.lock().insert(track.clone(), Arc::clone(&offset));
        self.sinks.lock().insert(track.clone(), events.clone());

        Ok(Box::new(FakeEngine {
            track,
            duration: self.duration,
            offset,
            events,
            log: Arc::clone(&self.log),
            live: Arc::clone(&self.live),
            defer_acks: Arc::clone(&self.defer_acks),
        }))
    }
}

struct FakeEngine {
    track: String,
    duration: Option<f64>,
    offset: Arc<Mutex<f64>>,
    events: EngineEventSink,
    log: Arc<Mutex<Vec<String>>>,
    live: Arc<AtomicUsize>,
    defer_acks: Arc<AtomicBool>,
}

impl FakeEngine {
    fn record(&self, entry: String) {
        self.log.lock().push(entry);
    }

    fn ack(&self, event: EngineEvent) {
        if !self.defer_acks.load(Ordering::SeqCst) {
            self.events.emit(event);
        }
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    async fn play(&mut self) -> BridgeResult<()> {
        self.record(format!("play:{}", self.track));
        self.ack(EngineEvent::Started);
        Ok(())
    }

    async fn pause(&mut self) -> BridgeResult<()> {
        self.record(format!("pause:{}", self.track));
        self.ack(EngineEvent::Paused);
        Ok(())
    }

    async fn seek(&mut self, seconds: f64) -> BridgeResult<()> {
        self.record(format!("seek:{}:{}", self.track, seconds));
        *self.offset.lock() = seconds;
        Ok(())
    }

    async fn stop(&mut self) -> BridgeResult<()> {
        self.record(format!("stop:{}", self.track));
        Ok(())
    }

    async fn unload(self: Box<Self>) -> BridgeResult<()> {
        self.record(format!("unload:{}", self.track));
        self.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn current_offset(&self) -> f64 {
        *self.offset.lock()
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub handle: PlayerHandle,
    pub store: PlayerStore,
    pub cache: Arc<ResourceCache>,
    pub positions: PositionStore,
    pub engines: Arc<FakeEngineFactory>,
    pub fetcher: Arc<GatedFetcher>,
    pub catalogue: Arc<InMemoryCatalogue>,
    pub events: EventBus,
    pub payload_store: Arc<MemoryKeyValueStore>,
}

impl Harness {
    pub fn start(tracks: &[&str]) -> Self {
        Self::start_with(tracks, SessionConfig::default())
    }

    pub fn start_with(tracks: &[&str], config: SessionConfig) -> Self {
        let payload_store = Arc::new(MemoryKeyValueStore::new());
        let position_store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let clock = Arc::new(SystemClock);
        let events = EventBus::new(256);

        let fetcher = Arc::new(GatedFetcher::default());
        let cache = Arc::new(
            ResourceCache::new(
                CacheConfig::default(),
                payload_store.clone(),
                fetcher.clone(),
                clock.clone(),
            )
            .unwrap()
            .with_event_bus(events.clone()),
        );
        let positions = PositionStore::new(position_store, clock, config.position_retention);
        let engines = Arc::new(FakeEngineFactory::new(Some(200.0)));
        let catalogue = Arc::new(InMemoryCatalogue::from_locators(tracks.iter().copied()).unwrap());

        let (controller, handle, store) = SessionController::new(
            config,
            SessionDependencies {
                cache: cache.clone(),
                positions: positions.clone(),
                engines: engines.clone(),
                catalogue: catalogue.clone(),
            },
        )
        .unwrap();
        controller.with_event_bus(events.clone()).spawn();

        Self {
            handle,
            store,
            cache,
            positions,
            engines,
            fetcher,
            catalogue,
            events,
            payload_store,
        }
    }

    /// Wait (bounded) for a snapshot matching `predicate`.
    pub async fn wait_for<F>(&mut self, predicate: F) -> PlayerSnapshot
    where
        F: FnMut(&PlayerSnapshot) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), self.store.wait_for(predicate))
            .await
            .expect("timed out waiting for player state")
            .expect("controller closed")
    }

    pub async fn wait_playing(&mut self, track: &str) -> PlayerSnapshot {
        let track = TrackId::new(track);
        self.wait_for(|s| s.is_playing && s.current_track.as_ref() == Some(&track))
            .await
    }
}

/// Poll `condition` until it holds, failing the test after a few seconds.
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

pub fn track(id: &str) -> TrackId {
    TrackId::new(id)
}
