//! Audio engine bridge traits.
//!
//! The playback core never talks to an audio backend directly. A host
//! provides an [`EngineFactory`] that turns a block of encoded payload bytes
//! into an [`AudioEngine`] instance; the core owns that instance exclusively
//! and drives it through this trait only, whatever the concrete backend.
//!
//! Engines report asynchronous happenings (playback actually started, paused
//! by the OS, reached the end, failed to decode) through an
//! [`EngineEventSink`]. Every sink is stamped with the generation of the
//! session it was created for, so the core can recognise and drop events
//! from instances it has already replaced.

use async_trait::async_trait;
use bytes::Bytes;
use core_async::sync::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;

/// Everything an engine needs to start a playback instance.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    /// Opaque track identifier, for host-side diagnostics.
    pub track_id: String,
    /// Encoded audio payload (not PCM).
    pub payload: Bytes,
}

impl EngineRequest {
    pub fn new(track_id: impl Into<String>, payload: Bytes) -> Self {
        Self {
            track_id: track_id.into(),
            payload,
        }
    }
}

/// Asynchronous notifications raised by an engine instance.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Audio output actually began (or resumed).
    Started,
    /// Output stopped without reaching the end (user, OS, or device).
    Paused,
    /// The stream played through to its natural end.
    Ended,
    /// The payload could not be decoded or the device failed.
    Error { message: String },
}

/// An [`EngineEvent`] tagged with the session generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineNotification {
    pub generation: u64,
    pub event: EngineEvent,
}

/// Listener handle given to an engine at construction time.
///
/// Cloneable so backends can hand it to callback threads. Once the owning
/// [`ListenerRegistration`] is detached, [`EngineEventSink::emit`] silently
/// drops everything.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    generation: u64,
    attached: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<EngineNotification>,
}

impl EngineEventSink {
    /// Create a sink feeding `tx`, plus the registration that can detach it.
    pub fn new(
        generation: u64,
        tx: mpsc::UnboundedSender<EngineNotification>,
    ) -> (Self, ListenerRegistration) {
        let attached = Arc::new(AtomicBool::new(true));
        let sink = Self {
            generation,
            attached: Arc::clone(&attached),
            tx,
        };
        (sink, ListenerRegistration { attached })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver an event. Returns `false` if the listener is detached or the
    /// receiving side is gone.
    pub fn emit(&self, event: EngineEvent) -> bool {
        if !self.attached.load(Ordering::Acquire) {
            return false;
        }
        self.tx
            .send(EngineNotification {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Owner-side half of an [`EngineEventSink`].
#[derive(Debug)]
pub struct ListenerRegistration {
    attached: Arc<AtomicBool>,
}

impl ListenerRegistration {
    /// Stop delivering events from every clone of the paired sink.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.detach();
    }
}

/// One playback instance bound to one payload.
///
/// Control calls should return as soon as the backend has accepted the
/// command; confirmation arrives later through the event sink.
#[async_trait]
pub trait AudioEngine: Send {
    /// Begin or resume output. A successful call is acknowledged with one
    /// [`EngineEvent::Started`].
    async fn play(&mut self) -> Result<()>;

    /// Pause output, keeping position. A successful call is acknowledged
    /// with one [`EngineEvent::Paused`].
    async fn pause(&mut self) -> Result<()>;

    /// Jump to an absolute offset in seconds.
    async fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Stop output and rewind.
    async fn stop(&mut self) -> Result<()>;

    /// Release every backend resource. The instance is consumed.
    async fn unload(self: Box<Self>) -> Result<()>;

    /// Current playback offset in seconds.
    fn current_offset(&self) -> f64;

    /// Total duration in seconds, once known.
    fn duration(&self) -> Option<f64>;
}

/// Creates engine instances for the core.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Build an engine for `request`. Events from the instance must go to
    /// `events`. Failing to recognise the payload is an `Err` here; failures
    /// discovered later are reported as [`EngineEvent::Error`].
    async fn create(
        &self,
        request: EngineRequest,
        events: EngineEventSink,
    ) -> Result<Box<dyn AudioEngine>>;
}
