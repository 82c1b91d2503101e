//! # Playback Session Controller
//!
//! Owns the single active audio engine and drives the load, play, end cycle.
//!
//! The controller runs as one task. Commands from [`PlayerHandle`]s, engine
//! notifications, cache load completions and progress ticks all arrive on
//! channels and are processed one at a time, so session state never needs a
//! lock.
//!
//! Every selection bumps a generation counter. Load completions and engine
//! notifications carry the generation they were started for; anything that
//! does not match the current generation is dropped (a stale successful load
//! gives its handle straight back to the cache).
//!
//! Play and pause take effect as soon as the engine call returns. The
//! engine's `Started`/`Paused` events that acknowledge those calls are
//! matched off a per-session queue; only unrequested ones change state.

use bridge_traits::{
    AudioEngine, EngineEvent, EngineEventSink, EngineFactory, EngineNotification, EngineRequest,
    ListenerRegistration,
};
use core_async::sync::{mpsc, watch};
use core_async::task::JoinHandle;
use core_async::time::{Instant, Ticker};
use core_library::{CatalogueEntry, CatalogueProvider, TrackId};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{ResolvedHandle, ResourceCache};
use crate::config::SessionConfig;
use crate::error::{CatalogueEmptyError, DecodeError, FetchError, PlaybackError, Result};
use crate::navigator::TrackNavigator;
use crate::position::PositionStore;
use crate::session::handle::{PlayerCommand, PlayerHandle};
use crate::session::state::{PlaybackProgress, PlayerSnapshot, SessionPhase};
use crate::session::store::PlayerStore;

/// Collaborators the controller drives.
#[derive(Clone)]
pub struct SessionDependencies {
    pub cache: Arc<ResourceCache>,
    pub positions: PositionStore,
    pub engines: Arc<dyn EngineFactory>,
    pub catalogue: Arc<dyn CatalogueProvider>,
}

/// Result of a background resolve, tagged with the generation that asked.
struct LoadOutcome {
    generation: u64,
    track: TrackId,
    result: std::result::Result<ResolvedHandle, FetchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Ready,
    Playing,
    Paused,
}

/// Engine event expected in reply to a controller call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ack {
    Started,
    Paused,
}

struct ActiveSession {
    track: TrackId,
    engine: Box<dyn AudioEngine>,
    handle: ResolvedHandle,
    registration: ListenerRegistration,
    state: EngineState,
    /// Whether playback has started at least once.
    started: bool,
    pending_acks: VecDeque<Ack>,
}

impl ActiveSession {
    /// Consume `ack` if it is the next acknowledgement owed by the engine.
    fn take_ack(&mut self, ack: Ack) -> bool {
        if self.pending_acks.front() == Some(&ack) {
            self.pending_acks.pop_front();
            true
        } else {
            false
        }
    }
}

enum Session {
    Idle,
    Loading { track: TrackId },
    Active(ActiveSession),
    Transitioning,
}

impl Session {
    fn track(&self) -> Option<&TrackId> {
        match self {
            Session::Loading { track } => Some(track),
            Session::Active(active) => Some(&active.track),
            Session::Idle | Session::Transitioning => None,
        }
    }
}

/// The playback session actor. Build it with [`SessionController::new`],
/// then [`spawn`](SessionController::spawn) it.
pub struct SessionController {
    config: SessionConfig,
    deps: SessionDependencies,
    navigator: TrackNavigator,
    event_bus: Option<EventBus>,

    commands: mpsc::Receiver<PlayerCommand>,
    engine_tx: mpsc::UnboundedSender<EngineNotification>,
    engine_rx: mpsc::UnboundedReceiver<EngineNotification>,
    load_tx: mpsc::UnboundedSender<LoadOutcome>,
    load_rx: mpsc::UnboundedReceiver<LoadOutcome>,
    snapshot: watch::Sender<PlayerSnapshot>,

    session: Session,
    generation: u64,
    autoplay: bool,
    shuffle: bool,
    repeat_one: bool,
    last_track: Option<TrackId>,
    ticker: Ticker,
    last_position_write: Option<Instant>,
}

impl SessionController {
    /// Create a controller plus the handle and store that talk to it.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidConfig`] if `config` does not validate.
    pub fn new(
        config: SessionConfig,
        deps: SessionDependencies,
    ) -> Result<(Self, PlayerHandle, PlayerStore)> {
        config.validate().map_err(|e| {
            PlaybackError::InvalidConfig(format!("Invalid session configuration: {}", e))
        })?;

        let (command_tx, commands) = mpsc::channel(config.command_buffer);
        let (engine_tx, engine_rx) = mpsc::unbounded_channel();
        let (load_tx, load_rx) = mpsc::unbounded_channel();
        let (snapshot, snapshot_rx) = watch::channel(PlayerSnapshot::default());

        let controller = Self {
            navigator: TrackNavigator::new(config.shuffle_policy),
            autoplay: config.autoplay,
            config,
            deps,
            event_bus: None,
            commands,
            engine_tx,
            engine_rx,
            load_tx,
            load_rx,
            snapshot,
            session: Session::Idle,
            generation: 0,
            shuffle: false,
            repeat_one: false,
            last_track: None,
            ticker: Ticker::new(),
            last_position_write: None,
        };

        Ok((
            controller,
            PlayerHandle::new(command_tx),
            PlayerStore::new(snapshot_rx),
        ))
    }

    /// Publish [`PlaybackEvent`]s on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Replace the navigator, e.g. with a seeded one.
    pub fn with_navigator(mut self, navigator: TrackNavigator) -> Self {
        self.navigator = navigator;
        self
    }

    /// Run the controller on the async runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        core_async::spawn(self.run())
    }

    /// Process commands and notifications until shutdown or until every
    /// [`PlayerHandle`] is dropped.
    pub async fn run(mut self) {
        info!("Playback controller started");

        loop {
            core_async::select! {
                command = self.commands.recv() => match command {
                    Some(PlayerCommand::Shutdown(ack)) => {
                        self.shutdown().await;
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some(notification) = self.engine_rx.recv() => {
                    self.handle_engine_notification(notification).await;
                }
                Some(outcome) = self.load_rx.recv() => {
                    self.handle_load_outcome(outcome).await;
                }
                _ = self.ticker.tick() => self.on_progress_tick().await,
            }
        }

        info!("Playback controller stopped");
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn handle_command(&mut self, command: PlayerCommand) {
        debug!(?command, generation = self.generation, "Handling command");
        match command {
            PlayerCommand::Select(track) => self.select(track).await,
            PlayerCommand::TogglePlayPause => self.toggle_play_pause().await,
            PlayerCommand::Play => self.play().await,
            PlayerCommand::Pause => self.pause().await,
            PlayerCommand::Stop => self.stop().await,
            PlayerCommand::SeekTo(fraction) => self.seek_to(fraction).await,
            PlayerCommand::ToggleShuffle => {
                self.shuffle = !self.shuffle;
                if self.shuffle {
                    self.navigator.reset_history();
                }
                let shuffle = self.shuffle;
                self.publish(|s| s.shuffle = shuffle);
            }
            PlayerCommand::ToggleRepeat => {
                self.repeat_one = !self.repeat_one;
                let repeat_one = self.repeat_one;
                self.publish(|s| s.repeat_one = repeat_one);
            }
            PlayerCommand::Next => self.navigate(true).await,
            PlayerCommand::Previous => self.navigate(false).await,
            // Handled by the run loop.
            PlayerCommand::Shutdown(_) => {}
        }
    }

    /// Tear down whatever is bound and start loading `track`.
    async fn select(&mut self, track: TrackId) {
        self.teardown(true).await;

        self.generation += 1;
        let generation = self.generation;
        self.autoplay = self.config.autoplay;
        self.session = Session::Loading {
            track: track.clone(),
        };
        info!(track = %track, generation, "Loading track");

        let published = track.clone();
        self.publish(move |s| {
            s.current_track = Some(published);
            s.is_playing = false;
            s.phase = SessionPhase::Loading;
            s.progress = PlaybackProgress::default();
            s.notice = None;
        });

        let cache = Arc::clone(&self.deps.cache);
        let catalogue = Arc::clone(&self.deps.catalogue);
        let load_tx = self.load_tx.clone();
        core_async::spawn(async move {
            let entry = match catalogue.find(&track).await {
                Ok(Some(entry)) => entry,
                Ok(None) => CatalogueEntry::from_locator(track.as_str()),
                Err(e) => {
                    warn!(error = %e, track = %track, "Catalogue lookup failed, using id as locator");
                    CatalogueEntry::from_locator(track.as_str())
                }
            };

            let result = cache.resolve(&entry).await;
            let outcome = LoadOutcome {
                generation,
                track,
                result,
            };
            if let Err(mpsc::error::SendError(outcome)) = load_tx.send(outcome) {
                if let Ok(handle) = outcome.result {
                    cache.release(handle);
                }
            }
        });
    }

    async fn toggle_play_pause(&mut self) {
        match self.phase() {
            SessionPhase::Playing => self.pause().await,
            SessionPhase::Ready | SessionPhase::Paused => self.play().await,
            SessionPhase::Loading => {
                self.autoplay = !self.autoplay;
                debug!(autoplay = self.autoplay, "Play intent changed while loading");
            }
            SessionPhase::Idle => self.reselect_last().await,
            SessionPhase::Transitioning => {}
        }
    }

    async fn play(&mut self) {
        match self.phase() {
            SessionPhase::Ready | SessionPhase::Paused => {
                let Some(active) = self.active_mut() else {
                    return;
                };
                match active.engine.play().await {
                    Ok(()) => {
                        active.pending_acks.push_back(Ack::Started);
                        self.enter_playing();
                    }
                    Err(e) => {
                        let track = active.track.clone();
                        self.fail_session(track, PlaybackError::Engine(e.to_string()))
                            .await;
                    }
                }
            }
            SessionPhase::Loading => self.autoplay = true,
            SessionPhase::Idle => self.reselect_last().await,
            SessionPhase::Playing | SessionPhase::Transitioning => {}
        }
    }

    async fn pause(&mut self) {
        match self.phase() {
            SessionPhase::Playing | SessionPhase::Ready => {
                let Some(active) = self.active_mut() else {
                    return;
                };
                match active.engine.pause().await {
                    Ok(()) => {
                        active.pending_acks.push_back(Ack::Paused);
                        self.enter_paused().await;
                    }
                    Err(e) => {
                        let track = active.track.clone();
                        self.fail_session(track, PlaybackError::Engine(e.to_string()))
                            .await;
                    }
                }
            }
            SessionPhase::Loading => self.autoplay = false,
            _ => {}
        }
    }

    /// Play the most recently bound track again, if there was one.
    async fn reselect_last(&mut self) {
        if let Some(track) = self.last_track.clone() {
            self.select(track).await;
        }
    }

    async fn stop(&mut self) {
        let outgoing = self.session.track().cloned();
        self.teardown(true).await;
        self.generation += 1;
        self.publish_idle(None);
        self.emit(PlaybackEvent::Stopped {
            track_id: outgoing.map(|t| t.to_string()),
        });
    }

    async fn seek_to(&mut self, fraction: f64) {
        let Session::Active(active) = &mut self.session else {
            debug!("Seek ignored, nothing bound");
            return;
        };

        let Some(duration) = active.engine.duration().filter(|d| *d > 0.0) else {
            debug!("Seek ignored, duration unknown");
            return;
        };

        let offset = fraction.clamp(0.0, 1.0) * duration;
        if let Err(e) = active.engine.seek(offset).await {
            warn!(error = %e, "Seek failed");
            return;
        }

        self.publish(|s| s.progress = PlaybackProgress::new(offset, Some(duration)));
    }

    /// Move to the next (`forward`) or previous track in the catalogue.
    async fn navigate(&mut self, forward: bool) {
        let current = self
            .session
            .track()
            .cloned()
            .or_else(|| self.last_track.clone());

        match self.pick(current.as_ref(), forward).await {
            Ok(track) => self.select(track).await,
            Err(PlaybackError::CatalogueEmpty(_)) => debug!("Catalogue is empty"),
            Err(e) => self.surface(current, e),
        }
    }

    /// Ask the navigator for a neighbour of `current` in a fresh catalogue.
    async fn pick(&mut self, current: Option<&TrackId>, forward: bool) -> Result<TrackId> {
        let entries = self.deps.catalogue.load_ordered_tracks().await?;
        let next = if forward {
            self.navigator.next(&entries, current, self.shuffle)
        } else {
            self.navigator.previous(&entries, current, self.shuffle)
        };
        next.ok_or_else(|| CatalogueEmptyError.into())
    }

    // ========================================================================
    // Load completion
    // ========================================================================

    async fn handle_load_outcome(&mut self, outcome: LoadOutcome) {
        let LoadOutcome {
            generation,
            track,
            result,
        } = outcome;

        if generation != self.generation {
            debug!(track = %track, generation, current = self.generation, "Dropping stale load");
            if let Ok(handle) = result {
                self.deps.cache.release(handle);
            }
            return;
        }

        match result {
            Ok(handle) => self.bind_engine(track, handle).await,
            Err(e) => self.fail_session(track, e.into()).await,
        }
    }

    /// Build an engine for `handle`, restore the saved position, and start
    /// it if play is still wanted.
    async fn bind_engine(&mut self, track: TrackId, handle: ResolvedHandle) {
        let (sink, registration) = EngineEventSink::new(self.generation, self.engine_tx.clone());
        let request = EngineRequest::new(track.as_str(), handle.payload().clone());

        let mut engine = match self.deps.engines.create(request, sink).await {
            Ok(engine) => engine,
            Err(e) => {
                self.deps.cache.release(handle);
                let error = DecodeError {
                    track: track.to_string(),
                    message: e.to_string(),
                };
                self.fail_session(track, error.into()).await;
                return;
            }
        };

        if let Some(offset) = self.deps.positions.load(&track).await {
            let in_bounds = offset > 0.0 && engine.duration().map_or(true, |d| offset < d);
            if in_bounds {
                match engine.seek(offset).await {
                    Ok(()) => debug!(track = %track, offset, "Restored playback position"),
                    Err(e) => warn!(error = %e, "Failed to restore playback position"),
                }
            }
        }

        let progress = PlaybackProgress::new(engine.current_offset(), engine.duration());
        let autoplay = self.autoplay;
        self.session = Session::Active(ActiveSession {
            track: track.clone(),
            engine,
            handle,
            registration,
            state: if autoplay {
                EngineState::Ready
            } else {
                EngineState::Paused
            },
            started: false,
            pending_acks: VecDeque::new(),
        });
        self.last_position_write = None;

        self.publish(move |s| {
            s.phase = if autoplay {
                SessionPhase::Ready
            } else {
                SessionPhase::Paused
            };
            s.progress = progress;
        });

        if autoplay {
            self.play().await;
        }
    }

    // ========================================================================
    // Engine notifications
    // ========================================================================

    async fn handle_engine_notification(&mut self, notification: EngineNotification) {
        if notification.generation != self.generation {
            debug!(
                generation = notification.generation,
                current = self.generation,
                "Dropping stale engine event"
            );
            return;
        }

        let Session::Active(active) = &mut self.session else {
            return;
        };

        match notification.event {
            EngineEvent::Started => {
                if active.take_ack(Ack::Started) {
                    return;
                }
                if active.state != EngineState::Playing {
                    debug!(track = %active.track, "Engine started on its own");
                    self.enter_playing();
                }
            }
            EngineEvent::Paused => {
                if active.take_ack(Ack::Paused) {
                    return;
                }
                if active.state == EngineState::Playing {
                    debug!(track = %active.track, "Engine paused on its own");
                    self.enter_paused().await;
                }
            }
            EngineEvent::Ended => self.on_natural_end().await,
            EngineEvent::Error { message } => {
                let track = active.track.clone();
                let error = DecodeError {
                    track: track.to_string(),
                    message,
                };
                self.fail_session(track, error.into()).await;
            }
        }
    }

    fn enter_playing(&mut self) {
        let Session::Active(active) = &mut self.session else {
            return;
        };
        let resumed = active.started;
        active.state = EngineState::Playing;
        active.started = true;
        let track_id = active.track.to_string();
        let position_ms = seconds_to_ms(active.engine.current_offset());

        self.ticker.arm(self.config.progress_interval);
        self.publish(|s| {
            s.is_playing = true;
            s.phase = SessionPhase::Playing;
        });
        if resumed {
            self.emit(PlaybackEvent::Resumed {
                track_id,
                position_ms,
            });
        } else {
            info!(track = %track_id, "Playback started");
            self.emit(PlaybackEvent::Started { track_id });
        }
    }

    async fn enter_paused(&mut self) {
        let Session::Active(active) = &mut self.session else {
            return;
        };
        active.state = EngineState::Paused;
        let track = active.track.clone();
        let offset = active.engine.current_offset();

        self.ticker.disarm();
        self.publish(|s| {
            s.is_playing = false;
            s.phase = SessionPhase::Paused;
        });
        self.deps.positions.save(&track, offset).await;
        self.emit(PlaybackEvent::Paused {
            track_id: track.to_string(),
            position_ms: seconds_to_ms(offset),
        });
    }

    async fn on_natural_end(&mut self) {
        let Session::Active(active) = &mut self.session else {
            return;
        };
        let track = active.track.clone();

        if self.repeat_one {
            debug!(track = %track, "Repeating track");
            let restarted = match active.engine.seek(0.0).await {
                Ok(()) => active.engine.play().await,
                Err(e) => Err(e),
            };
            match restarted {
                Ok(()) => {
                    active.pending_acks.push_back(Ack::Started);
                    let duration = active.engine.duration();
                    self.publish(|s| s.progress = PlaybackProgress::new(0.0, duration));
                }
                Err(e) => {
                    self.fail_session(track, PlaybackError::Engine(e.to_string()))
                        .await;
                }
            }
            return;
        }

        info!(track = %track, "Track completed");
        self.emit(PlaybackEvent::Completed {
            track_id: track.to_string(),
        });
        self.deps.positions.clear(&track).await;

        self.teardown(false).await;
        self.session = Session::Transitioning;
        self.publish(|s| {
            s.is_playing = false;
            s.phase = SessionPhase::Transitioning;
        });

        match self.pick(Some(&track), true).await {
            Ok(next) => self.select(next).await,
            Err(PlaybackError::CatalogueEmpty(_)) => {
                debug!("Nothing to advance to");
                self.session = Session::Idle;
                self.publish_idle(None);
                self.emit(PlaybackEvent::Stopped {
                    track_id: Some(track.to_string()),
                });
            }
            Err(e) => {
                self.session = Session::Idle;
                self.surface(Some(track), e);
            }
        }
    }

    // ========================================================================
    // Progress
    // ========================================================================

    async fn on_progress_tick(&mut self) {
        let Some((track, offset, duration)) = self.sample_progress() else {
            self.ticker.disarm();
            return;
        };

        self.publish(|s| s.progress = PlaybackProgress::new(offset, duration));
        self.emit(PlaybackEvent::PositionChanged {
            track_id: track.to_string(),
            position_ms: seconds_to_ms(offset),
            duration_ms: duration.map(seconds_to_ms),
        });

        let due = self
            .last_position_write
            .map_or(true, |at| at.elapsed() >= self.config.position_write_interval);
        if due {
            self.deps.positions.save(&track, offset).await;
            self.last_position_write = Some(Instant::now());
        }
    }

    // ========================================================================
    // Teardown & failure
    // ========================================================================

    /// Release everything bound to the current session and go idle.
    ///
    /// The listener is detached before anything else so no event from the
    /// outgoing engine can reach the controller.
    async fn teardown(&mut self, save_position: bool) {
        self.ticker.disarm();

        match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Active(active) => {
                let ActiveSession {
                    track,
                    mut engine,
                    handle,
                    registration,
                    ..
                } = active;
                registration.detach();

                if save_position {
                    let offset = engine.current_offset();
                    if offset > 0.0 {
                        self.deps.positions.save(&track, offset).await;
                    }
                }

                if let Err(e) = engine.stop().await {
                    warn!(error = %e, track = %track, "Engine stop failed");
                }
                if let Err(e) = engine.unload().await {
                    warn!(error = %e, track = %track, "Engine unload failed");
                }
                self.deps.cache.release(handle);

                debug!(track = %track, "Session torn down");
                self.last_track = Some(track);
            }
            Session::Loading { track } => self.last_track = Some(track),
            Session::Idle | Session::Transitioning => {}
        }
    }

    async fn fail_session(&mut self, track: TrackId, error: PlaybackError) {
        self.teardown(false).await;
        self.generation += 1;
        self.last_track = Some(track.clone());
        self.surface(Some(track), error);
    }

    /// Publish an idle snapshot carrying `error` as the notice.
    fn surface(&mut self, track: Option<TrackId>, error: PlaybackError) {
        warn!(error = %error, track = ?track, "Playback failed");
        self.publish_idle(Some(error.user_message()));
        self.emit(PlaybackEvent::Error {
            track_id: track.map(|t| t.to_string()),
            message: error.to_string(),
            recoverable: error.is_transient(),
        });
    }

    async fn shutdown(&mut self) {
        self.teardown(true).await;
        self.generation += 1;
        self.publish_idle(None);
    }

    // ========================================================================
    // Session inspection
    // ========================================================================

    fn phase(&self) -> SessionPhase {
        match &self.session {
            Session::Idle => SessionPhase::Idle,
            Session::Loading { .. } => SessionPhase::Loading,
            Session::Transitioning => SessionPhase::Transitioning,
            Session::Active(active) => match active.state {
                EngineState::Ready => SessionPhase::Ready,
                EngineState::Playing => SessionPhase::Playing,
                EngineState::Paused => SessionPhase::Paused,
            },
        }
    }

    fn active_mut(&mut self) -> Option<&mut ActiveSession> {
        match &mut self.session {
            Session::Active(active) => Some(active),
            _ => None,
        }
    }

    /// Track, offset and duration of a playing engine.
    fn sample_progress(&self) -> Option<(TrackId, f64, Option<f64>)> {
        match &self.session {
            Session::Active(active) if active.state == EngineState::Playing => Some((
                active.track.clone(),
                active.engine.current_offset(),
                active.engine.duration(),
            )),
            _ => None,
        }
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    fn publish<F>(&self, update: F)
    where
        F: FnOnce(&mut PlayerSnapshot),
    {
        self.snapshot.send_modify(update);
    }

    fn publish_idle(&self, notice: Option<String>) {
        self.publish(|s| {
            s.current_track = None;
            s.is_playing = false;
            s.phase = SessionPhase::Idle;
            s.progress = PlaybackProgress::default();
            s.notice = notice;
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_ms() {
        assert_eq!(seconds_to_ms(1.5), 1500);
        assert_eq!(seconds_to_ms(-3.0), 0);
        assert_eq!(seconds_to_ms(0.0004), 0);
    }

    #[test]
    fn test_session_track() {
        assert!(Session::Idle.track().is_none());
        assert!(Session::Transitioning.track().is_none());
        let loading = Session::Loading {
            track: TrackId::new("a.mp3"),
        };
        assert_eq!(loading.track(), Some(&TrackId::new("a.mp3")));
    }
}
