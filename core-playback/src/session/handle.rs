//! Command side of the session controller.

use core_async::sync::{mpsc, oneshot};
use core_library::TrackId;

use crate::error::{PlaybackError, Result};

/// Requests processed by the controller task, in order.
#[derive(Debug)]
pub enum PlayerCommand {
    Select(TrackId),
    TogglePlayPause,
    Play,
    Pause,
    Stop,
    /// Fraction of the track duration, clamped to `[0, 1]`.
    SeekTo(f64),
    ToggleShuffle,
    ToggleRepeat,
    Next,
    Previous,
    /// Tear down and exit; the sender is signalled once teardown finished.
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable front door to a running session controller.
///
/// Every method only enqueues a command; its effect shows up later in the
/// [`PlayerStore`](crate::session::PlayerStore).
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<PlayerCommand>,
}

impl PlayerHandle {
    pub(crate) fn new(tx: mpsc::Sender<PlayerCommand>) -> Self {
        Self { tx }
    }

    async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| PlaybackError::ControllerClosed)
    }

    /// Load `track` and, with autoplay on, start it. Always tears down the
    /// current session first.
    pub async fn select_track(&self, track: impl Into<TrackId>) -> Result<()> {
        self.send(PlayerCommand::Select(track.into())).await
    }

    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.send(PlayerCommand::TogglePlayPause).await
    }

    pub async fn play(&self) -> Result<()> {
        self.send(PlayerCommand::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause).await
    }

    /// Tear the session down to idle.
    pub async fn stop(&self) -> Result<()> {
        self.send(PlayerCommand::Stop).await
    }

    /// Seek to `fraction` of the current track. Ignored while nothing is
    /// bound or the duration is unknown.
    pub async fn seek_to(&self, fraction: f64) -> Result<()> {
        self.send(PlayerCommand::SeekTo(fraction)).await
    }

    pub async fn toggle_shuffle(&self) -> Result<()> {
        self.send(PlayerCommand::ToggleShuffle).await
    }

    pub async fn toggle_repeat(&self) -> Result<()> {
        self.send(PlayerCommand::ToggleRepeat).await
    }

    pub async fn next_track(&self) -> Result<()> {
        self.send(PlayerCommand::Next).await
    }

    pub async fn previous_track(&self) -> Result<()> {
        self.send(PlayerCommand::Previous).await
    }

    /// Stop the controller, saving the current position. Resolves once the
    /// engine has been released.
    pub async fn shutdown(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(PlayerCommand::Shutdown(ack_tx)).await?;
        ack_rx.await.map_err(|_| PlaybackError::ControllerClosed)
    }

    /// Returns `true` once the controller task has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commands_are_enqueued_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = PlayerHandle::new(tx);

        handle.select_track("a.mp3").await.unwrap();
        handle.seek_to(0.5).await.unwrap();
        handle.toggle_shuffle().await.unwrap();

        assert!(matches!(rx.recv().await, Some(PlayerCommand::Select(id)) if id.as_str() == "a.mp3"));
        assert!(matches!(rx.recv().await, Some(PlayerCommand::SeekTo(f)) if f == 0.5));
        assert!(matches!(rx.recv().await, Some(PlayerCommand::ToggleShuffle)));
    }

    #[tokio::test]
    async fn test_closed_controller_is_reported() {
        let (tx, rx) = mpsc::channel(1);
        let handle = PlayerHandle::new(tx);
        drop(rx);

        assert!(handle.is_closed());
        assert!(matches!(
            handle.toggle_play_pause().await,
            Err(PlaybackError::ControllerClosed)
        ));
        assert!(matches!(
            handle.shutdown().await,
            Err(PlaybackError::ControllerClosed)
        ));
    }
}
