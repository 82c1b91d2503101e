//! Application state store fed by the session controller.

use core_async::sync::watch;

use crate::error::{PlaybackError, Result};
use crate::session::state::PlayerSnapshot;

/// Read side of the player state. Cheap to clone; every clone sees the same
/// latest snapshot.
#[derive(Debug, Clone)]
pub struct PlayerStore {
    rx: watch::Receiver<PlayerSnapshot>,
}

impl PlayerStore {
    pub(crate) fn new(rx: watch::Receiver<PlayerSnapshot>) -> Self {
        Self { rx }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.rx.borrow().clone()
    }

    /// Raw watch receiver, for hosts that drive their own select loops.
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.rx.clone()
    }

    /// Wait for the next published snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::ControllerClosed`] once the controller has
    /// stopped.
    pub async fn changed(&mut self) -> Result<PlayerSnapshot> {
        self.rx
            .changed()
            .await
            .map_err(|_| PlaybackError::ControllerClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait until a snapshot satisfies `predicate`, checking the current one
    /// first.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Result<PlayerSnapshot>
    where
        F: FnMut(&PlayerSnapshot) -> bool,
    {
        loop {
            {
                let current = self.rx.borrow_and_update();
                if predicate(&*current) {
                    return Ok(current.clone());
                }
            }
            self.rx
                .changed()
                .await
                .map_err(|_| PlaybackError::ControllerClosed)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::SessionPhase;

    #[tokio::test]
    async fn test_wait_for_sees_later_update() {
        let (tx, rx) = watch::channel(PlayerSnapshot::default());
        let mut store = PlayerStore::new(rx);

        tokio::spawn(async move {
            tx.send_modify(|s| s.phase = SessionPhase::Loading);
            tx.send_modify(|s| {
                s.phase = SessionPhase::Playing;
                s.is_playing = true;
            });
        });

        let snapshot = store.wait_for(|s| s.is_playing).await.unwrap();
        assert_eq!(snapshot.phase, SessionPhase::Playing);
        assert!(store.snapshot().is_playing);
    }

    #[tokio::test]
    async fn test_closed_controller_is_reported() {
        let (tx, rx) = watch::channel(PlayerSnapshot::default());
        let mut store = PlayerStore::new(rx);
        drop(tx);

        assert!(matches!(
            store.changed().await,
            Err(PlaybackError::ControllerClosed)
        ));
        assert!(matches!(
            store.wait_for(|s| s.is_playing).await,
            Err(PlaybackError::ControllerClosed)
        ));
    }
}
