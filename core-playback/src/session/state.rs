//! Observable session state.

use core_library::TrackId;
use serde::{Deserialize, Serialize};

/// Where the session controller is in the load, play, end cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No track bound.
    #[default]
    Idle,
    /// Waiting for the cache to resolve the selected track.
    Loading,
    /// Engine built and positioned, not yet confirmed playing.
    Ready,
    Playing,
    Paused,
    /// The current track ended and the next one is being chosen.
    Transitioning,
}

impl SessionPhase {
    /// Phases with an engine bound.
    pub fn has_engine(&self) -> bool {
        matches!(
            self,
            SessionPhase::Ready | SessionPhase::Playing | SessionPhase::Paused
        )
    }
}

/// Playback offset of the bound engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackProgress {
    pub offset_seconds: f64,
    /// `None` until the engine knows the duration.
    pub duration_seconds: Option<f64>,
}

impl PlaybackProgress {
    pub fn new(offset_seconds: f64, duration_seconds: Option<f64>) -> Self {
        Self {
            offset_seconds,
            duration_seconds,
        }
    }

    /// Offset as a fraction of the duration, in `[0, 1]`.
    pub fn fraction(&self) -> Option<f64> {
        match self.duration_seconds {
            Some(duration) if duration > 0.0 => {
                Some((self.offset_seconds / duration).clamp(0.0, 1.0))
            }
            _ => None,
        }
    }
}

/// Everything the UI needs to render the player.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub current_track: Option<TrackId>,
    pub is_playing: bool,
    pub phase: SessionPhase,
    pub progress: PlaybackProgress,
    pub shuffle: bool,
    pub repeat_one: bool,
    /// User-facing message about the last failure, cleared on the next
    /// selection.
    pub notice: Option<String>,
}

impl PlayerSnapshot {
    /// Nothing selected and nothing playing.
    pub fn is_idle(&self) -> bool {
        self.phase == SessionPhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        assert_eq!(PlaybackProgress::new(30.0, Some(120.0)).fraction(), Some(0.25));
        assert_eq!(PlaybackProgress::new(130.0, Some(120.0)).fraction(), Some(1.0));
        assert_eq!(PlaybackProgress::new(30.0, None).fraction(), None);
        assert_eq!(PlaybackProgress::new(0.0, Some(0.0)).fraction(), None);
    }

    #[test]
    fn test_default_snapshot_is_idle() {
        let snapshot = PlayerSnapshot::default();
        assert!(snapshot.is_idle());
        assert!(!snapshot.is_playing);
        assert!(!snapshot.phase.has_engine());
    }

    #[test]
    fn test_snapshot_serializes_phase_in_snake_case() {
        let snapshot = PlayerSnapshot {
            phase: SessionPhase::Transitioning,
            ..Default::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["phase"], "transitioning");
    }
}
