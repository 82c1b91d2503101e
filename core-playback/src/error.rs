//! # Playback Error Types
//!
//! Error taxonomy for the resource cache, navigator and session controller.

use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

// ============================================================================
// Fetch Errors
// ============================================================================

/// A payload could not be obtained from its source.
///
/// `locator` is the redacted locator (last path segment, no query string),
/// safe to show in notices and logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure (DNS, connect, TLS, reset).
    #[error("Network error fetching {locator}: {message}")]
    Network { locator: String, message: String },

    /// The fetch did not complete within the configured timeout.
    #[error("Fetching {locator} timed out after {timeout_ms} ms")]
    Timeout { locator: String, timeout_ms: u64 },

    /// The source answered successfully but with no bytes.
    #[error("Empty payload for {locator}")]
    EmptyPayload { locator: String },

    /// The source answered with a non-success status.
    #[error("HTTP {status} fetching {locator}")]
    Status { locator: String, status: u16 },
}

impl FetchError {
    /// Returns `true` if another attempt might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Timeout { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::EmptyPayload { .. } => false,
        }
    }
}

// ============================================================================
// Decode / Catalogue Errors
// ============================================================================

/// The engine could not play the payload bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot decode {track}: {message}")]
pub struct DecodeError {
    pub track: String,
    pub message: String,
}

/// There is nothing to advance to.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Catalogue is empty")]
pub struct CatalogueEmptyError;

// ============================================================================
// Playback Error
// ============================================================================

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    CatalogueEmpty(#[from] CatalogueEmptyError),

    /// The catalogue provider failed.
    #[error("Catalogue error: {0}")]
    Catalogue(#[from] LibraryError),

    /// An engine control call (play, pause, seek) failed.
    #[error("Audio engine error: {0}")]
    Engine(String),

    /// A storage bridge failed.
    #[error("Storage error: {0}")]
    Storage(#[from] BridgeError),

    /// Persisted data could not be parsed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The controller task has stopped.
    #[error("Playback controller is not running")]
    ControllerClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Fetch(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::Fetch(FetchError::Network { .. })
                | PlaybackError::Fetch(FetchError::Timeout { .. })
        )
    }

    /// Text suitable for a user-facing notice.
    pub fn user_message(&self) -> String {
        match self {
            PlaybackError::Fetch(FetchError::Timeout { locator, .. }) => {
                format!("Loading {} took too long", locator)
            }
            PlaybackError::Fetch(FetchError::Status { locator, status }) if *status == 404 => {
                format!("{} could not be found", locator)
            }
            PlaybackError::Fetch(e) => format!("Could not load track: {}", e),
            PlaybackError::Decode(e) => {
                format!("Could not play {}: unsupported or damaged audio", e.track)
            }
            other => other.to_string(),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_classification() {
        let timeout = FetchError::Timeout {
            locator: "a.mp3".to_string(),
            timeout_ms: 30_000,
        };
        assert!(timeout.is_transient());
        assert!(PlaybackError::from(timeout).is_network_error());

        let missing = FetchError::Status {
            locator: "a.mp3".to_string(),
            status: 404,
        };
        assert!(!missing.is_transient());
        assert_eq!(
            PlaybackError::from(missing).user_message(),
            "a.mp3 could not be found"
        );

        assert!(FetchError::Status {
            locator: "a.mp3".to_string(),
            status: 503,
        }
        .is_transient());
        assert!(!FetchError::EmptyPayload {
            locator: "a.mp3".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_decode_error_is_not_transient() {
        let error = PlaybackError::from(DecodeError {
            track: "a.mp3".to_string(),
            message: "no decoder for format".to_string(),
        });
        assert!(!error.is_transient());
        assert_eq!(error.to_string(), "Cannot decode a.mp3: no decoder for format");
    }
}
