//! # Playback Session
//!
//! The session controller actor plus the two halves the UI talks to:
//! [`PlayerHandle`] to send commands and [`PlayerStore`] to observe state.
//!
//! ```text
//!  UI ──PlayerHandle──► SessionController ──PlayerStore──► UI
//!                         │   ▲
//!           ResourceCache ┘   └ EngineEventSink (AudioEngine callbacks)
//! ```

pub mod controller;
pub mod handle;
pub mod state;
pub mod store;

pub use controller::{SessionController, SessionDependencies};
pub use handle::{PlayerCommand, PlayerHandle};
pub use state::{PlaybackProgress, PlayerSnapshot, SessionPhase};
pub use store::PlayerStore;
