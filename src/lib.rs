//! Workspace umbrella crate.
//!
//! Exposes feature flags that map onto the individual workspace crates so a
//! host application can depend on `encore-workspace` alone. The default
//! `desktop-shims` feature pulls in the full `core-service` façade with the
//! desktop bridges; `playback-only` exposes just the playback core for hosts
//! that bring their own bridges.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "playback-only")]
pub use core_playback as playback;
