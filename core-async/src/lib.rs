//! Runtime abstraction layer for the Encore playback core.
//!
//! Every other crate in the workspace reaches the async runtime through this
//! crate instead of naming Tokio directly. Native builds map each module onto
//! the corresponding `tokio` module; the surface is kept narrow so an
//! alternative executor only needs to satisfy what is re-exported here.
//!
//! # Modules
//!
//! - `task`: task spawning and join handles
//! - `time`: sleep, timeouts, intervals, and the disarmable [`time::Ticker`]
//! - `sync`: async-aware locks and channels
//! - `runtime`: runtime handles and a `block_on` helper for sync contexts
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};

/// Wait on several async branches and run the first that completes.
pub use tokio::select;
