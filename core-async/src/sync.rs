//! Synchronization primitives.
//!
//! Async-aware locks and channels re-exported from `tokio::sync`. The playback
//! controller uses `mpsc` for its command/event inbox and `watch` for the
//! observable player snapshot; `broadcast` backs the runtime event bus.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::watch;
//!
//! let (tx, rx) = watch::channel(0u32);
//! tx.send_replace(1);
//! assert_eq!(*rx.borrow(), 1);
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard, Semaphore, SemaphorePermit,
};
