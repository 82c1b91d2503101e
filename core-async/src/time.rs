//! Time-related abstractions.
//!
//! `Instant` is Tokio's instant rather than `std`'s so that code measuring
//! elapsed time follows the runtime clock, including when a test pauses and
//! advances it.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(10)).await;
//!     assert!(start.elapsed() >= Duration::from_millis(10));
//! }
//! ```

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
pub use tokio::time::{
    error::Elapsed, interval, interval_at, sleep, sleep_until, timeout, Instant, Interval,
    MissedTickBehavior, Sleep, Timeout,
};

/// A periodic timer that can be armed and disarmed in place.
///
/// While disarmed, [`Ticker::tick`] never completes, which lets an owner keep
/// it as a permanent branch of a `select!` loop. Disarming drops the
/// underlying interval, so no tick scheduled before the call can be observed
/// afterwards.
#[derive(Debug, Default)]
pub struct Ticker {
    interval: Option<Interval>,
}

impl Ticker {
    /// Create a disarmed ticker.
    pub fn new() -> Self {
        Self { interval: None }
    }

    /// Start ticking every `period`; the first tick fires one period from now.
    ///
    /// Re-arming an armed ticker restarts its schedule.
    pub fn arm(&mut self, period: Duration) {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
    }

    /// Stop ticking.
    pub fn disarm(&mut self) {
        self.interval = None;
    }

    /// Whether the ticker is currently armed.
    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next tick, or forever when disarmed.
    pub async fn tick(&mut self) -> Instant {
        match self.interval.as_mut() {
            Some(interval) => interval.tick().await,
            None => std::future::pending().await,
        }
    }
}
