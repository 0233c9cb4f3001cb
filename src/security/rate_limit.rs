//! Sliding-window admission control for reputation providers.
//!
//! Every provider owns one [`RateLimiter`] sized to its daily quota. The
//! limiter keeps a ring of `capacity` expiry timestamps. A grant consumes
//! the slot after the cursor and stamps it with `now + expires_in`; the slot
//! becomes usable again only once that stamp has passed. Therefore at most
//! `capacity` grants fall inside any trailing window of `expires_in`.
//!
//! # Architecture
//!
//! ```text
//!   cursor ─┐
//!           v
//!   [ t+1h ][ t+1h ][ now ][ now ]      capacity = 4
//!                    ^
//!                    └── next candidate slot
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of "now" for the limiter.
///
/// Production uses [`SystemClock`]; tests drive time by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug)]
struct Window {
    slots: Vec<Instant>,
    cursor: usize,
}

/// Fixed-capacity sliding-window limiter.
pub struct RateLimiter {
    window: Mutex<Window>,
    expires_in: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Allow `capacity` grants per `expires_in`, using the system clock.
    pub fn new(capacity: usize, expires_in: Duration) -> Self {
        Self::with_clock(capacity, expires_in, Arc::new(SystemClock))
    }

    /// Daily quota convenience constructor.
    pub fn per_day(capacity: usize) -> Self {
        Self::new(capacity, Duration::from_secs(24 * 60 * 60))
    }

    /// Same as [`RateLimiter::new`] with an injected clock.
    pub fn with_clock(capacity: usize, expires_in: Duration, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            window: Mutex::new(Window {
                slots: vec![now; capacity],
                cursor: 0,
            }),
            expires_in,
            clock,
        }
    }

    /// Number of grants per window.
    pub fn capacity(&self) -> usize {
        self.window.lock().slots.len()
    }

    /// Try to take one admission.
    ///
    /// Returns `false` when the next slot has not expired yet. A zero
    /// capacity limiter never admits.
    pub fn allow(&self) -> bool {
        let now = self.clock.now();
        let mut window = self.window.lock();
        let len = window.slots.len();
        if len == 0 {
            return false;
        }

        let next = (window.cursor + 1) % len;
        if window.slots[next] > now {
            debug!(capacity = len, "rate window exhausted");
            return false;
        }

        window.cursor = next;
        window.slots[next] = now + self.expires_in;
        true
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("capacity", &self.capacity())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Clock;
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};

    /// Clock that only moves when told to.
    pub struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            *self.now.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock()
        }
    }
}
