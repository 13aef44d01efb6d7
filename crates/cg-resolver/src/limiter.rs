use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// Monotonic time source for quota windows
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock used in production
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the limiter.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy)]
struct QuotaState {
    count: u32,
    window_start: Instant,
}

/// Fixed-window request counter.
///
/// Grants at most `capacity` acquisitions per window. All tokens come back at
/// once when the window elapses; there is no gradual refill.
pub struct QuotaLimiter {
    capacity: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<QuotaState>,
}

impl QuotaLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self::with_clock(capacity, window, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        let window_start = clock.now();
        Self {
            capacity,
            window,
            clock,
            state: Mutex::new(QuotaState {
                count: 0,
                window_start,
            }),
        }
    }

    /// Consume one token if the current window has any left. Never blocks
    /// beyond the internal lock.
    pub fn try_acquire(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if now.saturating_duration_since(state.window_start) >= self.window {
            debug!(
                "Quota window elapsed after {} requests, resetting",
                state.count
            );
            state.count = 0;
            state.window_start = now;
        }

        if state.count < self.capacity {
            state.count += 1;
            true
        } else {
            false
        }
    }

    /// Tokens left in the current window, as of now
    pub fn remaining(&self) -> u32 {
        let now = self.clock.now();
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if now.saturating_duration_since(state.window_start) >= self.window {
            self.capacity
        } else {
            self.capacity.saturating_sub(state.count)
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl fmt::Debug for QuotaLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotaLimiter")
            .field("capacity", &self.capacity)
            .field("window", &self.window)
            .field("remaining", &self.remaining())
            .finish()
    }
}
