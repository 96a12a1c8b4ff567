//! Client-side throttle for write requests

use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};

/// Maximum number of write requests per window
pub const DEFAULT_MAX_ACTIONS: usize = 30;

/// Length of the rolling window
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Source of time for the rate limiter
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant::now`] and [`std::thread::sleep`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Rolling-window limiter gating every request the client sends
///
/// The whole of [`throttle`](Self::throttle), including any wait, runs under
/// one lock, so concurrent callers queue up and can never both claim the
/// last free slot.
///
/// # Example
///
/// ```
/// use hn_write_client::RateLimiter;
///
/// let limiter = RateLimiter::new();
/// limiter.throttle();
/// assert_eq!(limiter.len(), 1);
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    max_actions: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
    timestamps: Mutex<VecDeque<Instant>>,
}

static SHARED: OnceLock<Arc<RateLimiter>> = OnceLock::new();

impl RateLimiter {
    /// Create a limiter with the default ceiling of 30 requests per 60 seconds
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_ACTIONS, DEFAULT_WINDOW)
    }

    /// Create a limiter with a custom ceiling and window
    pub fn with_limits(max_actions: usize, window: Duration) -> Self {
        Self::with_clock(max_actions, window, Arc::new(SystemClock))
    }

    /// Create a limiter driven by a custom clock
    pub fn with_clock(max_actions: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_actions: max_actions.max(1),
            window,
            clock,
            timestamps: Mutex::new(VecDeque::with_capacity(max_actions)),
        }
    }

    /// Process-wide limiter shared by every client built with default settings
    ///
    /// All clients talk to the same remote server, so by default they share
    /// one budget.
    pub fn shared() -> Arc<RateLimiter> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(RateLimiter::new())))
    }

    /// Wait until a request slot is free, then claim it
    ///
    /// Drops timestamps older than the window. If the ceiling is reached,
    /// blocks until the oldest remaining timestamp leaves the window. The
    /// current time is recorded as the last step; a claimed slot is never
    /// given back.
    pub fn throttle(&self) {
        let mut timestamps = self.lock();

        let now = self.clock.now();
        self.prune(&mut timestamps, now);

        let now = if timestamps.len() >= self.max_actions {
            let oldest = timestamps[timestamps.len() - self.max_actions];
            let wait = (oldest + self.window).saturating_duration_since(now);
            tracing::debug!(
                wait_ms = wait.as_millis() as u64,
                in_window = timestamps.len(),
                "write rate limit reached, waiting"
            );
            self.clock.sleep(wait);

            let now = self.clock.now();
            self.prune(&mut timestamps, now);
            now
        } else {
            now
        };

        timestamps.push_back(now);
    }

    /// Number of requests recorded inside the current window
    pub fn len(&self) -> usize {
        let mut timestamps = self.lock();
        let now = self.clock.now();
        self.prune(&mut timestamps, now);
        timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every recorded request
    ///
    /// Intended for tests and debugging only.
    pub fn reset(&self) {
        self.lock().clear();
    }

    fn prune(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = timestamps.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        // The queue is always left consistent, so a poisoned lock is still usable
        self.timestamps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
