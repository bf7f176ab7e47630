use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

/// Default number of lines allowed per window.
pub const DEFAULT_MAX_PER_WINDOW: usize = 10;

/// Default sliding window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window limiter: at most `max_per_window` grants per key within
/// the trailing `window`.
#[derive(Debug)]
pub struct LogRateLimiter {
    max_per_window: usize,
    window: Duration,
    grants: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl Default for LogRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_WINDOW, DEFAULT_WINDOW)
    }
}

impl LogRateLimiter {
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            grants: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_per_window(&self) -> usize {
        self.max_per_window
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Grants and records one occurrence of `key` if the window has room.
    pub fn should_log(&self, key: &str) -> bool {
        self.should_log_at(Instant::now(), key)
    }

    /// Recorded grants for `key` that have already left the window.
    ///
    /// Rejected calls are never recorded, so this is not a count of
    /// suppressed lines. The next [`should_log`](Self::should_log) prunes
    /// whatever this reports.
    pub fn get_suppressed_count(&self, key: &str) -> usize {
        self.expired_at(Instant::now(), key)
    }

    /// Drops keys with no grant inside the window. Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn should_log_at(&self, now: Instant, key: &str) -> bool {
        let mut grants = self.lock();
        let stamps = grants.entry(key.to_owned()).or_default();

        while stamps
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
        {
            stamps.pop_front();
        }

        if stamps.len() < self.max_per_window {
            stamps.push_back(now);
            true
        } else {
            false
        }
    }

    fn expired_at(&self, now: Instant, key: &str) -> usize {
        self.lock().get(key).map_or(0, |stamps| {
            stamps
                .iter()
                .filter(|t| now.saturating_duration_since(**t) >= self.window)
                .count()
        })
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        let mut grants = self.lock();
        let before = grants.len();
        grants.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|t| now.saturating_duration_since(*t) < self.window)
        });
        before - grants.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.grants.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
