use std::{
    collections::HashMap,
    mem,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crate::throttle::{KEY_PREFIX_CHARS, LogSink, Severity, TracingSink};

#[derive(Debug)]
struct KeyState {
    last_emit: Instant,
    suppressed: u64,
}

/// Logger wrapper that lets at most one line per key through every `min_interval`.
///
/// Debug, info and warning calls are keyed by the explicit `key` or, when it
/// is `None`, by the first 50 characters of the message. A call inside the
/// interval is counted and dropped; the next call that gets through carries
/// `" (+N suppressed)"`. Error and critical calls bypass all of this.
///
/// The decision for a key is made under one lock, so concurrent callers
/// never both emit inside the same interval and never lose a count.
///
/// ```
/// use std::time::Duration;
/// use wake_observe::ThrottledLogger;
///
/// let log = ThrottledLogger::new("ticks", Duration::from_secs(5));
/// for n in 0..100 {
///     log.info(&format!("tick {n}"), Some("tick"));
/// }
/// ```
pub struct ThrottledLogger<S = TracingSink> {
    sink: S,
    min_interval: Duration,
    state: Mutex<HashMap<String, KeyState>>,
}

impl ThrottledLogger<TracingSink> {
    pub fn new(name: impl Into<String>, min_interval: Duration) -> Self {
        Self::with_sink(TracingSink::new(name), min_interval)
    }
}

impl<S: LogSink> ThrottledLogger<S> {
    pub fn with_sink(sink: S, min_interval: Duration) -> Self {
        Self {
            sink,
            min_interval,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns `true` if the line was emitted.
    pub fn debug(&self, msg: &str, key: Option<&str>) -> bool {
        self.throttled(Instant::now(), Severity::Debug, msg, key)
    }

    /// Returns `true` if the line was emitted.
    pub fn info(&self, msg: &str, key: Option<&str>) -> bool {
        self.throttled(Instant::now(), Severity::Info, msg, key)
    }

    /// Returns `true` if the line was emitted.
    pub fn warning(&self, msg: &str, key: Option<&str>) -> bool {
        self.throttled(Instant::now(), Severity::Warning, msg, key)
    }

    pub fn error(&self, msg: &str) {
        self.sink.emit(Severity::Error, msg);
    }

    pub fn critical(&self, msg: &str) {
        self.sink.emit(Severity::Critical, msg);
    }

    /// Emits at `severity` without consulting or touching throttle state.
    pub fn force_log(&self, severity: Severity, msg: &str) {
        self.sink.emit(severity, msg);
    }

    /// Suppressed calls waiting to be reported for `key`.
    pub fn suppressed(&self, key: &str) -> u64 {
        self.lock().get(key).map_or(0, |s| s.suppressed)
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    /// Forgets keys that have not emitted for `idle`. Pending suppressed
    /// counts of evicted keys are dropped. Returns how many keys were removed.
    pub fn evict_idle(&self, idle: Duration) -> usize {
        self.evict_idle_at(Instant::now(), idle)
    }

    fn evict_idle_at(&self, now: Instant, idle: Duration) -> usize {
        let mut state = self.lock();
        let before = state.len();
        state.retain(|_, s| now.saturating_duration_since(s.last_emit) < idle);
        before - state.len()
    }

    fn throttled(&self, now: Instant, severity: Severity, msg: &str, key: Option<&str>) -> bool {
        if !severity.is_throttled() {
            self.sink.emit(severity, msg);
            return true;
        }

        let key = key.unwrap_or_else(|| key_prefix(msg));
        let Some(suppressed) = self.admit(now, key) else {
            return false;
        };

        if suppressed > 0 {
            self.sink
                .emit(severity, &format!("{msg} (+{suppressed} suppressed)"));
        } else {
            self.sink.emit(severity, msg);
        }
        true
    }

    /// Returns the pending suppressed count when `key` may emit at `now`,
    /// resetting it; otherwise records one more suppressed call.
    fn admit(&self, now: Instant, key: &str) -> Option<u64> {
        let mut state = self.lock();
        match state.get_mut(key) {
            Some(entry) if now.saturating_duration_since(entry.last_emit) >= self.min_interval => {
                entry.last_emit = now;
                Some(mem::take(&mut entry.suppressed))
            }
            Some(entry) => {
                entry.suppressed += 1;
                None
            }
            None => {
                state.insert(
                    key.to_owned(),
                    KeyState {
                        last_emit: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, KeyState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// First [`KEY_PREFIX_CHARS`] characters of `msg`, cut on a char boundary.
fn key_prefix(msg: &str) -> &str {
    match msg.char_indices().nth(KEY_PREFIX_CHARS) {
        Some((idx, _)) => &msg[..idx],
        None => msg,
    }
}
