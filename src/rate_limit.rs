use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

// Rate limit entry - tracks admissions per user
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub last_request: Option<Instant>, // None until the first admission
    pub window_start: Instant,
    pub count: u32,
}

impl RateLimitEntry {
    fn new(now: Instant) -> Self {
        Self {
            last_request: None,
            window_start: now,
            count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub min_interval: Duration, // spacing between two admissions
    pub max_per_window: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            max_per_window: 20,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot was (or would be) consumed now.
    Granted,
    /// Not admitted, ask again after this delay.
    RetryAfter(Duration),
}

impl Admission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted)
    }

    /// Zero when granted, like the millisecond delay the drain loop waits on.
    pub fn delay(&self) -> Duration {
        match self {
            Admission::Granted => Duration::ZERO,
            Admission::RetryAfter(delay) => *delay,
        }
    }
}

/// Per-user rolling window limiter.
///
/// Each user gets at most one admission per `min_interval` and at most
/// `max_per_window` admissions per window. The window is reset lazily by the
/// first admission attempt that lands more than `window` after its start.
/// Entries are created on first use and never evicted.
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: DashMap<String, RateLimitEntry>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Try to consume a slot for `user_id` at `now`.
    ///
    /// A rejection on the per-interval gate leaves the entry untouched. A
    /// rejection on the window count keeps a rollover applied in the same call.
    pub fn admit(&self, user_id: &str, now: Instant) -> Admission {
        // the entry guard serializes check and mutation for this user
        let mut entry = self
            .entries
            .entry(user_id.to_string())
            .or_insert_with(|| RateLimitEntry::new(now));

        if let Some(wait) = self.interval_wait(&entry, now) {
            debug!(%user_id, ?wait, "admission deferred by interval");
            return Admission::RetryAfter(wait);
        }

        // window expired..? reset it
        if now.saturating_duration_since(entry.window_start) > self.config.window {
            entry.window_start = now;
            entry.count = 0;
        }

        if entry.count >= self.config.max_per_window {
            let wait = self.window_wait(&entry, now);
            debug!(%user_id, ?wait, count = entry.count, "admission deferred by window");
            return Admission::RetryAfter(wait);
        }

        entry.last_request = Some(now);
        entry.count += 1;
        Admission::Granted
    }

    /// Same decision as [`admit`](Self::admit) without consuming or resetting anything.
    pub fn check(&self, user_id: &str, now: Instant) -> Admission {
        let Some(entry) = self.entries.get(user_id) else {
            return Admission::Granted;
        };

        if let Some(wait) = self.interval_wait(&entry, now) {
            return Admission::RetryAfter(wait);
        }

        if now.saturating_duration_since(entry.window_start) > self.config.window {
            return Admission::Granted;
        }

        if entry.count >= self.config.max_per_window {
            return Admission::RetryAfter(self.window_wait(&entry, now));
        }

        Admission::Granted
    }

    /// Snapshot of a user's state, if any was ever created.
    pub fn entry(&self, user_id: &str) -> Option<RateLimitEntry> {
        self.entries.get(user_id).map(|e| e.clone())
    }

    pub fn tracked_users(&self) -> usize {
        self.entries.len()
    }

    fn interval_wait(&self, entry: &RateLimitEntry, now: Instant) -> Option<Duration> {
        let last = entry.last_request?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.config.min_interval {
            Some(self.config.min_interval - elapsed)
        } else {
            None
        }
    }

    fn window_wait(&self, entry: &RateLimitEntry, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(entry.window_start);
        // a zero delay would read as granted
        self.config
            .window
            .saturating_sub(elapsed)
            .max(Duration::from_millis(1))
    }
}
