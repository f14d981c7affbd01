//! In-memory rate limiting for authentication attempts.
//!
//! Each client key gets a window that starts on its first attempt and is reset
//! lazily by the first attempt after it has fully elapsed. Every check counts
//! as an attempt, including checks that end up rejected.
//!
//! The table lives for the process lifetime only; expired entries are purged
//! by [`crate::cleanup::run_cleanup_loop`].

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default number of attempts allowed per window
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default window length (15 minutes)
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Default interval between purges of expired entries (5 minutes)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Longest accepted window (one week)
pub const MAX_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Client key used when no forwarding header is present.
///
/// All such clients share one bucket. This is an accepted approximation.
pub const UNKNOWN_CLIENT: &str = "unknown";

pub const HEADER_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const HEADER_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const HEADER_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    /// Attempts observed in `[window_start, window_start + window)`
    attempts: u32,
    window_start: Instant,
}

/// Shared attempt table keyed by client.
///
/// Cloning is cheap and every clone sees the same table.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    attempts: Arc<DashMap<String, RateLimitEntry>>,
    max_attempts: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            window,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an attempt for `key` and report whether it is over the limit.
    ///
    /// The entry's shard stays locked for the whole read-modify-write, so
    /// concurrent attempts from the same key are never undercounted.
    pub fn is_rate_limited(&self, key: &str) -> bool {
        let now = Instant::now();

        match self.attempts.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(RateLimitEntry {
                    attempts: 1,
                    window_start: now,
                });
                1 > self.max_attempts
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if now.duration_since(entry.window_start) >= self.window {
                    *entry = RateLimitEntry {
                        attempts: 1,
                        window_start: now,
                    };
                    return 1 > self.max_attempts;
                }

                entry.attempts = entry.attempts.saturating_add(1);
                entry.attempts > self.max_attempts
            }
        }
    }

    /// Attempts left for `key` in its current window.
    pub fn remaining(&self, key: &str) -> u32 {
        let now = Instant::now();
        match self.attempts.get(key) {
            Some(entry) if now.duration_since(entry.window_start) < self.window => {
                self.max_attempts.saturating_sub(entry.attempts)
            }
            _ => self.max_attempts,
        }
    }

    /// Time until the window for `key` resets. Zero when there is no entry.
    pub fn reset_in(&self, key: &str) -> Duration {
        match self.attempts.get(key) {
            Some(entry) => match entry.window_start.checked_add(self.window) {
                Some(reset_at) => reset_at.saturating_duration_since(Instant::now()),
                None => self.window,
            },
            None => Duration::ZERO,
        }
    }

    /// Set `X-RateLimit-Limit`, `X-RateLimit-Remaining` and `X-RateLimit-Reset`
    /// (seconds, rounded up) for `key`.
    pub fn apply_headers(&self, headers: &mut HeaderMap, key: &str) {
        let reset_secs = self.reset_in(key).as_millis().div_ceil(1000);

        headers.insert(HEADER_LIMIT, HeaderValue::from(self.max_attempts));
        headers.insert(HEADER_REMAINING, HeaderValue::from(self.remaining(key)));
        headers.insert(HEADER_RESET, HeaderValue::from(reset_secs as u64));
    }

    /// Drop every entry whose window has elapsed. Returns the number removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.attempts.len();
        self.attempts
            .retain(|_, entry| now.duration_since(entry.window_start) < self.window);
        before.saturating_sub(self.attempts.len())
    }

    /// Number of tracked client keys.
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

/// Derive the rate-limit key for a request.
///
/// Prefers the first `X-Forwarded-For` address, then `X-Real-IP`, then
/// [`UNKNOWN_CLIENT`].
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    UNKNOWN_CLIENT.to_string()
}
