//! Sliding-window rate limiter for mutating actions.
//!
//! One window per `(user, action)` pair, all windows sharing the same
//! limit and length. State is a timestamp list per pair; nothing is
//! persisted, so a daemon restart clears every window. The key space is
//! unbounded but small in practice: a fixed set of actions times a
//! handful of users.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

use dockyard_core::DockyardError;
use dockyard_core::metrics::{LABEL_ACTION, RATE_LIMIT_REJECTIONS_TOTAL};

/// Sliding-window limiter keyed by `(user, action)`.
///
/// A call is admitted when fewer than `limit` calls of the same pair
/// were admitted within the trailing window. Rejected calls are not
/// recorded, so they do not extend the window.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    admitted: Mutex<HashMap<(String, String), VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            admitted: Mutex::new(HashMap::new()),
        }
    }

    /// Admits or rejects one call of `action` by `user` happening now.
    pub fn check(&self, user: &str, action: &str) -> Result<(), DockyardError> {
        self.check_at(user, action, Instant::now())
    }

    /// Admits or rejects one call of `action` by `user` happening at
    /// `now`. Timestamps must be non-decreasing across calls.
    ///
    /// The evict-test-append sequence runs as one unit under the lock,
    /// so concurrent checks on the same pair cannot race past the limit.
    pub fn check_at(&self, user: &str, action: &str, now: Instant) -> Result<(), DockyardError> {
        let mut admitted = self.admitted.lock().unwrap_or_else(|e| e.into_inner());
        let window = admitted
            .entry((user.to_owned(), action.to_owned()))
            .or_default();

        // an admission aged exactly one window still counts
        while window
            .front()
            .is_some_and(|t| now.duration_since(*t) > self.window)
        {
            window.pop_front();
        }

        if window.len() >= self.limit {
            warn!(user, action, limit = self.limit, "rate limit exceeded");
            metrics::counter!(RATE_LIMIT_REJECTIONS_TOTAL, LABEL_ACTION => action.to_owned())
                .increment(1);
            return Err(DockyardError::RateLimited {
                action: action.to_owned(),
            });
        }

        window.push_back(now);
        Ok(())
    }
}
