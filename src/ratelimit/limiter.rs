// Fixed-window rate limiter for inbound messages, one window per client.
//
// The first request from a client opens a window. Requests inside the
// window are counted until the limit; further requests are rejected without
// being counted. Once the window is older than its duration the next request
// replaces it outright. Bursts at window boundaries are possible and accepted.
//
// Windows are never merged, but they would accumulate forever for clients
// that stop sending, so `sweep` drops windows that have been stale for a few
// window lengths. `serve` runs it on a timer via `spawn_sweeper`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::store::{RateWindow, WindowStore};

/// Windows this many durations old are dropped by `sweep`.
pub const STALE_WINDOWS: u32 = 2;

/// Floor for the sweeper's tick; `tokio::time::interval` panics on zero.
const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(1);

/// Per-client fixed-window rate limiter.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct ClientRateLimiter {
    store: Arc<dyn WindowStore>,
    /// Maximum requests allowed per window.
    limit: u32,
    /// Fixed window length.
    window: Duration,
}

impl ClientRateLimiter {
    pub fn new(store: Arc<dyn WindowStore>, limit: u32, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub fn check(&self, identity: &str) -> bool {
        self.check_at(identity, Instant::now())
    }

    /// `check` against an explicit clock reading.
    pub fn check_at(&self, identity: &str, now: Instant) -> bool {
        let mut allowed = true;
        let limit = self.limit;
        let window = self.window;

        self.store.modify(identity, &mut |current| match current {
            None => RateWindow::starting_at(now),
            Some(w) if now.saturating_duration_since(w.window_start) > window => {
                RateWindow::starting_at(now)
            }
            Some(w) if w.count >= limit => {
                allowed = false;
                w
            }
            Some(mut w) => {
                w.count += 1;
                w
            }
        });

        if !allowed {
            debug!(identity = identity, limit = limit, "Rate limit exceeded");
        }
        allowed
    }

    /// Drop windows that started more than `STALE_WINDOWS` windows before `now`.
    pub fn sweep(&self, now: Instant) -> usize {
        let max_age = self.window.saturating_mul(STALE_WINDOWS);
        match now.checked_sub(max_age) {
            Some(cutoff) => self.store.evict_started_before(cutoff),
            // Process younger than the stale age: nothing can be stale yet
            None => 0,
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked(&self) -> usize {
        self.store.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Run `sweep` once per window in a background tokio task.
pub fn spawn_sweeper(limiter: ClientRateLimiter) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(limiter.window().max(MIN_SWEEP_PERIOD));
        // The first tick fires immediately; skip it
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.sweep(Instant::now());
            if removed > 0 {
                info!(
                    removed = removed,
                    remaining = limiter.tracked(),
                    "Swept stale rate-limit windows"
                );
            }
        }
    })
}
