// Window storage for the per-client rate limiter.
//
// Each read-modify-write goes through `modify`, which must run as a single
// critical section for that identity. The in-memory store gets this from
// DashMap's shard locks: two requests from the same client serialize, while
// unrelated clients on other shards proceed in parallel.

use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Request count for one client within the current fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub window_start: Instant,
}

impl RateWindow {
    /// A fresh window containing one request.
    pub fn starting_at(now: Instant) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }
}

/// Storage backend for rate windows, keyed by client identity.
pub trait WindowStore: Send + Sync {
    /// Current window for `identity`, if any.
    fn get(&self, identity: &str) -> Option<RateWindow>;

    /// Replace the window for `identity`.
    fn set(&self, identity: &str, window: RateWindow);

    /// Atomically read, transform and store the window for `identity`.
    /// Returns the stored value.
    fn modify(
        &self,
        identity: &str,
        f: &mut dyn FnMut(Option<RateWindow>) -> RateWindow,
    ) -> RateWindow;

    /// Drop every window that started before `cutoff`. Returns how many were removed.
    fn evict_started_before(&self, cutoff: Instant) -> usize;

    /// Number of tracked identities.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local window table.
#[derive(Default)]
pub struct MemoryWindowStore {
    windows: DashMap<String, RateWindow>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowStore for MemoryWindowStore {
    fn get(&self, identity: &str) -> Option<RateWindow> {
        self.windows.get(identity).map(|w| *w)
    }

    fn set(&self, identity: &str, window: RateWindow) {
        self.windows.insert(identity.to_string(), window);
    }

    fn modify(
        &self,
        identity: &str,
        f: &mut dyn FnMut(Option<RateWindow>) -> RateWindow,
    ) -> RateWindow {
        // Fast path avoids allocating a key for known clients
        if let Some(mut window) = self.windows.get_mut(identity) {
            let next = f(Some(*window));
            *window = next;
            return next;
        }

        match self.windows.entry(identity.to_string()) {
            Entry::Occupied(mut entry) => {
                let next = f(Some(*entry.get()));
                entry.insert(next);
                next
            }
            Entry::Vacant(entry) => {
                let next = f(None);
                entry.insert(next);
                next
            }
        }
    }

    fn evict_started_before(&self, cutoff: Instant) -> usize {
        let mut removed = 0;
        self.windows.retain(|_, window| {
            let keep = window.window_start >= cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    fn len(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_get_set_round_trip() {
        let store = MemoryWindowStore::new();
        let now = Instant::now();
        assert!(store.get("1.2.3.4").is_none());

        store.set(
            "1.2.3.4",
            RateWindow {
                count: 4,
                window_start: now,
            },
        );
        assert_eq!(store.get("1.2.3.4").map(|w| w.count), Some(4));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_modify_sees_none_for_new_identity() {
        let store = MemoryWindowStore::new();
        let now = Instant::now();
        let mut saw = None;
        store.modify("anon", &mut |current| {
            saw = Some(current.is_none());
            RateWindow::starting_at(now)
        });
        assert_eq!(saw, Some(true));
        assert_eq!(store.get("anon").map(|w| w.count), Some(1));
    }

    #[test]
    fn test_modify_updates_existing_window() {
        let store = MemoryWindowStore::new();
        let now = Instant::now();
        store.set("anon", RateWindow::starting_at(now));

        let stored = store.modify("anon", &mut |current| {
            let mut window = current.unwrap_or(RateWindow::starting_at(now));
            window.count += 1;
            window
        });
        assert_eq!(stored.count, 2);
        assert_eq!(store.get("anon").map(|w| w.count), Some(2));
    }

    #[test]
    fn test_evict_started_before_drops_only_old_windows() {
        let store = MemoryWindowStore::new();
        let old = Instant::now();
        let fresh = old + Duration::from_secs(300);

        store.set("old", RateWindow::starting_at(old));
        store.set("fresh", RateWindow::starting_at(fresh));

        let removed = store.evict_started_before(old + Duration::from_secs(120));
        assert_eq!(removed, 1);
        assert!(store.get("old").is_none());
        assert!(store.get("fresh").is_some());
    }
}
