//! Request de-duplication.
//!
//! View-layer lifecycle hooks fire more than once for what is logically one
//! navigation (double mounts, back/forward, re-renders). Two guards keep that
//! from turning into repeated network work:
//!
//! - [`RequestDedupCache`] remembers every navigation key started in this
//!   session. Only the first attempt for a key proceeds, whether or not it has
//!   finished. It holds no article data and is never evicted: keys are bounded
//!   by the distinct paths visited in one session.
//! - [`DebounceGuard`] rejects any attempt started within a short interval of
//!   the previous admitted attempt, for any key.

use crate::metrics_defs::DEDUP_ENTRIES;
use crate::types::NavigationKey;
use parking_lot::Mutex;
use shared::gauge;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryState {
    Pending,
    Done,
}

#[derive(Clone, Copy, Debug)]
pub struct CacheEntry {
    pub state: EntryState,
    pub inserted_at: Instant,
}

#[derive(Default)]
pub struct RequestDedupCache {
    entries: Mutex<HashMap<NavigationKey, CacheEntry>>,
}

impl RequestDedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and marks the key pending the first time it is seen.
    /// Every later call for the same key returns false.
    pub fn try_begin(&self, key: &str) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            return false;
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                state: EntryState::Pending,
                inserted_at: Instant::now(),
            },
        );
        gauge!(DEDUP_ENTRIES).set(entries.len() as f64);
        true
    }

    /// Transitions the key to `Done`. Idempotent; unknown keys are ignored.
    pub fn mark_done(&self, key: &str) {
        if let Some(entry) = self.entries.lock().get_mut(key) {
            entry.state = EntryState::Done;
        }
    }

    pub fn state(&self, key: &str) -> Option<EntryState> {
        self.entries.lock().get(key).map(|entry| entry.state)
    }

    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct DebounceState {
    last_admitted: Option<Instant>,
    // Target of the redirect we just issued. The attempt it triggers arrives
    // immediately and must not be debounced away.
    expected: Option<NavigationKey>,
}

pub struct DebounceGuard {
    interval: Duration,
    state: Mutex<DebounceState>,
}

impl DebounceGuard {
    pub fn new(interval: Duration) -> Self {
        DebounceGuard {
            interval,
            state: Mutex::new(DebounceState {
                last_admitted: None,
                expected: None,
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true if an attempt for `key` may start now, and records it.
    pub fn admit(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock();

        let expected = state.expected.as_deref() == Some(key);
        let within_window = state
            .last_admitted
            .is_some_and(|last| now.duration_since(last) < self.interval);

        if within_window && !expected {
            return false;
        }

        if expected {
            state.expected = None;
        }
        state.last_admitted = Some(now);
        true
    }

    /// Lets the next attempt for `key` bypass the window once.
    pub fn expect(&self, key: &str) {
        self.state.lock().expected = Some(key.to_string());
    }
}

impl Default for DebounceGuard {
    fn default() -> Self {
        DebounceGuard::new(DEFAULT_DEBOUNCE)
    }
}
