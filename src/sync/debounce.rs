// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Debouncing of bursts of SyncState source writes.
//!
//! When many bindings change at once (a rollout, an operator restart), every
//! write to a SyncState triggers a reconcile. The [`Debouncer`] holds the
//! Cloudflare call back until the aggregated hash has been stable for
//! `delay`, and never longer than `max_wait` after the first pending change.
//!
//! The debouncer is shared by all SyncState workers through the controller
//! context and is keyed by SyncState name.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Outcome of [`Debouncer::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceDecision {
    /// Sync now.
    Ready,
    /// Requeue after the given duration and observe again.
    Wait(Duration),
}

#[derive(Debug, Clone)]
struct Pending {
    hash: String,
    first_pending: Instant,
    last_change: Instant,
}

/// Per-key quiet-period tracker.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    max_wait: Duration,
    pending: Mutex<HashMap<String, Pending>>,
}

impl Debouncer {
    /// `max_wait` is raised to `delay` when shorter.
    #[must_use]
    pub fn new(delay: Duration, max_wait: Duration) -> Self {
        Self {
            delay,
            max_wait: max_wait.max(delay),
            pending: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Record that `key` currently aggregates to `hash` and decide whether to sync.
    ///
    /// A new or different hash restarts the quiet period; the max-wait clock
    /// starts with the first pending observation and is only reset by
    /// [`Debouncer::complete`] or [`Debouncer::forget`].
    pub fn observe(&self, key: &str, hash: &str, now: Instant) -> DebounceDecision {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        let entry = pending.entry(key.to_string()).or_insert_with(|| Pending {
            hash: hash.to_string(),
            first_pending: now,
            last_change: now,
        });
        if entry.hash != hash {
            entry.hash = hash.to_string();
            entry.last_change = now;
        }

        let quiet_for = now.saturating_duration_since(entry.last_change);
        let pending_for = now.saturating_duration_since(entry.first_pending);

        if quiet_for >= self.delay || pending_for >= self.max_wait {
            DebounceDecision::Ready
        } else {
            let until_quiet = self.delay - quiet_for;
            let until_max = self.max_wait - pending_for;
            DebounceDecision::Wait(until_quiet.min(until_max))
        }
    }

    /// Clear the pending state of `key` after a successful sync.
    pub fn complete(&self, key: &str) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Drop all state of `key` (SyncState deleted).
    pub fn forget(&self, key: &str) {
        self.complete(key);
    }
}

#[cfg(test)]
#[path = "debounce_tests.rs"]
mod debounce_tests;
