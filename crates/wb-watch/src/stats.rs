//! Lock-free watcher counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use wb_core::Classification;

/// Shared, incrementable counters owned by the running watcher.
#[derive(Debug, Default)]
pub struct WatchCounters {
    seen: AtomicU64,
    new: AtomicU64,
    duplicate: AtomicU64,
    update: AtomicU64,
    rejected: AtomicU64,
    unsettled: AtomicU64,
    render_failures: AtomicU64,
}

/// Point-in-time copy of [`WatchCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStats {
    pub seen: u64,
    pub new: u64,
    pub duplicate: u64,
    pub update: u64,
    pub rejected: u64,
    pub unsettled: u64,
    pub render_failures: u64,
}

impl WatchStats {
    /// Files that made it onto the board in any form.
    pub fn accepted(&self) -> u64 {
        self.new + self.duplicate + self.update
    }
}

impl WatchCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn file_seen(&self) {
        self.seen.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn classified(&self, classification: Classification) {
        let counter = match classification {
            Classification::New => &self.new,
            Classification::Duplicate => &self.duplicate,
            Classification::Update => &self.update,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn unsettled(&self) {
        self.unsettled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn render_failed(&self) {
        self.render_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WatchStats {
        WatchStats {
            seen: self.seen.load(Ordering::Relaxed),
            new: self.new.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
            update: self.update.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            unsettled: self.unsettled.load(Ordering::Relaxed),
            render_failures: self.render_failures.load(Ordering::Relaxed),
        }
    }
}
