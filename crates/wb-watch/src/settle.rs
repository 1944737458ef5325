//! Quiescence tracking for inbox files.
//!
//! A file is only read once its length and modification time have stayed the
//! same for the quiescence interval. Files that keep changing past the settle
//! timeout are given up on. The tracker is clock-agnostic: callers pass
//! `now` in, which keeps it deterministic under test.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// What a metadata probe saw for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileProbe {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileProbe {
    /// Probe `path` on disk. `None` when it is gone or not a regular file.
    pub fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        meta.is_file().then(|| Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

/// Result of polling a pending file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// Unchanged for the whole quiescence interval.
    Ready(PathBuf),
    /// Still changing when the settle timeout ran out.
    TimedOut(PathBuf),
    /// Disappeared before it settled.
    Vanished(PathBuf),
}

#[derive(Debug)]
struct Pending {
    first_seen: Instant,
    last_change: Instant,
    last_probe: Option<FileProbe>,
}

#[derive(Debug)]
pub struct SettleTracker {
    quiescence: Duration,
    timeout: Duration,
    pending: HashMap<PathBuf, Pending>,
}

impl SettleTracker {
    pub fn new(quiescence: Duration, timeout: Duration) -> Self {
        Self {
            quiescence,
            timeout,
            pending: HashMap::new(),
        }
    }

    /// A filesystem event touched `path`; restart its quiet period.
    pub fn observe(&mut self, path: PathBuf, now: Instant) {
        self.pending
            .entry(path)
            .and_modify(|p| p.last_change = now)
            .or_insert(Pending {
                first_seen: now,
                last_change: now,
                last_probe: None,
            });
    }

    /// Start tracking `path` unless it is already pending. Used by scans,
    /// which carry no evidence of fresh activity.
    pub fn track(&mut self, path: PathBuf, now: Instant) {
        self.pending.entry(path).or_insert(Pending {
            first_seen: now,
            last_change: now,
            last_probe: None,
        });
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Probe every pending file and return the ones whose fate is decided,
    /// in the order they were first seen.
    pub fn poll<F>(&mut self, now: Instant, mut probe: F) -> Vec<Settled>
    where
        F: FnMut(&Path) -> Option<FileProbe>,
    {
        let mut decided: Vec<(Instant, Settled)> = Vec::new();

        for (path, pending) in &mut self.pending {
            let Some(current) = probe(path) else {
                decided.push((pending.first_seen, Settled::Vanished(path.clone())));
                continue;
            };

            if pending.last_probe != Some(current) {
                pending.last_probe = Some(current);
                pending.last_change = now;
            } else if now.duration_since(pending.last_change) >= self.quiescence {
                decided.push((pending.first_seen, Settled::Ready(path.clone())));
                continue;
            }

            if now.duration_since(pending.first_seen) >= self.timeout {
                decided.push((pending.first_seen, Settled::TimedOut(path.clone())));
            }
        }

        decided.sort_by_key(|(first_seen, _)| *first_seen);
        decided
            .into_iter()
            .map(|(_, outcome)| {
                let path = match &outcome {
                    Settled::Ready(p) | Settled::TimedOut(p) | Settled::Vanished(p) => p,
                };
                self.pending.remove(path);
                outcome
            })
            .collect()
    }
}

/// Whether a directory entry name looks like a check-in rather than a
/// partial transfer or hidden file.
pub fn is_candidate(path: &Path, ignore_suffixes: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.') && !ignore_suffixes.iter().any(|s| name.ends_with(s.as_str()))
}
