//! Board — the authoritative callsign → [`BoardEntry`] table.
//!
//! The board is the single source of truth; renderers read from a
//! [`BoardSnapshot`], never from the live table. Each [`Board::submit`] and
//! [`Board::snapshot`] holds the lock for exactly one call, so a reader never
//! observes a half-applied submission. No I/O happens under the lock.

use crate::types::{BoardEntry, CheckinRecord, Classification, Power, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Recent-event ring size.
pub const EVENT_CAPACITY: usize = 200;

/// One classified submission, kept for the activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEvent {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub callsign: String,
    pub classification: Classification,
    pub source_file: String,
}

/// Immutable copy of the board, entries in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub taken_at: DateTime<Utc>,
    pub entries: Vec<BoardEntry>,
}

impl BoardSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, callsign: &str) -> Option<&BoardEntry> {
        let key = callsign.trim().to_ascii_uppercase();
        self.entries.iter().find(|e| e.current.callsign == key)
    }

    /// Count per status, in [`Status::ALL`] order.
    pub fn status_counts(&self) -> Vec<(Status, usize)> {
        Status::ALL
            .into_iter()
            .map(|s| (s, self.entries.iter().filter(|e| e.current.status == s).count()))
            .collect()
    }

    /// Count per reported power state; the `None` bucket is "unknown".
    pub fn power_counts(&self) -> Vec<(Option<Power>, usize)> {
        Power::ALL
            .into_iter()
            .map(Some)
            .chain(std::iter::once(None))
            .map(|p| (p, self.entries.iter().filter(|e| e.current.power == p).count()))
            .collect()
    }
}

#[derive(Debug, Default)]
struct BoardState {
    entries: HashMap<String, BoardEntry>,
    /// Callsigns in first-seen order.
    order: Vec<String>,
    events: VecDeque<BoardEvent>,
    next_seq: u64,
}

impl BoardState {
    fn record_event(&mut self, record: &CheckinRecord, classification: Classification) {
        self.next_seq += 1;
        if self.events.len() == EVENT_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(BoardEvent {
            seq: self.next_seq,
            at: record.received_at,
            callsign: record.callsign.clone(),
            classification,
            source_file: record.source_file.clone(),
        });
    }
}

/// Lock-guarded board. Share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct Board {
    state: RwLock<BoardState>,
    history_cap: Option<usize>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `cap` prior records per station (oldest dropped first).
    pub fn with_history_cap(cap: Option<usize>) -> Self {
        Self {
            state: RwLock::default(),
            history_cap: cap,
        }
    }

    /// Rebuild a board from a persisted snapshot. Entry order is preserved.
    pub fn restore(snapshot: BoardSnapshot, history_cap: Option<usize>) -> Self {
        let board = Self::with_history_cap(history_cap);
        {
            let mut state = board.write();
            for mut entry in snapshot.entries {
                let key = entry.current.callsign.clone();
                if state.entries.contains_key(&key) {
                    continue;
                }
                if let Some(cap) = history_cap {
                    trim_history(&mut entry.history, cap);
                }
                state.order.push(key.clone());
                state.entries.insert(key, entry);
            }
        }
        board
    }

    fn read(&self) -> RwLockReadGuard<'_, BoardState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BoardState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Classify `record` against the station's entry and apply it.
    pub fn submit(&self, record: CheckinRecord) -> Classification {
        let mut state = self.write();
        let key = record.callsign.clone();

        let classification = match state.entries.get_mut(&key) {
            None => Classification::New,
            Some(entry) if entry.current.raw_hash == record.raw_hash => {
                entry.last_seen_at = record.received_at;
                entry.duplicate_count += 1;
                Classification::Duplicate
            }
            Some(entry) => {
                let previous = std::mem::replace(&mut entry.current, record.clone());
                entry.history.push(previous);
                if let Some(cap) = self.history_cap {
                    trim_history(&mut entry.history, cap);
                }
                entry.update_count += 1;
                entry.last_updated_at = record.received_at;
                entry.last_seen_at = record.received_at;
                Classification::Update
            }
        };

        state.record_event(&record, classification);
        if classification == Classification::New {
            state.order.push(key.clone());
            state.entries.insert(key, BoardEntry::new(record));
        }
        classification
    }

    /// Immutable copy of every entry, in first-seen order.
    pub fn snapshot(&self) -> BoardSnapshot {
        let state = self.read();
        BoardSnapshot {
            taken_at: Utc::now(),
            entries: state
                .order
                .iter()
                .filter_map(|k| state.entries.get(k).cloned())
                .collect(),
        }
    }

    /// Clone of one station's entry.
    pub fn entry(&self, callsign: &str) -> Option<BoardEntry> {
        self.read()
            .entries
            .get(&callsign.trim().to_ascii_uppercase())
            .cloned()
    }

    /// Up to `limit` most recent events, newest last.
    pub fn recent_events(&self, limit: usize) -> Vec<BoardEvent> {
        let state = self.read();
        let skip = state.events.len().saturating_sub(limit);
        state.events.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Explicit session reset. Returns how many entries were removed.
    pub fn reset(&self) -> usize {
        let mut state = self.write();
        let removed = state.entries.len();
        state.entries.clear();
        state.order.clear();
        state.events.clear();
        removed
    }
}

fn trim_history(history: &mut Vec<CheckinRecord>, cap: usize) {
    if history.len() > cap {
        let excess = history.len() - cap;
        history.drain(..excess);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
