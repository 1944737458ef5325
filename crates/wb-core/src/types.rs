//! Core types for wb-core — welfare board.
//!
//! This module defines the data structures shared across all pipeline
//! layers: the validated [`CheckinRecord`], its controlled vocabularies
//! ([`Status`], [`Power`]), the per-station [`BoardEntry`], and the
//! [`Classification`] returned by the board on every submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// One parsed, validated check-in submission.
///
/// Produced by the validator from a [`ParsedFields`](crate::parser::ParsedFields)
/// value; never constructed from unvalidated input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinRecord {
    /// Station callsign, uppercase. Unique key on the board.
    pub callsign: String,
    pub name: String,
    pub location: String,
    pub status: Status,
    /// `None` means the station did not report power ("unknown").
    pub power: Option<Power>,
    /// Free text, continuation lines joined with single spaces.
    pub message: Option<String>,
    /// Labels the parser did not recognise. Keys are uppercase.
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
    /// Ingest timestamp assigned by the watcher, never read from the file.
    pub received_at: DateTime<Utc>,
    /// Hex SHA-256 fingerprint of the canonical field set.
    pub raw_hash: String,
    /// Original file name, kept for audit.
    pub source_file: String,
    /// Result of the active time-window check.
    #[serde(default)]
    pub window: WindowCheck,
}

/// Station status, the controlled vocabulary of the `STATUS` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Sorted first on the text board.
    NeedAssistance,
    Traffic,
    Safe,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::NeedAssistance, Status::Traffic, Status::Safe];

    /// Short form used on the compact text board.
    pub fn abbrev(self) -> &'static str {
        match self {
            Status::Safe => "OK",
            Status::NeedAssistance => "NEED",
            Status::Traffic => "TRAF",
        }
    }

    /// CSS class suffix used by the HTML board.
    pub fn css_class(self) -> &'static str {
        match self {
            Status::Safe => "safe",
            Status::NeedAssistance => "assistance",
            Status::Traffic => "traffic",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Safe => write!(f, "SAFE"),
            Status::NeedAssistance => write!(f, "NEED ASSISTANCE"),
            Status::Traffic => write!(f, "TRAFFIC"),
        }
    }
}

impl FromStr for Status {
    type Err = ();

    /// Case-insensitive; runs of inner whitespace count as one space.
    /// Anything else is rejected rather than coerced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match collapse_whitespace(s).to_ascii_uppercase().as_str() {
            "SAFE" => Ok(Status::Safe),
            "NEED ASSISTANCE" => Ok(Status::NeedAssistance),
            "TRAFFIC" => Ok(Status::Traffic),
            _ => Err(()),
        }
    }
}

/// Reported power situation, the controlled vocabulary of `POWER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Power {
    On,
    Off,
    Generator,
}

impl Power {
    pub const ALL: [Power; 3] = [Power::On, Power::Off, Power::Generator];
}

impl std::fmt::Display for Power {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Power::On => write!(f, "ON"),
            Power::Off => write!(f, "OFF"),
            Power::Generator => write!(f, "GENERATOR"),
        }
    }
}

impl FromStr for Power {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ON" => Ok(Power::On),
            "OFF" => Ok(Power::Off),
            "GENERATOR" => Ok(Power::Generator),
            _ => Err(()),
        }
    }
}

/// Outcome of the active time-window policy for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowCheck {
    /// Window enforcement is off.
    #[default]
    NotChecked,
    /// Received inside the named window.
    Within { name: String },
    /// Received outside every window and accepted anyway (annotate mode).
    Outside,
}

impl WindowCheck {
    pub fn is_outside(&self) -> bool {
        matches!(self, WindowCheck::Outside)
    }
}

impl std::fmt::Display for WindowCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowCheck::NotChecked => Ok(()),
            WindowCheck::Within { name } => write!(f, "{name}"),
            WindowCheck::Outside => write!(f, "OUT OF WINDOW"),
        }
    }
}

/// How the board classified a submission relative to the station's
/// existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// First check-in for this callsign.
    New,
    /// Retransmission of the current record (same fingerprint).
    Duplicate,
    /// Same callsign, changed content.
    Update,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::New => write!(f, "NEW"),
            Classification::Duplicate => write!(f, "DUPLICATE"),
            Classification::Update => write!(f, "UPDATE"),
        }
    }
}

/// Authoritative per-station state held by the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEntry {
    /// Latest accepted record.
    pub current: CheckinRecord,
    pub first_seen_at: DateTime<Utc>,
    /// Refreshed on NEW and UPDATE only.
    pub last_updated_at: DateTime<Utc>,
    /// Refreshed on every submission, retransmissions included.
    pub last_seen_at: DateTime<Utc>,
    pub update_count: u32,
    pub duplicate_count: u32,
    /// Prior records, oldest first.
    #[serde(default)]
    pub history: Vec<CheckinRecord>,
}

impl BoardEntry {
    pub(crate) fn new(record: CheckinRecord) -> Self {
        let at = record.received_at;
        Self {
            current: record,
            first_seen_at: at,
            last_updated_at: at,
            last_seen_at: at,
            update_count: 0,
            duplicate_count: 0,
            history: Vec::new(),
        }
    }

    /// Status of the record this entry replaced most recently.
    pub fn previous_status(&self) -> Option<Status> {
        self.history.last().map(|r| r.status)
    }

    /// `true` when the last update changed the station's status.
    pub fn status_changed(&self) -> bool {
        self.previous_status()
            .is_some_and(|prev| prev != self.current.status)
    }
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
