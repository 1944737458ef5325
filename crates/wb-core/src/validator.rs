//! Record validator — turns [`ParsedFields`] into a [`CheckinRecord`].
//!
//! Checks required fields and the controlled vocabularies, applies the
//! optional active time-window policy, and fingerprints the canonical field
//! set for duplicate detection. All violations are collected before
//! returning, so an operator sees everything wrong with a file at once.

use crate::error::{ValidationError, Violation};
use crate::parser::{Field, ParsedFields};
use crate::types::{collapse_whitespace, CheckinRecord, Power, Status, WindowCheck};
use chrono::{DateTime, Local, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// A named clock-time window during which the net accepts check-ins.
///
/// Both ends are inclusive. A window whose end is before its start wraps
/// past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub name: String,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(name: impl Into<String>, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= t && t <= self.end
        } else {
            t >= self.start || t <= self.end
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.name,
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// What happens to a check-in received outside every window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Windows are not consulted.
    #[default]
    Off,
    /// Accept, but flag the record as out of window.
    Annotate,
    /// Reject with [`Violation::OutsideWindow`].
    Reject,
}

impl std::fmt::Display for WindowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowMode::Off => write!(f, "off"),
            WindowMode::Annotate => write!(f, "annotate"),
            WindowMode::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for WindowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(WindowMode::Off),
            "annotate" => Ok(WindowMode::Annotate),
            "reject" => Ok(WindowMode::Reject),
            other => Err(format!("unknown window mode {other:?} (off, annotate, reject)")),
        }
    }
}

/// Validation settings supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub windows: Vec<TimeWindow>,
    pub window_mode: WindowMode,
    /// Include MESSAGE text in the fingerprint.
    pub hash_message: bool,
}

impl ValidationPolicy {
    /// Window check for a record received at `at` (local clock time).
    fn check_window(&self, at: DateTime<Local>) -> Result<WindowCheck, Violation> {
        if self.window_mode == WindowMode::Off {
            return Ok(WindowCheck::NotChecked);
        }
        let t = at.time();
        if let Some(window) = self.windows.iter().find(|w| w.contains(t)) {
            return Ok(WindowCheck::Within {
                name: window.name.clone(),
            });
        }
        match self.window_mode {
            WindowMode::Reject => Err(Violation::OutsideWindow {
                received: t.format("%H:%M:%S").to_string(),
                windows: self
                    .windows
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
            _ => Ok(WindowCheck::Outside),
        }
    }
}

/// Watcher-assigned metadata for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingest {
    pub received_at: DateTime<Utc>,
    pub source_file: String,
}

impl Ingest {
    pub fn now(source_file: impl Into<String>) -> Self {
        Self {
            received_at: Utc::now(),
            source_file: source_file.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate parsed fields into a record, or list every violation.
pub fn validate(
    fields: &ParsedFields,
    ingest: Ingest,
    policy: &ValidationPolicy,
) -> Result<CheckinRecord, ValidationError> {
    let mut violations = Vec::new();

    let mut required = |field: Field| -> Option<String> {
        match fields.get(field).map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Some(v.to_string()),
            None => {
                violations.push(Violation::Missing(field));
                None
            }
        }
    };
    let callsign = required(Field::Callsign);
    let name = required(Field::Name);
    let location = required(Field::Location);
    let status_raw = required(Field::Status);

    let status = status_raw.and_then(|raw| match raw.parse::<Status>() {
        Ok(status) => Some(status),
        Err(()) => {
            violations.push(Violation::InvalidStatus(raw));
            None
        }
    });

    // Present-but-empty POWER reads as absent.
    let power = match fields.power.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => None,
        Some(raw) => match raw.parse::<Power>() {
            Ok(power) => Some(power),
            Err(()) => {
                violations.push(Violation::InvalidPower(raw.to_string()));
                None
            }
        },
    };

    let window = match policy.check_window(ingest.received_at.with_timezone(&Local)) {
        Ok(check) => Some(check),
        Err(violation) => {
            violations.push(violation);
            None
        }
    };

    let (Some(callsign), Some(name), Some(location), Some(status), Some(window)) =
        (callsign, name, location, status, window)
    else {
        return Err(ValidationError { violations });
    };
    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    let mut record = CheckinRecord {
        callsign: collapse_whitespace(&callsign).to_ascii_uppercase(),
        name: collapse_whitespace(&name),
        location: collapse_whitespace(&location),
        status,
        power,
        message: fields
            .message
            .as_deref()
            .map(collapse_whitespace)
            .filter(|m| !m.is_empty()),
        extras: fields.extras.clone(),
        received_at: ingest.received_at,
        raw_hash: String::new(),
        source_file: ingest.source_file,
        window,
    };
    record.raw_hash = fingerprint(&record, policy.hash_message);
    Ok(record)
}

// ---------------------------------------------------------------------------
// Canonical form
// ---------------------------------------------------------------------------

/// Canonical `LABEL=VALUE` lines for the fingerprint: trimmed, whitespace
/// collapsed, uppercased. Timestamps, file names and extras never take part.
pub fn canonical_fields(record: &CheckinRecord, include_message: bool) -> Vec<(Field, String)> {
    let mut out = vec![
        (Field::Callsign, record.callsign.to_ascii_uppercase()),
        (Field::Name, record.name.to_uppercase()),
        (Field::Location, record.location.to_uppercase()),
        (Field::Status, record.status.to_string()),
        (
            Field::Power,
            record.power.map(|p| p.to_string()).unwrap_or_default(),
        ),
    ];
    if include_message {
        out.push((
            Field::Message,
            record.message.as_deref().unwrap_or_default().to_uppercase(),
        ));
    }
    out
}

/// Hex SHA-256 over [`canonical_fields`].
pub fn fingerprint(record: &CheckinRecord, include_message: bool) -> String {
    let mut hasher = Sha256::new();
    for (field, value) in canonical_fields(record, include_message) {
        hasher.update(field.label().as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Serialise a record back into the check-in file grammar.
pub fn to_checkin_text(record: &CheckinRecord) -> String {
    let mut text = format!(
        "CALLSIGN: {}\nNAME: {}\nLOCATION: {}\nSTATUS: {}\n",
        record.callsign, record.name, record.location, record.status
    );
    if let Some(power) = record.power {
        text.push_str(&format!("POWER: {power}\n"));
    }
    if let Some(message) = &record.message {
        text.push_str(&format!("MESSAGE: {message}\n"));
    }
    text
}

// ---------------------------------------------------------------------------
// HH:MM serde
// ---------------------------------------------------------------------------

pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Result<NaiveTime, String> {
        let s = s.trim();
        let well_formed = s.len() == 5 && s.as_bytes()[2] == b':';
        match NaiveTime::parse_from_str(s, "%H:%M") {
            Ok(t) if well_formed => Ok(t),
            _ => Err(format!("invalid time {s:?}, expected HH:MM (24-hour)")),
        }
    }

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

pub use hhmm::parse as parse_hhmm;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
