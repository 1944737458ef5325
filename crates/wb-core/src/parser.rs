//! Field parser — turns raw check-in file content into [`ParsedFields`].
//!
//! The grammar is one `LABEL: value` pair per line. Labels are matched
//! case-insensitively against the canonical set ([`Field`]); any other label
//! is kept in [`ParsedFields::extras`]. `MESSAGE` may continue over the
//! following lines until the next canonical label or end of input.
//!
//! Parsing is pure: no I/O, and identical input always yields identical
//! output.

use crate::error::ParseError;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A canonical check-in field label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Callsign,
    Name,
    Location,
    Status,
    Power,
    Message,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Callsign,
        Field::Name,
        Field::Location,
        Field::Status,
        Field::Power,
        Field::Message,
    ];

    /// Fields the validator requires.
    pub const REQUIRED: [Field; 4] = [Field::Callsign, Field::Name, Field::Location, Field::Status];

    pub fn label(self) -> &'static str {
        match self {
            Field::Callsign => "CALLSIGN",
            Field::Name => "NAME",
            Field::Location => "LOCATION",
            Field::Status => "STATUS",
            Field::Power => "POWER",
            Field::Message => "MESSAGE",
        }
    }

    /// Case-insensitive lookup of a canonical label.
    pub fn from_label(label: &str) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Fields recognised in one check-in file, before validation.
///
/// Values are trimmed. A label that appeared with an empty value is stored
/// as `Some("")` so the validator can tell "empty" from "absent" when it
/// reports violations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    pub callsign: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub power: Option<String>,
    pub message: Option<String>,
    /// Unrecognised labels (uppercase) and their values.
    pub extras: BTreeMap<String, String>,
}

impl ParsedFields {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Callsign => &self.callsign,
            Field::Name => &self.name,
            Field::Location => &self.location,
            Field::Status => &self.status,
            Field::Power => &self.power,
            Field::Message => &self.message,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Callsign => &mut self.callsign,
            Field::Name => &mut self.name,
            Field::Location => &mut self.location,
            Field::Status => &mut self.status,
            Field::Power => &mut self.power,
            Field::Message => &mut self.message,
        }
    }

    /// Number of canonical fields present (empty values included).
    pub fn canonical_count(&self) -> usize {
        Field::ALL.iter().filter(|f| self.slot(**f).is_some()).count()
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// `LABEL: value`. Labels start with a letter and stay short so that prose
/// containing a colon is not mistaken for a field.
fn label_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z][A-Za-z0-9 _-]{0,23}?)\s*:\s?(.*)$")
            .expect("label regex is valid")
    })
}

/// Parse raw file bytes. Invalid UTF-8 is replaced rather than rejected.
pub fn parse_bytes(bytes: &[u8]) -> Result<ParsedFields, ParseError> {
    parse(&String::from_utf8_lossy(bytes))
}

/// Parse check-in text into its fields.
///
/// Fails with [`ParseError::Empty`] for blank content and
/// [`ParseError::NoFields`] when no canonical label appears at all.
pub fn parse(content: &str) -> Result<ParsedFields, ParseError> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut fields = ParsedFields::default();
    let mut in_message = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let labelled = label_line()
            .captures(line)
            .map(|caps| (caps[1].trim().to_string(), caps[2].trim().to_string()));

        match labelled {
            Some((label, value)) => match Field::from_label(&label) {
                Some(field) => {
                    in_message = field == Field::Message;
                    let slot = fields.slot_mut(field);
                    if slot.is_none() {
                        *slot = Some(value);
                    } else {
                        // First occurrence wins; a repeat also ends any
                        // message continuation.
                        tracing::debug!(field = %field, "ignoring repeated label");
                        in_message = false;
                    }
                }
                None if in_message => append_message(&mut fields, line),
                None => {
                    fields
                        .extras
                        .entry(label.to_ascii_uppercase())
                        .or_insert(value);
                }
            },
            None if in_message => append_message(&mut fields, line),
            None => tracing::trace!(line, "skipping unlabelled line"),
        }
    }

    if fields.canonical_count() == 0 {
        return Err(ParseError::NoFields);
    }
    Ok(fields)
}

fn append_message(fields: &mut ParsedFields, line: &str) {
    let message = fields.message.get_or_insert_with(String::new);
    if !message.is_empty() {
        message.push(' ');
    }
    message.push_str(line);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
