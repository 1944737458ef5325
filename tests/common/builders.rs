//! Test builders: check-in text, records and scratch directory layouts.
//!
//! These favour readability over flexibility and panic on invalid input
//! rather than returning `Result`.

use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use welfare_board::parser::parse;
use welfare_board::validator::validate;
use welfare_board::{
    CheckinRecord, Exporter, Ingest, Pipeline, Power, Quarantine, RenderOptions, Status,
    ValidationPolicy, WatchOptions,
};

// ---------------------------------------------------------------------------
// CheckinBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for check-in files and the records they validate into.
///
/// ```rust
/// let record = CheckinBuilder::new("KK4ODA")
///     .status(Status::NeedAssistance)
///     .power(Power::Off)
///     .message("Need tarp")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct CheckinBuilder {
    callsign: String,
    name: String,
    location: String,
    status: String,
    power: Option<String>,
    message: Option<String>,
    received_at: DateTime<Utc>,
    source_file: String,
}

impl CheckinBuilder {
    pub fn new(callsign: impl Into<String>) -> Self {
        let callsign = callsign.into();
        Self {
            source_file: format!("{}.txt", callsign.to_ascii_lowercase()),
            callsign,
            name: "Test Operator".to_string(),
            location: "Net Control".to_string(),
            status: Status::Safe.to_string(),
            power: None,
            message: None,
            received_at: Utc.with_ymd_and_hms(2024, 9, 27, 23, 0, 0).unwrap(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status.to_string();
        self
    }

    /// Raw STATUS text, for invalid-value cases.
    pub fn status_text(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn power(mut self, power: Power) -> Self {
        self.power = Some(power.to_string());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn received_at(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = at;
        self
    }

    /// Shift the receive time by `minutes` from the builder default.
    pub fn minutes_later(mut self, minutes: i64) -> Self {
        self.received_at += chrono::Duration::minutes(minutes);
        self
    }

    pub fn source_file(mut self, name: impl Into<String>) -> Self {
        self.source_file = name.into();
        self
    }

    /// The check-in as an operator would send it.
    pub fn text(&self) -> String {
        let mut text = format!(
            "CALLSIGN: {}\nNAME: {}\nLOCATION: {}\nSTATUS: {}\n",
            self.callsign, self.name, self.location, self.status
        );
        if let Some(power) = &self.power {
            text.push_str(&format!("POWER: {power}\n"));
        }
        if let Some(message) = &self.message {
            text.push_str(&format!("MESSAGE: {message}\n"));
        }
        text
    }

    pub fn ingest(&self) -> Ingest {
        Ingest {
            received_at: self.received_at,
            source_file: self.source_file.clone(),
        }
    }

    /// Parse and validate [`Self::text`] under the default policy.
    pub fn build(&self) -> CheckinRecord {
        let fields = parse(&self.text()).expect("builder text parses");
        validate(&fields, self.ingest(), &ValidationPolicy::default())
            .expect("builder text validates")
    }
}

// ---------------------------------------------------------------------------
// Scratch layout
// ---------------------------------------------------------------------------

/// Inbox, archive, error and output directories under one temp root.
pub struct Scratch {
    pub root: tempfile::TempDir,
    pub inbox: PathBuf,
    pub archive: PathBuf,
    pub error: PathBuf,
    pub output: PathBuf,
}

impl Scratch {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let inbox = root.path().join("inbox");
        std::fs::create_dir(&inbox).expect("create inbox");
        Self {
            archive: root.path().join("archive"),
            error: root.path().join("error"),
            output: root.path().join("output"),
            inbox,
            root,
        }
    }

    /// Drop a file into the inbox in one write.
    pub fn drop_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.inbox.join(name);
        std::fs::write(&path, contents).expect("write inbox file");
        path
    }

    pub fn exporter(&self) -> Exporter {
        Exporter::new(&self.output, "welfare_board", RenderOptions::default()).with_state(true)
    }

    pub fn quarantine(&self) -> Quarantine {
        Quarantine::new(&self.archive, &self.error)
    }

    pub fn pipeline(&self, board: std::sync::Arc<welfare_board::Board>) -> Pipeline {
        Pipeline::new(
            board,
            ValidationPolicy::default(),
            self.exporter(),
            self.quarantine(),
        )
    }

    /// Watch options tuned for tests: short quiescence, no periodic rescan.
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions::new(&self.inbox)
            .with_quiescence(Duration::from_millis(100))
            .with_settle_timeout(Duration::from_secs(5))
            .with_rescan(None)
    }

    pub fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }
}

/// Poll `check` every 25ms until it holds or `timeout` passes.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
