//! Export — renders a [`BoardSnapshot`] as compact text, live HTML and CSV.
//!
//! Rendering is a pure function of the snapshot (and the options), so the
//! same snapshot always yields the same bytes. [`Exporter::write_all`] puts
//! every artifact in place with a write-to-temp-then-rename so a poller never
//! reads a half-written file.

use crate::board::BoardSnapshot;
use crate::error::RenderError;
use crate::types::{BoardEntry, Power, Status, WindowCheck};
use chrono::{DateTime, Local, Utc};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Presentation settings shared by the renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Browser refresh interval for the HTML board.
    pub html_refresh_secs: u32,
    /// Line budget for the compact text board.
    pub text_width: usize,
    /// List messages under each station on the text board.
    pub text_messages: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            html_refresh_secs: 30,
            text_width: 64,
            text_messages: true,
        }
    }
}

const CALL_W: usize = 10;
const STATUS_W: usize = 4;
const POWER_W: usize = 3;
const TIME_W: usize = 5;
const MIN_LOCATION_W: usize = 8;
const INDENT: &str = "      ";

fn local_hm(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%H:%M").to_string()
}

fn local_hms(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn power_abbrev(power: Option<Power>) -> &'static str {
    match power {
        Some(Power::On) => "ON",
        Some(Power::Off) => "OFF",
        Some(Power::Generator) => "GEN",
        None => "--",
    }
}

// ---------------------------------------------------------------------------
// Compact text
// ---------------------------------------------------------------------------

/// Packet-radio friendly board: a summary header, then one fixed-width line
/// per station grouped by status with NEED ASSISTANCE first.
pub fn render_text(snapshot: &BoardSnapshot, opts: &RenderOptions) -> String {
    let mut out = String::new();
    let local = snapshot.taken_at.with_timezone(&Local);

    let _ = writeln!(out, "WELFARE BOARD {}", local.format("%Y-%m-%d"));
    let _ = writeln!(out, "Total:{} Gen:{}", snapshot.len(), local.format("%H:%M"));

    let statuses: Vec<String> = snapshot
        .status_counts()
        .into_iter()
        .map(|(s, n)| format!("{}:{n}", s.abbrev()))
        .collect();
    let _ = writeln!(out, "{}", statuses.join(" "));

    let powers: Vec<String> = snapshot
        .power_counts()
        .into_iter()
        .filter(|(p, n)| p.is_some() && *n > 0)
        .map(|(p, n)| format!("PWR-{}:{n}", power_abbrev(p)))
        .collect();
    if !powers.is_empty() {
        let _ = writeln!(out, "{}", powers.join(" "));
    }

    for status in Status::ALL {
        let group: Vec<&BoardEntry> = snapshot
            .entries
            .iter()
            .filter(|e| e.current.status == status)
            .collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{status} ({})", group.len());
        for entry in group {
            let _ = writeln!(out, "{}", station_line(entry, opts.text_width));
            if opts.text_messages {
                if let Some(message) = &entry.current.message {
                    let budget = opts.text_width.saturating_sub(INDENT.len()).max(16);
                    for line in wrap(message, budget) {
                        let _ = writeln!(out, "{INDENT}{line}");
                    }
                }
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "END {}", local.format("%H:%M"));
    out
}

fn station_line(entry: &BoardEntry, width: usize) -> String {
    let record = &entry.current;

    let mut markers = String::new();
    if entry.update_count > 0 {
        let _ = write!(markers, " [UPD{}]", entry.update_count);
    }
    if record.window.is_outside() {
        markers.push_str(" [OOW]");
    }

    // Markers come out of the location column so the line stays on budget.
    let fixed = CALL_W + STATUS_W + POWER_W + TIME_W + 4 + markers.len();
    let location_w = width.saturating_sub(fixed).max(MIN_LOCATION_W);

    format!(
        "{} {:<STATUS_W$} {:<POWER_W$} {} {}{markers}",
        fit(&record.callsign, CALL_W),
        record.status.abbrev(),
        power_abbrev(record.power),
        fit(&record.location, location_w),
        local_hm(entry.last_updated_at),
    )
}

/// Pad or truncate to exactly `width` characters; truncation ends in `~`.
fn fit(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        format!("{s:<width$}")
    } else {
        let mut cut: String = s.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

/// Greedy word wrap; words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() { 0 } else { 1 } + word.chars().count();
        if current.chars().count() + needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"
body { font-family: 'Courier New', monospace; background: #1a1a1a; color: #00ff00; margin: 0; padding: 20px; }
h1 { text-align: center; text-transform: uppercase; border-bottom: 2px solid #00ff00; padding-bottom: 10px; }
.summary { display: flex; gap: 20px; flex-wrap: wrap; margin: 20px 0; }
.count { padding: 6px 14px; border-radius: 5px; font-weight: bold; }
table { width: 100%; border-collapse: collapse; }
th, td { border: 1px solid #004400; padding: 6px 10px; text-align: left; vertical-align: top; }
th { color: #00aa00; }
.status-safe { background: #002200; }
.status-safe .status { color: #00ff00; }
.status-assistance { background: #330000; }
.status-assistance .status { color: #ff0000; }
.status-traffic { background: #333300; }
.status-traffic .status { color: #ffff00; }
.count.status-safe { color: #00ff00; }
.count.status-assistance { color: #ff0000; }
.count.status-traffic { color: #ffff00; }
.power-on { color: #00ff00; font-weight: bold; }
.power-off { color: #ff4444; font-weight: bold; }
.power-generator { color: #ffaa00; font-weight: bold; }
.power-unknown { color: #888888; }
.badge { display: inline-block; background: #0066ff; color: #ffffff; padding: 1px 6px; border-radius: 3px; font-size: 0.8em; margin-left: 6px; }
.oow { background: #884400; }
.previous { color: #ffaa00; font-style: italic; font-size: 0.9em; }
.footer { text-align: center; margin-top: 30px; color: #00aa00; }
"#;

fn power_class(power: Option<Power>) -> &'static str {
    match power {
        Some(Power::On) => "power-on",
        Some(Power::Off) => "power-off",
        Some(Power::Generator) => "power-generator",
        None => "power-unknown",
    }
}

/// Full table board with a meta refresh, colour coded by status and power.
pub fn render_html(snapshot: &BoardSnapshot, opts: &RenderOptions) -> String {
    let refresh = opts.html_refresh_secs;
    let local = snapshot.taken_at.with_timezone(&Local);
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<meta http-equiv="refresh" content="{refresh}">
<title>Welfare Board</title>
<style>{STYLE}</style>
</head>
<body>
<h1>Welfare Board</h1>
<p>{date} &middot; Total check-ins: {total} &middot; Last updated: {time} &middot; Refreshes every {refresh} seconds</p>
<div class="summary">
"#,
        date = local.format("%A, %B %d, %Y"),
        total = snapshot.len(),
        time = local.format("%H:%M:%S"),
    );

    for (status, count) in snapshot.status_counts() {
        let _ = writeln!(
            html,
            r#"<div class="count status-{}">{}: {count}</div>"#,
            status.css_class(),
            status
        );
    }
    for (power, count) in snapshot.power_counts() {
        let label = power.map_or_else(|| "UNKNOWN".to_string(), |p| p.to_string());
        let _ = writeln!(
            html,
            r#"<div class="count {}">POWER {label}: {count}</div>"#,
            power_class(power)
        );
    }

    html.push_str(
        "</div>\n<table>\n<thead><tr><th>#</th><th>Callsign</th><th>Name</th><th>Location</th>\
         <th>Status</th><th>Power</th><th>Message</th><th>Updated</th></tr></thead>\n<tbody>\n",
    );

    for (i, entry) in snapshot.entries.iter().enumerate() {
        let r = &entry.current;
        let mut callsign = escape(&r.callsign);
        if entry.update_count > 0 {
            let _ = write!(callsign, r#"<span class="badge">UPDATE #{}</span>"#, entry.update_count);
        }
        if r.window.is_outside() {
            callsign.push_str(r#"<span class="badge oow">OUT OF WINDOW</span>"#);
        }
        let mut status = format!(r#"<span class="status">{}</span>"#, r.status);
        if let Some(prev) = entry.previous_status().filter(|_| entry.status_changed()) {
            let _ = write!(status, r#"<div class="previous">Previously: {prev}</div>"#);
        }
        let power = r.power.map_or_else(|| "UNKNOWN".to_string(), |p| p.to_string());

        let _ = writeln!(
            html,
            r#"<tr class="entry status-{}"><td>{}</td><td>{callsign}</td><td>{}</td><td>{}</td><td>{status}</td><td class="{}">{power}</td><td>{}</td><td>{}</td></tr>"#,
            r.status.css_class(),
            i + 1,
            escape(&r.name),
            escape(&r.location),
            power_class(r.power),
            escape(r.message.as_deref().unwrap_or_default()),
            local_hms(entry.last_updated_at),
        );
    }

    let _ = write!(
        html,
        "</tbody>\n</table>\n<div class=\"footer\">This page refreshes every {refresh} seconds</div>\n</body>\n</html>\n"
    );
    html
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub const CSV_HEADER: [&str; 13] = [
    "Callsign",
    "Name",
    "Location",
    "Status",
    "Power",
    "Message",
    "First_Seen",
    "Last_Updated",
    "Last_Seen",
    "Update_Number",
    "Previous_Status",
    "Window",
    "Source_File",
];

/// One row per station in snapshot order, stable column order.
pub fn render_csv(snapshot: &BoardSnapshot) -> Result<String, RenderError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for entry in &snapshot.entries {
        let r = &entry.current;
        let window = match &r.window {
            WindowCheck::NotChecked => String::new(),
            other => other.to_string(),
        };
        writer.write_record([
            r.callsign.clone(),
            r.name.clone(),
            r.location.clone(),
            r.status.to_string(),
            r.power.map(|p| p.to_string()).unwrap_or_default(),
            r.message.clone().unwrap_or_default(),
            entry.first_seen_at.to_rfc3339(),
            entry.last_updated_at.to_rfc3339(),
            entry.last_seen_at.to_rfc3339(),
            entry.update_count.to_string(),
            entry
                .previous_status()
                .map(|s| s.to_string())
                .unwrap_or_default(),
            window,
            r.source_file.clone(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Paths written by one [`Exporter::write_all`] pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub text: PathBuf,
    pub html: PathBuf,
    pub csv: PathBuf,
    pub state: Option<PathBuf>,
}

/// Writes the rendered board into a fixed set of file names.
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
    basename: String,
    options: RenderOptions,
    persist_state: bool,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>, basename: impl Into<String>, options: RenderOptions) -> Self {
        Self {
            dir: dir.into(),
            basename: basename.into(),
            options,
            persist_state: false,
        }
    }

    /// Also write the snapshot as JSON next to the boards.
    pub fn with_state(mut self, persist: bool) -> Self {
        self.persist_state = persist;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{extension}", self.basename))
    }

    /// Where the JSON snapshot lives, whether or not it is being written.
    pub fn state_path(&self) -> PathBuf {
        self.path_for("json")
    }

    /// Render every artifact and move each into place atomically.
    pub fn write_all(&self, snapshot: &BoardSnapshot) -> Result<Written, RenderError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| RenderError::io(&self.dir, e))?;

        let text = self.path_for("txt");
        let html = self.path_for("html");
        let csv = self.path_for("csv");

        write_atomic(&text, render_text(snapshot, &self.options).as_bytes())?;
        write_atomic(&html, render_html(snapshot, &self.options).as_bytes())?;
        write_atomic(&csv, render_csv(snapshot)?.as_bytes())?;

        let state = if self.persist_state {
            let path = self.state_path();
            write_atomic(&path, &serde_json::to_vec_pretty(snapshot)?)?;
            Some(path)
        } else {
            None
        };

        tracing::debug!(entries = snapshot.len(), dir = %self.dir.display(), "board rendered");
        Ok(Written {
            text,
            html,
            csv,
            state,
        })
    }
}

/// Load a snapshot previously written by an [`Exporter`] with state enabled.
pub fn load_state(path: &Path) -> Result<BoardSnapshot, RenderError> {
    let bytes = std::fs::read(path).map_err(|e| RenderError::io(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write to a temp file in the target directory, then rename over `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), RenderError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut builder = tempfile::Builder::new();
    builder.prefix(".wb-").suffix(".part");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }

    let mut tmp = builder
        .tempfile_in(dir)
        .map_err(|e| RenderError::io(path, e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| RenderError::io(path, e))?;
    tmp.persist(path).map_err(|e| RenderError::io(path, e.error))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
