//! Moving processed files out of the inbox.
//!
//! Accepted files (including retransmitted duplicates) go to the archive
//! directory; rejected ones go to the error directory with a `.error.txt`
//! sidecar explaining why. Neither move ever overwrites an existing file.

use crate::error::IngestError;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Quarantine {
    archive_dir: PathBuf,
    error_dir: PathBuf,
}

impl Quarantine {
    pub fn new(archive_dir: impl Into<PathBuf>, error_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            error_dir: error_dir.into(),
        }
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn error_dir(&self) -> &Path {
        &self.error_dir
    }

    /// Create both destination directories.
    pub fn prepare(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.archive_dir)?;
        std::fs::create_dir_all(&self.error_dir)
    }

    /// Move an accepted file into the archive.
    pub fn archive(&self, path: &Path) -> io::Result<PathBuf> {
        let dest = unique_destination(&self.archive_dir, file_name(path)?, Local::now());
        move_file(path, &dest)?;
        Ok(dest)
    }

    /// Move a rejected file into the error directory and write its sidecar.
    ///
    /// Only a failed move is an error. Once the file is out of the inbox a
    /// sidecar failure is logged and the destination is still returned.
    pub fn reject(&self, path: &Path, reason: &IngestError) -> io::Result<PathBuf> {
        let now = Local::now();
        let name = file_name(path)?;
        let dest = unique_destination(&self.error_dir, name, now);
        move_file(path, &dest)?;

        let sidecar = sidecar_path(&dest);
        if let Err(e) = std::fs::write(&sidecar, sidecar_text(name, reason, now)) {
            tracing::warn!(
                file = %dest.display(),
                sidecar = %sidecar.display(),
                error = %e,
                "quarantined file has no error sidecar"
            );
        }
        Ok(dest)
    }
}

/// `<dest>.error.txt`, next to the quarantined file.
pub fn sidecar_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".error.txt");
    dest.with_file_name(name)
}

fn sidecar_text(source: &str, reason: &IngestError, at: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Error: {reason}");
    let _ = writeln!(out, "Time: {}", at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Source: {source}");
    for violation in reason.violations() {
        let _ = writeln!(out, "- {violation}");
    }
    out
}

fn file_name(path: &Path) -> io::Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no usable file name", path.display()),
            )
        })
}

/// `dir/name`, or `dir/stem_YYYYmmdd_HHMMSS[_n].ext` when that is taken.
pub fn unique_destination(dir: &Path, name: &str, now: DateTime<Local>) -> PathBuf {
    let plain = dir.join(name);
    if !plain.exists() {
        return plain;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let stamp = now.format("%Y%m%d_%H%M%S");
    let build = |counter: u32| {
        let suffix = if counter == 0 {
            format!("{stem}_{stamp}")
        } else {
            format!("{stem}_{stamp}_{counter}")
        };
        match ext {
            Some(ext) => dir.join(format!("{suffix}.{ext}")),
            None => dir.join(suffix),
        }
    };

    let mut counter = 0;
    loop {
        let candidate = build(counter);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Rename, falling back to copy-then-remove when the rename is refused
/// (different filesystems).
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(e) => {
            tracing::debug!(from = %from.display(), error = %e, "rename failed, copying");
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wb_core::{Field, ValidationError, Violation};

    fn stamp() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 9, 27, 19, 5, 30).unwrap()
    }

    #[test]
    fn free_name_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            unique_destination(dir.path(), "a.txt", stamp()),
            dir.path().join("a.txt")
        );
    }

    #[test]
    fn taken_name_gets_timestamp_then_counter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let first = unique_destination(dir.path(), "a.txt", stamp());
        assert_eq!(first, dir.path().join("a_20240927_190530.txt"));

        std::fs::write(&first, "x").unwrap();
        assert_eq!(
            unique_destination(dir.path(), "a.txt", stamp()),
            dir.path().join("a_20240927_190530_1.txt")
        );
    }

    #[test]
    fn extensionless_names_keep_no_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("checkin"), "x").unwrap();
        assert_eq!(
            unique_destination(dir.path(), "checkin", stamp()),
            dir.path().join("checkin_20240927_190530")
        );
    }

    #[test]
    fn archive_never_overwrites() {
        let root = tempfile::tempdir().unwrap();
        let inbox = root.path().join("inbox");
        std::fs::create_dir(&inbox).unwrap();
        let q = Quarantine::new(root.path().join("archive"), root.path().join("error"));
        q.prepare().unwrap();

        std::fs::write(inbox.join("a.txt"), "first").unwrap();
        let first = q.archive(&inbox.join("a.txt")).unwrap();
        std::fs::write(inbox.join("a.txt"), "second").unwrap();
        let second = q.archive(&inbox.join("a.txt")).unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read_to_string(first).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(second).unwrap(), "second");
        assert!(!inbox.join("a.txt").exists());
    }

    #[test]
    fn reject_writes_sidecar_with_each_violation() {
        let root = tempfile::tempdir().unwrap();
        let q = Quarantine::new(root.path().join("archive"), root.path().join("error"));
        q.prepare().unwrap();
        let src = root.path().join("bad.txt");
        std::fs::write(&src, "CALLSIGN: W1ABC\n").unwrap();

        let err = IngestError::from(ValidationError {
            violations: vec![
                Violation::Missing(Field::Name),
                Violation::Missing(Field::Location),
            ],
        });
        let dest = q.reject(&src, &err).unwrap();

        assert_eq!(dest, root.path().join("error").join("bad.txt"));
        let sidecar = std::fs::read_to_string(sidecar_path(&dest)).unwrap();
        assert!(sidecar.starts_with("Error: validation failed"));
        assert!(sidecar.contains("Source: bad.txt"));
        assert!(sidecar.contains("- NAME is missing"));
        assert!(sidecar.contains("- LOCATION is missing"));
    }

    #[test]
    fn sidecar_failure_still_reports_destination() {
        let root = tempfile::tempdir().unwrap();
        let q = Quarantine::new(root.path().join("archive"), root.path().join("error"));
        q.prepare().unwrap();
        let src = root.path().join("bad.txt");
        std::fs::write(&src, "").unwrap();
        // A directory where the sidecar should go makes the write fail.
        std::fs::create_dir(sidecar_path(&root.path().join("error").join("bad.txt"))).unwrap();

        let dest = q
            .reject(&src, &IngestError::Parse(wb_core::ParseError::Empty))
            .unwrap();

        assert_eq!(dest, root.path().join("error").join("bad.txt"));
        assert!(dest.is_file());
        assert!(!src.exists());
    }

    #[test]
    fn sidecar_sits_next_to_destination() {
        assert_eq!(
            sidecar_path(Path::new("/err/a_20240927_190530.txt")),
            PathBuf::from("/err/a_20240927_190530.txt.error.txt")
        );
    }
}
