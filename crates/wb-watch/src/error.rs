//! Watcher error types.
//!
//! [`IngestError`] is scoped to one inbox file and always ends with that file
//! in the error directory. [`WatchError`] only happens at startup and stops
//! the watcher before any file is touched.

use std::path::PathBuf;
use std::time::Duration;
use wb_core::{ParseError, ValidationError, Violation};

/// Why a single check-in file was quarantined.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file was still changing after {0:?}")]
    Unsettled(Duration),
}

impl IngestError {
    /// Individual violations, empty unless validation failed.
    pub fn violations(&self) -> &[Violation] {
        match self {
            IngestError::Validation(err) => &err.violations,
            _ => &[],
        }
    }

    /// Short label used in logs and the activity counters.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Parse(_) => "parse",
            IngestError::Validation(_) => "validation",
            IngestError::Io { .. } => "io",
            IngestError::Unsettled(_) => "unsettled",
        }
    }
}

/// The watcher could not start.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("inbox {0} does not exist")]
    MissingDir(PathBuf),
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("cannot prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use wb_core::Field;

    #[test]
    fn violations_only_for_validation_errors() {
        let err = IngestError::from(ValidationError {
            violations: vec![Violation::Missing(Field::Status)],
        });
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.kind(), "validation");

        let err = IngestError::from(ParseError::Empty);
        assert!(err.violations().is_empty());
        assert_eq!(err.to_string(), "parse failed: file is empty");
    }
}
