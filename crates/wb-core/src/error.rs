//! Error taxonomy for the pipeline layers.
//!
//! Parse and validation errors describe a single check-in file and never
//! reach the board. Render errors describe a single output pass and never
//! roll back board state.

use crate::parser::Field;
use std::path::PathBuf;

/// The content held no recognisable `FIELD: value` lines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("file is empty")]
    Empty,
    #[error("no recognisable FIELD: value lines")]
    NoFields,
}

/// One specific rule a parsed check-in broke.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("{0} is missing")]
    Missing(Field),
    #[error("STATUS {0:?} is not one of SAFE, NEED ASSISTANCE, TRAFFIC")]
    InvalidStatus(String),
    #[error("POWER {0:?} is not one of ON, OFF, GENERATOR")]
    InvalidPower(String),
    #[error("received at {received} outside every active window ({windows})")]
    OutsideWindow { received: String, windows: String },
}

/// Every violation found in one check-in, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} violation(s): {}", .violations.len(), summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Fields named as missing, in canonical order.
    pub fn missing_fields(&self) -> Vec<Field> {
        self.violations
            .iter()
            .filter_map(|v| match v {
                Violation::Missing(field) => Some(*field),
                _ => None,
            })
            .collect()
    }
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// An output artifact could not be written.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("state snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("window {index}: {message}")]
    Window { index: usize, message: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("window_mode is {0} but no windows are configured")]
    NoWindows(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_violation() {
        let err = ValidationError {
            violations: vec![
                Violation::Missing(Field::Name),
                Violation::InvalidStatus("OK".into()),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("2 violation(s)"));
        assert!(text.contains("NAME is missing"));
        assert!(text.contains("\"OK\""));
        assert_eq!(err.missing_fields(), vec![Field::Name]);
    }
}
