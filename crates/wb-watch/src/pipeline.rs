//! The per-file ingest sequence: read → parse → validate → submit → render →
//! archive (or quarantine).
//!
//! File reads, renders and moves all run on the blocking pool. The board lock
//! is only held inside [`Board::submit`] and [`Board::snapshot`].

use crate::error::IngestError;
use crate::quarantine::Quarantine;
use crate::stats::WatchCounters;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use wb_core::export::Written;
use wb_core::validator::validate;
use wb_core::{
    parser, Board, CheckinRecord, Classification, Exporter, Ingest, RenderError,
    ValidationPolicy,
};

/// What happened to one inbox file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted {
        callsign: String,
        classification: Classification,
        archived: PathBuf,
    },
    Rejected {
        reason: String,
        moved_to: PathBuf,
    },
    /// The file was gone by the time it was read or moved.
    Skipped,
}

/// Parse and validate one file's bytes.
pub fn ingest_bytes(
    bytes: &[u8],
    ingest: Ingest,
    policy: &ValidationPolicy,
) -> Result<CheckinRecord, IngestError> {
    let fields = parser::parse_bytes(bytes)?;
    Ok(validate(&fields, ingest, policy)?)
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    board: Arc<Board>,
    policy: Arc<ValidationPolicy>,
    exporter: Exporter,
    quarantine: Quarantine,
    counters: Arc<WatchCounters>,
}

impl Pipeline {
    pub fn new(
        board: Arc<Board>,
        policy: ValidationPolicy,
        exporter: Exporter,
        quarantine: Quarantine,
    ) -> Self {
        Self {
            board,
            policy: Arc::new(policy),
            exporter,
            quarantine,
            counters: Arc::new(WatchCounters::new()),
        }
    }

    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    pub fn counters(&self) -> &Arc<WatchCounters> {
        &self.counters
    }

    pub fn quarantine(&self) -> &Quarantine {
        &self.quarantine
    }

    /// Run one settled inbox file through the whole sequence.
    pub async fn process(&self, path: &Path) -> Outcome {
        let bytes = match read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "file vanished before read");
                return Outcome::Skipped;
            }
            Err(source) => {
                let err = IngestError::Io {
                    path: path.to_path_buf(),
                    source,
                };
                return self.reject(path, err).await;
            }
        };
        self.counters.file_seen();

        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let record = match ingest_bytes(&bytes, Ingest::now(source_file), &self.policy) {
            Ok(record) => record,
            Err(err) => return self.reject(path, err).await,
        };

        let callsign = record.callsign.clone();
        let classification = self.board.submit(record);
        self.counters.classified(classification);
        info!(%callsign, %classification, file = %path.display(), "check-in accepted");

        self.render().await;

        let quarantine = self.quarantine.clone();
        let src = path.to_path_buf();
        match blocking(move || quarantine.archive(&src)).await {
            Ok(archived) => {
                debug!(to = %archived.display(), "archived");
                Outcome::Accepted {
                    callsign,
                    classification,
                    archived,
                }
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "could not archive processed file");
                Outcome::Skipped
            }
        }
    }

    /// Park a file that never stopped changing.
    pub async fn reject_unsettled(&self, path: &Path, waited: Duration) -> Outcome {
        self.counters.unsettled();
        self.reject(path, IngestError::Unsettled(waited)).await
    }

    /// Render the current snapshot. Failures are logged and counted; the
    /// next accepted check-in retries.
    pub async fn render(&self) -> Option<Written> {
        let snapshot = self.board.snapshot();
        let exporter = self.exporter.clone();
        let result = tokio::task::spawn_blocking(move || exporter.write_all(&snapshot))
            .await
            .unwrap_or_else(|join| {
                Err(RenderError::io(
                    self.exporter.dir(),
                    io::Error::other(join.to_string()),
                ))
            });
        match result {
            Ok(written) => Some(written),
            Err(err) => {
                self.counters.render_failed();
                warn!(error = %err, "board render failed");
                None
            }
        }
    }

    async fn reject(&self, path: &Path, err: IngestError) -> Outcome {
        self.counters.rejected();
        warn!(file = %path.display(), kind = err.kind(), error = %err, "check-in rejected");

        let reason = err.to_string();
        let quarantine = self.quarantine.clone();
        let src = path.to_path_buf();
        match blocking(move || quarantine.reject(&src, &err)).await {
            Ok(moved_to) => Outcome::Rejected { reason, moved_to },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Outcome::Skipped,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "could not quarantine file");
                Outcome::Skipped
            }
        }
    }
}

async fn read(path: &Path) -> io::Result<Vec<u8>> {
    tokio::fs::read(path).await
}

async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|join| Err(io::Error::other(join.to_string())))
}
