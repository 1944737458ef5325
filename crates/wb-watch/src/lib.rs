//! wb-watch — the inbox folder watcher for the welfare board.
//!
//! Turns files dropped into an inbox directory into board updates:
//!
//! ```text
//! inbox/*.txt ──► settle (quiescence) ──► Pipeline ──► Board ──► Exporter
//!                                             │
//!                                             └──► archive/ or error/ (+ .error.txt)
//! ```
//!
//! [`start`] performs every startup check up front and returns a
//! [`WatcherHandle`]; after that, no single file can stop the watcher.

pub mod error;
pub mod pipeline;
pub mod quarantine;
pub mod settle;
pub mod stats;
pub mod watcher;

pub use error::{IngestError, WatchError};
pub use pipeline::{ingest_bytes, Outcome, Pipeline};
pub use quarantine::Quarantine;
pub use stats::{WatchCounters, WatchStats};
pub use watcher::{start, WatchOptions, WatcherHandle};
