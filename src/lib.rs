//! welfare-board — check-in ingestion for emergency-communications net control.
//!
//! Operators in the field drop one plain-text check-in per file into a shared
//! inbox. This crate ties the layers together so integration tests and the
//! binary can import them from one place:
//!
//! ```text
//! Folder Watcher ──► Field Parser ──► Record Validator ──► Board ──► Output
//!   (wb-watch)          (wb-core)        (wb-core)      (wb-core)  (wb-core)
//! ```
//!
//! Everything except the board is stateless; the board is shared behind an
//! `Arc` between the watcher's pipeline task and the optional status endpoint.

pub mod server;

pub use wb_core::{
    board, config, error, export, parser, types, validator, Board, BoardEntry, BoardEvent,
    BoardSnapshot, CheckinRecord, Classification, Exporter, Field, Ingest, ParsedFields, Power,
    RenderOptions, Status, TimeWindow, ValidationPolicy, WindowCheck, WindowMode,
};
pub use wb_watch::quarantine;
pub use wb_watch::{
    ingest_bytes, start, IngestError, Outcome, Pipeline, Quarantine, WatchCounters, WatchError,
    WatchOptions, WatchStats, WatcherHandle,
};
