//! wb-core — welfare board core library.
//!
//! This crate exposes the pipeline layers that turn one check-in file into
//! board state and rendered output. Nothing here touches the inbox folder
//! or spawns tasks; that lives in `wb-watch`.
//!
//! # Architecture
//!
//! ```text
//! bytes ──► parser ──► validator ──► Board ──► export (text, HTML, CSV, JSON)
//! ```
//!
//! The board is the only shared mutable state. Every other layer is a pure
//! function over its input, which is what keeps the renderers deterministic.

pub mod board;
pub mod config;
pub mod error;
pub mod export;
pub mod parser;
pub mod types;
pub mod validator;

pub use board::{Board, BoardEvent, BoardSnapshot};
pub use error::{ConfigError, ParseError, RenderError, ValidationError, Violation};
pub use export::{Exporter, RenderOptions};
pub use parser::{Field, ParsedFields};
pub use types::{BoardEntry, CheckinRecord, Classification, Power, Status, WindowCheck};
pub use validator::{Ingest, TimeWindow, ValidationPolicy, WindowMode};
