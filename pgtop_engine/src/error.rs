//! Error taxonomy for the engine.
//!
//! Only conditions that end the session are `EngineError`s. Per-field read
//! problems are reported through `ReadOutcome`, and data-source trouble is
//! absorbed by the controller as an empty cycle.

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The host counter source is not mounted or not readable.
    #[error("host counter source not available at {}", path.display())]
    HostUnavailable { path: PathBuf },

    /// A raw counter value did not fit the parsing limit.
    #[error("value of `{field}` for pid {pid} is {len} bytes, larger than the parse buffer")]
    FieldOverflow {
        pid: i32,
        field: &'static str,
        len: usize,
    },

    /// Could not grow the active buffer.
    #[error("failed to allocate active buffer: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failures of the database collaborator. Never escapes a refresh cycle.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("data source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data source returned malformed rows: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
