//! Process-table engine for a top-like PostgreSQL monitor.
//!
//! `Monitor` runs refresh cycles: it samples the host, pulls session rows
//! from a `DataSource`, merges them into per-pid records, derives rates from
//! double-buffered counters and leaves a sorted active buffer for display.

pub mod config;
pub mod delta;
pub mod error;
pub mod format;
pub mod host;
pub mod order;
pub mod procfs;
pub mod refresh;
pub mod source;
pub mod store;
pub mod system;
pub mod types;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, SourceError};
pub use format::{format_header, Layout, RowCursor};
pub use host::{HostSource, HostStatics, ProcFs};
pub use order::{order_index, ORDER_NAMES};
pub use procfs::{FieldReader, ReadOutcome};
pub use refresh::Monitor;
pub use source::{DataSource, JsonSnapshotSource, ReplicationRow, RowSet, SessionRow};
pub use store::ProcessStore;
pub use types::{
    BackendState, CycleSummary, FullCmd, Mode, ProcState, ProcessRecord, ProcessSelection,
    SystemSample,
};
