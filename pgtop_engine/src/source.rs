//! Row sources: where session and replication rows come from.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::SourceError;
use crate::types::{Mode, ProcessSelection};

/// One backend as reported by the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRow {
    pub pid: i32,
    pub username: String,
    /// Backend state text, e.g. `idle in transaction`.
    pub state: String,
    pub xact_secs: i64,
    pub query_secs: i64,
    pub locks: u32,
    pub query: Option<String>,
}

/// One replication peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationRow {
    pub pid: i32,
    pub username: String,
    pub application_name: String,
    pub client_addr: String,
    pub state: String,
    pub primary: String,
    pub sent: String,
    pub write: String,
    pub flush: String,
    pub replay: String,
    pub sent_lag: i64,
    pub write_lag: i64,
    pub flush_lag: i64,
    pub replay_lag: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSet {
    Normal(Vec<SessionRow>),
    Replication(Vec<ReplicationRow>),
}

impl RowSet {
    pub fn empty(mode: Mode) -> Self {
        match mode {
            Mode::Normal => RowSet::Normal(Vec::new()),
            Mode::Replication => RowSet::Replication(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RowSet::Normal(v) => v.len(),
            RowSet::Replication(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The database collaborator. Called once per cycle; blocking.
pub trait DataSource {
    fn fetch(&mut self, mode: Mode, selection: &ProcessSelection) -> Result<RowSet, SourceError>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Snapshot {
    sessions: Vec<SessionRow>,
    replication: Vec<ReplicationRow>,
}

/// Reads `{"sessions": [...], "replication": [...]}` from a file on every
/// fetch, so an external process can keep it current.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for JsonSnapshotSource {
    fn fetch(&mut self, mode: Mode, _selection: &ProcessSelection) -> Result<RowSet, SourceError> {
        let text = fs::read_to_string(&self.path)?;
        let snap: Snapshot = serde_json::from_str(&text)?;
        Ok(match mode {
            Mode::Normal => RowSet::Normal(snap.sessions),
            Mode::Replication => RowSet::Replication(snap.replication),
        })
    }
}
