//! Data model shared by the engine and its callers.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::delta::{DoubleBuffer, Slot};

/// OS run state from the single-byte code in `<pid>/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcState {
    /// Acquisition did not complete this cycle.
    #[default]
    Incomplete,
    Running,
    Sleeping,
    DiskWait,
    Zombie,
    Stopped,
    Paging,
    Unknown,
}

impl ProcState {
    pub fn from_code(code: u8) -> Self {
        match code {
            b'R' => ProcState::Running,
            b'S' => ProcState::Sleeping,
            b'D' => ProcState::DiskWait,
            b'Z' => ProcState::Zombie,
            b'T' => ProcState::Stopped,
            b'W' => ProcState::Paging,
            _ => ProcState::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProcState::Incomplete => "",
            ProcState::Running => "run",
            ProcState::Sleeping => "sleep",
            ProcState::DiskWait => "disk",
            ProcState::Zombie => "zomb",
            ProcState::Stopped => "stop",
            ProcState::Paging => "swap",
            ProcState::Unknown => "?",
        }
    }
}

/// Backend (session) state as reported by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum BackendState {
    #[default]
    Undefined,
    Idle,
    Active,
    IdleInTransaction,
    FastPath,
    IdleInTransactionAborted,
    Disabled,
}

impl BackendState {
    pub const ALL: [BackendState; 7] = [
        BackendState::Undefined,
        BackendState::Idle,
        BackendState::Active,
        BackendState::IdleInTransaction,
        BackendState::FastPath,
        BackendState::IdleInTransactionAborted,
        BackendState::Disabled,
    ];

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "idle" => BackendState::Idle,
            "active" => BackendState::Active,
            "idle in transaction" => BackendState::IdleInTransaction,
            "fastpath function call" => BackendState::FastPath,
            "idle in transaction (aborted)" => BackendState::IdleInTransactionAborted,
            "disabled" => BackendState::Disabled,
            _ => BackendState::Undefined,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Short column label.
    pub fn label(self) -> &'static str {
        match self {
            BackendState::Undefined => "",
            BackendState::Idle => "idle",
            BackendState::Active => "active",
            BackendState::IdleInTransaction => "idltxn",
            BackendState::FastPath => "fast",
            BackendState::IdleInTransactionAborted => "abort",
            BackendState::Disabled => "disabl",
        }
    }

    /// Name used in the summary histogram line.
    pub fn summary_name(self) -> &'static str {
        match self {
            BackendState::Undefined => "other",
            BackendState::Idle => "idle",
            BackendState::Active => "active",
            BackendState::IdleInTransaction => "idle in txn",
            BackendState::FastPath => "fastpath",
            BackendState::IdleInTransactionAborted => "aborted",
            BackendState::Disabled => "disabled",
        }
    }
}

/// Count of sessions per backend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StateHistogram {
    counts: [usize; 7],
}

impl StateHistogram {
    pub fn clear(&mut self) {
        self.counts = [0; 7];
    }

    pub fn tally(&mut self, state: BackendState) {
        self.counts[state.index()] += 1;
    }

    pub fn count(&self, state: BackendState) -> usize {
        self.counts[state.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BackendState, usize)> + '_ {
        BackendState::ALL.iter().map(|s| (*s, self.count(*s)))
    }
}

/// How the command column is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullCmd {
    /// Short process name from the status line.
    Off,
    /// Full argument vector from the process table.
    #[default]
    ProcessTable,
    /// Query text reported by the database.
    QueryText,
}

impl FullCmd {
    pub fn next(self) -> Self {
        match self {
            FullCmd::Off => FullCmd::ProcessTable,
            FullCmd::ProcessTable => FullCmd::QueryText,
            FullCmd::QueryText => FullCmd::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Normal,
    Replication,
}

/// Caller-owned filter settings consumed every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSelection {
    pub show_idle: bool,
    /// Empty means every user.
    pub username: String,
    pub full_cmd: FullCmd,
}

impl Default for ProcessSelection {
    fn default() -> Self {
        Self {
            show_idle: true,
            username: String::new(),
            full_cmd: FullCmd::default(),
        }
    }
}

/// Cumulative OS counters, one double buffer each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub cpu_ticks: DoubleBuffer,
    pub iops: DoubleBuffer,
    pub syscr: DoubleBuffer,
    pub syscw: DoubleBuffer,
    pub read_bytes: DoubleBuffer,
    pub write_bytes: DoubleBuffer,
}

/// Per-second values derived from `Counters` in the current cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rates {
    /// Fraction of one CPU (1.0 = 100%).
    pub cpu: f64,
    pub iops: f64,
    pub syscr: f64,
    pub syscw: f64,
    pub read_bytes: f64,
    pub write_bytes: f64,
}

/// Replication columns, filled only in replication mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Replication {
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

/// Everything known about one backend across cycles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessRecord {
    pub pid: i32,
    pub state: ProcState,
    pub pgstate: BackendState,
    pub name: String,
    pub username: String,

    /// Virtual size in KiB.
    pub size_kb: u64,
    /// Resident size in KiB.
    pub rss_kb: u64,
    /// Start time in ticks after boot.
    pub start_time: u64,

    pub slot: Slot,
    pub counters: Counters,
    pub rates: Rates,

    /// Seconds since the transaction started.
    pub xact_secs: i64,
    /// Seconds since the query started.
    pub query_secs: i64,
    pub locks: u32,

    pub replication: Replication,

    /// Cycle generation in which the data source last returned this pid.
    pub last_seen: u64,
    /// When the counters in the other slot were read. Rates divide by the
    /// time since then, which spans any cycles the pid missed.
    pub observed_at: Option<Instant>,
}

impl ProcessRecord {
    pub fn new(pid: i32) -> Self {
        Self {
            pid,
            ..Default::default()
        }
    }
}

/// Host-wide figures for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemSample {
    /// Percent of CPU time per state, in the order of the probed state names.
    pub cpu_states: Vec<f64>,
    pub memory: MemoryStats,
    pub swap: SwapStats,
    pub load_avg: [f64; 3],
    /// `None` when the host does not report it.
    pub last_pid: Option<i32>,
    pub uptime_secs: u64,
    pub process_states: StateHistogram,
}

/// KiB values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub used: u64,
    pub free: u64,
    pub shared: u64,
    pub buffers: u64,
    pub cached: u64,
}

/// KiB values; `in_rate`/`out_rate` are KiB per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SwapStats {
    pub used: u64,
    pub free: u64,
    pub cached: u64,
    pub in_rate: f64,
    pub out_rate: f64,
}

/// What one refresh produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// Records in the active buffer.
    pub active: usize,
    /// Rows returned by the data source.
    pub total: usize,
    /// Records held by the store after the sweep.
    pub tracked: usize,
    pub evicted: usize,
    pub histogram: StateHistogram,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes() {
        assert_eq!(ProcState::from_code(b'R'), ProcState::Running);
        assert_eq!(ProcState::from_code(b'W'), ProcState::Paging);
        assert_eq!(ProcState::from_code(b'X'), ProcState::Unknown);
        assert_eq!(ProcState::default(), ProcState::Incomplete);
    }

    #[test]
    fn backend_state_strings() {
        assert_eq!(BackendState::parse("active"), BackendState::Active);
        assert_eq!(
            BackendState::parse("idle in transaction (aborted)"),
            BackendState::IdleInTransactionAborted
        );
        assert_eq!(BackendState::parse(""), BackendState::Undefined);
    }

    #[test]
    fn histogram_counts() {
        let mut h = StateHistogram::default();
        h.tally(BackendState::Idle);
        h.tally(BackendState::Idle);
        h.tally(BackendState::Active);
        assert_eq!(h.count(BackendState::Idle), 2);
        assert_eq!(h.total(), 3);
        h.clear();
        assert_eq!(h.total(), 0);
    }
}
