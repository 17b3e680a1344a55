//! Fake procfs trees and canned row sources shared by the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use pgtop_engine::{
    DataSource, EngineConfig, Mode, ProcessSelection, ReplicationRow, RowSet, SessionRow,
    SourceError,
};
use tempfile::TempDir;

pub struct FakeProc {
    dir: TempDir,
}

impl FakeProc {
    /// A host with every system file present and I/O accounting on.
    pub fn new() -> Self {
        let p = Self {
            dir: tempfile::tempdir().expect("tempdir"),
        };
        p.write("stat", "cpu  100 0 100 800 0 0 0 0\ncpu0 100 0 100 800 0 0 0 0\n");
        p.write("loadavg", "0.50 0.40 0.30 1/120 4321\n");
        p.write(
            "meminfo",
            "MemTotal: 8000 kB\nMemFree: 2000 kB\nBuffers: 10 kB\nCached: 500 kB\n\
             SwapTotal: 1000 kB\nSwapFree: 1000 kB\nSwapCached: 0 kB\n",
        );
        p.write("vmstat", "pswpin 0\npswpout 0\n");
        p.write("uptime", "5000.00 9000.00\n");
        p.write("self/io", io_text(0, 0, 0, 0, 0).as_str());
        p
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, contents).expect("write");
    }

    pub fn remove(&self, name: &str) {
        let _ = fs::remove_file(self.dir.path().join(name));
    }

    /// `<pid>/stat` with the given command name, total ticks and resident pages.
    pub fn set_stat(&self, pid: i32, comm: &str, ticks: u64, rss_pages: u64) {
        self.write(
            &format!("{pid}/stat"),
            &format!(
                "{pid} ({comm}) S 1 {pid} {pid} 0 -1 4194560 10 0 0 0 {ticks} 0 0 0 20 0 1 0 777 {} {rss_pages} 0\n",
                100 * 1024 * 1024
            ),
        );
    }

    pub fn set_io(&self, pid: i32, syscr: u64, syscw: u64, read: u64, write: u64) {
        self.write(&format!("{pid}/io"), &io_text(syscr, syscw, read, write, 0));
    }
}

pub fn io_text(syscr: u64, syscw: u64, read: u64, write: u64, cancelled: u64) -> String {
    format!(
        "rchar: 0\nwchar: 0\nsyscr: {syscr}\nsyscw: {syscw}\nread_bytes: {read}\n\
         write_bytes: {write}\ncancelled_write_bytes: {cancelled}\n"
    )
}

pub fn config(root: &Path) -> EngineConfig {
    EngineConfig {
        procfs_root: root.to_path_buf(),
        ticks_per_second: Some(100),
        page_size: Some(4096),
        ..Default::default()
    }
}

pub fn session(pid: i32, user: &str, state: &str) -> SessionRow {
    SessionRow {
        pid,
        username: user.into(),
        state: state.into(),
        ..Default::default()
    }
}

pub fn standby(pid: i32, app: &str, replay_lag: i64) -> ReplicationRow {
    ReplicationRow {
        pid,
        username: "replicator".into(),
        application_name: app.into(),
        state: "streaming".into(),
        replay_lag,
        ..Default::default()
    }
}

/// Returns whatever rows it currently holds.
pub struct CannedRows {
    pub sessions: Vec<SessionRow>,
    pub replication: Vec<ReplicationRow>,
}

impl CannedRows {
    pub fn sessions(rows: Vec<SessionRow>) -> Self {
        Self {
            sessions: rows,
            replication: Vec::new(),
        }
    }
}

impl DataSource for CannedRows {
    fn fetch(&mut self, mode: Mode, _selection: &ProcessSelection) -> Result<RowSet, SourceError> {
        Ok(match mode {
            Mode::Normal => RowSet::Normal(self.sessions.clone()),
            Mode::Replication => RowSet::Replication(self.replication.clone()),
        })
    }
}

/// A database that never answers.
pub struct DownSource;

impl DataSource for DownSource {
    fn fetch(&mut self, _mode: Mode, _selection: &ProcessSelection) -> Result<RowSet, SourceError> {
        Err(SourceError::Unavailable("connection refused".into()))
    }
}

/// Fixed cycle timestamps one second apart.
pub struct Ticks {
    base: Instant,
    n: u64,
}

impl Ticks {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            n: 0,
        }
    }

    pub fn advance(&mut self) -> Instant {
        let t = self.base + Duration::from_secs(self.n);
        self.n += 1;
        t
    }
}
