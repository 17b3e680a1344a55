//! Demo row source: pretends every local postgres process is a session.
//! Falls back to every process on the host when no postgres is running, so
//! the display always has something to show.

use pgtop_engine::procfs::split_stat;
use pgtop_engine::{DataSource, Mode, ProcessSelection, RowSet, SessionRow, SourceError};
use std::{fs, path::PathBuf};

pub struct DemoSource {
    root: PathBuf,
    user: String,
}

impl DemoSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            user: std::env::var("USER").unwrap_or_else(|_| "postgres".into()),
        }
    }

    fn row(&self, pid: i32) -> Option<SessionRow> {
        let stat = fs::read_to_string(self.root.join(pid.to_string()).join("stat")).ok()?;
        let (comm, rest) = split_stat(&stat)?;
        let code = rest.split_whitespace().next()?;
        Some(SessionRow {
            pid,
            username: self.user.clone(),
            state: if code == "R" { "active" } else { "idle" }.into(),
            query: Some(comm.to_string()),
            ..Default::default()
        })
    }
}

impl DataSource for DemoSource {
    fn fetch(&mut self, mode: Mode, _selection: &ProcessSelection) -> Result<RowSet, SourceError> {
        if mode == Mode::Replication {
            return Ok(RowSet::Replication(Vec::new()));
        }
        let mut rows: Vec<SessionRow> = fs::read_dir(&self.root)?
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str()?.parse::<i32>().ok())
            .filter_map(|pid| self.row(pid))
            .collect();
        if rows
            .iter()
            .any(|r| r.query.as_deref().is_some_and(|q| q.starts_with("postgres")))
        {
            rows.retain(|r| r.query.as_deref().is_some_and(|q| q.starts_with("postgres")));
        }
        Ok(RowSet::Normal(rows))
    }
}
