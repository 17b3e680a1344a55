//! Engine settings. Defaults suit a local database on Linux; a few knobs can
//! be overridden from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{EngineError, EngineResult};

pub const DEFAULT_PROCFS: &str = "/proc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mount point of the host counter source.
    pub procfs_root: PathBuf,
    /// Shortest interval used as a rate divisor.
    pub min_interval_ms: u64,
    /// Cycles a pid may be missing from the row-set before its record goes.
    pub evict_after: u64,
    /// Scheduler ticks per second; probed with sysconf when unset.
    pub ticks_per_second: Option<u64>,
    /// Page size in bytes; probed with sysconf when unset.
    pub page_size: Option<u64>,
    /// The database runs on another host: skip per-process OS reads.
    pub remote: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            procfs_root: PathBuf::from(DEFAULT_PROCFS),
            min_interval_ms: 10,
            evict_after: 3,
            ticks_per_second: None,
            page_size: None,
            remote: false,
        }
    }
}

impl EngineConfig {
    /// Defaults with `PGTOP_PROCFS`, `PGTOP_MIN_INTERVAL_MS` and
    /// `PGTOP_EVICT_AFTER` applied.
    pub fn from_env() -> EngineResult<Self> {
        let mut cfg = Self::default();
        if let Some(root) = std::env::var_os("PGTOP_PROCFS") {
            cfg.procfs_root = PathBuf::from(root);
        }
        if let Ok(v) = std::env::var("PGTOP_MIN_INTERVAL_MS") {
            cfg.min_interval_ms = parse_env("PGTOP_MIN_INTERVAL_MS", &v)?;
        }
        if let Ok(v) = std::env::var("PGTOP_EVICT_AFTER") {
            cfg.evict_after = parse_env("PGTOP_EVICT_AFTER", &v)?;
        }
        Ok(cfg)
    }

    pub fn min_interval_secs(&self) -> f64 {
        self.min_interval_ms as f64 / 1000.0
    }
}

fn parse_env(name: &str, value: &str) -> EngineResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::Config(format!("{name}={value:?} is not a whole number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"evict_after": 5, "remote": true}"#).unwrap();
        assert_eq!(cfg.evict_after, 5);
        assert!(cfg.remote);
        assert_eq!(cfg.procfs_root, PathBuf::from("/proc"));
        assert_eq!(cfg.min_interval_secs(), 0.01);
    }

    #[test]
    fn bad_env_value_is_a_config_error() {
        let err = parse_env("PGTOP_EVICT_AFTER", "three").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
