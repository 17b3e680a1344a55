//! Host counter source and the one-time capability probe.

use once_cell::sync::OnceCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use sysinfo::System;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::order::ORDER_NAMES;

/// Named counter files, addressed relative to the source root
/// (`loadavg`, `stat`, `<pid>/io`, ...).
pub trait HostSource {
    fn root(&self) -> &Path;

    fn read_bytes(&self, name: &str) -> io::Result<Vec<u8>>;

    fn read(&self, name: &str) -> io::Result<String> {
        let raw = self.read_bytes(name)?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

/// The Linux `/proc` filesystem, or any directory laid out like it.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl HostSource for ProcFs {
    fn root(&self) -> &Path {
        &self.root
    }

    fn read_bytes(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(name))
    }
}

pub const CPU_STATE_NAMES: [&str; 5] = ["user", "nice", "system", "idle", "iowait"];
pub const MEMORY_NAMES: [&str; 5] = ["used", "free", "shared", "buffers", "cached"];
pub const SWAP_NAMES: [&str; 5] = ["used", "free", "cached", "in", "out"];

/// Facts about the host that do not change during a session.
#[derive(Debug, Clone, PartialEq)]
pub struct HostStatics {
    /// `/proc/stat` reports an iowait column.
    pub iowait: bool,
    /// Per-process I/O accounting is available.
    pub io_accounting: bool,
    /// Epoch seconds; `None` when it could not be determined.
    pub boot_time: Option<u64>,
    pub ticks_per_second: u64,
    pub page_size: u64,
    pub hostname: String,
}

impl HostStatics {
    pub fn probe(source: &dyn HostSource, cfg: &EngineConfig) -> EngineResult<Self> {
        let stat = source
            .read("stat")
            .map_err(|_| EngineError::HostUnavailable {
                path: source.root().to_path_buf(),
            })?;
        let iowait = count_cpu_fields(&stat) >= 5;

        let boot_time = source
            .read("uptime")
            .ok()
            .and_then(|s| boot_time_from_uptime(&s))
            .or_else(|| Some(System::boot_time()).filter(|t| *t > 0));

        let io_accounting = source.read_bytes("self/io").is_ok();
        if !io_accounting {
            warn!("per-process I/O accounting not available; I/O columns disabled");
        }

        let statics = Self {
            iowait,
            io_accounting,
            boot_time,
            ticks_per_second: cfg.ticks_per_second.unwrap_or_else(clock_ticks),
            page_size: cfg.page_size.unwrap_or_else(page_size),
            hostname: System::host_name().unwrap_or_else(|| "unknown".into()),
        };
        info!(
            iowait = statics.iowait,
            io_accounting = statics.io_accounting,
            hz = statics.ticks_per_second,
            "host probed"
        );
        Ok(statics)
    }

    /// CPU state names in the order `SystemSample::cpu_states` uses.
    pub fn cpu_state_names(&self) -> &'static [&'static str] {
        if self.iowait {
            &CPU_STATE_NAMES
        } else {
            &CPU_STATE_NAMES[..4]
        }
    }

    pub fn memory_names(&self) -> &'static [&'static str] {
        &MEMORY_NAMES
    }

    pub fn swap_names(&self) -> &'static [&'static str] {
        &SWAP_NAMES
    }

    pub fn order_names(&self) -> &'static [&'static str] {
        &ORDER_NAMES
    }
}

fn count_cpu_fields(stat: &str) -> usize {
    stat.lines()
        .next()
        .map(|line| {
            line.split_whitespace()
                .skip(1)
                .take_while(|t| t.parse::<u64>().is_ok())
                .count()
        })
        .unwrap_or(0)
}

fn boot_time_from_uptime(s: &str) -> Option<u64> {
    let up: f64 = s.split_whitespace().next()?.parse().ok()?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(now.saturating_sub(up as u64))
}

fn clock_ticks() -> u64 {
    static HZ: OnceCell<u64> = OnceCell::new();
    // SAFETY: sysconf only reads a process-wide constant.
    *HZ.get_or_init(|| match unsafe { libc::sysconf(libc::_SC_CLK_TCK) } {
        n if n > 0 => n as u64,
        _ => 100,
    })
}

fn page_size() -> u64 {
    static PAGE: OnceCell<u64> = OnceCell::new();
    // SAFETY: as above.
    *PAGE.get_or_init(|| match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        n if n > 0 => n as u64,
        _ => 4096,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iowait_detected_from_field_count() {
        assert_eq!(count_cpu_fields("cpu  10 20 30 40 50 0 0\ncpu0 1 2 3 4 5\n"), 7);
        assert_eq!(count_cpu_fields("cpu  10 20 30 40\n"), 4);
        assert_eq!(count_cpu_fields(""), 0);
    }

    #[test]
    fn boot_time_is_now_minus_uptime() {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let bt = boot_time_from_uptime("3600.25 7000.00\n").unwrap();
        assert!(now - bt >= 3600 && now - bt <= 3602);
        assert_eq!(boot_time_from_uptime("garbage"), None);
    }

    #[test]
    fn state_names_follow_iowait() {
        let mut s = HostStatics {
            iowait: false,
            io_accounting: true,
            boot_time: None,
            ticks_per_second: 100,
            page_size: 4096,
            hostname: "h".into(),
        };
        assert_eq!(s.cpu_state_names().len(), 4);
        s.iowait = true;
        assert_eq!(s.cpu_state_names().last(), Some(&"iowait"));
    }
}
