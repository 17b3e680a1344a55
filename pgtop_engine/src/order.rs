//! Sort order registry.
//!
//! Every order is a list of `(key, direction)` pairs compared in turn until
//! one differs. All lists end with the pid so equal rows sort the same way
//! every cycle.

use std::cmp::Ordering;

use crate::types::ProcessRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Cpu,
    PgState,
    Rss,
    Size,
    XactTime,
    QueryTime,
    Iops,
    Syscr,
    Syscw,
    ReadBytes,
    WriteBytes,
    Locks,
    Name,
    FlushLag,
    ReplayLag,
    SentLag,
    WriteLag,
    Pid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug)]
pub struct SortOrder {
    pub name: &'static str,
    pub keys: &'static [(SortKey, Direction)],
}

use Direction::{Asc, Desc};
use SortKey::*;

pub const ORDER_NAMES: [&str; 16] = [
    "cpu", "size", "res", "xtime", "qtime", "iops", "iorps", "iowps", "reads", "writes", "locks",
    "command", "flag", "rlag", "slag", "wlag",
];

pub static ORDERS: [SortOrder; 16] = [
    SortOrder {
        name: "cpu",
        keys: &[(Cpu, Desc), (PgState, Desc), (Rss, Desc), (Size, Desc), (Pid, Asc)],
    },
    SortOrder {
        name: "size",
        keys: &[(Size, Desc), (Rss, Desc), (Cpu, Desc), (PgState, Desc), (Pid, Asc)],
    },
    SortOrder {
        name: "res",
        keys: &[(Rss, Desc), (Size, Desc), (Cpu, Desc), (PgState, Desc), (Pid, Asc)],
    },
    SortOrder {
        name: "xtime",
        keys: &[(XactTime, Desc), (Cpu, Desc), (PgState, Desc), (Size, Desc), (Rss, Desc), (Pid, Asc)],
    },
    SortOrder {
        name: "qtime",
        keys: &[(QueryTime, Desc), (Cpu, Desc), (PgState, Desc), (Size, Desc), (Rss, Desc), (Pid, Asc)],
    },
    SortOrder {
        name: "iops",
        keys: &[
            (Iops, Desc),
            (Syscw, Desc),
            (Syscr, Desc),
            (ReadBytes, Desc),
            (WriteBytes, Desc),
            (Name, Asc),
            (Pid, Asc),
        ],
    },
    SortOrder {
        name: "iorps",
        keys: &[
            (Syscr, Desc),
            (Iops, Desc),
            (Syscw, Desc),
            (ReadBytes, Desc),
            (WriteBytes, Desc),
            (Name, Asc),
            (Pid, Asc),
        ],
    },
    SortOrder {
        name: "iowps",
        keys: &[
            (Syscw, Desc),
            (Iops, Desc),
            (Syscr, Desc),
            (ReadBytes, Desc),
            (WriteBytes, Desc),
            (Name, Asc),
            (Pid, Asc),
        ],
    },
    SortOrder {
        name: "reads",
        keys: &[
            (ReadBytes, Desc),
            (Syscr, Desc),
            (Iops, Desc),
            (Syscw, Desc),
            (WriteBytes, Desc),
            (Name, Asc),
            (Pid, Asc),
        ],
    },
    SortOrder {
        name: "writes",
        keys: &[
            (WriteBytes, Desc),
            (Iops, Desc),
            (Syscr, Desc),
            (Syscw, Desc),
            (ReadBytes, Desc),
            (Name, Asc),
            (Pid, Asc),
        ],
    },
    SortOrder {
        name: "locks",
        keys: &[
            (Locks, Desc),
            (QueryTime, Desc),
            (Cpu, Desc),
            (PgState, Desc),
            (Size, Desc),
            (Rss, Desc),
            (Pid, Asc),
        ],
    },
    SortOrder {
        name: "command",
        keys: &[(Name, Asc), (Cpu, Desc), (PgState, Desc), (Rss, Desc), (Size, Desc), (Pid, Asc)],
    },
    SortOrder {
        name: "flag",
        keys: &[(FlushLag, Desc), (Cpu, Desc), (PgState, Desc), (Size, Desc), (Rss, Desc), (Pid, Asc)],
    },
    SortOrder {
        name: "rlag",
        keys: &[(ReplayLag, Desc), (Cpu, Desc), (PgState, Desc), (Size, Desc), (Rss, Desc), (Pid, Asc)],
    },
    SortOrder {
        name: "slag",
        keys: &[(SentLag, Desc), (Cpu, Desc), (PgState, Desc), (Size, Desc), (Rss, Desc), (Pid, Asc)],
    },
    SortOrder {
        name: "wlag",
        keys: &[(WriteLag, Desc), (Cpu, Desc), (PgState, Desc), (Size, Desc), (Rss, Desc), (Pid, Asc)],
    },
];

/// Index of the order called `name`.
pub fn order_index(name: &str) -> Option<usize> {
    ORDER_NAMES.iter().position(|n| *n == name)
}

fn compare_key(a: &ProcessRecord, b: &ProcessRecord, key: SortKey) -> Ordering {
    match key {
        Cpu => a.rates.cpu.total_cmp(&b.rates.cpu),
        PgState => a.pgstate.cmp(&b.pgstate),
        Rss => a.rss_kb.cmp(&b.rss_kb),
        Size => a.size_kb.cmp(&b.size_kb),
        XactTime => a.xact_secs.cmp(&b.xact_secs),
        QueryTime => a.query_secs.cmp(&b.query_secs),
        Iops => a.rates.iops.total_cmp(&b.rates.iops),
        Syscr => a.rates.syscr.total_cmp(&b.rates.syscr),
        Syscw => a.rates.syscw.total_cmp(&b.rates.syscw),
        ReadBytes => a.rates.read_bytes.total_cmp(&b.rates.read_bytes),
        WriteBytes => a.rates.write_bytes.total_cmp(&b.rates.write_bytes),
        Locks => a.locks.cmp(&b.locks),
        Name => a.name.cmp(&b.name),
        FlushLag => a.replication.flush_lag.cmp(&b.replication.flush_lag),
        ReplayLag => a.replication.replay_lag.cmp(&b.replication.replay_lag),
        SentLag => a.replication.sent_lag.cmp(&b.replication.sent_lag),
        WriteLag => a.replication.write_lag.cmp(&b.replication.write_lag),
        Pid => a.pid.cmp(&b.pid),
    }
}

/// Compares two records under the order at `index`.
///
/// # Panics
/// When `index` is not below `ORDERS.len()`.
pub fn compare(a: &ProcessRecord, b: &ProcessRecord, index: usize) -> Ordering {
    ORDERS[index]
        .keys
        .iter()
        .map(|&(key, dir)| match dir {
            Asc => compare_key(a, b, key),
            Desc => compare_key(b, a, key),
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

pub fn sort(records: &mut [ProcessRecord], index: usize) {
    records.sort_by(|a, b| compare(a, b, index));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackendState;

    fn rec(pid: i32, cpu: f64, rss: u64) -> ProcessRecord {
        let mut r = ProcessRecord::new(pid);
        r.rates.cpu = cpu;
        r.rss_kb = rss;
        r
    }

    #[test]
    fn names_and_table_agree() {
        for (i, o) in ORDERS.iter().enumerate() {
            assert_eq!(o.name, ORDER_NAMES[i]);
            assert_eq!(o.keys.last(), Some(&(Pid, Asc)));
        }
        assert_eq!(order_index("wlag"), Some(15));
        assert_eq!(order_index("bogus"), None);
    }

    #[test]
    fn cpu_order_breaks_ties_on_state_then_rss() {
        let mut a = rec(1, 0.5, 100);
        let mut b = rec(2, 0.5, 200);
        a.pgstate = BackendState::Active;
        b.pgstate = BackendState::Idle;
        assert_eq!(compare(&a, &b, 0), Ordering::Less);
        b.pgstate = BackendState::Active;
        assert_eq!(compare(&a, &b, 0), Ordering::Greater);
    }

    #[test]
    fn cpu_compares_fractions_exactly() {
        let a = rec(1, 0.31, 0);
        let b = rec(2, 0.30, 0);
        assert_eq!(compare(&a, &b, 0), Ordering::Less);
    }

    #[test]
    fn equal_records_fall_back_to_pid() {
        let mut v = vec![rec(9, 0.0, 0), rec(3, 0.0, 0), rec(5, 0.0, 0)];
        sort(&mut v, order_index("size").unwrap());
        let pids: Vec<i32> = v.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![3, 5, 9]);
    }

    #[test]
    fn command_order_is_alphabetical() {
        let mut a = rec(1, 0.0, 0);
        let mut b = rec(2, 0.9, 0);
        a.name = "autovacuum".into();
        b.name = "walwriter".into();
        let mut v = vec![b, a];
        sort(&mut v, order_index("command").unwrap());
        assert_eq!(v[0].name, "autovacuum");
    }
}
