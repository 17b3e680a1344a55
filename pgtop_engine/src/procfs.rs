//! Per-process OS fields: command line, status line and I/O accounting.

use tracing::trace;

use crate::error::{EngineError, EngineResult};
use crate::host::{HostSource, HostStatics};
use crate::types::{FullCmd, ProcState, ProcessRecord, ProcessSelection};

/// Longest raw value accepted from a counter file.
pub const MAX_FIELD_LEN: usize = 255;

/// Bytes of the argument vector worth keeping; more never fits a row.
const MAX_CMDLINE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Complete,
    /// Some field group fell back or was left at its previous value.
    Partial,
    /// The status line could not be read; the record is marked incomplete.
    Failed,
}

#[derive(Debug, Clone)]
pub struct FieldReader {
    io_enabled: bool,
    page_size: u64,
}

struct StatLine<'a> {
    comm: &'a str,
    state: u8,
    ticks: u64,
    start_time: u64,
    vsize: u64,
    rss_pages: u64,
}

impl FieldReader {
    pub fn new(statics: &HostStatics) -> Self {
        Self {
            io_enabled: statics.io_accounting,
            page_size: statics.page_size,
        }
    }

    /// Refreshes `record` from the host. Counters are written into the
    /// record's current slot; flipping it is left to the caller.
    pub fn populate(
        &self,
        source: &dyn HostSource,
        record: &mut ProcessRecord,
        selection: &ProcessSelection,
    ) -> EngineResult<ReadOutcome> {
        let pid = record.pid;
        record.state = ProcState::Incomplete;
        let mut outcome = ReadOutcome::Complete;

        let cmdline = if selection.full_cmd == FullCmd::ProcessTable {
            let line = source
                .read_bytes(&format!("{pid}/cmdline"))
                .ok()
                .filter(|raw| raw.len() > 1)
                .map(|raw| cmdline_text(&raw));
            if line.is_none() {
                outcome = ReadOutcome::Partial;
            }
            line
        } else {
            None
        };

        let stat_raw = source.read(&format!("{pid}/stat")).ok();
        let Some(stat) = stat_raw.as_deref().and_then(parse_stat) else {
            trace!(pid, "stat unreadable");
            record.counters.cpu_ticks.carry(record.slot);
            carry_io(record);
            return Ok(ReadOutcome::Failed);
        };
        if stat.comm.len() > MAX_FIELD_LEN {
            return Err(EngineError::FieldOverflow {
                pid,
                field: "comm",
                len: stat.comm.len(),
            });
        }

        record.name = cmdline.unwrap_or_else(|| sanitize(stat.comm));
        record.state = ProcState::from_code(stat.state);
        record.counters.cpu_ticks.store(record.slot, stat.ticks);
        record.start_time = stat.start_time;
        record.size_kb = (stat.vsize + 512) >> 10;
        record.rss_kb = (stat.rss_pages * self.page_size) >> 10;

        if !self.io_enabled || !self.read_io(source, record)? {
            carry_io(record);
            outcome = ReadOutcome::Partial;
        }
        Ok(outcome)
    }

    /// `Ok(false)` when the file is missing; slots then keep their values.
    fn read_io(&self, source: &dyn HostSource, record: &mut ProcessRecord) -> EngineResult<bool> {
        let pid = record.pid;
        let Ok(raw) = source.read(&format!("{pid}/io")) else {
            return Ok(false);
        };
        let mut syscr = 0;
        let mut syscw = 0;
        let mut read_bytes = 0;
        let mut write_bytes = 0;
        let mut cancelled = 0;
        for line in raw.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.len() > MAX_FIELD_LEN {
                return Err(EngineError::FieldOverflow {
                    pid,
                    field: "io",
                    len: value.len(),
                });
            }
            let v: u64 = value.parse().unwrap_or(0);
            match key {
                "syscr" => syscr = v,
                "syscw" => syscw = v,
                "read_bytes" => read_bytes = v,
                "write_bytes" => write_bytes = v,
                "cancelled_write_bytes" => cancelled = v,
                _ => {}
            }
        }
        let slot = record.slot;
        let c = &mut record.counters;
        c.syscr.store(slot, syscr);
        c.syscw.store(slot, syscw);
        c.iops.store(slot, syscr + syscw);
        c.read_bytes.store(slot, read_bytes);
        c.write_bytes.store(slot, write_bytes.saturating_sub(cancelled));
        Ok(true)
    }
}

/// Keeps the I/O counters at their last known values for this cycle.
fn carry_io(record: &mut ProcessRecord) {
    let slot = record.slot;
    let c = &mut record.counters;
    for counter in [
        &mut c.iops,
        &mut c.syscr,
        &mut c.syscw,
        &mut c.read_bytes,
        &mut c.write_bytes,
    ] {
        counter.carry(slot);
    }
}

/// Splits a `stat` line into the command name and the fields after it. The
/// name is everything between the first `(` and the last `)`, so names that
/// contain parentheses survive.
pub fn split_stat(raw: &str) -> Option<(&str, &str)> {
    let open = raw.find('(')?;
    let close = raw.rfind(')')?;
    if close < open {
        return None;
    }
    Some((&raw[open + 1..close], &raw[close + 1..]))
}

fn parse_stat(raw: &str) -> Option<StatLine<'_>> {
    let (comm, rest) = split_stat(raw)?;
    let rest: Vec<&str> = rest.split_whitespace().collect();
    let num = |i: usize| rest.get(i).and_then(|t| t.parse::<u64>().ok());
    let state = *rest.first()?.as_bytes().first()?;
    Some(StatLine {
        comm,
        state,
        ticks: num(11)? + num(12)?,
        start_time: num(19)?,
        vsize: num(20)?,
        rss_pages: num(21)?,
    })
}

fn cmdline_text(raw: &[u8]) -> String {
    let raw = &raw[..raw.len().min(MAX_CMDLINE)];
    let trimmed = match raw.iter().rposition(|b| *b != 0) {
        Some(end) => &raw[..=end],
        None => &raw[..0],
    };
    let spaced: Vec<u8> = trimmed
        .iter()
        .map(|b| if *b == 0 { b' ' } else { *b })
        .collect();
    sanitize(&String::from_utf8_lossy(&spaced))
}

/// Replaces control characters and undecodable bytes with `?`.
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_control() || c == char::REPLACEMENT_CHARACTER {
                '?'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "4242 (postgres: bob db (idle)) S 1 4242 4242 0 -1 4194560 \
                        300 0 0 0 70 30 0 0 20 0 1 0 98765 204800000 2500 18446744073709551615";

    #[test]
    fn stat_uses_last_paren() {
        let s = parse_stat(STAT).unwrap();
        assert_eq!(s.comm, "postgres: bob db (idle)");
        assert_eq!(s.state, b'S');
        assert_eq!(s.ticks, 100);
        assert_eq!(s.start_time, 98765);
        assert_eq!(s.vsize, 204800000);
        assert_eq!(s.rss_pages, 2500);
    }

    #[test]
    fn truncated_stat_is_rejected() {
        assert!(parse_stat("12 (x) S 1 2 3").is_none());
        assert!(parse_stat("no parens here").is_none());
    }

    #[test]
    fn split_keeps_short_lines() {
        let (comm, rest) = split_stat("12 (a) b) R 1").unwrap();
        assert_eq!(comm, "a) b");
        assert_eq!(rest.split_whitespace().next(), Some("R"));
        assert!(split_stat("12 )x( R").is_none());
    }

    #[test]
    fn cmdline_joins_arguments() {
        assert_eq!(
            cmdline_text(b"postgres\0-D\0/var/lib/pg\0"),
            "postgres -D /var/lib/pg"
        );
    }

    #[test]
    fn sanitize_replaces_control_and_invalid() {
        assert_eq!(sanitize("a\tb\u{1b}c"), "a?b?c");
        let lossy = String::from_utf8_lossy(b"ok\xffok").into_owned();
        assert_eq!(sanitize(&lossy), "ok?ok");
    }
}
