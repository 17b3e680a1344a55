//! Fixed-width text for the process table and the summary lines.

use crate::types::{MemoryStats, ProcessRecord, StateHistogram, SwapStats, SystemSample};

const PROCESS_HEADER: &str =
    "    PID X           SIZE   RES STATE   XTIME  QTIME  %CPU LOCKS COMMAND";
const IO_HEADER: &str = "    PID  IOPS   IORPS   IOWPS READS WRITES COMMAND";

/// Width reserved for the user column title.
const UNAME_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Process,
    Io,
    Replication,
}

/// Column header for `layout`, with the user column titled `uname_field`
/// (cut to eight characters).
pub fn format_header(layout: Layout, uname_field: &str) -> String {
    match layout {
        Layout::Process => {
            let title: String = uname_field.chars().take(UNAME_WIDTH).collect();
            let mut out = String::with_capacity(PROCESS_HEADER.len());
            let (head, tail) = PROCESS_HEADER.split_at(PROCESS_HEADER.find('X').unwrap_or(0));
            out.push_str(head);
            let width = title.chars().count().max(1);
            out.push_str(&format!("{title:<width$}"));
            out.extend(tail.chars().skip(width));
            out
        }
        Layout::Io => IO_HEADER.to_string(),
        Layout::Replication => format!(
            "{:>5} {:<8.8} {:<11.11} {:>15} {:<9.9} {:<10.10} {:<10.10} {:<10.10} {:<10.10} {:<10.10} {:>5} {:>5} {:>5} {:>5}",
            "PID",
            uname_field,
            "APPLICATION",
            "CLIENT",
            "STATE",
            "PRIMARY",
            "SENT",
            "WRITE",
            "FLUSH",
            "REPLAY",
            "SLAG",
            "WLAG",
            "FLAG",
            "RLAG"
        ),
    }
}

/// Hands out one formatted row per call over a cycle's active buffer.
#[derive(Debug, Clone)]
pub struct RowCursor<'a> {
    rows: &'a [ProcessRecord],
    pos: usize,
    layout: Layout,
}

impl<'a> RowCursor<'a> {
    pub fn new(rows: &'a [ProcessRecord], layout: Layout) -> Self {
        Self {
            rows,
            pos: 0,
            layout,
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn next_row(&mut self) -> Option<String> {
        let p = self.rows.get(self.pos)?;
        self.pos += 1;
        Some(match self.layout {
            Layout::Process => process_row(p),
            Layout::Io => io_row(p),
            Layout::Replication => replication_row(p),
        })
    }
}

impl Iterator for RowCursor<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_row()
    }
}

fn process_row(p: &ProcessRecord) -> String {
    format!(
        "{:>7} {:<10.8} {:>5} {:>5} {:<6} {:>5} {:>5} {:>5.1} {:>5} {}",
        p.pid,
        p.username,
        format_k(p.size_kb),
        format_k(p.rss_kb),
        p.pgstate.label(),
        format_time(p.xact_secs),
        format_time(p.query_secs),
        p.rates.cpu * 100.0,
        p.locks,
        p.name
    )
}

fn io_row(p: &ProcessRecord) -> String {
    let r = &p.rates;
    format!(
        "{:>5} {:>7.0} {:>7.0} {:>7.0} {:>5} {:>6} {}",
        p.pid,
        r.iops,
        r.syscr,
        r.syscw,
        format_b(r.read_bytes as i64),
        format_b(r.write_bytes as i64),
        p.name
    )
}

fn replication_row(p: &ProcessRecord) -> String {
    let r = &p.replication;
    format!(
        "{:>5} {:<8.8} {:<11.11} {:>15} {:<9.9} {:<10.10} {:<10.10} {:<10.10} {:<10.10} {:<10.10} {:>5} {:>5} {:>5} {:>5}",
        p.pid,
        p.username,
        r.application_name,
        r.client_addr,
        r.state,
        r.primary,
        r.sent,
        r.write,
        r.flush,
        r.replay,
        format_b(r.sent_lag),
        format_b(r.write_lag),
        format_b(r.flush_lag),
        format_b(r.replay_lag)
    )
}

/// KiB amount scaled to at most four digits plus a unit letter.
pub fn format_k(kb: u64) -> String {
    scale(kb, &['K', 'M', 'G', 'T'])
}

/// Byte amount scaled like `format_k`. Negative values (a standby ahead of
/// its reported primary position) keep their sign.
pub fn format_b(bytes: i64) -> String {
    let s = scale(bytes.unsigned_abs(), &['B', 'K', 'M', 'G', 'T']);
    if bytes < 0 {
        format!("-{s}")
    } else {
        s
    }
}

fn scale(mut amount: u64, units: &[char]) -> String {
    let mut unit = 0;
    while amount >= 10_000 && unit + 1 < units.len() {
        amount = (amount + 512) / 1024;
        unit += 1;
    }
    format!("{amount}{}", units[unit])
}

/// `m:ss` up to 999 minutes, then hours, then days.
pub fn format_time(secs: i64) -> String {
    if secs < 0 {
        return "?".into();
    }
    if secs <= 999 * 60 + 59 {
        return format!("{}:{:02}", secs / 60, secs % 60);
    }
    let hours = secs / 3600;
    if hours < 1000 {
        format!("{hours}H")
    } else {
        format!("{}D", hours / 24)
    }
}

pub fn format_load(sample: &SystemSample) -> String {
    let [one, five, fifteen] = sample.load_avg;
    match sample.last_pid {
        Some(pid) => format!("last pid: {pid:>6};  load avg: {one:5.2}, {five:5.2}, {fifteen:5.2}"),
        None => format!("load avg: {one:5.2}, {five:5.2}, {fifteen:5.2}"),
    }
}

pub fn format_processes(total: usize, hist: &StateHistogram) -> String {
    let parts: Vec<String> = hist
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(s, n)| format!("{n} {}", s.summary_name()))
        .collect();
    if parts.is_empty() {
        format!("{total} processes")
    } else {
        format!("{total} processes: {}", parts.join(", "))
    }
}

pub fn format_cpu_states(names: &[&str], states: &[f64]) -> String {
    let parts: Vec<String> = names
        .iter()
        .zip(states)
        .map(|(n, v)| format!("{v:5.1}% {n}"))
        .collect();
    format!("CPU states: {}", parts.join(", "))
}

/// Memory line, labelled with the names `HostStatics::memory_names` publishes.
pub fn format_memory(names: &[&str], m: &MemoryStats) -> String {
    let values = [m.used, m.free, m.shared, m.buffers, m.cached].map(format_k);
    labelled("Mem", names, values)
}

/// Swap line; the two activity figures are per second.
pub fn format_swap(names: &[&str], s: &SwapStats) -> String {
    let values = [
        format_k(s.used),
        format_k(s.free),
        format_k(s.cached),
        format!("{}/s", format_k(s.in_rate as u64)),
        format!("{}/s", format_k(s.out_rate as u64)),
    ];
    labelled("Swap", names, values)
}

fn labelled(title: &str, names: &[&str], values: [String; 5]) -> String {
    let parts: Vec<String> = values
        .iter()
        .zip(names)
        .map(|(v, n)| format!("{v} {n}"))
        .collect();
    format!("{title}: {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackendState;

    #[test]
    fn header_truncates_user_title() {
        let h = format_header(Layout::Process, "administrator");
        assert!(h.starts_with("    PID administ    "));
        assert!(!h.contains("administr"));
        assert_eq!(h.len(), PROCESS_HEADER.len());
    }

    #[test]
    fn header_with_short_title_keeps_columns() {
        let h = format_header(Layout::Process, "USERNAME");
        assert_eq!(
            h,
            "    PID USERNAME    SIZE   RES STATE   XTIME  QTIME  %CPU LOCKS COMMAND"
        );
    }

    #[test]
    fn cursor_walks_rows_once() {
        let mut a = ProcessRecord::new(7);
        a.username = "alice".into();
        a.name = "postgres: alice app".into();
        a.pgstate = BackendState::Active;
        a.rates.cpu = 0.125;
        let rows = vec![a, ProcessRecord::new(8)];
        let mut cur = RowCursor::new(&rows, Layout::Process);
        let first = cur.next_row().unwrap();
        assert!(first.starts_with("      7 alice"));
        assert!(first.contains(" active "));
        assert!(first.contains(" 12.5 "));
        assert!(cur.next_row().unwrap().starts_with("      8"));
        assert!(cur.next_row().is_none());
        cur.reset();
        assert_eq!(cur.count(), 2);
    }

    #[test]
    fn unit_scaling() {
        assert_eq!(format_k(9999), "9999K");
        assert_eq!(format_k(20480), "20M");
        assert_eq!(format_b(512), "512B");
        assert_eq!(format_b(-2048), "-2048B");
        assert_eq!(format_b(1_048_576), "1024K");
    }

    #[test]
    fn time_ranges() {
        assert_eq!(format_time(65), "1:05");
        assert_eq!(format_time(999 * 60 + 59), "999:59");
        assert_eq!(format_time(999 * 60 + 60), "16H");
        assert_eq!(format_time(2000 * 3600), "83D");
        assert_eq!(format_time(-1), "?");
    }

    #[test]
    fn process_summary_skips_empty_states() {
        let mut h = StateHistogram::default();
        h.tally(BackendState::Active);
        h.tally(BackendState::Idle);
        h.tally(BackendState::Idle);
        assert_eq!(format_processes(3, &h), "3 processes: 2 idle, 1 active");
    }

    #[test]
    fn memory_and_swap_lines_use_published_names() {
        use crate::host::{MEMORY_NAMES, SWAP_NAMES};
        let m = MemoryStats {
            used: 6000,
            free: 20_000,
            shared: 0,
            buffers: 10,
            cached: 500,
        };
        assert_eq!(
            format_memory(&MEMORY_NAMES, &m),
            "Mem: 6000K used, 20M free, 0K shared, 10K buffers, 500K cached"
        );
        let s = SwapStats {
            used: 0,
            free: 1000,
            cached: 0,
            in_rate: 4.0,
            out_rate: 0.0,
        };
        assert_eq!(
            format_swap(&SWAP_NAMES, &s),
            "Swap: 0K used, 1000K free, 0K cached, 4K/s in, 0K/s out"
        );
    }
}
