//! Host-wide sample: load, CPU state percentages, memory and swap.

use tracing::debug;

use crate::delta::{per_second, DoubleBuffer, Slot};
use crate::host::{HostSource, HostStatics};
use crate::types::{StateHistogram, SystemSample};

/// Keeps the previous raw readings so each call can report deltas.
#[derive(Debug)]
pub struct SystemSampler {
    cpu_fields: usize,
    page_size: u64,
    prev_cpu: Option<Vec<u64>>,
    swap_slot: Slot,
    swap_in: DoubleBuffer,
    swap_out: DoubleBuffer,
    swap_seen: bool,
    sample: SystemSample,
}

impl SystemSampler {
    pub fn new(statics: &HostStatics) -> Self {
        let cpu_fields = statics.cpu_state_names().len();
        Self {
            cpu_fields,
            page_size: statics.page_size,
            prev_cpu: None,
            swap_slot: Slot::default(),
            swap_in: DoubleBuffer::default(),
            swap_out: DoubleBuffer::default(),
            swap_seen: false,
            sample: SystemSample {
                cpu_states: vec![0.0; cpu_fields],
                ..Default::default()
            },
        }
    }

    /// Reads every host source once. Sources that cannot be read leave their
    /// fields as they were.
    pub fn sample(&mut self, source: &dyn HostSource, elapsed: Option<f64>) -> &SystemSample {
        if let Ok(s) = source.read("loadavg") {
            self.apply_loadavg(&s);
        }
        if let Ok(s) = source.read("stat") {
            self.apply_cpu(&s);
        }
        if let Ok(s) = source.read("meminfo") {
            self.apply_meminfo(&s);
        }
        if let Ok(s) = source.read("vmstat") {
            self.apply_vmstat(&s, elapsed);
        }
        if let Ok(s) = source.read("uptime") {
            if let Some(up) = first_float(&s) {
                self.sample.uptime_secs = up as u64;
            }
        }
        debug!(
            load = self.sample.load_avg[0],
            used_kb = self.sample.memory.used,
            "system sampled"
        );
        &self.sample
    }

    pub fn current(&self) -> &SystemSample {
        &self.sample
    }

    pub(crate) fn set_process_states(&mut self, hist: StateHistogram) {
        self.sample.process_states = hist;
    }

    fn apply_loadavg(&mut self, s: &str) {
        let toks: Vec<&str> = s.split_whitespace().collect();
        for (i, slot) in self.sample.load_avg.iter_mut().enumerate() {
            if let Some(v) = toks.get(i).and_then(|t| t.parse().ok()) {
                *slot = v;
            }
        }
        self.sample.last_pid = toks.get(4).and_then(|t| t.parse().ok());
    }

    fn apply_cpu(&mut self, s: &str) {
        let Some(line) = s.lines().find(|l| l.starts_with("cpu ")) else {
            return;
        };
        let now: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .take(self.cpu_fields)
            .map_while(|t| t.parse().ok())
            .collect();
        if now.len() < self.cpu_fields {
            return;
        }
        self.sample.cpu_states = match self.prev_cpu.as_deref() {
            Some(prev) => percentages(&now, prev),
            None => vec![0.0; self.cpu_fields],
        };
        self.prev_cpu = Some(now);
    }

    fn apply_meminfo(&mut self, s: &str) {
        let mut total = None;
        let mut free = None;
        let mut swap_total = None;
        let mut swap_free = None;
        let mem = &mut self.sample.memory;
        let swap = &mut self.sample.swap;
        for line in s.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let Some(v) = rest.split_whitespace().next().and_then(|t| t.parse::<u64>().ok())
            else {
                continue;
            };
            match key {
                "MemTotal" => total = Some(v),
                "MemFree" => free = Some(v),
                "MemShared" | "Shmem" => mem.shared = v,
                "Buffers" => mem.buffers = v,
                "Cached" => mem.cached = v,
                "SwapTotal" => swap_total = Some(v),
                "SwapFree" => swap_free = Some(v),
                "SwapCached" => swap.cached = v,
                _ => {}
            }
        }
        if let (Some(t), Some(f)) = (total, free) {
            mem.used = t.saturating_sub(f);
            mem.free = f;
        }
        if let (Some(t), Some(f)) = (swap_total, swap_free) {
            swap.used = t.saturating_sub(f);
            swap.free = f;
        }
    }

    fn apply_vmstat(&mut self, s: &str, elapsed: Option<f64>) {
        let mut pin = None;
        let mut pout = None;
        for line in s.lines() {
            let mut it = line.split_whitespace();
            match (it.next(), it.next().and_then(|v| v.parse::<u64>().ok())) {
                (Some("pswpin"), Some(v)) => pin = Some(v),
                (Some("pswpout"), Some(v)) => pout = Some(v),
                _ => {}
            }
        }
        let (Some(pin), Some(pout)) = (pin, pout) else {
            return;
        };
        let slot = self.swap_slot;
        self.swap_in.store(slot, pin);
        self.swap_out.store(slot, pout);
        if self.swap_seen {
            let kib = |pages: u64| pages * self.page_size / 1024;
            self.sample.swap.in_rate = per_second(kib(self.swap_in.delta(slot)), elapsed);
            self.sample.swap.out_rate = per_second(kib(self.swap_out.delta(slot)), elapsed);
        }
        self.swap_seen = true;
        self.swap_slot.flip();
    }
}

/// Share of each tick counter in the total growth since `prev`, in percent.
fn percentages(now: &[u64], prev: &[u64]) -> Vec<f64> {
    let diffs: Vec<u64> = now
        .iter()
        .zip(prev)
        .map(|(n, p)| n.saturating_sub(*p))
        .collect();
    let total: u64 = diffs.iter().sum();
    if total == 0 {
        return vec![0.0; now.len()];
    }
    diffs
        .iter()
        .map(|d| *d as f64 * 100.0 / total as f64)
        .collect()
}

fn first_float(s: &str) -> Option<f64> {
    s.split_whitespace().next()?.parse().ok()
}
