//! What the user asked to see: filters, mode, layout and sort order.
//! Shared by the batch printer and the terminal view.

use chrono::{DateTime, Local};
use pgtop_engine::format::{
    format_cpu_states, format_load, format_memory, format_processes, format_swap,
};
use pgtop_engine::{order_index, CycleSummary, Layout, Mode, Monitor, ProcessSelection, ORDER_NAMES};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub selection: ProcessSelection,
    pub mode: Mode,
    /// Layout for normal mode; replication mode has its own.
    pub io: bool,
    pub order: usize,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Refresh,
    Redraw,
    Ignored,
}

impl View {
    pub fn layout(&self) -> Layout {
        match (self.mode, self.io) {
            (Mode::Replication, _) => Layout::Replication,
            (Mode::Normal, true) => Layout::Io,
            (Mode::Normal, false) => Layout::Process,
        }
    }

    pub fn order_name(&self) -> &'static str {
        ORDER_NAMES[self.order]
    }

    /// Selects `name`; unknown names leave the order unchanged.
    pub fn set_order(&mut self, name: &str) -> bool {
        match order_index(name) {
            Some(i) => {
                self.order = i;
                true
            }
            None => false,
        }
    }

    pub fn handle_key(&mut self, c: char) -> KeyAction {
        match c {
            'q' => return KeyAction::Quit,
            ' ' => return KeyAction::Refresh,
            'o' => self.order = (self.order + 1) % ORDER_NAMES.len(),
            'P' => {
                self.set_order("cpu");
            }
            'M' => {
                self.set_order("size");
            }
            'T' => {
                self.set_order("xtime");
            }
            'i' => self.selection.show_idle = !self.selection.show_idle,
            'c' => self.selection.full_cmd = self.selection.full_cmd.next(),
            'I' => self.io = !self.io,
            'R' => self.toggle_replication(),
            _ => return KeyAction::Ignored,
        }
        KeyAction::Redraw
    }

    fn toggle_replication(&mut self) {
        let on_lag = self.order >= order_index("flag").unwrap_or(ORDER_NAMES.len());
        self.mode = match self.mode {
            Mode::Normal => {
                if !on_lag {
                    self.set_order("rlag");
                }
                Mode::Replication
            }
            Mode::Replication => {
                if on_lag {
                    self.set_order("cpu");
                }
                Mode::Normal
            }
        };
    }
}

/// The top-of-screen block: clock, load, session counts, CPU, memory, swap.
pub fn summary_lines(m: &Monitor, summary: &CycleSummary, now: DateTime<Local>) -> Vec<String> {
    let sys = m.system();
    let statics = m.statics();
    vec![
        format!(
            "pgtop - {} - up {}  {}    {}",
            statics.hostname,
            format_uptime(sys.uptime_secs),
            format_load(sys),
            now.format("%H:%M:%S")
        ),
        format_processes(summary.total, &summary.histogram),
        format_cpu_states(statics.cpu_state_names(), &sys.cpu_states),
        format_memory(statics.memory_names(), &sys.memory),
        format_swap(statics.swap_names(), &sys.swap),
    ]
}

fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;
    match days {
        0 => format!("{hours:02}:{mins:02}"),
        1 => format!("1 day, {hours:02}:{mins:02}"),
        d => format!("{d} days, {hours:02}:{mins:02}"),
    }
}
