//! Plain-text output for non-interactive use: one block per refresh on stdout.

use anyhow::{Context, Result};
use chrono::Local;
use pgtop_engine::{format_header, CycleSummary, DataSource, Monitor};
use std::io::{self, Write};
use tokio::time::sleep;

use crate::view::{summary_lines, View};

/// Refreshes and prints until `iterations` blocks have been written
/// (forever when `None`).
pub async fn run(
    monitor: &mut Monitor,
    source: &mut dyn DataSource,
    view: &View,
    iterations: Option<u64>,
) -> Result<()> {
    let mut done = 0u64;
    loop {
        let summary = monitor
            .refresh(source, &view.selection, view.mode, Some(view.order))
            .context("refresh cycle failed")?;
        {
            let mut out = io::stdout().lock();
            print_cycle(&mut out, monitor, &summary, view)?;
            out.flush()?;
        }
        done += 1;
        if iterations.is_some_and(|max| done >= max) {
            return Ok(());
        }
        sleep(view.delay).await;
    }
}

fn print_cycle(
    out: &mut impl Write,
    monitor: &Monitor,
    summary: &CycleSummary,
    view: &View,
) -> io::Result<()> {
    for line in summary_lines(monitor, summary, Local::now()) {
        writeln!(out, "{line}")?;
    }
    writeln!(out)?;
    writeln!(out, "{}", format_header(view.layout(), "USERNAME"))?;
    for row in monitor.cursor(view.layout()) {
        writeln!(out, "{row}")?;
    }
    writeln!(out)
}
