//! App state and main loop: input handling, refresh cycles, and drawing.

use std::{
    io,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pgtop_engine::{DataSource, Monitor};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Rect},
    Terminal,
};
use tokio::time::sleep;

use crate::ui::header::draw_header;
use crate::ui::processes::{draw_processes, processes_handle_key};
use crate::view::{summary_lines, KeyAction, View};

const SUMMARY_ROWS: u16 = 6;

pub struct App {
    view: View,
    summary: Vec<String>,
    last_refresh: Option<Instant>,
    should_quit: bool,
    procs_scroll_offset: usize,
    last_procs_area: Option<Rect>,
}

impl App {
    pub fn new(view: View) -> Self {
        Self {
            view,
            summary: Vec::new(),
            last_refresh: None,
            should_quit: false,
            procs_scroll_offset: 0,
            last_procs_area: None,
        }
    }

    pub async fn run(&mut self, monitor: &mut Monitor, source: &mut dyn DataSource) -> Result<()> {
        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal, monitor, source).await;

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        monitor: &mut Monitor,
        source: &mut dyn DataSource,
    ) -> Result<()> {
        loop {
            let mut refresh_now = self.last_refresh.is_none();

            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                let Event::Key(k) = event::read()? else {
                    continue;
                };
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match k.code {
                    KeyCode::Esc => self.should_quit = true,
                    KeyCode::Char(c) => match self.view.handle_key(c) {
                        KeyAction::Quit => self.should_quit = true,
                        KeyAction::Refresh | KeyAction::Redraw => refresh_now = true,
                        KeyAction::Ignored => {}
                    },
                    _ => {
                        if let Some(p_area) = self.last_procs_area {
                            // borders (2) + header (1)
                            let page = p_area.height.saturating_sub(3).max(1) as usize;
                            processes_handle_key(
                                &mut self.procs_scroll_offset,
                                k,
                                page,
                                monitor.active().len(),
                            );
                        }
                    }
                }
            }
            if self.should_quit {
                break;
            }

            let due = self
                .last_refresh
                .is_none_or(|t| t.elapsed() >= self.view.delay);
            if refresh_now || due {
                self.refresh(monitor, source)?;
            }

            terminal.draw(|f| self.draw(f, monitor))?;

            // Tick rate
            sleep(Duration::from_millis(50)).await;
        }
        Ok(())
    }

    fn refresh(&mut self, monitor: &mut Monitor, source: &mut dyn DataSource) -> Result<()> {
        let v = &self.view;
        let summary = monitor
            .refresh(source, &v.selection, v.mode, Some(v.order))
            .context("refresh cycle failed")?;
        self.summary = summary_lines(monitor, &summary, Local::now());
        self.last_refresh = Some(Instant::now());
        Ok(())
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>, monitor: &Monitor) {
        let rows = ratatui::layout::Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(SUMMARY_ROWS), Constraint::Min(3)])
            .split(f.area());

        draw_header(f, rows[0], &self.summary, &self.view);

        // Cache for input handlers
        self.last_procs_area = Some(rows[1]);
        draw_processes(f, rows[1], monitor, &self.view, self.procs_scroll_offset);
    }
}
