//! Session table: fixed-width rows from the engine cursor, state coloring and a scrollbar.

use crossterm::event::{KeyCode, KeyEvent};
use pgtop_engine::{format_header, BackendState, Monitor};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::ui::theme::{HEADER_FG, SB_ARROW, SB_THUMB, SB_TRACK};
use crate::view::View;

fn state_style(state: BackendState) -> Style {
    match state {
        BackendState::Active | BackendState::FastPath => Style::default().fg(Color::Green),
        BackendState::IdleInTransaction => Style::default().fg(Color::Yellow),
        BackendState::IdleInTransactionAborted => Style::default().fg(Color::Red),
        BackendState::Idle => Style::default().fg(Color::DarkGray),
        BackendState::Undefined | BackendState::Disabled => Style::default(),
    }
}

pub fn draw_processes(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    monitor: &Monitor,
    view: &View,
    scroll_offset: usize,
) {
    let active = monitor.active();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Sessions ({} shown)", active.len()));
    f.render_widget(block, area);

    // Inner area and content area (reserve 2 columns for scrollbar)
    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    if inner.height < 1 || inner.width < 3 {
        return;
    }
    let content = Rect {
        x: inner.x,
        y: inner.y,
        width: inner.width.saturating_sub(2),
        height: inner.height,
    };

    let total_rows = active.len();
    let viewport_rows = content.height.saturating_sub(1) as usize;
    let offset = scroll_offset.min(total_rows.saturating_sub(viewport_rows));

    let layout = view.layout();
    let mut lines: Vec<Line> = Vec::with_capacity(viewport_rows + 1);
    lines.push(Line::from(Span::styled(
        format_header(layout, "USERNAME"),
        Style::default().fg(HEADER_FG).add_modifier(Modifier::BOLD),
    )));
    lines.extend(
        monitor
            .cursor(layout)
            .zip(active)
            .skip(offset)
            .take(viewport_rows)
            .map(|(text, rec)| Line::from(Span::styled(text, state_style(rec.pgstate)))),
    );
    f.render_widget(Paragraph::new(lines), content);

    draw_scrollbar(f, inner, total_rows, viewport_rows, offset);
}

fn draw_scrollbar(
    f: &mut ratatui::Frame<'_>,
    inner: Rect,
    total_rows: usize,
    viewport_rows: usize,
    offset: usize,
) {
    let scroll_area = Rect {
        x: inner.x + inner.width.saturating_sub(1),
        y: inner.y,
        width: 1,
        height: inner.height,
    };
    if scroll_area.height < 3 {
        return;
    }
    let track = (scroll_area.height - 2) as usize;
    let total = total_rows.max(1);
    let view = viewport_rows.clamp(1, total);
    let max_off = total.saturating_sub(view);

    let thumb_len = (track * view).div_ceil(total).max(1).min(track);
    let thumb_top = if max_off == 0 {
        0
    } else {
        ((track - thumb_len) * offset + max_off / 2) / max_off
    };

    let mut lines: Vec<Line> = Vec::with_capacity(scroll_area.height as usize);
    lines.push(Line::from(Span::styled("▲", Style::default().fg(SB_ARROW))));
    for i in 0..track {
        if i >= thumb_top && i < thumb_top + thumb_len {
            lines.push(Line::from(Span::styled("█", Style::default().fg(SB_THUMB))));
        } else {
            lines.push(Line::from(Span::styled("│", Style::default().fg(SB_TRACK))));
        }
    }
    lines.push(Line::from(Span::styled("▼", Style::default().fg(SB_ARROW))));
    f.render_widget(Paragraph::new(lines), scroll_area);
}

/// Handle keyboard scrolling (Up/Down/PageUp/PageDown/Home/End).
/// Returns `true` when the key was a scroll key.
pub fn processes_handle_key(
    scroll_offset: &mut usize,
    key: KeyEvent,
    page_size: usize,
    total_rows: usize,
) -> bool {
    match key.code {
        KeyCode::Up => *scroll_offset = scroll_offset.saturating_sub(1),
        KeyCode::Down => *scroll_offset += 1,
        KeyCode::PageUp => *scroll_offset = scroll_offset.saturating_sub(page_size),
        KeyCode::PageDown => *scroll_offset += page_size,
        KeyCode::Home => *scroll_offset = 0,
        KeyCode::End => *scroll_offset = usize::MAX,
        _ => return false,
    }
    *scroll_offset = (*scroll_offset).min(total_rows.saturating_sub(page_size));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn scrolling_is_clamped() {
        let mut off = 0;
        assert!(processes_handle_key(&mut off, key(KeyCode::PageDown), 10, 25));
        assert_eq!(off, 10);
        processes_handle_key(&mut off, key(KeyCode::End), 10, 25);
        assert_eq!(off, 15);
        processes_handle_key(&mut off, key(KeyCode::Home), 10, 25);
        assert_eq!(off, 0);
        assert!(!processes_handle_key(&mut off, key(KeyCode::Char('x')), 10, 25));
    }
}
