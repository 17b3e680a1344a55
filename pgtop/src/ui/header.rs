//! Summary block at the top: host, load, session counts, CPU, memory, swap.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};

use crate::view::View;

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, lines: &[String], view: &View) {
    let title = format!(
        "order: {} | idle: {} | keys: q quit, o order, i idle, c cmd, I io, R replication",
        view.order_name(),
        if view.selection.show_idle { "shown" } else { "hidden" }
    );
    let body: Vec<Line> = if lines.is_empty() {
        vec![Line::from("pgtop - waiting for first refresh...")]
    } else {
        lines.iter().map(|l| Line::from(l.as_str())).collect()
    };
    let block = Block::default()
        .title_bottom(title)
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));
    f.render_widget(Paragraph::new(body).block(block), area);
}
