use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: &'static str, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(pad),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("r", "           ", "Rerun (same seed when --seed was given)"),
        key_line("p", "           ", "Pause/Resume sampling"),
        key_line("s", "           ", "Save run to history"),
        key_line("a", "           ", "Toggle auto-save"),
        key_line("tab", "         ", "Switch tabs"),
        key_line("?", "           ", "Show this help"),
        Line::from(""),
        Line::from("History tab:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Navigate"),
        ]),
        key_line("e", "           ", "Export selected as JSON"),
        key_line("c", "           ", "Export selected as CSV"),
        key_line("y", "           ", "Copy exported path to clipboard"),
        key_line("d", "           ", "Delete selected"),
        key_line("r", "           ", "Refresh history"),
        Line::from(""),
        Line::from("Bars show how often each outcome was drawn; the frequency table beside"),
        Line::from("or below the chart lists the count and share of every outcome. Draws"),
        Line::from("outside the table are counted as discarded."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
