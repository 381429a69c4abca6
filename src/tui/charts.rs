use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use super::state::UiState;
use crate::distribution::DistributionSpec;
use crate::format::{group_thousands, percent};

/// Bar colour per distribution: salmon for binomial, green otherwise.
pub fn bar_color(dist: &DistributionSpec) -> Color {
    match dist {
        DistributionSpec::Binomial { .. } => Color::Rgb(250, 128, 114),
        _ => Color::Green,
    }
}

/// Top of the value axis: 10% above the tallest bar to leave room for labels.
pub fn y_max(max_count: u64) -> u64 {
    max_count.saturating_add(max_count.div_ceil(10)).max(1)
}

pub fn chart_title(state: &UiState) -> String {
    format!(
        "Frequencies for {} {} (Frame {}/{})",
        group_thousands(state.table.total()),
        state.distribution.label(),
        state.frame,
        state.frames
    )
}

/// Width and gap so that `n` bars fill `inner_width` cells.
pub fn bar_layout(inner_width: u16, n: usize) -> (u16, u16) {
    if n == 0 {
        return (1, 0);
    }
    let n = n as u16;
    let gap = if inner_width >= n * 2 { 1 } else { 0 };
    let width = (inner_width.saturating_sub(gap * n.saturating_sub(1)) / n).max(1);
    (width, gap)
}

/// Live bar chart of outcome counts.
pub fn render_frequency_chart(f: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(chart_title(state)));

    if state.table.is_empty() || state.frames == 0 {
        f.render_widget(Paragraph::new("Waiting for first frame...").block(block), area);
        return;
    }

    let color = bar_color(&state.distribution);
    let (bar_width, bar_gap) = bar_layout(area.width.saturating_sub(2), state.table.len());

    let bars: Vec<Bar> = state
        .table
        .values()
        .zip(state.table.counts.iter())
        .map(|(value, &count)| {
            let text = group_thousands(count);
            let text = if text.len() as u16 <= bar_width {
                text
            } else {
                String::new()
            };
            Bar::default()
                .value(count)
                .label(Line::from(value.to_string()))
                .text_value(text)
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(Color::Black).bg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(bar_gap)
        .max(y_max(state.table.max_count()));
    f.render_widget(chart, area);
}

/// Per-outcome table with the count and percentage shown above each bar.
pub fn render_frequency_table(f: &mut Frame, area: Rect, state: &UiState) {
    let precision = state.distribution.percent_precision();
    let max = state.table.max_count();
    let rows: Vec<Row> = state
        .table
        .values()
        .zip(state.table.toppers(precision))
        .zip(state.table.counts.iter())
        .map(|((value, (count, pct)), &raw)| {
            let style = if raw == max && max > 0 {
                Style::default().fg(bar_color(&state.distribution))
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(value.to_string()),
                Cell::from(count),
                Cell::from(pct),
            ])
            .style(style)
        })
        .collect();

    let header = Row::new(vec![
        state.distribution.value_axis_label(),
        "Frequency",
        "Share",
    ])
    .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(9),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Frequencies"));
    f.render_widget(table, area);
}

/// Observed vs expected moments for the live table.
pub fn moments_line(state: &UiState) -> String {
    let summary = crate::metrics::summarize(&state.table, &state.distribution);
    let fmt = |v: Option<f64>| v.map(|x| format!("{x:.3}")).unwrap_or_else(|| "-".into());
    format!(
        "Mean {} (exp {:.3})  Var {} (exp {:.3})",
        fmt(summary.mean),
        summary.expected_mean,
        fmt(summary.variance),
        summary.expected_variance,
    )
}

pub fn draws_line(state: &UiState) -> String {
    format!(
        "Draws: {}  Discarded: {} ({})",
        group_thousands(state.table.draws()),
        group_thousands(state.table.discarded),
        percent(discarded_share(state), 2)
    )
}

/// Topper text for every outcome as `value: count percent`, values right-aligned.
pub fn topper_cells(state: &UiState) -> Vec<String> {
    let precision = state.distribution.percent_precision();
    let value_width = state
        .table
        .values()
        .map(|v| v.to_string().len())
        .max()
        .unwrap_or(1);
    state
        .table
        .values()
        .zip(state.table.toppers(precision))
        .map(|(v, (count, pct))| format!("{v:>value_width$}: {count} {pct}"))
        .collect()
}

/// Columns and rows of a column-major grid of `n` cells, two spaces apart.
pub fn grid_shape(inner_width: u16, n: usize, cell_width: usize) -> (usize, usize) {
    if n == 0 {
        return (1, 0);
    }
    let cols = ((inner_width as usize + 2) / (cell_width + 2)).clamp(1, n);
    (cols, n.div_ceil(cols))
}

/// Height (borders included) of the topper grid drawn `width` cells wide.
pub fn topper_grid_height(state: &UiState, width: u16) -> u16 {
    let cells = topper_cells(state);
    let cell_width = cells.iter().map(|c| c.len()).max().unwrap_or(0);
    let (_, rows) = grid_shape(width.saturating_sub(2), cells.len(), cell_width);
    rows as u16 + 2
}

/// Compact grid of bar toppers for terminals too narrow for the side table.
pub fn render_topper_grid(f: &mut Frame, area: Rect, state: &UiState) {
    let cells = topper_cells(state);
    let cell_width = cells.iter().map(|c| c.len()).max().unwrap_or(0);
    let (cols, rows) = grid_shape(area.width.saturating_sub(2), cells.len(), cell_width);
    let max = state.table.max_count();
    let highlight = Style::default().fg(bar_color(&state.distribution));

    let lines: Vec<Line> = (0..rows)
        .map(|r| {
            let spans: Vec<Span> = (0..cols)
                .filter_map(|c| {
                    let idx = c * rows + r;
                    let cell = cells.get(idx)?;
                    let raw = state.table.counts[idx];
                    let style = if raw == max && max > 0 {
                        highlight
                    } else {
                        Style::default()
                    };
                    Some(Span::styled(format!("{cell:<cell_width$}  "), style))
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Frequencies"));
    f.render_widget(p, area);
}

fn discarded_share(state: &UiState) -> f64 {
    let draws = state.table.draws();
    if draws == 0 {
        0.0
    } else {
        state.table.discarded as f64 * 100.0 / draws as f64
    }
}
