mod charts;
mod export;
mod help;
mod state;

use crate::cli::Cli;
use crate::model::{RunResult, RunState, SampleEvent};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Sparkline, Tabs},
    Terminal,
};
use state::{apply_event, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure and task switching in the hot path.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SampleEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&args, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<SampleEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let initial_load = terminal
        .size()
        .map(|size| ((size.height as usize).saturating_sub(2) * 3).max(20))
        .unwrap_or(66);

    let mut state = UiState {
        auto_save: args.auto_save,
        comments: args.comments.clone(),
        ..Default::default()
    };
    // UiState is owned by the UI thread only; no cross-thread mutation.
    state.reset_for_run(args.distribution_spec());
    state.frames = args.frames;
    state.samples_per_frame = args.samples_per_frame;
    state.initial_history_load_size = initial_load;
    state.history = crate::storage::load_recent(initial_load).unwrap_or_default();
    state.history_loaded_count = state.history.len();
    if !args.run_on_launch {
        state.info = "Press r to start sampling".into();
    }

    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            match ev {
                SampleEvent::RunCompleted { result } => {
                    handle_run_completed(&args, &mut state, *result);
                }
                other => apply_event(&mut state, other),
            }
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('p')) => {
                        if state.run_state == RunState::Sampling
                            || state.run_state == RunState::Paused
                        {
                            state.paused = !state.paused;
                            let _ = cmd_tx.send(UiCommand::Pause(state.paused));
                        }
                    }
                    (_, KeyCode::Char('r')) => {
                        if state.tab == 1 {
                            refresh_history(&mut state);
                        } else {
                            state.info = "Restart requested…".into();
                            let _ = cmd_tx.send(UiCommand::Restart);
                        }
                    }
                    (_, KeyCode::Char('s')) => {
                        if state.tab == 0 {
                            if let Some(r) = state.last_result.clone() {
                                export::save_and_show_path(&r, &mut state);
                            } else {
                                state.info = "No completed run to save yet.".into();
                            }
                        }
                    }
                    (_, KeyCode::Char('e')) => {
                        if let Some(r) = selected_history(&state).cloned() {
                            match export::export_result_json(&r) {
                                Ok(p) => {
                                    state.last_exported_path = Some(p.to_string_lossy().into());
                                    state.info = format!(
                                        "Exported JSON: {} (press 'y' to copy path)",
                                        p.display()
                                    );
                                }
                                Err(e) => state.info = format!("JSON export failed: {e:#}"),
                            }
                        }
                    }
                    (_, KeyCode::Char('c')) => {
                        if let Some(r) = selected_history(&state).cloned() {
                            match export::export_result_csv(&r) {
                                Ok(p) => {
                                    state.last_exported_path = Some(p.to_string_lossy().into());
                                    state.info = format!(
                                        "Exported CSV: {} (press 'y' to copy path)",
                                        p.display()
                                    );
                                }
                                Err(e) => state.info = format!("CSV export failed: {e:#}"),
                            }
                        }
                    }
                    (_, KeyCode::Char('y')) => {
                        if state.tab == 1 {
                            if let Some(path) = state.last_exported_path.clone() {
                                match export::copy_to_clipboard(&path) {
                                    Ok(_) => {
                                        state.info = format!("✓ Copied to clipboard: {}", path);
                                    }
                                    Err(e) => {
                                        state.info = format!("Clipboard copy failed: {e:#}");
                                    }
                                }
                            } else {
                                state.info =
                                    "No exported file path to copy. Export a file first (e/c)"
                                        .into();
                            }
                        }
                    }
                    (_, KeyCode::Char('a')) => {
                        state.auto_save = !state.auto_save;
                        state.info = if state.auto_save {
                            "Auto-save enabled".into()
                        } else {
                            "Auto-save disabled".into()
                        };
                    }
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % 3;
                        if state.tab == 1 {
                            state.history_selected = 0;
                            state.history_scroll_offset = 0;
                        }
                    }
                    (_, KeyCode::Char('?')) => {
                        state.tab = 2;
                    }
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => {
                        if state.tab == 1 && state.history_selected > 0 {
                            state.history_selected -= 1;
                            if state.history_selected < state.history_scroll_offset {
                                state.history_scroll_offset = state.history_selected;
                            }
                        }
                    }
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => {
                        if state.tab == 1
                            && state.history_selected < state.history.len().saturating_sub(1)
                        {
                            state.history_selected += 1;
                            let visible = terminal
                                .size()
                                .map(|s| (s.height as usize).saturating_sub(8).max(1))
                                .unwrap_or(30);
                            if state.history_selected >= state.history_scroll_offset + visible {
                                state.history_scroll_offset =
                                    state.history_selected.saturating_sub(visible - 1);
                            }
                            load_more_history(&mut state);
                        }
                    }
                    (_, KeyCode::Char('d')) => {
                        if let Some(to_delete) = selected_history(&state).cloned() {
                            match crate::storage::delete_run(&to_delete) {
                                Ok(()) => {
                                    state.history.remove(state.history_selected);
                                    state.clamp_history_selection();
                                    state.info = "Deleted".into();
                                }
                                Err(e) => state.info = format!("Delete failed: {e:#}"),
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn selected_history(state: &UiState) -> Option<&RunResult> {
    if state.tab == 1 {
        state.history.get(state.history_selected)
    } else {
        None
    }
}

fn refresh_history(state: &mut UiState) {
    let reload_size = state
        .initial_history_load_size
        .max(state.history_loaded_count);
    match crate::storage::load_recent(reload_size) {
        Ok(new_history) => {
            let old_count = state.history.len();
            state.history = new_history;
            state.history_loaded_count = state.history.len();
            state.clamp_history_selection();

            let new_count = state.history.len();
            state.info = if new_count > old_count {
                format!("Refreshed: {} new run(s)", new_count - old_count)
            } else if new_count < old_count {
                format!("Refreshed: {} run(s) removed", old_count - new_count)
            } else {
                "Refreshed".into()
            };
        }
        Err(e) => state.info = format!("Refresh failed: {e:#}"),
    }
}

/// Page in older runs when the selection nears the end of what is loaded.
fn load_more_history(state: &mut UiState) {
    let load_threshold = state.history_loaded_count.saturating_sub(10);
    if state.history_selected < load_threshold
        || state.history_loaded_count != state.history.len()
    {
        return;
    }
    let want = state.history.len() + state.history.len().max(20);
    if let Ok(more) = crate::storage::load_recent(want) {
        let existing: std::collections::HashSet<_> =
            state.history.iter().map(|r| r.run_id.clone()).collect();
        let new_items: Vec<_> = more
            .into_iter()
            .filter(|r| !existing.contains(&r.run_id))
            .collect();
        if !new_items.is_empty() {
            state.history.extend(new_items);
            state.history_loaded_count = state.history.len();
        }
    }
}

fn handle_run_completed(args: &Cli, state: &mut UiState, r: RunResult) {
    let reload_size = (state.history_loaded_count + 1).max(state.initial_history_load_size);
    let processed = orchestrator::process_run_completion(args, reload_size, state.auto_save, &r);

    state.info = if r.cancelled {
        format!("Cancelled after {} frame(s)", r.frames_completed)
    } else {
        format!(
            "Done: {} draws in {} frames",
            crate::format::group_thousands(r.draws()),
            r.frames_completed
        )
    };
    apply_event(state, SampleEvent::RunCompleted { result: Box::new(r) });

    if let Some(path) = processed.auto_saved_path.as_ref() {
        state.info = format!("Saved: {}", path.display());
    }
    if !processed.export_messages.is_empty() {
        state.info = processed.export_messages.join("; ");
    }

    state.history = processed.history;
    state.history_loaded_count = state.history.len();
    if state.tab == 1 {
        state.history_selected = 0;
        state.history_scroll_offset = 0;
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Dashboard"),
        Line::from("History"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("animated-distributions"),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_dashboard(chunks[1], f, state),
        1 => draw_history(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn run_state_span(state: &UiState) -> Span<'static> {
    let (text, color) = match state.run_state {
        RunState::Sampling => ("sampling", Color::Green),
        RunState::Paused => ("paused", Color::Yellow),
        RunState::Completed => ("completed", Color::Cyan),
        RunState::Cancelled => ("cancelled", Color::Red),
    };
    Span::styled(text, Style::default().fg(color))
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let wide = area.width >= 90;
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(8)].as_ref())
        .split(area);

    // Narrow terminals stack the frequencies under the chart instead of beside it.
    if wide {
        let row = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(50), Constraint::Length(36)].as_ref())
            .split(main[0]);
        charts::render_frequency_chart(f, row[0], state);
        charts::render_frequency_table(f, row[1], state);
    } else {
        let grid_height = charts::topper_grid_height(state, main[0].width);
        let col = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(grid_height)].as_ref())
            .split(main[0]);
        charts::render_frequency_chart(f, col[0], state);
        charts::render_topper_grid(f, col[1], state);
    }

    // The sparkline only fits beside the status panel on wide terminals.
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(main[1]);
    let status_area = if wide { bottom[0] } else { main[1] };

    let seed = state
        .seed
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".into());
    let auto_save = if state.auto_save { "on" } else { "off" };
    let mut status = vec![
        Line::from(vec![
            Span::styled("State: ", Style::default().fg(Color::Gray)),
            run_state_span(state),
            Span::styled("  Frame: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{}/{}", state.frame, state.frames)),
            Span::styled("  Per frame: ", Style::default().fg(Color::Gray)),
            Span::raw(crate::format::group_thousands(state.samples_per_frame)),
        ]),
        Line::from(vec![
            Span::styled("Seed: ", Style::default().fg(Color::Gray)),
            Span::raw(seed),
            Span::styled("  Auto-save: ", Style::default().fg(Color::Gray)),
            Span::raw(auto_save),
        ]),
        Line::from(charts::draws_line(state)),
        Line::from(charts::moments_line(state)),
    ];
    let p = Paragraph::new(status).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, status_area);
    if !wide {
        return;
    }

    let spark = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Recorded per frame"),
        )
        .data(&state.per_frame_series)
        .style(Style::default().fg(charts::bar_color(&state.distribution)));
    f.render_widget(spark, bottom[1]);
}

fn draw_history(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        format!(
            "{:<22} {:<9} {:>9} {:>12} {:>9} {:>9}",
            "Timestamp (UTC)", "Dist", "Frames", "Draws", "Mean", "Expected"
        ),
        Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
    )));

    if state.history.is_empty() {
        lines.push(Line::from("No saved runs yet. Press 's' on the dashboard or enable auto-save."));
    }

    // Two rows for borders, one for the header.
    let visible = (area.height as usize).saturating_sub(3).max(1);
    for (idx, r) in state
        .history
        .iter()
        .enumerate()
        .skip(state.history_scroll_offset)
        .take(visible)
    {
        let ts: String = r.timestamp_utc.chars().take(19).collect();
        let mean = r
            .summary
            .mean
            .map(|m| format!("{m:.3}"))
            .unwrap_or_else(|| "-".into());
        let text = format!(
            "{:<22} {:<9} {:>9} {:>12} {:>9} {:>9.3}",
            ts,
            r.distribution.name(),
            format!("{}/{}", r.frames_completed, r.frames_requested),
            crate::format::group_thousands(r.draws()),
            mean,
            r.summary.expected_mean
        );
        let style = if idx == state.history_selected {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(text, style)));
    }

    let title = format!(
        "History ({} loaded) - {}",
        state.history.len(),
        if state.info.is_empty() {
            "e/c export, d delete, r refresh"
        } else {
            state.info.as_str()
        }
    );
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::DistributionSpec;
    use ratatui::backend::TestBackend;

    fn screen(state: &UiState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f.area(), f, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .chunks(width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn finished_run(spec: DistributionSpec) -> UiState {
        let mut state = UiState::default();
        state.reset_for_run(spec);
        state.frames = 10;
        state.frame = 10;
        for (i, value) in (0..state.table.len() as i64).enumerate() {
            for _ in 0..(100 + i as u64 * 40) {
                state.table.record(value);
            }
        }
        state.table.record(-1);
        state
    }

    #[test]
    fn narrow_dashboard_shows_every_topper() {
        for spec in [
            DistributionSpec::DEFAULT_BINOMIAL,
            DistributionSpec::DEFAULT_NORMAL,
            DistributionSpec::DEFAULT_POISSON,
        ] {
            let state = finished_run(spec);
            let text = screen(&state, 80, 30);
            for cell in charts::topper_cells(&state) {
                assert!(
                    text.contains(cell.trim_start()),
                    "{}: missing {cell:?} in\n{text}",
                    spec.name()
                );
            }
            assert!(text.contains("Discarded: 1 ("), "{}:\n{text}", spec.name());
        }
    }

    #[test]
    fn wide_dashboard_keeps_side_table() {
        let state = finished_run(DistributionSpec::DEFAULT_POISSON);
        let text = screen(&state, 120, 40);
        assert!(text.contains("Share"));
        assert!(text.contains("Recorded per frame"));
        assert!(text.contains("Discarded: 1 ("));
    }

    #[test]
    fn help_describes_rerun_seed() {
        let state = UiState {
            tab: 2,
            ..Default::default()
        };
        let text = screen(&state, 100, 40);
        assert!(text.contains("Rerun (same seed when --seed was given)"));
    }
}
