use crate::distribution::DistributionSpec;
use crate::frequency::FrequencyTable;
use crate::model::{RunResult, RunState, SampleEvent};
use std::time::Instant;

pub struct UiState {
    pub tab: usize,
    pub paused: bool,
    pub run_state: RunState,
    pub info: String,
    pub comments: Option<String>,

    // Current run
    pub run_id: Option<String>,
    pub distribution: DistributionSpec,
    pub frame: u64,
    pub frames: u64,
    pub samples_per_frame: u64,
    pub seed: Option<u64>,
    pub table: FrequencyTable,
    pub run_start: Instant,
    /// Recorded draws added by each frame, newest last (sparkline).
    pub per_frame_series: Vec<u64>,

    pub last_result: Option<RunResult>,
    pub history: Vec<RunResult>,
    pub history_selected: usize, // Index of selected history item (0 = most recent)
    pub history_scroll_offset: usize,
    pub history_loaded_count: usize,
    pub initial_history_load_size: usize, // Initial load size based on terminal height
    pub auto_save: bool,
    pub last_exported_path: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        let distribution = DistributionSpec::DEFAULT_BINOMIAL;
        Self {
            tab: 0,
            paused: false,
            run_state: RunState::Sampling,
            info: String::new(),
            comments: None,
            run_id: None,
            distribution,
            frame: 0,
            frames: 0,
            samples_per_frame: 0,
            seed: None,
            table: FrequencyTable::new(0, distribution.bins()),
            run_start: Instant::now(),
            per_frame_series: Vec::new(),
            last_result: None,
            history: Vec::new(),
            history_selected: 0,
            history_scroll_offset: 0,
            history_loaded_count: 0,
            initial_history_load_size: 66, // Default initial load size
            auto_save: false,
            last_exported_path: None,
        }
    }
}

impl UiState {
    pub fn push_series(series: &mut Vec<u64>, v: u64) {
        const MAX: usize = 120;
        series.push(v);
        if series.len() > MAX {
            let _ = series.drain(0..(series.len() - MAX));
        }
    }

    /// Forget the previous run and size the table for `distribution`.
    pub fn reset_for_run(&mut self, distribution: DistributionSpec) {
        self.distribution = distribution;
        self.table = FrequencyTable::new(0, distribution.bins());
        self.frame = 0;
        self.per_frame_series.clear();
        self.run_start = Instant::now();
        self.last_result = None;
        self.paused = false;
        self.run_state = RunState::Sampling;
    }

    /// Clamp selection and scroll after the history list changed size.
    pub fn clamp_history_selection(&mut self) {
        if self.history.is_empty() {
            self.history_selected = 0;
            self.history_scroll_offset = 0;
            return;
        }
        if self.history_selected >= self.history.len() {
            self.history_selected = self.history.len() - 1;
        }
        if self.history_scroll_offset >= self.history.len() {
            self.history_scroll_offset = self.history.len().saturating_sub(20);
        }
    }
}

/// Fold one engine event into the UI state. `RunCompleted` is handled by the caller
/// because it also triggers saving and exports.
pub fn apply_event(state: &mut UiState, ev: SampleEvent) {
    match ev {
        SampleEvent::RunStarted {
            run_id,
            distribution,
            frames,
            samples_per_frame,
            seed,
        } => {
            state.reset_for_run(distribution);
            state.run_id = Some(run_id);
            state.frames = frames;
            state.samples_per_frame = samples_per_frame;
            state.seed = Some(seed);
        }
        SampleEvent::FrameDrawn {
            frame,
            frames,
            counts,
            discarded,
            draws: _,
        } => {
            // Snapshots from a run replaced by a restart can still be in flight.
            if counts.len() != state.table.len() {
                return;
            }
            let before = state.table.total();
            state.table.counts = counts;
            state.table.discarded = discarded;
            state.frame = frame;
            state.frames = frames;
            let added = state.table.total().saturating_sub(before);
            UiState::push_series(&mut state.per_frame_series, added);
        }
        SampleEvent::Paused(p) => {
            state.paused = p;
            state.run_state = if p {
                RunState::Paused
            } else {
                RunState::Sampling
            };
        }
        SampleEvent::Info(info) => state.info = info.to_message(),
        SampleEvent::RunCompleted { result } => {
            state.run_state = if result.cancelled {
                RunState::Cancelled
            } else {
                RunState::Completed
            };
            state.table = result.table.clone();
            state.frame = result.frames_completed;
            state.last_result = Some(*result);
        }
    }
}
