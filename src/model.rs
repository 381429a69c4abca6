use crate::distribution::DistributionSpec;
use crate::frequency::FrequencyTable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub run_id: String,
    #[serde(default)]
    pub comments: Option<String>,
    pub distribution: DistributionSpec,
    pub frames: u64,
    pub samples_per_frame: u64,
    #[serde(with = "humantime_serde")]
    pub frame_interval: Duration,
    /// Fixed seed; `None` draws a fresh one per run.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Sampling,
    Paused,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SampleEvent {
    RunStarted {
        run_id: String,
        distribution: DistributionSpec,
        frames: u64,
        samples_per_frame: u64,
        seed: u64,
    },
    FrameDrawn {
        frame: u64,
        frames: u64,
        counts: Vec<u64>,
        discarded: u64,
        /// Every draw so far, recorded or discarded.
        draws: u64,
    },
    Paused(bool),
    Info(InfoEvent),
    RunCompleted {
        // Boxed so the hot FrameDrawn variant does not pay for the large result.
        result: Box<RunResult>,
    },
}

/// Structured info events emitted by the engine and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfoEvent {
    Message(String),
    Seeded { seed: u64 },
    Cancelled { frames_completed: u64 },
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Seeded { seed } => format!("Sampling with seed {seed}"),
            InfoEvent::Cancelled { frames_completed } => {
                format!("Run cancelled after {frames_completed} frame(s)")
            }
        }
    }
}

/// Observed statistics of the recorded draws next to the distribution's moments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencySummary {
    pub mean: Option<f64>,
    pub variance: Option<f64>,
    pub median: Option<f64>,
    pub p25: Option<f64>,
    pub p75: Option<f64>,
    pub expected_mean: f64,
    pub expected_variance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub timestamp_utc: String,
    pub run_id: String,
    #[serde(default)]
    pub comments: Option<String>,
    pub distribution: DistributionSpec,
    pub seed: u64,
    pub frames_requested: u64,
    pub frames_completed: u64,
    pub samples_per_frame: u64,
    pub table: FrequencyTable,
    pub summary: FrequencySummary,
    #[serde(default)]
    pub cancelled: bool,
}

impl RunResult {
    /// Total draws generated, including those outside the table.
    pub fn draws(&self) -> u64 {
        self.table.draws()
    }
}
