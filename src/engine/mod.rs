mod frame;

use crate::frequency::FrequencyTable;
use crate::model::{InfoEvent, RunConfig, RunResult, SampleEvent};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum EngineControl {
    /// Pause (true) or resume (false) between frames
    Pause(bool),
    /// Stop at the next chunk boundary, dropping the unfinished frame
    Cancel,
}

/// Draws between control checks inside a frame.
const DRAW_CHUNK: u64 = 10_000;

/// What the frame loop should do after applying pending control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct ControlState {
    paused: bool,
    cancelled: bool,
}

impl ControlState {
    fn apply(&mut self, msg: EngineControl, event_tx: &mpsc::UnboundedSender<SampleEvent>) {
        match msg {
            EngineControl::Pause(p) => {
                if self.paused != p {
                    self.paused = p;
                    let _ = event_tx.send(SampleEvent::Paused(p));
                }
            }
            EngineControl::Cancel => self.cancelled = true,
        }
    }
}

fn drain_control(
    control_rx: &mut mpsc::UnboundedReceiver<EngineControl>,
    state: &mut ControlState,
    event_tx: &mpsc::UnboundedSender<SampleEvent>,
) {
    while let Ok(msg) = control_rx.try_recv() {
        state.apply(msg, event_tx);
    }
}

/// Apply queued control messages, then park while paused.
/// A closed control channel never pauses or cancels the run.
async fn wait_if_paused_or_cancelled(
    control_rx: &mut mpsc::UnboundedReceiver<EngineControl>,
    state: &mut ControlState,
    event_tx: &mpsc::UnboundedSender<SampleEvent>,
) -> Flow {
    drain_control(control_rx, state, event_tx);
    while state.paused && !state.cancelled {
        match control_rx.recv().await {
            Some(msg) => state.apply(msg, event_tx),
            None => state.paused = false,
        }
    }
    if state.cancelled {
        Flow::Stop
    } else {
        Flow::Continue
    }
}

pub struct SamplingEngine {
    cfg: RunConfig,
}

impl SamplingEngine {
    pub fn new(cfg: RunConfig) -> Self {
        Self { cfg }
    }

    pub async fn run(
        self,
        event_tx: mpsc::UnboundedSender<SampleEvent>,
        mut control_rx: mpsc::UnboundedReceiver<EngineControl>,
    ) -> Result<RunResult> {
        let distribution = self.cfg.distribution;
        let sampler = distribution
            .sampler()
            .context("invalid distribution parameters")?;

        let seed = self.cfg.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(seed);
        let mut table = FrequencyTable::new(0, distribution.bins());

        tracing::debug!(
            run_id = %self.cfg.run_id,
            distribution = distribution.name(),
            frames = self.cfg.frames,
            samples_per_frame = self.cfg.samples_per_frame,
            seed,
            "starting run"
        );

        let _ = event_tx.send(SampleEvent::RunStarted {
            run_id: self.cfg.run_id.clone(),
            distribution,
            frames: self.cfg.frames,
            samples_per_frame: self.cfg.samples_per_frame,
            seed,
        });
        let _ = event_tx.send(SampleEvent::Info(InfoEvent::Seeded { seed }));

        let mut control = ControlState {
            paused: false,
            cancelled: false,
        };
        let mut frames_completed = 0u64;

        for frame in 1..=self.cfg.frames {
            if wait_if_paused_or_cancelled(&mut control_rx, &mut control, &event_tx).await
                == Flow::Stop
            {
                break;
            }

            // Draw into a scratch table in chunks so a cancel lands mid-frame.
            let mut pending = FrequencyTable::new(table.origin, table.len());
            let mut remaining = self.cfg.samples_per_frame;
            let mut drawn = frame::FrameDraw::default();
            while remaining > 0 {
                let n = remaining.min(DRAW_CHUNK);
                let chunk = frame::draw_frame(&sampler, &mut rng, &mut pending, n);
                drawn.recorded += chunk.recorded;
                drawn.discarded += chunk.discarded;
                remaining -= n;
                if remaining > 0 {
                    tokio::task::yield_now().await;
                    drain_control(&mut control_rx, &mut control, &event_tx);
                    if control.cancelled {
                        break;
                    }
                }
            }
            if control.cancelled {
                tracing::debug!(frame, "frame interrupted by cancel");
                break;
            }

            table.merge(&pending);
            frames_completed = frame;
            if drawn.discarded > 0 {
                tracing::trace!(
                    frame,
                    recorded = drawn.recorded,
                    discarded = drawn.discarded,
                    "draws outside table"
                );
            }

            let _ = event_tx.send(SampleEvent::FrameDrawn {
                frame,
                frames: self.cfg.frames,
                counts: table.counts.clone(),
                discarded: table.discarded,
                draws: table.draws(),
            });

            if frame < self.cfg.frames && !self.cfg.frame_interval.is_zero() {
                tokio::time::sleep(self.cfg.frame_interval).await;
            }
        }

        let cancelled = frames_completed < self.cfg.frames;
        if cancelled {
            let _ = event_tx.send(SampleEvent::Info(InfoEvent::Cancelled { frames_completed }));
        }
        tracing::debug!(
            run_id = %self.cfg.run_id,
            frames_completed,
            recorded = table.total(),
            discarded = table.discarded,
            "run finished"
        );

        let summary = crate::metrics::summarize(&table, &distribution);
        Ok(RunResult {
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            run_id: self.cfg.run_id.clone(),
            comments: self.cfg.comments.clone(),
            distribution,
            seed,
            frames_requested: self.cfg.frames,
            frames_completed,
            samples_per_frame: self.cfg.samples_per_frame,
            table,
            summary,
            cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::DistributionSpec;
    use std::time::Duration;

    fn config(distribution: DistributionSpec, frames: u64, per_frame: u64) -> RunConfig {
        RunConfig {
            run_id: "test".into(),
            comments: None,
            distribution,
            frames,
            samples_per_frame: per_frame,
            frame_interval: Duration::ZERO,
            seed: Some(1234),
        }
    }

    async fn run_to_end(cfg: RunConfig) -> (RunResult, Vec<SampleEvent>) {
        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
        let (_ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        let result = SamplingEngine::new(cfg).run(evt_tx, ctrl_rx).await.unwrap();
        let mut events = Vec::new();
        while let Ok(ev) = evt_rx.try_recv() {
            events.push(ev);
        }
        (result, events)
    }

    #[tokio::test]
    async fn counts_sum_to_draws() {
        let (result, events) = run_to_end(config(DistributionSpec::DEFAULT_POISSON, 5, 200)).await;
        assert_eq!(result.frames_completed, 5);
        assert!(!result.cancelled);
        assert_eq!(result.draws(), 1_000);
        assert_eq!(result.table.total() + result.table.discarded, 1_000);

        let frames: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                SampleEvent::FrameDrawn { frame, .. } => Some(*frame),
                _ => None,
            })
            .collect();
        assert_eq!(frames, vec![1, 2, 3, 4, 5]);
        assert!(matches!(events[0], SampleEvent::RunStarted { seed: 1234, .. }));
    }

    #[tokio::test]
    async fn frame_counts_only_grow() {
        let (_, events) = run_to_end(config(DistributionSpec::DEFAULT_NORMAL, 4, 50)).await;
        let snapshots: Vec<&Vec<u64>> = events
            .iter()
            .filter_map(|e| match e {
                SampleEvent::FrameDrawn { counts, .. } => Some(counts),
                _ => None,
            })
            .collect();
        for pair in snapshots.windows(2) {
            assert!(pair[0].iter().zip(pair[1]).all(|(a, b)| a <= b));
        }
    }

    #[tokio::test]
    async fn binomial_never_discards() {
        let (result, _) = run_to_end(config(DistributionSpec::DEFAULT_BINOMIAL, 10, 500)).await;
        assert_eq!(result.table.discarded, 0);
        assert_eq!(result.table.len(), 26);
        let mean = result.summary.mean.unwrap();
        assert!((mean - 5.0).abs() < 0.2, "mean {mean}");
    }

    #[tokio::test]
    async fn same_seed_reproduces_table() {
        let (a, _) = run_to_end(config(DistributionSpec::DEFAULT_NORMAL, 3, 300)).await;
        let (b, _) = run_to_end(config(DistributionSpec::DEFAULT_NORMAL, 3, 300)).await;
        assert_eq!(a.table, b.table);
    }

    #[tokio::test]
    async fn cancel_before_first_frame() {
        let (evt_tx, _evt_rx) = mpsc::unbounded_channel();
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        ctrl_tx.send(EngineControl::Cancel).unwrap();
        let result = SamplingEngine::new(config(DistributionSpec::DEFAULT_POISSON, 10, 10))
            .run(evt_tx, ctrl_rx)
            .await
            .unwrap();
        assert!(result.cancelled);
        assert_eq!(result.frames_completed, 0);
        assert_eq!(result.draws(), 0);
    }

    #[tokio::test]
    async fn frame_events_carry_running_draws() {
        let (_, events) = run_to_end(config(DistributionSpec::DEFAULT_POISSON, 3, 25_000)).await;
        let draws: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                SampleEvent::FrameDrawn {
                    counts,
                    discarded,
                    draws,
                    ..
                } => {
                    assert_eq!(counts.iter().sum::<u64>() + discarded, *draws);
                    Some(*draws)
                }
                _ => None,
            })
            .collect();
        assert_eq!(draws, vec![25_000, 50_000, 75_000]);
    }

    #[tokio::test]
    async fn cancel_interrupts_a_long_frame() {
        let (evt_tx, _evt_rx) = mpsc::unbounded_channel();
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        // Far more draws than could finish before the cancel arrives.
        let cfg = config(DistributionSpec::DEFAULT_NORMAL, 3, 50_000_000);
        let started = std::time::Instant::now();
        let handle = tokio::spawn(SamplingEngine::new(cfg).run(evt_tx, ctrl_rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        ctrl_tx.send(EngineControl::Cancel).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("engine did not stop after cancel")
            .unwrap()
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(result.cancelled);
        assert_eq!(result.frames_completed, 0);
        // The unfinished frame is dropped, not half-counted.
        assert_eq!(result.draws(), 0);
    }

    #[tokio::test]
    async fn pause_then_cancel_stops_run() {
        let (evt_tx, _evt_rx) = mpsc::unbounded_channel();
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        ctrl_tx.send(EngineControl::Pause(true)).unwrap();
        ctrl_tx.send(EngineControl::Cancel).unwrap();
        let result = SamplingEngine::new(config(DistributionSpec::DEFAULT_POISSON, 3, 10))
            .run(evt_tx, ctrl_rx)
            .await
            .unwrap();
        assert!(result.cancelled);
        assert_eq!(result.frames_completed, 0);
    }

    #[tokio::test]
    async fn invalid_parameters_fail() {
        let bad = DistributionSpec::Normal {
            mean: 0.0,
            std_dev: -1.0,
            bins: 5,
        };
        let (evt_tx, _evt_rx) = mpsc::unbounded_channel();
        let (_ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        assert!(SamplingEngine::new(config(bad, 1, 1))
            .run(evt_tx, ctrl_rx)
            .await
            .is_err());
    }
}
