use crate::distribution::DistributionSpec;
use crate::engine::{EngineControl, SamplingEngine};
use crate::model::{RunConfig, RunResult, SampleEvent};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::RngCore;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DistributionKind {
    Binomial,
    Normal,
    Poisson,
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "animated-distributions",
    version,
    about = "Animate live frequency bar charts of random binomial, normal or poisson samples"
)]
pub struct Cli {
    /// Distribution to sample from
    #[arg(value_enum)]
    pub distribution: DistributionKind,

    /// Number of animation frames
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub frames: u64,

    /// Random draws generated per frame
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub samples_per_frame: u64,

    /// Binomial: number of trials
    #[arg(long, default_value_t = 25)]
    pub trials: u64,

    /// Binomial: probability of success per trial
    #[arg(long, default_value_t = 0.2)]
    pub probability: f64,

    /// Normal: mean
    #[arg(long, default_value_t = 12.5)]
    pub mean: f64,

    /// Normal: standard deviation
    #[arg(long, default_value_t = 3.125)]
    pub std_dev: f64,

    /// Poisson: rate (lambda)
    #[arg(long, default_value_t = 5.0)]
    pub lambda: f64,

    /// Number of outcome bins (normal and poisson; binomial always covers 0..=trials)
    #[arg(long)]
    pub bins: Option<usize>,

    /// Delay between frames
    #[arg(long, default_value = "25ms")]
    pub interval: humantime::Duration,

    /// Seed for the random number generator (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run silently: suppress all output except errors
    #[arg(long)]
    pub silent: bool,

    /// Export results as JSON
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Export results as CSV
    #[arg(long)]
    pub export_csv: Option<std::path::PathBuf>,

    /// Save each completed run to the history directory
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub auto_save: bool,

    /// Automatically start sampling when the app launches
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub run_on_launch: bool,

    /// Attach custom comments to this run
    #[arg(long)]
    pub comments: Option<String>,
}

impl Cli {
    /// Distribution parameters selected by the command line.
    pub fn distribution_spec(&self) -> DistributionSpec {
        match self.distribution {
            DistributionKind::Binomial => DistributionSpec::Binomial {
                trials: self.trials,
                probability: self.probability,
            },
            DistributionKind::Normal => DistributionSpec::Normal {
                mean: self.mean,
                std_dev: self.std_dev,
                bins: self
                    .bins
                    .unwrap_or(DistributionSpec::DEFAULT_NORMAL.bins()),
            },
            DistributionKind::Poisson => DistributionSpec::Poisson {
                lambda: self.lambda,
                bins: self
                    .bins
                    .unwrap_or(DistributionSpec::DEFAULT_POISSON.bins()),
            },
        }
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }
    args.distribution_spec()
        .validate()
        .context("invalid distribution parameters")?;

    if args.silent {
        return run_sampling_engine(args, true).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    if args.json {
        return run_sampling_engine(args, false).await;
    }

    run_text(args).await
}

/// Generate a random identifier for a run.
fn gen_run_id() -> String {
    let mut b = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut b);
    format!("{:016x}", u64::from_le_bytes(b))
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        run_id: gen_run_id(),
        comments: args.comments.clone(),
        distribution: args.distribution_spec(),
        frames: args.frames,
        samples_per_frame: args.samples_per_frame,
        frame_interval: Duration::from(args.interval),
        seed: args.seed,
    }
}

/// Run the engine to completion and print JSON unless `silent`.
async fn run_sampling_engine(args: Cli, silent: bool) -> Result<()> {
    let cfg = build_config(&args);
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<SampleEvent>();
    let (_ctrl_tx, ctrl_rx) = mpsc::unbounded_channel::<EngineControl>();

    let engine = SamplingEngine::new(cfg);
    let handle = tokio::spawn(async move { engine.run(evt_tx, ctrl_rx).await });

    // Keep the channel drained; every frame snapshot would otherwise pile up.
    while let Some(_ev) = evt_rx.recv().await {}

    let result = handle
        .await
        .context("sampling task failed")?
        .context("sampling run failed")?;

    handle_exports(&args, &result)?;

    if args.auto_save {
        let path = crate::storage::save_run(&result).context("failed to save run results")?;
        tracing::info!(path = %path.display(), "saved run");
    }

    if !silent {
        let (out_tx, out_handle) = spawn_output_writer();
        let out = serde_json::to_string_pretty(&result)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
        drop(out_tx);
        let _ = out_handle.await;
    }

    Ok(())
}

/// How often text mode reports progress: about twenty lines per run.
fn progress_every(frames: u64) -> u64 {
    (frames / 20).max(1)
}

async fn run_text(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<SampleEvent>();
    let (_ctrl_tx, ctrl_rx) = mpsc::unbounded_channel::<EngineControl>();

    let engine = SamplingEngine::new(cfg);
    let handle = tokio::spawn(async move { engine.run(evt_tx, ctrl_rx).await });

    while let Some(ev) = evt_rx.recv().await {
        match ev {
            SampleEvent::RunStarted { distribution, .. } => {
                let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", distribution.label())));
            }
            SampleEvent::FrameDrawn {
                frame,
                frames,
                counts,
                discarded,
                draws,
            } => {
                if frame % progress_every(frames) == 0 || frame == frames {
                    let recorded: u64 = counts.iter().sum();
                    let _ = out_tx.send(OutputLine::Stderr(format!(
                        "Frame {frame}/{frames}: {} draws, {} recorded, {} discarded",
                        crate::format::group_thousands(draws),
                        crate::format::group_thousands(recorded),
                        crate::format::group_thousands(discarded)
                    )));
                }
            }
            SampleEvent::Info(info) => {
                let _ = out_tx.send(OutputLine::Stderr(info.to_message()));
            }
            SampleEvent::Paused(_) | SampleEvent::RunCompleted { .. } => {}
        }
    }

    let result = handle.await??;

    handle_exports(&args, &result)?;
    let summary = crate::text_summary::build_text_summary(&result);
    for line in summary.lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }
    if args.auto_save {
        if let Ok(p) = crate::storage::save_run(&result) {
            let _ = out_tx.send(OutputLine::Stderr(format!("Saved: {}", p.display())));
        }
    }
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Handle export operations (JSON and CSV) for both text and JSON modes.
fn handle_exports(args: &Cli, result: &RunResult) -> Result<()> {
    if let Some(p) = args.export_json.as_deref() {
        crate::storage::export_json(p, result)?;
    }
    if let Some(p) = args.export_csv.as_deref() {
        crate::storage::export_csv(p, result)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_frames_and_samples() {
        let cli = Cli::try_parse_from(["animated-distributions", "poisson", "100", "1000"]).unwrap();
        assert_eq!(cli.distribution, DistributionKind::Poisson);
        assert_eq!(cli.frames, 100);
        assert_eq!(cli.samples_per_frame, 1000);
        assert_eq!(cli.distribution_spec(), DistributionSpec::DEFAULT_POISSON);
        assert!(!cli.auto_save);
        assert!(cli.run_on_launch);
    }

    #[test]
    fn rejects_non_integer_arguments() {
        assert!(Cli::try_parse_from(["animated-distributions", "normal", "ten", "5"]).is_err());
        assert!(Cli::try_parse_from(["animated-distributions", "normal", "10"]).is_err());
        assert!(Cli::try_parse_from(["animated-distributions", "normal", "0", "5"]).is_err());
        assert!(Cli::try_parse_from(["animated-distributions", "gamma", "1", "5"]).is_err());
    }

    #[test]
    fn parameter_flags_reach_the_spec() {
        let cli = Cli::try_parse_from([
            "animated-distributions",
            "binomial",
            "5",
            "10",
            "--trials",
            "10",
            "--probability",
            "0.5",
        ])
        .unwrap();
        assert_eq!(
            cli.distribution_spec(),
            DistributionSpec::Binomial {
                trials: 10,
                probability: 0.5
            }
        );

        let cli = Cli::try_parse_from([
            "animated-distributions",
            "normal",
            "5",
            "10",
            "--bins",
            "40",
            "--interval",
            "1s",
        ])
        .unwrap();
        assert_eq!(cli.distribution_spec().bins(), 40);
        let cfg = build_config(&cli);
        assert_eq!(cfg.frame_interval, Duration::from_secs(1));
        assert_eq!(cfg.run_id.len(), 16);
    }

    #[test]
    fn progress_cadence() {
        assert_eq!(progress_every(5), 1);
        assert_eq!(progress_every(200), 10);
    }
}
