//! Run lifecycle controller.
//!
//! Owns start/pause/restart orchestration and emits events for presentation layers.

use crate::cli::{build_config, Cli};
use crate::engine::{EngineControl, SamplingEngine};
use crate::model::{InfoEvent, RunConfig, RunResult, SampleEvent};
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;

/// Commands emitted by UI layers to control the running sampler.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Pause(bool),
    Restart,
    Quit,
}

/// Internal handle for a running sampling task.
struct RunCtx {
    ctrl_tx: UnboundedSender<EngineControl>,
    handle: Option<tokio::task::JoinHandle<Result<RunResult>>>,
}

/// Spawn a new run and return its control handle.
fn start_run(args: &Cli, event_tx: UnboundedSender<SampleEvent>) -> RunCtx {
    let cfg: RunConfig = build_config(args);
    let (ctrl_tx, ctrl_rx) = tokio::sync::mpsc::unbounded_channel::<EngineControl>();
    let engine = SamplingEngine::new(cfg);
    let handle = tokio::spawn(async move { engine.run(event_tx, ctrl_rx).await });
    RunCtx {
        ctrl_tx,
        handle: Some(handle),
    }
}

/// Ask the active run to stop and arm the stall watchdog.
fn cancel_run(
    ctx: &RunCtx,
    event_tx: &UnboundedSender<SampleEvent>,
    cancel_deadline: &mut Option<tokio::time::Instant>,
) {
    let _ = ctx.ctrl_tx.send(EngineControl::Cancel);
    let _ = event_tx.send(SampleEvent::Info(InfoEvent::Message("Cancelling…".into())));
    *cancel_deadline = Some(tokio::time::Instant::now() + Duration::from_secs(3));
}

/// Orchestrate runs based on UI commands and emit events back to presentation layers.
pub(crate) async fn run_controller(
    args: &Cli,
    event_tx: UnboundedSender<SampleEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut run_ctx = if args.run_on_launch {
        Some(start_run(args, event_tx.clone()))
    } else {
        None
    };
    let mut restart_pending = false;
    let mut quit_pending = false;
    let mut cancel_deadline: Option<tokio::time::Instant> = None;
    let mut watchdog = tokio::time::interval(Duration::from_millis(500));

    let res = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Pause(p)) => {
                        if let Some(ctx) = &run_ctx {
                            let _ = ctx.ctrl_tx.send(EngineControl::Pause(p));
                        }
                    }
                    Some(UiCommand::Restart) => {
                        // Restart is serialized: cancel the active run first and start the
                        // next one once completion is observed, so runs never overlap.
                        if let Some(ctx) = &run_ctx {
                            restart_pending = true;
                            cancel_run(ctx, &event_tx, &mut cancel_deadline);
                        } else {
                            run_ctx = Some(start_run(args, event_tx.clone()));
                            let _ = event_tx.send(SampleEvent::Info(InfoEvent::Message(
                                "Restarting…".into(),
                            )));
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        quit_pending = true;
                        if let Some(ctx) = &run_ctx {
                            cancel_run(ctx, &event_tx, &mut cancel_deadline);
                        } else {
                            break Ok(());
                        }
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and completion is never observed.
            maybe_done = async {
                if let Some(ctx) = &mut run_ctx {
                    if let Some(h) = ctx.handle.as_mut() {
                        return Some(h.await);
                    }
                }
                futures::future::pending().await
            } => {
                if let Some(join_res) = maybe_done {
                    if let Some(ctx) = &mut run_ctx {
                        ctx.handle.take();
                    }
                    match join_res {
                        Ok(Ok(r)) if restart_pending => {
                            tracing::debug!(run_id = %r.run_id, "discarding result of restarted run");
                        }
                        Ok(Ok(r)) => {
                            let _ = event_tx.send(SampleEvent::RunCompleted { result: Box::new(r) });
                        }
                        Ok(Err(e)) => {
                            let _ = event_tx.send(SampleEvent::Info(InfoEvent::Message(format!(
                                "Run failed: {e:#}"
                            ))));
                        }
                        Err(e) => {
                            let _ = event_tx.send(SampleEvent::Info(InfoEvent::Message(format!(
                                "Run join failed: {e}"
                            ))));
                        }
                    }
                    run_ctx = None;
                    cancel_deadline = None;
                    if quit_pending {
                        break Ok(());
                    }
                    if restart_pending {
                        run_ctx = Some(start_run(args, event_tx.clone()));
                        restart_pending = false;
                    }
                }
            }
            _ = watchdog.tick() => {
                if let Some(deadline) = cancel_deadline {
                    if tokio::time::Instant::now() >= deadline && run_ctx.is_some() {
                        let _ = event_tx.send(SampleEvent::Info(InfoEvent::Message(
                            "Still cancelling…".into(),
                        )));
                        cancel_deadline = None;
                    }
                }
            }
        }
    };

    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tokio::sync::mpsc;

    fn args(extra: &[&str]) -> Cli {
        let mut argv = vec!["animated-distributions", "poisson", "3", "10", "--interval", "0s"];
        argv.extend_from_slice(extra);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn completes_run_on_launch() {
        let args = args(&["--seed", "5"]);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let ctl = tokio::spawn(async move { run_controller(&args, event_tx, cmd_rx).await });

        let mut completed = None;
        while let Some(ev) = event_rx.recv().await {
            if let SampleEvent::RunCompleted { result } = ev {
                completed = Some(result);
                break;
            }
        }
        let result = completed.expect("run should complete");
        assert_eq!(result.frames_completed, 3);
        assert_eq!(result.draws(), 30);

        cmd_tx.send(UiCommand::Quit).unwrap();
        ctl.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn quits_immediately_without_run() {
        let args = args(&["--run-on-launch", "false"]);
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        cmd_tx.send(UiCommand::Quit).unwrap();
        run_controller(&args, event_tx, cmd_rx).await.unwrap();
    }
}
