//! Post-run processing utilities.
//!
//! Handles auto-save, exports, and history refresh after a run completes.

use crate::cli::Cli;
use crate::model::RunResult;
use crate::storage;

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub export_messages: Vec<String>,
    pub history: Vec<RunResult>,
    pub auto_saved_path: Option<std::path::PathBuf>,
}

/// Process a completed run: auto-save, export, and reload history.
pub(crate) fn process_run_completion(
    args: &Cli,
    history_load: usize,
    auto_save: bool,
    run: &RunResult,
) -> ProcessedRun {
    // Cancelled runs are partial; keep them out of history unless exported explicitly.
    let auto_saved_path = if auto_save && !run.cancelled {
        match storage::save_run(run) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "auto-save failed");
                None
            }
        }
    } else {
        None
    };

    let mut export_messages = Vec::new();
    if let Some(export_path) = args.export_json.as_deref() {
        match storage::export_json(export_path, run) {
            Ok(_) => export_messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export JSON failed: {e:#}")),
        }
    }
    if let Some(export_path) = args.export_csv.as_deref() {
        match storage::export_csv(export_path, run) {
            Ok(_) => export_messages.push(format!("Exported CSV: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export CSV failed: {e:#}")),
        }
    }

    let history = storage::load_recent(history_load).unwrap_or_default();

    ProcessedRun {
        export_messages,
        history,
        auto_saved_path,
    }
}
