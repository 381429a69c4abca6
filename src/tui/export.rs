use crate::model::RunResult;
use anyhow::{Context, Result};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Save result and update state.info with the saved path message.
pub fn save_and_show_path(r: &RunResult, state: &mut UiState) {
    match crate::storage::save_run(r) {
        Ok(path) => {
            state.info = format!("Saved: {}", path.display());
        }
        Err(e) => {
            state.info = format!("Save failed: {e:#}");
        }
    }
}

/// Default export file name in the current directory, e.g.
/// `poisson-2026-10-19_08-00-00Z-1f2e3d4c.json`.
fn export_path(r: &RunResult, ext: &str) -> Result<std::path::PathBuf> {
    let name = format!(
        "{}-{}-{}.{ext}",
        r.distribution.name().to_lowercase(),
        r.timestamp_utc.replace(':', "-").replace('T', "_"),
        &r.run_id[..8.min(r.run_id.len())]
    );
    let current_dir = std::env::current_dir().context("get current directory")?;
    Ok(current_dir.join(name))
}

/// Export JSON to the current directory. Returns the absolute path of the exported file.
pub fn export_result_json(r: &RunResult) -> Result<std::path::PathBuf> {
    let path = export_path(r, "json")?;
    crate::storage::export_json(&path, r)?;
    Ok(path)
}

/// Export CSV to the current directory. Returns the absolute path of the exported file.
pub fn export_result_csv(r: &RunResult) -> Result<std::path::PathBuf> {
    let path = export_path(r, "csv")?;
    crate::storage::export_csv(&path, r)?;
    Ok(path)
}

/// Start the clipboard thread on first use.
/// Each clipboard instance is kept alive for a while so clipboard managers can read it.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
