//! Run history and export files.
//!
//! Completed runs are stored one JSON file per run under the user data
//! directory, named so that lexical order is chronological order.

use crate::model::RunResult;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "animated-distributions";

/// Directory holding saved runs.
pub fn runs_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .context("could not determine a data directory")?;
    Ok(base.join(APP_DIR).join("runs"))
}

fn file_name(result: &RunResult) -> String {
    format!(
        "run-{}-{}.json",
        result.timestamp_utc.replace(':', "-"),
        result.run_id
    )
}

pub fn save_run(result: &RunResult) -> Result<PathBuf> {
    save_run_in(&runs_dir()?, result)
}

pub fn load_recent(limit: usize) -> Result<Vec<RunResult>> {
    load_recent_in(&runs_dir()?, limit)
}

pub fn delete_run(result: &RunResult) -> Result<()> {
    delete_run_in(&runs_dir()?, result)
}

pub(crate) fn save_run_in(dir: &Path, result: &RunResult) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(file_name(result));
    export_json(&path, result)?;
    tracing::debug!(path = %path.display(), "saved run");
    Ok(path)
}

/// Load up to `limit` runs, newest first. Unreadable files are skipped.
pub(crate) fn load_recent_in(dir: &Path, limit: usize) -> Result<Vec<RunResult>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();
    paths.reverse();

    let mut out = Vec::new();
    for p in paths {
        if out.len() >= limit {
            break;
        }
        match fs::read(&p)
            .map_err(anyhow::Error::from)
            .and_then(|b| serde_json::from_slice::<RunResult>(&b).map_err(Into::into))
        {
            Ok(r) => out.push(r),
            Err(e) => tracing::warn!(path = %p.display(), error = %e, "skipping unreadable run"),
        }
    }
    Ok(out)
}

pub(crate) fn delete_run_in(dir: &Path, result: &RunResult) -> Result<()> {
    let path = dir.join(file_name(result));
    fs::remove_file(&path).with_context(|| format!("delete {}", path.display()))
}

pub fn export_json(path: &Path, result: &RunResult) -> Result<()> {
    let data = serde_json::to_vec_pretty(result)?;
    fs::write(path, data).with_context(|| format!("write {}", path.display()))
}

/// One row per outcome: value, count and share of recorded draws.
pub fn export_csv(path: &Path, result: &RunResult) -> Result<()> {
    let mut out = String::from("value,count,percent\n");
    let table = &result.table;
    for (i, value) in table.values().enumerate() {
        out.push_str(&format!("{},{},{:.6}\n", value, table.counts[i], table.percent(i)));
    }
    fs::write(path, out).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::DistributionSpec;
    use crate::frequency::FrequencyTable;
    use crate::model::FrequencySummary;

    fn result(ts: &str, id: &str) -> RunResult {
        let mut table = FrequencyTable::new(0, 3);
        table.record(1);
        table.record(2);
        table.record(2);
        table.record(2);
        RunResult {
            timestamp_utc: ts.into(),
            run_id: id.into(),
            comments: None,
            distribution: DistributionSpec::DEFAULT_POISSON,
            seed: 1,
            frames_requested: 1,
            frames_completed: 1,
            samples_per_frame: 4,
            table,
            summary: FrequencySummary::default(),
            cancelled: false,
        }
    }

    #[test]
    fn save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let runs = dir.path().join("runs");
        let older = result("2026-01-01T10:00:00Z", "aaaa");
        let newer = result("2026-01-02T10:00:00Z", "bbbb");
        save_run_in(&runs, &older).unwrap();
        let p = save_run_in(&runs, &newer).unwrap();
        assert!(p.exists());

        let loaded = load_recent_in(&runs, 10).unwrap();
        let ids: Vec<&str> = loaded.iter().map(|r| r.run_id.as_str()).collect();
        assert_eq!(ids, vec!["bbbb", "aaaa"]);
        assert_eq!(loaded[0].table, newer.table);

        assert_eq!(load_recent_in(&runs, 1).unwrap().len(), 1);

        delete_run_in(&runs, &newer).unwrap();
        assert_eq!(load_recent_in(&runs, 10).unwrap().len(), 1);
    }

    #[test]
    fn missing_dir_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_recent_in(&dir.path().join("nope"), 5)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("run-zzz.json"), b"{not json").unwrap();
        save_run_in(dir.path(), &result("2026-01-01T00:00:00Z", "ok")).unwrap();
        let loaded = load_recent_in(dir.path(), 10).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn csv_has_row_per_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        export_csv(&path, &result("t", "x")).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "value,count,percent");
        assert_eq!(lines[1], "0,0,0.000000");
        assert_eq!(lines[3], "2,3,75.000000");
        assert_eq!(lines.len(), 4);
    }
}
