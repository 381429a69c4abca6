//! Text summary builder for CLI output.
//!
//! Formats the final frequency table and summary statistics for text mode.

use crate::format::{group_thousands, percent, text_bar};
use crate::model::RunResult;

const BAR_WIDTH: usize = 40;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn opt(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{x:.precision$}"))
        .unwrap_or_else(|| "-".into())
}

/// Build a text summary from a completed run.
pub(crate) fn build_text_summary(result: &RunResult) -> TextSummary {
    let mut lines = Vec::new();
    let table = &result.table;
    let dist = &result.distribution;

    lines.push(format!(
        "Frequencies for {} draws of {}",
        group_thousands(table.total()),
        dist.label()
    ));
    let state = if result.cancelled { " (cancelled)" } else { "" };
    lines.push(format!(
        "Frames: {}/{}{state}, {} per frame, seed {}",
        result.frames_completed,
        result.frames_requested,
        group_thousands(result.samples_per_frame),
        result.seed
    ));
    if let Some(comments) = result.comments.as_deref() {
        if !comments.trim().is_empty() {
            lines.push(format!("Comments: {}", comments));
        }
    }
    lines.push(String::new());

    let precision = dist.percent_precision();
    let count_width = group_thousands(table.max_count()).len().max(9);
    lines.push(format!(
        "{:>12}  {:>count_width$}  {:>9}",
        dist.value_axis_label(),
        "Frequency",
        "Percent"
    ));
    let max = table.max_count();
    for (i, value) in table.values().enumerate() {
        let count = table.counts[i];
        lines.push(format!(
            "{:>12}  {:>count_width$}  {:>9}  {}",
            value,
            group_thousands(count),
            percent(table.percent(i), precision),
            text_bar(count, max, BAR_WIDTH)
        ));
    }
    lines.push(String::new());

    if table.discarded > 0 {
        lines.push(format!(
            "Discarded (outside {}..={}): {}",
            table.origin,
            table.origin + table.len() as i64 - 1,
            group_thousands(table.discarded)
        ));
    }

    let s = &result.summary;
    lines.push(format!(
        "Mean: {} (expected {:.3})  Variance: {} (expected {:.3})",
        opt(s.mean, 3),
        s.expected_mean,
        opt(s.variance, 3),
        s.expected_variance
    ));
    lines.push(format!(
        "Median: {}  p25: {}  p75: {}",
        opt(s.median, 0),
        opt(s.p25, 0),
        opt(s.p75, 0)
    ));

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::DistributionSpec;
    use crate::frequency::FrequencyTable;

    fn sample_result() -> RunResult {
        let distribution = DistributionSpec::Poisson {
            lambda: 2.0,
            bins: 3,
        };
        let mut table = FrequencyTable::new(0, 3);
        for v in [0, 1, 1, 2, 2, 2, 7] {
            table.record(v);
        }
        let summary = crate::metrics::summarize(&table, &distribution);
        RunResult {
            timestamp_utc: "2026-01-01T00:00:00Z".into(),
            run_id: "abc".into(),
            comments: Some("lab 3".into()),
            distribution,
            seed: 9,
            frames_requested: 2,
            frames_completed: 2,
            samples_per_frame: 1_500,
            table,
            summary,
            cancelled: false,
        }
    }

    #[test]
    fn lists_every_outcome() {
        let s = build_text_summary(&sample_result());
        assert!(s.lines[0].starts_with("Frequencies for 6 draws of Poisson"));
        assert!(s.lines[1].contains("1,500 per frame"));
        assert!(s.lines.iter().any(|l| l == "Comments: lab 3"));
        let rows: Vec<&String> = s
            .lines
            .iter()
            .filter(|l| l.contains('%') && !l.contains("Percent"))
            .collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[2].contains("50.000%"));
    }

    #[test]
    fn reports_discards_and_moments() {
        let s = build_text_summary(&sample_result());
        assert!(s.lines.iter().any(|l| l == "Discarded (outside 0..=2): 1"));
        assert!(s
            .lines
            .iter()
            .any(|l| l.starts_with("Mean: 1.333 (expected 2.000)")));
    }
}
