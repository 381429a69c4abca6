use crate::distribution::DistributionSpec;
use crate::frequency::FrequencyTable;
use crate::model::FrequencySummary;

/// Value at sorted position `rank` (0-based) of the draws held in `table`.
fn value_at_rank(table: &FrequencyTable, rank: u64) -> Option<f64> {
    let mut seen = 0u64;
    for (value, &count) in table.values().zip(table.counts.iter()) {
        seen += count;
        if rank < seen {
            return Some(value as f64);
        }
    }
    None
}

/// Compute (mean, median, 25th percentile, 75th percentile) of the recorded draws,
/// read directly off the table so large runs never materialize their samples.
pub fn compute_table_metrics(table: &FrequencyTable) -> Option<(f64, f64, f64, f64)> {
    let n = table.total();
    if n < 2 {
        return None;
    }
    let sum: f64 = table
        .values()
        .zip(table.counts.iter())
        .map(|(v, &c)| v as f64 * c as f64)
        .sum();
    let mean = sum / n as f64;
    let median = value_at_rank(table, n / 2)?;
    let p25 = value_at_rank(table, n / 4)?;
    let p75 = value_at_rank(table, 3 * n / 4)?;
    Some((mean, median, p25, p75))
}

/// Sample variance (n - 1 denominator) of the recorded draws.
pub fn compute_table_variance(table: &FrequencyTable) -> Option<f64> {
    let n = table.total();
    if n < 2 {
        return None;
    }
    let (mean, _, _, _) = compute_table_metrics(table)?;
    let ss: f64 = table
        .values()
        .zip(table.counts.iter())
        .map(|(v, &c)| {
            let d = v as f64 - mean;
            d * d * c as f64
        })
        .sum();
    Some(ss / (n - 1) as f64)
}

pub fn summarize(table: &FrequencyTable, distribution: &DistributionSpec) -> FrequencySummary {
    let metrics = compute_table_metrics(table);
    FrequencySummary {
        mean: metrics.map(|m| m.0),
        variance: compute_table_variance(table),
        median: metrics.map(|m| m.1),
        p25: metrics.map(|m| m.2),
        p75: metrics.map(|m| m.3),
        expected_mean: distribution.expected_mean(),
        expected_variance: distribution.expected_variance(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_from(samples: &[i64], len: usize) -> FrequencyTable {
        let mut t = FrequencyTable::new(0, len);
        for &s in samples {
            t.record(s);
        }
        t
    }

    #[test]
    fn too_few_samples() {
        assert_eq!(compute_table_metrics(&table_from(&[1], 3)), None);
        assert_eq!(compute_table_variance(&table_from(&[], 3)), None);
    }

    #[test]
    fn percentiles_use_sorted_positions() {
        // Sorted: 0 1 1 2 2 2 3 4 4 5 -> p25 = [2], median = [5], p75 = [7].
        let table = table_from(&[4, 2, 0, 1, 5, 2, 3, 1, 4, 2], 6);
        assert_eq!(compute_table_metrics(&table), Some((2.8, 2.0, 1.0, 4.0)));
    }

    #[test]
    fn variance_of_known_table() {
        // 2, 4, 4, 4, 5, 5, 7, 9 has mean 5 and sample variance 32/7.
        let table = table_from(&[2, 4, 4, 4, 5, 5, 7, 9], 10);
        let var = compute_table_variance(&table).unwrap();
        assert!((var - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn discarded_draws_do_not_count() {
        let table = table_from(&[1, 1, 3, 3, 99], 4);
        let (mean, _, _, _) = compute_table_metrics(&table).unwrap();
        assert!((mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn summary_carries_expected_moments() {
        let spec = DistributionSpec::DEFAULT_POISSON;
        let s = summarize(&FrequencyTable::new(0, spec.bins()), &spec);
        assert_eq!(s.mean, None);
        assert_eq!(s.expected_mean, 5.0);
        assert_eq!(s.expected_variance, 5.0);
    }
}
