use serde::{Deserialize, Serialize};

/// Fixed-size table of outcome counts.
///
/// Index `i` counts draws equal to `origin + i`. The length is fixed at
/// construction; draws outside the covered range are dropped and tallied in
/// `discarded` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTable {
    pub origin: i64,
    pub counts: Vec<u64>,
    #[serde(default)]
    pub discarded: u64,
}

impl FrequencyTable {
    pub fn new(origin: i64, len: usize) -> Self {
        Self {
            origin,
            counts: vec![0; len],
            discarded: 0,
        }
    }

    /// Count one draw. Returns false if it fell outside the table.
    pub fn record(&mut self, value: i64) -> bool {
        let idx = value
            .checked_sub(self.origin)
            .and_then(|i| usize::try_from(i).ok());
        match idx.and_then(|i| self.counts.get_mut(i)) {
            Some(slot) => {
                *slot += 1;
                true
            }
            None => {
                self.discarded += 1;
                false
            }
        }
    }

    /// Add the counts of `other`, a table over the same range.
    pub fn merge(&mut self, other: &FrequencyTable) {
        debug_assert_eq!((self.origin, self.len()), (other.origin, other.len()));
        for (slot, &n) in self.counts.iter_mut().zip(other.counts.iter()) {
            *slot += n;
        }
        self.discarded += other.discarded;
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of recorded (in-range) draws.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Recorded plus discarded draws.
    pub fn draws(&self) -> u64 {
        self.total() + self.discarded
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Outcome value for each index.
    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.counts.len()).map(move |i| self.origin + i as i64)
    }

    /// Share of recorded draws at `index`, in percent.
    pub fn percent(&self, index: usize) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let count = self.counts.get(index).copied().unwrap_or(0);
        count as f64 * 100.0 / total as f64
    }

    /// Text shown above each bar: the grouped count and its percentage.
    pub fn toppers(&self, precision: usize) -> Vec<(String, String)> {
        (0..self.counts.len())
            .map(|i| {
                (
                    crate::format::group_thousands(self.counts[i]),
                    crate::format::percent(self.percent(i), precision),
                )
            })
            .collect()
    }
}
