use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Running aggregate over the decoded clock-frequency samples of one cycle.
///
/// Tracks count, sum, min, max, and the exact median of every sample seen
/// since the last [`FreqStats::reset`]. The median is over the full sample
/// set, not a sliding window; samples are kept in sorted order so queries
/// are cheap and inserts cost a `partition_point` plus a shift.
///
/// Samples are integer Hz throughout. Conversion to MHz happens only at
/// presentation, see [`FreqSummary`].
#[derive(Debug, Default, Clone)]
pub struct FreqStats {
    sum: u64,
    sorted: Vec<u64>,
}

impl FreqStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frequency sample in Hz.
    pub fn update(&mut self, hz: u64) {
        self.sum += hz;
        let idx = self.sorted.partition_point(|&s| s <= hz);
        self.sorted.insert(idx, hz);
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.sorted.len() as u64
    }

    #[must_use]
    pub fn min(&self) -> Option<u64> {
        self.sorted.first().copied()
    }

    #[must_use]
    pub fn max(&self) -> Option<u64> {
        self.sorted.last().copied()
    }

    /// Mean of all samples, in Hz.
    ///
    /// # Errors
    /// [`Error::NoSamples`] when no samples have been recorded. "No data
    /// yet" is distinct from a valid zero-frequency average; callers must
    /// not conflate the two.
    pub fn average(&self) -> Result<f64> {
        if self.sorted.is_empty() {
            return Err(Error::NoSamples);
        }
        Ok(self.sum as f64 / self.sorted.len() as f64)
    }

    /// Exact median of all samples, in Hz. For an even count this is the
    /// mean of the two middle values.
    ///
    /// # Errors
    /// [`Error::NoSamples`] when no samples have been recorded.
    pub fn median(&self) -> Result<f64> {
        let n = self.sorted.len();
        if n == 0 {
            return Err(Error::NoSamples);
        }
        let mid = n / 2;
        if n % 2 == 1 {
            Ok(self.sorted[mid] as f64)
        } else {
            Ok((self.sorted[mid - 1] + self.sorted[mid]) as f64 / 2.0)
        }
    }

    /// Clear all accumulated state. Idempotent.
    pub fn reset(&mut self) {
        self.sum = 0;
        self.sorted.clear();
    }

    /// Non-destructive aggregate view, or `None` when empty.
    #[must_use]
    pub fn summary(&self) -> Option<FreqSummary> {
        if self.sorted.is_empty() {
            return None;
        }
        Some(FreqSummary {
            count: self.count(),
            // count checked above, cannot fail
            average_hz: self.average().ok()?,
            median_hz: self.median().ok()?,
            min_hz: self.min()?,
            max_hz: self.max()?,
        })
    }
}

/// Point-in-time aggregate of a [`FreqStats`], attached to cycle reports
/// and shutdown snapshots.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct FreqSummary {
    pub count: u64,
    pub average_hz: f64,
    pub median_hz: f64,
    pub min_hz: u64,
    pub max_hz: u64,
}

impl FreqSummary {
    #[must_use]
    pub fn average_mhz(&self) -> f64 {
        self.average_hz / 1e6
    }

    #[must_use]
    pub fn median_mhz(&self) -> f64 {
        self.median_hz / 1e6
    }
}
