//! Run statistics and the accept/reject verdict

use serde::Serialize;
use std::ops::AddAssign;

/// Highest acceptable `failures / successes` ratio (exclusive)
pub const NORMAL_ERR_RATE: f64 = 0.01;

/// Outcome counts for one device category
///
/// Written only by that category's sender and handed back when it exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryCounters {
    pub stored: u64,
    pub failed: u64,
}

impl AddAssign for CategoryCounters {
    fn add_assign(&mut self, other: Self) {
        self.stored += other.stored;
        self.failed += other.failed;
    }
}

/// Totals for a finished run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub parse_errors: u64,
    pub stored: u64,
    pub store_failures: u64,
}

impl RunStatistics {
    pub fn aggregate(parse_errors: u64, counters: impl IntoIterator<Item = CategoryCounters>) -> Self {
        let mut total = CategoryCounters::default();
        for c in counters {
            total += c;
        }
        Self {
            parse_errors,
            stored: total.stored,
            store_failures: total.failed,
        }
    }

    /// Parse errors plus records that exhausted their store attempts
    pub fn failures(&self) -> u64 {
        self.parse_errors + self.store_failures
    }

    /// `None` when nothing was stored
    pub fn error_rate(&self) -> Option<f64> {
        if self.stored == 0 {
            return None;
        }
        Some(self.failures() as f64 / self.stored as f64)
    }

    pub fn verdict(&self, threshold: f64) -> Verdict {
        match self.error_rate() {
            None => Verdict::NoData,
            Some(error_rate) if error_rate < threshold => Verdict::Accepted { error_rate },
            Some(error_rate) => Verdict::Rejected {
                error_rate,
                threshold,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accepted { error_rate: f64 },
    Rejected { error_rate: f64, threshold: f64 },
    /// Nothing was stored, so there is no rate to judge
    NoData,
}

impl Verdict {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Verdict::Rejected { .. })
    }
}
