//! Aggregation of raw plug logs into per-bucket yield.
//!
//! Both paths follow the same shape: filter, group by timestamp, drop
//! timestamps where a requested appliance is missing, sum, emit in time order.
//! They differ in bucket width and in where the production filter sits (per
//! row before summing for daily logs, per expanded slot for 5-minute logs).

use std::collections::BTreeSet;
use std::fmt;

use time::Duration;

pub mod daily;
pub mod intraday;

pub use daily::aggregate_daily;
pub use intraday::aggregate_intraday;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// Daily-log path, one bucket per log timestamp.
    Daily,
    /// 5-minute-log path.
    Intraday,
}

impl Granularity {
    pub fn bucket_width(self) -> Duration {
        match self {
            Granularity::Daily => daily::BUCKET_WIDTH,
            Granularity::Intraday => intraday::BUCKET_WIDTH,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Intraday => "intraday",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completeness gate shared by both paths.
///
/// A timestamp is complete when every required appliance reported at it. An
/// empty `required` set accepts every timestamp.
pub fn group_is_complete(present: &BTreeSet<i32>, required: &BTreeSet<i32>) -> bool {
    required.is_subset(present)
}

/// Running state for one timestamp while grouping.
#[derive(Debug, Default)]
struct Bucket {
    present: BTreeSet<i32>,
    total: f64,
}

impl Bucket {
    fn add(&mut self, appliance_id: i32, amount: f64) {
        self.present.insert(appliance_id);
        self.total += amount;
    }
}

fn record_gate_outcome(granularity: Granularity, emitted: usize, dropped: usize) {
    metrics::counter!("yield_aggregates_emitted_total", "granularity" => granularity.as_str())
        .increment(emitted as u64);
    if dropped > 0 {
        metrics::counter!(
            "yield_incomplete_timestamps_dropped_total",
            "granularity" => granularity.as_str()
        )
        .increment(dropped as u64);
        tracing::debug!(%granularity, dropped, "skipped incomplete timestamps");
    }
}
