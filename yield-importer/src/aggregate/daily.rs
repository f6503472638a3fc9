use std::collections::{BTreeMap, BTreeSet};

use plugwise_client::domain::{RawDailyRecord, YieldAggregate};
use time::{Duration, PrimitiveDateTime};

use super::{group_is_complete, record_gate_outcome, Bucket, Granularity};

pub const BUCKET_WIDTH: Duration = Duration::HOUR;

/// Aggregate daily-log rows into one yield value per log timestamp.
///
/// Only rows with `from <= ts <= to` and net production (negative combined
/// usage) take part. A row with zero net usage is dropped before grouping, so
/// it does not count as its appliance having reported. Callers normalize
/// `from`/`to` to day boundaries.
pub fn aggregate_daily(
    records: &[RawDailyRecord],
    from: PrimitiveDateTime,
    to: PrimitiveDateTime,
    appliance_ids: &BTreeSet<i32>,
) -> Vec<YieldAggregate> {
    let mut buckets: BTreeMap<PrimitiveDateTime, Bucket> = BTreeMap::new();

    for rec in records
        .iter()
        .filter(|r| r.ts >= from && r.ts <= to && r.net_usage() < 0.0)
    {
        buckets
            .entry(rec.ts)
            .or_default()
            .add(rec.appliance_id, rec.net_usage());
    }

    let total = buckets.len();
    let out: Vec<YieldAggregate> = buckets
        .into_iter()
        .filter(|(_, b)| group_is_complete(&b.present, appliance_ids))
        .map(|(ts, b)| YieldAggregate::new(ts, -b.total, BUCKET_WIDTH))
        .collect();

    record_gate_outcome(Granularity::Daily, out.len(), total - out.len());
    out
}
