use std::collections::{BTreeMap, BTreeSet};

use plugwise_client::domain::{RawIntervalRecord, YieldAggregate, SLOT_WIDTH};
use time::{Duration, PrimitiveDateTime};

use super::{group_is_complete, record_gate_outcome, Bucket, Granularity};

pub const BUCKET_WIDTH: Duration = SLOT_WIDTH;

/// How far before `from` a row may start and still hold slots at or after
/// `from`: one row covers the following hour.
pub const LOOK_BACK: Duration = Duration::HOUR;

/// Per-appliance points for every reported slot of `record`, with usage
/// negated into yield.
pub fn expand_slots(record: &RawIntervalRecord) -> impl Iterator<Item = YieldAggregate> + '_ {
    record.reported_slots().map(move |(at, usage)| {
        YieldAggregate::for_appliance(record.appliance_id, at, -usage, SLOT_WIDTH)
    })
}

/// Aggregate 5-minute-log rows into one yield value per 5-minute slot at or
/// after `from`.
///
/// Slots with zero or negative yield are dropped before grouping, so they do
/// not count as the appliance having reported. The upper bound is open.
pub fn aggregate_intraday(
    records: &[RawIntervalRecord],
    from: PrimitiveDateTime,
    appliance_ids: &BTreeSet<i32>,
) -> Vec<YieldAggregate> {
    let earliest_row = from - LOOK_BACK;
    let mut buckets: BTreeMap<PrimitiveDateTime, Bucket> = BTreeMap::new();

    let points = records
        .iter()
        .filter(|r| r.ts >= earliest_row)
        .flat_map(expand_slots)
        .filter(|p| p.date >= from && p.yield_kwh > 0.0);

    for point in points {
        let appliance_id = point.appliance_id.unwrap_or_default();
        buckets
            .entry(point.date)
            .or_default()
            .add(appliance_id, point.yield_kwh);
    }

    let total = buckets.len();
    let out: Vec<YieldAggregate> = buckets
        .into_iter()
        .filter(|(_, b)| group_is_complete(&b.present, appliance_ids))
        .map(|(at, b)| YieldAggregate::new(at, b.total, BUCKET_WIDTH))
        .collect();

    record_gate_outcome(Granularity::Intraday, out.len(), total - out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const HOUR: PrimitiveDateTime = datetime!(2014-05-14 12:00);

    fn five_min(at: PrimitiveDateTime, yield_kwh: f64) -> YieldAggregate {
        YieldAggregate::new(at, yield_kwh, Duration::minutes(5))
    }

    /// Appliance 1 reports slots 0, 5 and 10; appliance 2 misses slot 0.
    fn two_plugs() -> Vec<RawIntervalRecord> {
        vec![
            RawIntervalRecord::new(1, HOUR)
                .with_slot(0, -1.0)
                .with_slot(1, -1.0)
                .with_slot(2, -1.0),
            RawIntervalRecord::new(2, HOUR)
                .with_slot(1, -2.0)
                .with_slot(2, -2.0),
        ]
    }

    #[test]
    fn expands_reported_slots_with_their_offsets() {
        let rec = RawIntervalRecord::new(7, HOUR).with_slot(3, -0.5).with_slot(11, 0.25);

        let points: Vec<_> = expand_slots(&rec).collect();
        assert_eq!(
            points,
            vec![
                YieldAggregate::for_appliance(7, datetime!(2014-05-14 12:15), 0.5, Duration::minutes(5)),
                YieldAggregate::for_appliance(7, datetime!(2014-05-14 12:55), -0.25, Duration::minutes(5)),
            ]
        );
    }

    #[test]
    fn gate_skips_slot_missing_a_requested_appliance() {
        let out = aggregate_intraday(&two_plugs(), HOUR, &BTreeSet::from([1, 2]));

        assert_eq!(
            out,
            vec![
                five_min(datetime!(2014-05-14 12:05), 3.0),
                five_min(datetime!(2014-05-14 12:10), 3.0),
            ]
        );
    }

    #[test]
    fn without_requested_appliances_every_slot_is_emitted() {
        let out = aggregate_intraday(&two_plugs(), HOUR, &BTreeSet::new());

        assert_eq!(
            out,
            vec![
                five_min(datetime!(2014-05-14 12:00), 1.0),
                five_min(datetime!(2014-05-14 12:05), 3.0),
                five_min(datetime!(2014-05-14 12:10), 3.0),
            ]
        );
    }

    #[test]
    fn non_positive_yield_slots_are_never_emitted() {
        let records = vec![RawIntervalRecord::new(1, HOUR)
            .with_slot(0, 0.0)
            .with_slot(1, 0.3)
            .with_slot(2, -1.0)];

        let out = aggregate_intraday(&records, HOUR, &BTreeSet::new());
        assert_eq!(out, vec![five_min(datetime!(2014-05-14 12:10), 1.0)]);
    }

    #[test]
    fn non_positive_slot_counts_as_not_reported() {
        let records = vec![
            RawIntervalRecord::new(1, HOUR).with_slot(0, -1.0),
            RawIntervalRecord::new(2, HOUR).with_slot(0, 0.0),
        ];

        assert!(aggregate_intraday(&records, HOUR, &BTreeSet::from([1, 2])).is_empty());
    }

    #[test]
    fn look_back_row_contributes_slots_at_or_after_from() {
        let from = datetime!(2014-05-14 12:30);
        let records = vec![
            // starts inside the look-back margin, last slot lands on `from`
            RawIntervalRecord::new(1, datetime!(2014-05-14 11:35)).with_slot(11, -1.0),
            // 12:25 and 12:30 slots; only the latter is at/after `from`
            RawIntervalRecord::new(1, datetime!(2014-05-14 12:00))
                .with_slot(5, -1.0)
                .with_slot(6, -2.0),
            // beyond the margin
            RawIntervalRecord::new(1, datetime!(2014-05-14 11:25)).with_slot(11, -4.0),
        ];

        let out = aggregate_intraday(&records, from, &BTreeSet::new());
        assert_eq!(out, vec![five_min(from, 3.0)]);
    }

    #[test]
    fn resuming_from_last_emitted_date_includes_that_date() {
        let first = aggregate_intraday(&two_plugs(), HOUR, &BTreeSet::from([1, 2]));
        let checkpoint = first.last().map(|a| a.date).unwrap();

        let resumed = aggregate_intraday(&two_plugs(), checkpoint, &BTreeSet::from([1, 2]));
        assert_eq!(resumed, vec![five_min(checkpoint, 3.0)]);

        let advanced = aggregate_intraday(
            &two_plugs(),
            checkpoint + Duration::minutes(5),
            &BTreeSet::from([1, 2]),
        );
        assert!(advanced.is_empty());
    }

    #[test]
    fn output_is_sorted_across_rows_and_hours() {
        let records = vec![
            RawIntervalRecord::new(2, datetime!(2014-05-14 13:00)).with_slot(4, -1.0),
            RawIntervalRecord::new(1, HOUR).with_slot(9, -1.0).with_slot(2, -1.0),
            RawIntervalRecord::new(2, HOUR).with_slot(2, -1.0),
        ];

        let out = aggregate_intraday(&records, HOUR, &BTreeSet::new());
        let dates: Vec<_> = out.iter().map(|a| a.date).collect();
        assert_eq!(
            dates,
            vec![
                datetime!(2014-05-14 12:10),
                datetime!(2014-05-14 12:45),
                datetime!(2014-05-14 13:20),
            ]
        );
        assert!(out.iter().all(|a| a.appliance_id.is_none()));
    }
}
