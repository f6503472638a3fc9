use time::{Duration, PrimitiveDateTime};

pub const SLOTS_PER_HOUR: usize = 12;
pub const SLOT_WIDTH: Duration = Duration::minutes(5);

/// One `minute_log_5` row: twelve 5-minute usage deltas for the hour that
/// starts at `ts`.
///
/// `None` means the plug did not report that slot, which is not the same as
/// reporting zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RawIntervalRecord {
    pub appliance_id: i32,
    pub ts: PrimitiveDateTime,
    pub slots: [Option<f64>; SLOTS_PER_HOUR],
}

impl RawIntervalRecord {
    pub fn new(appliance_id: i32, ts: PrimitiveDateTime) -> Self {
        Self {
            appliance_id,
            ts,
            slots: [None; SLOTS_PER_HOUR],
        }
    }

    /// Builder-style setter used when assembling records by hand.
    pub fn with_slot(mut self, index: usize, usage: f64) -> Self {
        self.slots[index] = Some(usage);
        self
    }

    /// Start of slot `index` within this record's hour.
    pub fn slot_start(&self, index: usize) -> PrimitiveDateTime {
        self.ts + SLOT_WIDTH * index as i32
    }

    /// Reported slots as `(slot start, usage delta)` pairs, in slot order.
    pub fn reported_slots(&self) -> impl Iterator<Item = (PrimitiveDateTime, f64)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(i, usage)| usage.map(|u| (self.slot_start(i), u)))
    }
}

/// Wide row shape of `minute_log_5` as it comes out of the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IntervalLogRow {
    pub appliance_id: i32,
    pub ts: PrimitiveDateTime,
    pub usage_00: Option<f64>,
    pub usage_05: Option<f64>,
    pub usage_10: Option<f64>,
    pub usage_15: Option<f64>,
    pub usage_20: Option<f64>,
    pub usage_25: Option<f64>,
    pub usage_30: Option<f64>,
    pub usage_35: Option<f64>,
    pub usage_40: Option<f64>,
    pub usage_45: Option<f64>,
    pub usage_50: Option<f64>,
    pub usage_55: Option<f64>,
}

impl From<IntervalLogRow> for RawIntervalRecord {
    fn from(r: IntervalLogRow) -> Self {
        RawIntervalRecord {
            appliance_id: r.appliance_id,
            ts: r.ts,
            slots: [
                r.usage_00, r.usage_05, r.usage_10, r.usage_15, r.usage_20, r.usage_25,
                r.usage_30, r.usage_35, r.usage_40, r.usage_45, r.usage_50, r.usage_55,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn reported_slots_skip_absent_values_and_keep_zero() {
        let rec = RawIntervalRecord::new(3, datetime!(2014-05-14 10:00))
            .with_slot(0, -0.01)
            .with_slot(2, 0.0)
            .with_slot(11, -0.02);

        let slots: Vec<_> = rec.reported_slots().collect();
        assert_eq!(
            slots,
            vec![
                (datetime!(2014-05-14 10:00), -0.01),
                (datetime!(2014-05-14 10:10), 0.0),
                (datetime!(2014-05-14 10:55), -0.02),
            ]
        );
    }

    #[test]
    fn wide_row_maps_columns_to_slot_positions() {
        let row = IntervalLogRow {
            appliance_id: 1,
            ts: datetime!(2014-05-14 10:00),
            usage_00: None,
            usage_05: Some(-1.0),
            usage_10: None,
            usage_15: None,
            usage_20: None,
            usage_25: None,
            usage_30: Some(-2.0),
            usage_35: None,
            usage_40: None,
            usage_45: None,
            usage_50: None,
            usage_55: Some(-3.0),
        };

        let rec: RawIntervalRecord = row.into();
        assert_eq!(rec.slots[0], None);
        assert_eq!(rec.slots[1], Some(-1.0));
        assert_eq!(rec.slots[6], Some(-2.0));
        assert_eq!(rec.slots[11], Some(-3.0));
        assert_eq!(rec.slot_start(6), datetime!(2014-05-14 10:30));
    }
}
