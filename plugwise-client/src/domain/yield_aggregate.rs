use time::{Duration, PrimitiveDateTime};

/// Energy produced in one time bucket.
///
/// Equality is structural over all four fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YieldAggregate {
    /// Bucket start.
    pub date: PrimitiveDateTime,
    /// Produced energy in kWh, as a positive magnitude.
    pub yield_kwh: f64,
    /// Bucket width.
    pub duration: Duration,
    /// Set only on single-appliance intermediate points.
    pub appliance_id: Option<i32>,
}

impl YieldAggregate {
    pub fn new(date: PrimitiveDateTime, yield_kwh: f64, duration: Duration) -> Self {
        debug_assert!(duration.is_positive(), "bucket width must be positive");
        Self {
            date,
            yield_kwh,
            duration,
            appliance_id: None,
        }
    }

    pub fn for_appliance(
        appliance_id: i32,
        date: PrimitiveDateTime,
        yield_kwh: f64,
        duration: Duration,
    ) -> Self {
        Self {
            appliance_id: Some(appliance_id),
            ..Self::new(date, yield_kwh, duration)
        }
    }

    /// Average power over the bucket in watts.
    pub fn average_power(&self) -> f64 {
        let hours = self.duration.as_seconds_f64() / 3600.0;
        1000.0 * self.yield_kwh / hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-10, "{actual} != {expected}");
    }

    #[test]
    fn average_power_scales_with_duration() {
        let at = datetime!(2014-05-14 12:00);

        // 1 kWh in 1 hour = 1 kW
        assert_close(YieldAggregate::new(at, 1.0, Duration::HOUR).average_power(), 1000.0);
        assert_close(YieldAggregate::new(at, 2.0, Duration::HOUR).average_power(), 2000.0);
        // 1 kWh in 30 minutes = 2 kW
        assert_close(YieldAggregate::new(at, 1.0, Duration::minutes(30)).average_power(), 2000.0);
        assert_close(
            YieldAggregate::new(at, 1.0 / 60.0, Duration::MINUTE).average_power(),
            1000.0,
        );
    }

    #[test]
    fn equality_compares_every_field() {
        let at = datetime!(2014-05-14 12:00);
        let merged = YieldAggregate::new(at, 1.5, Duration::minutes(5));

        assert_eq!(merged, YieldAggregate::new(at, 1.5, Duration::minutes(5)));
        assert_ne!(merged, YieldAggregate::for_appliance(1, at, 1.5, Duration::minutes(5)));
        assert_ne!(merged, YieldAggregate::new(at, 1.5, Duration::HOUR));
        assert_ne!(merged, YieldAggregate::new(at, 1.25, Duration::minutes(5)));
    }
}
