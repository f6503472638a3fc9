use time::PrimitiveDateTime;

/// One `appliance_log` row: net energy transferred by one appliance in the
/// period starting at `ts`. Production is recorded as negative usage.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RawDailyRecord {
    pub appliance_id: i32,
    pub ts: PrimitiveDateTime,
    pub usage_offpeak: f64,
    pub usage_peak: f64,
}

impl RawDailyRecord {
    pub fn net_usage(&self) -> f64 {
        self.usage_offpeak + self.usage_peak
    }
}
