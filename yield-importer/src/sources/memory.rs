use std::collections::BTreeSet;

use plugwise_client::{
    domain::{resolve_appliances, Appliance, RawDailyRecord, RawIntervalRecord},
    ClientError,
};
use time::PrimitiveDateTime;

use crate::pipeline::RecordSource;

/// A fixed in-memory snapshot of plug logs with its own appliance catalog.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    pub appliances: Vec<Appliance>,
    pub daily: Vec<RawDailyRecord>,
    pub interval: Vec<RawIntervalRecord>,
}

impl MemoryRecordSource {
    pub fn new(appliances: Vec<Appliance>) -> Self {
        Self {
            appliances,
            ..Default::default()
        }
    }

    pub fn with_daily(mut self, records: impl IntoIterator<Item = RawDailyRecord>) -> Self {
        self.daily.extend(records);
        self
    }

    pub fn with_interval(mut self, records: impl IntoIterator<Item = RawIntervalRecord>) -> Self {
        self.interval.extend(records);
        self
    }

    fn checked(&self, ids: &BTreeSet<i32>) -> Result<(), ClientError> {
        resolve_appliances(&self.appliances, ids).map(|_| ())
    }
}

#[async_trait::async_trait]
impl RecordSource for MemoryRecordSource {
    async fn all_daily(
        &self,
        from: PrimitiveDateTime,
        to: PrimitiveDateTime,
    ) -> Result<Vec<RawDailyRecord>, ClientError> {
        Ok(self
            .daily
            .iter()
            .filter(|r| r.ts >= from && r.ts <= to)
            .cloned()
            .collect())
    }

    async fn daily_for(
        &self,
        ids: &BTreeSet<i32>,
        from: PrimitiveDateTime,
        to: PrimitiveDateTime,
    ) -> Result<Vec<RawDailyRecord>, ClientError> {
        self.checked(ids)?;
        Ok(self
            .daily
            .iter()
            .filter(|r| ids.contains(&r.appliance_id) && r.ts >= from && r.ts <= to)
            .cloned()
            .collect())
    }

    async fn all_interval(
        &self,
        since: PrimitiveDateTime,
    ) -> Result<Vec<RawIntervalRecord>, ClientError> {
        Ok(self.interval.iter().filter(|r| r.ts >= since).cloned().collect())
    }

    async fn interval_for(
        &self,
        ids: &BTreeSet<i32>,
        since: PrimitiveDateTime,
    ) -> Result<Vec<RawIntervalRecord>, ClientError> {
        self.checked(ids)?;
        Ok(self
            .interval
            .iter()
            .filter(|r| ids.contains(&r.appliance_id) && r.ts >= since)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn source() -> MemoryRecordSource {
        MemoryRecordSource::new(vec![
            Appliance { id: 1, name: "east".to_string() },
            Appliance { id: 2, name: "west".to_string() },
        ])
        .with_interval([
            RawIntervalRecord::new(1, datetime!(2014-05-14 11:00)),
            RawIntervalRecord::new(2, datetime!(2014-05-14 12:00)),
        ])
    }

    #[tokio::test]
    async fn id_query_filters_by_appliance_and_time() {
        let rows = source()
            .interval_for(&BTreeSet::from([2]), datetime!(2014-05-14 11:00))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].appliance_id, 2);
    }

    #[tokio::test]
    async fn unknown_appliance_fails_the_query() {
        let res = source()
            .interval_for(&BTreeSet::from([1, 9]), datetime!(2014-05-14 00:00))
            .await;
        assert!(matches!(res, Err(ClientError::UnknownAppliance(9))));
    }
}
