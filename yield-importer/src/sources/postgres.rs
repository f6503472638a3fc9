use std::collections::BTreeSet;

use plugwise_client::{
    db,
    domain::{RawDailyRecord, RawIntervalRecord},
    ClientError,
};
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::pipeline::RecordSource;

/// Record source over the Plugwise tables in Postgres.
#[derive(Clone)]
pub struct PgRecordSource {
    pool: PgPool,
}

impl PgRecordSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecordSource for PgRecordSource {
    async fn all_daily(
        &self,
        from: PrimitiveDateTime,
        to: PrimitiveDateTime,
    ) -> Result<Vec<RawDailyRecord>, ClientError> {
        db::all_daily_records(&self.pool, from, to).await
    }

    async fn daily_for(
        &self,
        ids: &BTreeSet<i32>,
        from: PrimitiveDateTime,
        to: PrimitiveDateTime,
    ) -> Result<Vec<RawDailyRecord>, ClientError> {
        db::daily_records_for(&self.pool, ids, from, to).await
    }

    async fn all_interval(
        &self,
        since: PrimitiveDateTime,
    ) -> Result<Vec<RawIntervalRecord>, ClientError> {
        db::all_interval_records(&self.pool, since).await
    }

    async fn interval_for(
        &self,
        ids: &BTreeSet<i32>,
        since: PrimitiveDateTime,
    ) -> Result<Vec<RawIntervalRecord>, ClientError> {
        db::interval_records_for(&self.pool, ids, since).await
    }
}
