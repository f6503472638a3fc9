use std::collections::BTreeSet;

use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::domain::{
    interval_record::IntervalLogRow, resolve_appliances, Appliance, RawDailyRecord,
    RawIntervalRecord,
};
use crate::ClientError;

const DAILY_COLUMNS: &str = r#"
        SELECT
            appliance_id,
            log_date AS ts,
            usage_offpeak,
            usage_peak
        FROM appliance_log
"#;

const INTERVAL_COLUMNS: &str = r#"
        SELECT
            appliance_id,
            log_date AS ts,
            usage_00, usage_05, usage_10, usage_15, usage_20, usage_25,
            usage_30, usage_35, usage_40, usage_45, usage_50, usage_55
        FROM minute_log_5
"#;

/// The full sensor catalog.
pub async fn appliances(pool: &PgPool) -> Result<Vec<Appliance>, ClientError> {
    let rows = sqlx::query_as::<_, Appliance>("SELECT id, name FROM appliance ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Resolve `ids` against the catalog and return them as a bind parameter.
async fn checked_ids(pool: &PgPool, ids: &BTreeSet<i32>) -> Result<Vec<i32>, ClientError> {
    let catalog = appliances(pool).await?;
    let found = resolve_appliances(&catalog, ids)?;

    let names: Vec<&str> = found.iter().map(|a| a.name.as_str()).collect();
    tracing::info!(appliances = %names.join(";"), "resolved appliances");

    Ok(found.into_iter().map(|a| a.id).collect())
}

/// Daily-log rows for every appliance with `from <= ts <= to`.
pub async fn all_daily_records(
    pool: &PgPool,
    from: PrimitiveDateTime,
    to: PrimitiveDateTime,
) -> Result<Vec<RawDailyRecord>, ClientError> {
    let sql = format!("{DAILY_COLUMNS} WHERE log_date >= $1 AND log_date <= $2");
    let rows = sqlx::query_as::<_, RawDailyRecord>(&sql)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Daily-log rows for the given appliances with `from <= ts <= to`.
pub async fn daily_records_for(
    pool: &PgPool,
    ids: &BTreeSet<i32>,
    from: PrimitiveDateTime,
    to: PrimitiveDateTime,
) -> Result<Vec<RawDailyRecord>, ClientError> {
    let ids = checked_ids(pool, ids).await?;
    let sql = format!(
        "{DAILY_COLUMNS} WHERE appliance_id = ANY($1) AND log_date >= $2 AND log_date <= $3"
    );
    let rows = sqlx::query_as::<_, RawDailyRecord>(&sql)
        .bind(&ids)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// 5-minute-log rows for every appliance whose hour starts at or after `since`.
pub async fn all_interval_records(
    pool: &PgPool,
    since: PrimitiveDateTime,
) -> Result<Vec<RawIntervalRecord>, ClientError> {
    let sql = format!("{INTERVAL_COLUMNS} WHERE log_date >= $1");
    let rows = sqlx::query_as::<_, IntervalLogRow>(&sql)
        .bind(since)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(RawIntervalRecord::from).collect())
}

/// 5-minute-log rows for the given appliances whose hour starts at or after `since`.
pub async fn interval_records_for(
    pool: &PgPool,
    ids: &BTreeSet<i32>,
    since: PrimitiveDateTime,
) -> Result<Vec<RawIntervalRecord>, ClientError> {
    let ids = checked_ids(pool, ids).await?;
    let sql = format!("{INTERVAL_COLUMNS} WHERE appliance_id = ANY($1) AND log_date >= $2");
    let rows = sqlx::query_as::<_, IntervalLogRow>(&sql)
        .bind(&ids)
        .bind(since)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(RawIntervalRecord::from).collect())
}
