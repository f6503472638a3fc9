use std::time::Duration;

use plugwise_client::domain::YieldAggregate;
use time::{format_description::BorrowedFormatItem, macros::format_description};

use super::http::{response_text, send_with_retry, RetryPolicy};
use crate::aggregate::Granularity;
use crate::config::PvOutputConfig;
use crate::pipeline::{PipelineError, Sink};

const NAME: &str = "pvoutput";

const DATE: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");
const TIME: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// Uploads to the PVOutput.org batch API.
///
/// Daily buckets go to `addbatchoutput.jsp` as generated Wh per day,
/// 5-minute buckets to `addbatchstatus.jsp` as average power. Each call holds
/// at most `batch_size` entries and successive calls are spaced by
/// `batch_delay`.
pub struct PvOutputApiSink {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    system_id: String,
    batch_size: usize,
    batch_delay: Duration,
    retry: RetryPolicy,
}

impl PvOutputApiSink {
    pub fn new(client: reqwest::Client, cfg: &PvOutputConfig) -> Self {
        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            system_id: cfg.system_id.clone(),
            batch_size: cfg.batch_size.max(1),
            batch_delay: Duration::from_millis(cfg.batch_delay_ms),
            retry: RetryPolicy::from(&cfg.retry),
        }
    }

    async fn post_batch(&self, endpoint: &str, data: String) -> Result<(), PipelineError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let resp = send_with_retry(NAME, self.retry, || {
            self.client
                .post(&url)
                .header("X-Pvoutput-Apikey", &self.api_key)
                .header("X-Pvoutput-SystemId", &self.system_id)
                .form(&[("data", data.as_str())])
        })
        .await?;
        let body = response_text(NAME, resp).await?;

        tracing::debug!(sink = NAME, %endpoint, response = %body.trim(), "batch uploaded");
        Ok(())
    }
}

/// `yyyymmdd,<Wh>` per bucket, joined by `;`.
pub fn output_batch(values: &[YieldAggregate]) -> Result<String, PipelineError> {
    let entries = values
        .iter()
        .map(|v| {
            let date = v.date.format(DATE).map_err(format_err)?;
            Ok(format!("{date},{}", watt_hours(v.yield_kwh)))
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;
    Ok(entries.join(";"))
}

/// `yyyymmdd,HH:MM,-1,<W>` per bucket, joined by `;`. Energy is left to
/// PVOutput to derive from the power readings.
pub fn status_batch(values: &[YieldAggregate]) -> Result<String, PipelineError> {
    let entries = values
        .iter()
        .map(|v| {
            let date = v.date.format(DATE).map_err(format_err)?;
            let time = v.date.format(TIME).map_err(format_err)?;
            Ok(format!("{date},{time},-1,{}", v.average_power().round() as i64))
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;
    Ok(entries.join(";"))
}

fn watt_hours(kwh: f64) -> i64 {
    (kwh * 1000.0).round() as i64
}

fn format_err(e: time::error::Format) -> PipelineError {
    PipelineError::sink(NAME, format!("failed to format date: {e}"))
}

#[async_trait::async_trait]
impl Sink for PvOutputApiSink {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn push(
        &self,
        granularity: Granularity,
        values: &[YieldAggregate],
    ) -> Result<(), PipelineError> {
        let (endpoint, encode): (&str, fn(&[YieldAggregate]) -> Result<String, PipelineError>) =
            match granularity {
                Granularity::Daily => ("addbatchoutput.jsp", output_batch),
                Granularity::Intraday => ("addbatchstatus.jsp", status_batch),
            };

        tracing::info!(sink = NAME, system_id = %self.system_id, count = values.len(), "uploading yield");

        for (i, batch) in values.chunks(self.batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }
            self.post_batch(endpoint, encode(batch)?).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn output_batch_reports_rounded_watt_hours_per_day() {
        let values = [
            YieldAggregate::new(datetime!(2014-05-14 00:00), 3.2504, time::Duration::HOUR),
            YieldAggregate::new(datetime!(2014-05-15 00:00), 0.4, time::Duration::HOUR),
        ];

        assert_eq!(output_batch(&values).unwrap(), "20140514,3250;20140515,400");
    }

    #[test]
    fn status_batch_reports_average_power() {
        let values = [
            YieldAggregate::new(datetime!(2014-05-14 09:05), 0.1, time::Duration::minutes(5)),
            YieldAggregate::new(datetime!(2014-05-14 09:10), 0.0125, time::Duration::minutes(5)),
        ];

        assert_eq!(
            status_batch(&values).unwrap(),
            "20140514,09:05,-1,1200;20140514,09:10,-1,150"
        );
    }

    #[test]
    fn empty_batch_is_empty_string() {
        assert_eq!(output_batch(&[]).unwrap(), "");
    }
}
