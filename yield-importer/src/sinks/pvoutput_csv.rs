use std::path::PathBuf;

use plugwise_client::domain::YieldAggregate;
use time::{format_description::BorrowedFormatItem, macros::format_description};

use crate::aggregate::Granularity;
use crate::pipeline::{PipelineError, Sink};

const NAME: &str = "pvoutput_csv";

const DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[day]/[month]/[year repr:last_two]");

/// CSV file for PVOutput's manual bulk upload: `dd/mm/yy,<Wh>` per day.
/// The file is rewritten on every push.
pub struct PvOutputCsvSink {
    path: PathBuf,
}

impl PvOutputCsvSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    fn write(&self, values: &[YieldAggregate]) -> Result<(), PipelineError> {
        let err = |e: &dyn std::fmt::Display| {
            PipelineError::sink(NAME, format!("{}: {e}", self.path.display()))
        };

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .map_err(|e| err(&e))?;

        for v in values {
            let date = v.date.format(DATE).map_err(|e| err(&e))?;
            let wh = (v.yield_kwh * 1000.0).to_string();
            wtr.write_record([date.as_str(), wh.as_str()])
                .map_err(|e| err(&e))?;
        }
        wtr.flush().map_err(|e| err(&e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sink for PvOutputCsvSink {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn push(
        &self,
        granularity: Granularity,
        values: &[YieldAggregate],
    ) -> Result<(), PipelineError> {
        if granularity != Granularity::Daily {
            tracing::debug!(sink = NAME, %granularity, "granularity not supported, skipping");
            return Ok(());
        }

        self.write(values)?;
        tracing::info!(sink = NAME, path = %self.path.display(), rows = values.len(), "csv written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::datetime, Duration};

    #[tokio::test]
    async fn writes_one_line_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.csv");
        let sink = PvOutputCsvSink::new(&path);

        let values = [
            YieldAggregate::new(datetime!(2014-05-14 00:00), 1.5, Duration::HOUR),
            YieldAggregate::new(datetime!(2014-05-15 00:00), 2.25, Duration::HOUR),
        ];
        sink.push(Granularity::Daily, &values).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "14/05/14,1500\n15/05/14,2250\n");
    }

    #[tokio::test]
    async fn intraday_values_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.csv");
        let sink = PvOutputCsvSink::new(&path);

        let values = [YieldAggregate::new(datetime!(2014-05-14 12:00), 0.1, Duration::minutes(5))];
        sink.push(Granularity::Intraday, &values).await.unwrap();

        assert!(!path.exists());
    }
}
