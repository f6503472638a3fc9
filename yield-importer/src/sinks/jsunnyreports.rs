use std::path::PathBuf;

use plugwise_client::domain::YieldAggregate;
use time::{format_description::BorrowedFormatItem, macros::format_description};

use crate::aggregate::Granularity;
use crate::pipeline::{PipelineError, Sink};

const NAME: &str = "jsunnyreports";

const FILE_NAME: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day].csv");
const DAY: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Import directory for jSunnyReports: one `yyyymmdd.csv` file per day
/// holding a single `yyyy-mm-dd 12:00:00;<Wh>` line.
pub struct JSunnyReportsSink {
    dir: PathBuf,
}

impl JSunnyReportsSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn write_day(&self, day: &YieldAggregate) -> Result<PathBuf, PipelineError> {
        let name = day.date.format(FILE_NAME).map_err(|e| PipelineError::sink(NAME, e.to_string()))?;
        let date = day.date.format(DAY).map_err(|e| PipelineError::sink(NAME, e.to_string()))?;
        let path = self.dir.join(name);
        let err = |e: &dyn std::fmt::Display| PipelineError::sink(NAME, format!("{}: {e}", path.display()));

        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| err(&e))?;
        let timestamp = format!("{date} 12:00:00");
        let wh = ((day.yield_kwh * 1000.0).round() as i64).to_string();
        wtr.write_record([timestamp.as_str(), wh.as_str()])
            .map_err(|e| err(&e))?;
        wtr.flush().map_err(|e| err(&e))?;
        Ok(path)
    }
}

#[async_trait::async_trait]
impl Sink for JSunnyReportsSink {
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

        for day in values {
            let path = self.write_day(day)?;
            tracing::debug!(sink = NAME, path = %path.display(), "day written");
        }
        tracing::info!(sink = NAME, dir = %self.dir.display(), days = values.len(), "csv files written");
        Ok(())
    }
}
