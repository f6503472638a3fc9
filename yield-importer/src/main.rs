use std::{collections::BTreeSet, path::PathBuf, time::Duration as StdDuration};

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use time::{macros::format_description, Date, Duration, OffsetDateTime};
use yield_importer::{
    checkpoint::JsonFileCheckpoint,
    config::AppConfig,
    metrics_server, observability,
    pipeline::Pipeline,
    sinks::{JSunnyReportsSink, PvOutputApiSink, PvOutputCsvSink, SonnenErtragSink},
    sources::PgRecordSource,
};

/// Uploads solar yield measured by Plugwise smart plugs to PVOutput,
/// SonnenErtrag and local CSV exports.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of days before `--to` to import.
    #[arg(long, default_value_t = 14)]
    days: i64,
    /// First day to import (yyyy-mm-dd). Takes precedence over `--days`.
    #[arg(long, value_parser = parse_date)]
    from: Option<Date>,
    /// Last day to import (yyyy-mm-dd), inclusive. Defaults to today.
    #[arg(long, value_parser = parse_date)]
    to: Option<Date>,
    #[arg(long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,
    /// Appliance that must have reported for a bucket to be uploaded.
    /// Repeatable; replaces the `appliances` list from the config file.
    #[arg(long = "appliance")]
    appliances: Vec<i32>,
    /// Config file. Falls back to $YIELD_IMPORTER_CONFIG, then ./yield-importer.toml.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    /// Per-day totals only.
    Daily,
    /// 5-minute values since the last checkpoint only.
    Intraday,
    Both,
}

fn parse_date(s: &str) -> Result<Date, String> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("expected yyyy-mm-dd: {e}"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // The local offset can only be read while the process is single-threaded.
    let today = OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(args, today))
}

async fn run(args: Args, today: Date) -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load(args.config.as_deref())?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let appliance_ids: BTreeSet<i32> = if args.appliances.is_empty() {
        cfg.appliances.clone()
    } else {
        args.appliances.iter().copied().collect()
    };

    let to = args.to.unwrap_or(today);
    let from = args.from.unwrap_or(to - Duration::days(args.days));
    if from > to {
        bail!("--from {from} is after --to {to}");
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let pipeline = build_pipeline(PgRecordSource::new(pool), &cfg)?;
    let mut sink_failures = 0;

    if matches!(args.mode, Mode::Daily | Mode::Both) {
        let report = pipeline.run_daily(from, to, &appliance_ids).await?;
        tracing::info!(days = report.aggregates.len(), kwh = report.total_kwh(), "daily import done");
        sink_failures += report.publish.failures.len();
    }

    if matches!(args.mode, Mode::Intraday | Mode::Both) {
        let checkpoint = JsonFileCheckpoint::new(&cfg.checkpoint.path);
        let report = pipeline
            .run_intraday(&checkpoint, to.midnight(), &appliance_ids)
            .await?;
        tracing::info!(slots = report.aggregates.len(), kwh = report.total_kwh(), "intraday import done");
        sink_failures += report.publish.failures.len();
    }

    if sink_failures > 0 {
        bail!("{sink_failures} sink upload(s) failed");
    }
    Ok(())
}

fn build_pipeline(source: PgRecordSource, cfg: &AppConfig) -> Result<Pipeline<PgRecordSource>> {
    let client = reqwest::Client::builder()
        .timeout(StdDuration::from_secs(30))
        .build()?;

    let mut pipeline = Pipeline::new(source);
    if let Some(pv) = &cfg.pvoutput {
        pipeline = pipeline.with_sink(PvOutputApiSink::new(client.clone(), pv));
    }
    if let Some(se) = &cfg.sonnenertrag {
        pipeline = pipeline.with_sink(SonnenErtragSink::new(client.clone(), se));
    }
    if let Some(csv) = &cfg.pvoutput_csv {
        pipeline = pipeline.with_sink(PvOutputCsvSink::new(&csv.path));
    }
    if let Some(jsr) = &cfg.jsunnyreports {
        pipeline = pipeline.with_sink(JSunnyReportsSink::new(&jsr.dir));
    }

    if pipeline.sinks.is_empty() {
        tracing::warn!("no sinks configured, results are only logged");
    }
    Ok(pipeline)
}
