use serde::Deserialize;
use std::{collections::BTreeSet, fs, path::Path};

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointConfig {
    pub path: String,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: "yield-importer.checkpoint.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

/// Retry policy shared by the HTTP upload sinks.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PvOutputConfig {
    pub api_key: String,
    pub system_id: String,
    #[serde(default = "default_pvoutput_url")]
    pub base_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between successive batch uploads, for the API rate limit.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PvOutputCsvConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JSunnyReportsConfig {
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SonnenErtragConfig {
    pub user: String,
    pub password: String,
    pub facility_id: String,
    #[serde(default = "default_sonnenertrag_url")]
    pub base_url: String,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    /// Appliances whose readings must all be present for a bucket to be
    /// reported. Empty means no completeness requirement.
    #[serde(default)]
    pub appliances: BTreeSet<i32>,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    pub metrics: Option<MetricsConfig>,
    pub pvoutput: Option<PvOutputConfig>,
    pub pvoutput_csv: Option<PvOutputCsvConfig>,
    pub jsunnyreports: Option<JSunnyReportsConfig>,
    pub sonnenertrag: Option<SonnenErtragConfig>,
}

impl AppConfig {
    /// Load from `path`, else `$YIELD_IMPORTER_CONFIG`, else `yield-importer.toml`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        use std::env;

        let path = match path {
            Some(p) => p.to_path_buf(),
            None => env::var("YIELD_IMPORTER_CONFIG")
                .unwrap_or_else(|_| "yield-importer.toml".to_string())
                .into(),
        };
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}

fn default_max_connections() -> u32 {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    2_000
}

fn default_batch_size() -> usize {
    30
}

fn default_batch_delay_ms() -> u64 {
    10_000
}

fn default_pvoutput_url() -> String {
    "https://pvoutput.org/service/r2".to_string()
}

fn default_sonnenertrag_url() -> String {
    "http://www.solar-yield.eu".to_string()
}
