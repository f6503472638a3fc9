use std::time::Duration;

use crate::config::RetryConfig;
use crate::pipeline::PipelineError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            backoff: Duration::from_millis(cfg.retry_backoff_ms),
        }
    }
}

/// Send the request built by `build`, retrying transport errors and 5xx
/// responses with linear backoff. Returns the first successful response.
///
/// 4xx responses are not retried.
pub(crate) async fn send_with_retry<F>(
    sink: &'static str,
    policy: RetryPolicy,
    build: F,
) -> Result<reqwest::Response, PipelineError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        let err = match build().send().await {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) if resp.status().is_client_error() => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                tracing::error!(sink, %status, body = %body.trim(), "upload rejected");
                return Err(PipelineError::sink(sink, format!("{status}: {}", body.trim())));
            }
            Ok(resp) => format!("server responded {}", resp.status()),
            Err(e) => e.to_string(),
        };

        if attempt >= policy.max_retries {
            tracing::error!(sink, error = %err, "upload failed, giving up");
            return Err(PipelineError::sink(sink, err));
        }

        attempt += 1;
        tracing::warn!(sink, error = %err, attempt, "upload failed, retrying with backoff");
        metrics::counter!("sink_retry_total", "sink" => sink).increment(1);
        tokio::time::sleep(policy.backoff * attempt).await;
    }
}

pub(crate) async fn response_text(
    sink: &'static str,
    resp: reqwest::Response,
) -> Result<String, PipelineError> {
    resp.text()
        .await
        .map_err(|e| PipelineError::sink(sink, format!("failed to read response: {e}")))
}
