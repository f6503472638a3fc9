use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::pipeline::PipelineError;

/// Where the intraday run resumes from.
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self) -> Result<Option<PrimitiveDateTime>, PipelineError>;
    async fn save(&self, at: PrimitiveDateTime) -> Result<(), PipelineError>;
}

time::serde::format_description!(
    checkpoint_format,
    PrimitiveDateTime,
    "[year]-[month]-[day]T[hour]:[minute]:[second]"
);

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    #[serde(with = "checkpoint_format")]
    last_intraday: PrimitiveDateTime,
}

/// Checkpoint kept in a small JSON file. A missing file means no checkpoint.
pub struct JsonFileCheckpoint {
    path: PathBuf,
}

impl JsonFileCheckpoint {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl CheckpointStore for JsonFileCheckpoint {
    async fn load(&self) -> Result<Option<PrimitiveDateTime>, PipelineError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PipelineError::Checkpoint(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let file: CheckpointFile = serde_json::from_str(&contents).map_err(|e| {
            PipelineError::Checkpoint(format!("invalid checkpoint {}: {e}", self.path.display()))
        })?;
        Ok(Some(file.last_intraday))
    }

    async fn save(&self, at: PrimitiveDateTime) -> Result<(), PipelineError> {
        let body = serde_json::to_string_pretty(&CheckpointFile { last_intraday: at })
            .map_err(|e| PipelineError::Checkpoint(e.to_string()))?;

        // Write a sibling temp file, then rename it over the checkpoint.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| PipelineError::Checkpoint(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PipelineError::Checkpoint(format!("failed to replace {}: {e}", self.path.display())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[tokio::test]
    async fn missing_file_is_no_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCheckpoint::new(dir.path().join("checkpoint.json"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn saved_checkpoint_is_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let store = JsonFileCheckpoint::new(&path);

        store.save(datetime!(2014-05-14 12:10)).await.unwrap();
        store.save(datetime!(2014-05-14 13:25)).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(datetime!(2014-05-14 13:25)));
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"last_intraday\": \"2014-05-14T13:25:00\""));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "not json").unwrap();

        let res = JsonFileCheckpoint::new(&path).load().await;
        assert!(matches!(res, Err(PipelineError::Checkpoint(_))));
    }
}
