use super::record::ReportRecord;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Destination for finished assessment reports
#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    async fn persist(&self, record: &ReportRecord) -> Result<()>;
}

/// Appends one JSON object per line to a file
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ReportSink for JsonLinesSink {
    async fn persist(&self, record: &ReportRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create report directory")?;
        }

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open report file: {:?}", self.path))?;

        file.write_all(&line)
            .await
            .context("Failed to write report")?;
        file.flush().await?;

        info!(
            "Saved report {} for {} to {}",
            record.id,
            record.audio_id,
            self.path.display()
        );

        Ok(())
    }
}
