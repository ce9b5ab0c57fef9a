//! Writing export artifacts

use super::bundle::ExportBundle;
use super::layout::ReportDocument;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize bundle: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination for finished exports
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn write_bundle(&self, stem: &str, bundle: &ExportBundle)
        -> Result<PathBuf, ExportError>;

    async fn write_report(
        &self,
        stem: &str,
        document: &ReportDocument,
    ) -> Result<PathBuf, ExportError>;
}

/// Writes `<stem>.json` and `<stem>.txt` into a directory
pub struct FileArtifactSink {
    dir: PathBuf,
}

impl FileArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, file_name: String, contents: String) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, contents).await?;
        tracing::info!(path = %path.display(), "Wrote artifact");
        Ok(path)
    }
}

#[async_trait]
impl ArtifactSink for FileArtifactSink {
    async fn write_bundle(
        &self,
        stem: &str,
        bundle: &ExportBundle,
    ) -> Result<PathBuf, ExportError> {
        let json = bundle.to_json_pretty()?;
        self.write(format!("{stem}.json"), json).await
    }

    async fn write_report(
        &self,
        stem: &str,
        document: &ReportDocument,
    ) -> Result<PathBuf, ExportError> {
        self.write(format!("{stem}.txt"), document.render_text()).await
    }
}
