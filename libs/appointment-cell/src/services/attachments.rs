use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::debug;

/// File storage behind appointment attachments.
#[async_trait]
pub trait AttachmentStorage: Send + Sync {
    /// Removes the file an attachment reference points at.
    async fn remove(&self, reference: &str) -> Result<()>;
}

/// Attachments stored as files in one uploads directory. References such as
/// `/uploads/scan.pdf` resolve by file name only, so a reference can never
/// escape the directory.
#[derive(Debug, Clone)]
pub struct FsAttachmentStorage {
    root: PathBuf,
}

impl FsAttachmentStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let name = Path::new(reference)
            .file_name()
            .ok_or_else(|| anyhow!("attachment reference '{}' has no file name", reference))?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl AttachmentStorage for FsAttachmentStorage {
    async fn remove(&self, reference: &str) -> Result<()> {
        let path = self.resolve(reference)?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to remove attachment {}", path.display()))?;
        debug!("Removed attachment {}", path.display());
        Ok(())
    }
}
