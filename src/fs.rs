//! File-system port used by the orchestrator

use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWrite;

/// Writable handle returned by [`FileSystem::create_new`]
pub type FileWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// File operations the download orchestrator depends on
///
/// Injected at construction so tests can substitute failing or recording
/// implementations without touching the production path.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Create `path` for appending; fails if it already exists
    async fn create_new(&self, path: &Path) -> std::io::Result<FileWriter>;

    /// Remove the file at `path`
    async fn remove(&self, path: &Path) -> std::io::Result<()>;
}

/// [`FileSystem`] backed by the local disk (`tokio::fs`)
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn create_new(&self, path: &Path) -> std::io::Result<FileWriter> {
        let file = tokio::fs::OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(path)
            .await?;
        Ok(Box::new(file))
    }

    async fn remove(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}
