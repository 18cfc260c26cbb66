//! Cancellation of an open destination file

use super::{Downloader, OpenFile};
use crate::error::{Error, Result};
use tokio::io::AsyncWriteExt;

impl Downloader {
    /// Close `file` and remove it from disk
    ///
    /// A close failure is reported without attempting removal. A missing file
    /// (already removed by someone else) is reported as a storage error.
    pub async fn cancel(&self, file: OpenFile) -> Result<()> {
        let OpenFile { path, mut writer } = file;

        writer
            .shutdown()
            .await
            .map_err(|e| Error::storage("closing", &path, e))?;
        drop(writer);

        self.fs
            .remove(&path)
            .await
            .map_err(|e| Error::storage("removing", &path, e))?;

        tracing::debug!(path = %path.display(), "removed partial file");
        Ok(())
    }
}
