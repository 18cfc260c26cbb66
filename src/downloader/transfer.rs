//! The fetch, copy, persist and notify sequence of one transfer

use super::{COPY_BUFFER_SIZE, CompletedDownload, Downloader, OpenFile};
use crate::error::{Error, Result};
use crate::fetcher::ByteStream;
use crate::filename;
use crate::progress::ProgressSink;
use crate::types::{DownloadRequest, ItemId, Notification, StoredItem, TransferProgress};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// How the copy loop ended
enum CopyOutcome {
    Completed(u64),
    Cancelled,
}

impl Downloader {
    /// Download `request.url` into the video directory
    ///
    /// Resolves metadata, opens the first offered encoding, copies it to
    /// `{video_dir}/{id}.{ext}` reporting every write to `progress`, saves a
    /// [`StoredItem`] and notifies the configured notifier.
    ///
    /// # Errors
    ///
    /// - [`Error::Fetch`] / [`Error::Stream`]: nothing was written to disk
    /// - [`Error::Storage`]: the destination could not be created, written or
    ///   closed; a partial file may remain
    /// - [`Error::Cancelled`]: `cancel` fired; the partial file was removed
    /// - [`Error::Notify`]: the item is stored and retrievable, only the
    ///   notification failed
    pub async fn download(
        &self,
        request: &DownloadRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<CompletedDownload> {
        request.validate(false)?;
        let url = request.url.as_str();

        let info = self
            .fetcher
            .resolve(url)
            .await
            .map_err(|source| Error::Fetch {
                url: url.to_string(),
                source,
            })?;

        let encoding = info
            .preferred_encoding()
            .ok_or_else(|| Error::Fetch {
                url: url.to_string(),
                source: "resource offers no encodings".into(),
            })?;

        let opened = self
            .fetcher
            .open_stream(&info, encoding)
            .await
            .map_err(|source| Error::Stream {
                url: url.to_string(),
                source,
            })?;

        let id = ItemId::generate();
        let stored_name = format!(
            "{}.{}",
            filename::sanitize_stem(id.as_str()),
            filename::extension_for(&encoding.mime_type)
        );
        let path = self.config.video_dir().join(&stored_name);

        let writer = self
            .fs
            .create_new(&path)
            .await
            .map_err(|e| Error::storage("creating file", &path, e))?;
        let mut file = OpenFile::new(path, writer);

        tracing::info!(
            id = %id,
            url = %url,
            fetcher = self.fetcher.name(),
            path = %file.path.display(),
            total_bytes = opened.total_bytes,
            "starting transfer"
        );

        progress.start(opened.total_bytes);

        let bytes_written =
            match copy_stream(opened.reader, &mut file, opened.total_bytes, progress, cancel)
                .await?
            {
                CopyOutcome::Completed(bytes) => bytes,
                CopyOutcome::Cancelled => {
                    tracing::info!(id = %id, url = %url, "transfer cancelled");
                    self.cancel(file).await?;
                    return Err(Error::Cancelled { id });
                }
            };

        file.writer
            .shutdown()
            .await
            .map_err(|e| Error::storage("closing", &file.path, e))?;
        progress.finish();

        let item = StoredItem {
            source_url: url.to_string(),
            filename: filename::sanitize_stem(&info.title),
            requester: request.requester().to_string(),
            media_type: media_type_essence(&encoding.mime_type),
            stored_name,
            created_at: chrono::Utc::now(),
        };

        // The file is usable even without a record, so a failed save is tolerated
        if let Err(e) = self.store.save(id.clone(), item.clone()) {
            tracing::error!(id = %id, error = %e, "failed to save record");
        }

        tracing::info!(
            id = %id,
            bytes = bytes_written,
            filename = %item.filename,
            "transfer complete"
        );

        if let Some(notifier) = &self.notifier {
            let notification = Notification {
                title: info.title.clone(),
                message: id.to_string(),
                recipient: request.requester().to_string(),
            };
            if let Err(source) = notifier.notify(&notification).await {
                tracing::warn!(id = %id, notifier = notifier.name(), error = %source, "notification failed");
                return Err(Error::Notify { id, source });
            }
        }

        Ok(CompletedDownload {
            id,
            item,
            bytes_written,
            path: file.path,
        })
    }
}

/// Copy `reader` into `file`, racing every read and write against `cancel`
async fn copy_stream(
    mut reader: ByteStream,
    file: &mut OpenFile,
    total_bytes: u64,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<CopyOutcome> {
    let OpenFile { path, writer } = file;
    let mut transfer = TransferProgress::new(total_bytes);
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(CopyOutcome::Cancelled),
            read = reader.read(&mut buffer) => {
                read.map_err(|e| Error::storage("copying stream to", path.as_path(), e))?
            }
        };
        if read == 0 {
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(CopyOutcome::Cancelled),
            written = writer.write_all(&buffer[..read]) => {
                written.map_err(|e| Error::storage("writing to", path.as_path(), e))?
            }
        }

        progress.update(transfer.advance(read));
    }

    Ok(CopyOutcome::Completed(transfer.current_bytes))
}

/// `video/mp4; codecs="avc1"` -> `video/mp4`
fn media_type_essence(mime_type: &str) -> String {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    if essence.is_empty() {
        "application/octet-stream".to_string()
    } else {
        essence.to_ascii_lowercase()
    }
}
