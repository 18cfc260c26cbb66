//! Serving stored items exactly once
//!
//! A stored file is streamed to the client through a [`CleanupReader`]. Its
//! [`CleanupGuard`] deletes the file and its record once, whichever comes
//! first: a read error, the end of the file, or the reader being dropped
//! (response finished, client gone, or an early return from the handler).

use crate::error::{Error, Result};
use crate::store::RecordStore;
use crate::types::{ItemId, StoredItem};
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::fs::Metadata;
use std::io::{self, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, ready};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, ReadBuf};
use tokio_util::io::ReaderStream;

/// Deletes a served file and its record, at most once
///
/// Runs on [`CleanupGuard::run`] or on drop, whichever happens first.
#[derive(Debug)]
pub struct CleanupGuard {
    id: ItemId,
    path: PathBuf,
    store: Arc<RecordStore>,
    done: AtomicBool,
}

impl CleanupGuard {
    /// Arm a guard for the file at `path` backing item `id`
    pub fn new(id: ItemId, path: PathBuf, store: Arc<RecordStore>) -> Self {
        Self {
            id,
            path,
            store,
            done: AtomicBool::new(false),
        }
    }

    /// Whether the cleanup has already run
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Remove the file, then the record; later calls do nothing
    pub fn run(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(id = %self.id, path = %self.path.display(), "removed served file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(id = %self.id, path = %self.path.display(), "served file already gone");
            }
            Err(e) => {
                tracing::warn!(id = %self.id, path = %self.path.display(), error = %e, "failed to remove served file");
            }
        }

        if self.store.remove(&self.id).is_err() {
            tracing::debug!(id = %self.id, "record already removed");
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.run();
    }
}

/// Seekable reader over a served file that triggers its [`CleanupGuard`]
///
/// End of file and read errors close the file and run the guard. Seeks are
/// forwarded untouched.
#[derive(Debug)]
pub struct CleanupReader {
    // Field order matters on drop: the file closes before the guard runs
    file: Option<File>,
    guard: CleanupGuard,
}

impl CleanupReader {
    /// Wrap an opened file
    pub fn new(file: File, guard: CleanupGuard) -> Self {
        Self {
            file: Some(file),
            guard,
        }
    }

    /// Close the file and run the cleanup
    pub fn finish(&mut self) {
        self.file.take();
        self.guard.run();
    }

    /// Whether the cleanup has already run
    pub fn is_finished(&self) -> bool {
        self.guard.is_done()
    }
}

impl AsyncRead for CleanupReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let Some(file) = this.file.as_mut() else {
            return Poll::Ready(Ok(()));
        };

        let before = buf.filled().len();
        let result = ready!(Pin::new(file).poll_read(cx, buf));
        match &result {
            Ok(()) if buf.filled().len() == before && buf.remaining() > 0 => this.finish(),
            Ok(()) => {}
            Err(e) => {
                tracing::warn!(id = %this.guard.id, error = %e, "read error while serving");
                this.finish();
            }
        }
        Poll::Ready(result)
    }
}

impl AsyncSeek for CleanupReader {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        match self.get_mut().file.as_mut() {
            Some(file) => Pin::new(file).start_seek(position),
            None => Err(io::Error::other("served file already closed")),
        }
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        match self.get_mut().file.as_mut() {
            Some(file) => Pin::new(file).poll_complete(cx),
            None => Poll::Ready(Err(io::Error::other("served file already closed"))),
        }
    }
}

/// Join `name` onto `root` and check the result stays inside `root`
///
/// Both paths are made absolute and normalized lexically, without touching
/// the file system, so traversal segments and absolute names are rejected
/// even when the target does not exist.
pub fn resolve_within(root: &Path, name: &str) -> Result<PathBuf> {
    let root = std::path::absolute(root)
        .map(|p| normalize_lexically(&p))
        .map_err(|e| Error::Forbidden(format!("cannot resolve storage root: {e}")))?;
    let candidate = normalize_lexically(&root.join(name));

    if candidate == root || !candidate.starts_with(&root) {
        return Err(Error::Forbidden(format!("{name} escapes the storage root")));
    }
    Ok(candidate)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// A parsed `Range` header against a file of known length
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteRange {
    /// No (usable) range: send the whole file
    Full,
    /// Inclusive byte range
    Partial {
        /// First byte offset
        start: u64,
        /// Last byte offset (inclusive)
        end: u64,
    },
    /// The range cannot be satisfied (416)
    Unsatisfiable,
}

impl ByteRange {
    /// Parse a single `bytes=` range
    ///
    /// Malformed headers and multi-range requests are ignored (whole file).
    pub fn parse(header: Option<&str>, len: u64) -> Self {
        let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
            return ByteRange::Full;
        };
        if spec.contains(',') {
            return ByteRange::Full;
        }
        let Some((start, end)) = spec.split_once('-') else {
            return ByteRange::Full;
        };
        let (start, end) = (start.trim(), end.trim());

        match (start.parse::<u64>(), end.parse::<u64>()) {
            // bytes=-N: the last N bytes
            (Err(_), Ok(suffix)) if start.is_empty() => {
                if suffix == 0 || len == 0 {
                    ByteRange::Unsatisfiable
                } else {
                    ByteRange::Partial {
                        start: len.saturating_sub(suffix),
                        end: len - 1,
                    }
                }
            }
            // bytes=A-
            (Ok(start), Err(_)) if end.is_empty() => {
                if start >= len {
                    ByteRange::Unsatisfiable
                } else {
                    ByteRange::Partial { start, end: len - 1 }
                }
            }
            // bytes=A-B
            (Ok(start), Ok(end)) if start <= end => {
                if start >= len {
                    ByteRange::Unsatisfiable
                } else {
                    ByteRange::Partial {
                        start,
                        end: end.min(len - 1),
                    }
                }
            }
            _ => ByteRange::Full,
        }
    }
}

/// Response for `GET /video/:id`
///
/// Unknown ids answer 404 without touching the file system. Once the record
/// is found and its path is contained in the video directory, the cleanup is
/// armed: every later outcome, including errors, deletes the file and record.
pub async fn serve_item(
    store: &Arc<RecordStore>,
    video_dir: &Path,
    cache_max_age: Duration,
    id: &ItemId,
    headers: &HeaderMap,
) -> Result<Response> {
    let item = store.get(id)?;
    let path = resolve_within(video_dir, &item.stored_name)?;

    let guard = CleanupGuard::new(id.clone(), path.clone(), store.clone());

    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(id = %id, path = %path.display(), "record without file, dropping record");
            return Err(Error::NotFound(format!("file for item {id}")));
        }
        Err(e) => return Err(Error::storage("opening", &path, e)),
    };
    let metadata = file
        .metadata()
        .await
        .map_err(|e| Error::storage("reading metadata of", &path, e))?;
    let len = metadata.len();

    let mut reader = CleanupReader::new(file, guard);
    let mut response_headers = item_headers(&item, &metadata, cache_max_age);

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let (status, body) = match ByteRange::parse(range_header, len) {
        ByteRange::Full => (StatusCode::OK, Body::from_stream(ReaderStream::new(reader))),
        ByteRange::Partial { start, end } => {
            reader
                .seek(SeekFrom::Start(start))
                .await
                .map_err(|e| Error::storage("seeking in", &path, e))?;
            let count = end - start + 1;
            response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(count));
            response_headers.insert(
                header::CONTENT_RANGE,
                header_value(&format!("bytes {start}-{end}/{len}")),
            );
            (
                StatusCode::PARTIAL_CONTENT,
                Body::from_stream(ReaderStream::new(reader.take(count))),
            )
        }
        ByteRange::Unsatisfiable => {
            response_headers.remove(header::CONTENT_LENGTH);
            response_headers.insert(
                header::CONTENT_RANGE,
                header_value(&format!("bytes */{len}")),
            );
            (StatusCode::RANGE_NOT_SATISFIABLE, Body::empty())
        }
    };

    tracing::info!(id = %id, bytes = len, status = status.as_u16(), "serving item");
    Ok((status, response_headers, body).into_response())
}

/// Headers-only response for `HEAD /video/:id`
///
/// Never arms the cleanup: the file and record stay in place for the `GET`
/// that actually transfers them.
pub async fn describe_item(
    store: &RecordStore,
    video_dir: &Path,
    cache_max_age: Duration,
    id: &ItemId,
) -> Result<Response> {
    let item = store.get(id)?;
    let path = resolve_within(video_dir, &item.stored_name)?;

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!("file for item {id}")));
        }
        Err(e) => return Err(Error::storage("reading metadata of", &path, e)),
    };

    let headers = item_headers(&item, &metadata, cache_max_age);
    Ok((StatusCode::OK, headers).into_response())
}

/// Entity headers shared by `GET` and `HEAD`
fn item_headers(item: &StoredItem, metadata: &Metadata, cache_max_age: Duration) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, header_value(&item.media_type));
    headers.insert(
        header::CONTENT_DISPOSITION,
        header_value(&format!(
            "attachment; filename=\"{}\"",
            item.attachment_name()
        )),
    );
    headers.insert(
        header::CACHE_CONTROL,
        header_value(&format!("private, max-age={}", cache_max_age.as_secs())),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    if let Ok(modified) = metadata.modified() {
        headers.insert(
            header::LAST_MODIFIED,
            header_value(&httpdate::fmt_http_date(modified)),
        );
    }
    headers
}

/// Header value from arbitrary text; non-ASCII bytes are sent as-is
fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_bytes(value.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}
