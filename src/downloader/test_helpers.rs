//! Shared fakes for exercising the orchestrator and the API in tests.

use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::{BoxError, NotifyError};
use crate::fetcher::{ByteStream, Encoding, Fetcher, OpenedStream, ResourceInfo};
use crate::fs::{FileSystem, FileWriter, LocalFileSystem};
use crate::notifier::Notifier;
use crate::progress::ProgressSink;
use crate::store::RecordStore;
use crate::types::Notification;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tempfile::tempdir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};

/// How the scripted stream behaves after delivering its body
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StreamEnd {
    /// End of stream
    Eof,
    /// Never ends (until the transfer is cancelled)
    Stall,
    /// Fails with an I/O error
    Fail,
    /// Delivered in two chunks with a pause between them
    Chunked,
}

/// Fetcher returning a fixed title, encoding and body
///
/// Resolving the URL "bad" fails with "video not found".
pub(crate) struct ScriptedFetcher {
    pub(crate) title: String,
    pub(crate) encodings: Vec<Encoding>,
    pub(crate) body: Vec<u8>,
    pub(crate) announced_bytes: Option<u64>,
    pub(crate) end: StreamEnd,
    pub(crate) fail_open: bool,
    pub(crate) resolved: AtomicUsize,
    held: Mutex<Vec<DuplexStream>>,
}

impl ScriptedFetcher {
    pub(crate) fn video(title: &str, mime_type: &str, body: &[u8]) -> Self {
        Self {
            title: title.to_string(),
            encodings: vec![Encoding {
                mime_type: mime_type.to_string(),
                content_length: Some(body.len() as u64),
                url: "scripted://stream".to_string(),
            }],
            body: body.to_vec(),
            announced_bytes: None,
            end: StreamEnd::Eof,
            fail_open: false,
            resolved: AtomicUsize::new(0),
            held: Mutex::new(Vec::new()),
        }
    }

    /// The scenario fetcher: "Test Video", one `video/mp4` encoding, "video_content"
    pub(crate) fn test_video() -> Self {
        Self::video("Test Video", "video/mp4", b"video_content")
    }

    pub(crate) fn with_end(mut self, end: StreamEnd) -> Self {
        self.end = end;
        self
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn resolve(&self, url: &str) -> Result<ResourceInfo, BoxError> {
        self.resolved.fetch_add(1, Ordering::SeqCst);
        if url == "bad" {
            return Err("video not found".into());
        }
        Ok(ResourceInfo {
            title: self.title.clone(),
            encodings: self.encodings.clone(),
        })
    }

    async fn open_stream(
        &self,
        _info: &ResourceInfo,
        _encoding: &Encoding,
    ) -> Result<OpenedStream, BoxError> {
        if self.fail_open {
            return Err("stream unavailable".into());
        }

        let total_bytes = self.announced_bytes.unwrap_or(self.body.len() as u64);
        let reader: ByteStream = match self.end {
            StreamEnd::Eof => Box::pin(io::Cursor::new(self.body.clone())),
            StreamEnd::Fail => Box::pin(io::Cursor::new(self.body.clone()).chain(FailingReader)),
            StreamEnd::Chunked => {
                let (head, tail) = self.body.split_at(self.body.len() / 2);
                Box::pin(
                    tokio_test::io::Builder::new()
                        .read(head)
                        .wait(std::time::Duration::from_millis(10))
                        .read(tail)
                        .build(),
                )
            }
            StreamEnd::Stall => {
                let (mut tx, rx) = tokio::io::duplex(self.body.len().max(1));
                tx.write_all(&self.body).await?;
                // Holding the writer keeps the reader pending after the body
                self.held.lock().unwrap().push(tx);
                Box::pin(rx)
            }
        };

        Ok(OpenedStream {
            reader,
            total_bytes,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Reader that always fails
struct FailingReader;

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset",
        )))
    }
}

/// One observed progress event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ProgressEvent {
    Start(u64),
    Update(u64),
    Finish,
}

/// Progress sink recording every call
#[derive(Default)]
pub(crate) struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub(crate) fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn updates(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Update(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn start(&self, total: u64) {
        self.events.lock().unwrap().push(ProgressEvent::Start(total));
    }

    fn update(&self, current: u64) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::Update(current));
    }

    fn finish(&self) {
        self.events.lock().unwrap().push(ProgressEvent::Finish);
    }
}

/// Notifier recording every notification, optionally failing
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) fail_with_status: Option<u16>,
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(crate) fn failing(status: u16) -> Self {
        Self {
            fail_with_status: Some(status),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        match self.fail_with_status {
            Some(status) => Err(NotifyError::Status(status)),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Which file-system operation fails
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FailAt {
    Create,
    Write,
    Close,
}

/// File system whose create, write or close fails; counts removals
pub(crate) struct FailingFileSystem {
    pub(crate) fail_at: FailAt,
    pub(crate) removes: AtomicUsize,
}

impl FailingFileSystem {
    pub(crate) fn new(fail_at: FailAt) -> Self {
        Self {
            fail_at,
            removes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FileSystem for FailingFileSystem {
    async fn create_new(&self, path: &Path) -> io::Result<FileWriter> {
        match self.fail_at {
            FailAt::Create => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("read-only: {}", path.display()),
            )),
            fail_at => Ok(Box::new(FailingWriter { fail_at })),
        }
    }

    async fn remove(&self, _path: &Path) -> io::Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingWriter {
    fail_at: FailAt,
}

impl AsyncWrite for FailingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.fail_at == FailAt::Write {
            Poll::Ready(Err(io::Error::other("disk full")))
        } else {
            Poll::Ready(Ok(buf.len()))
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.fail_at == FailAt::Close {
            Poll::Ready(Err(io::Error::other("bad file descriptor")))
        } else {
            Poll::Ready(Ok(()))
        }
    }
}

/// Config whose directories live inside `root`, with notifications disabled
pub(crate) fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.storage.video_dir = root.join("videos");
    config.storage.log_dir = root.join("logs");
    config.storage.config_dir = root.join("config");
    config.notifier.kind = crate::config::NotifierKind::None;
    std::fs::create_dir_all(&config.storage.video_dir).unwrap();
    config
}

/// Helper to create a test Downloader writing to a temporary video directory.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(
    fetcher: Arc<dyn Fetcher>,
    notifier: Option<Arc<dyn Notifier>>,
) -> (Downloader, tempfile::TempDir) {
    create_test_downloader_with_fs(fetcher, Arc::new(LocalFileSystem), notifier)
}

/// Like [`create_test_downloader`] with a custom file system
pub(crate) fn create_test_downloader_with_fs(
    fetcher: Arc<dyn Fetcher>,
    fs: Arc<dyn FileSystem>,
    notifier: Option<Arc<dyn Notifier>>,
) -> (Downloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = Arc::new(test_config(temp_dir.path()));
    let store = Arc::new(RecordStore::new());

    let downloader = Downloader::new(config, fetcher, fs, store, notifier);
    (downloader, temp_dir)
}

/// Files currently in the downloader's video directory
pub(crate) fn stored_files(downloader: &Downloader) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(downloader.config().video_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    files.sort();
    files
}
