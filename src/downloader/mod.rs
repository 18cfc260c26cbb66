//! Download orchestrator
//!
//! The [`Downloader`] drives one transfer from a resource URL to a stored,
//! notified item:
//! - [`transfer`] - resolve, open, copy, persist and notify
//! - [`control`] - cancellation of an open destination file

mod control;
mod transfer;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::fs::{FileSystem, FileWriter};
use crate::notifier::Notifier;
use crate::store::RecordStore;
use crate::types::{ItemId, StoredItem};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Size of the buffer used by the copy loop
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Download orchestrator (cloneable - all fields are Arc-wrapped)
///
/// Every collaborator is injected at construction; the orchestrator holds no
/// process-wide state.
#[derive(Clone)]
pub struct Downloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Resolves resources and opens their streams
    pub(crate) fetcher: Arc<dyn Fetcher>,
    /// Creates and removes destination files
    pub(crate) fs: Arc<dyn FileSystem>,
    /// Records of completed items, shared with the serving endpoint
    pub(crate) store: Arc<RecordStore>,
    /// Optional notifier called once per completed item
    pub(crate) notifier: Option<Arc<dyn Notifier>>,
}

/// A destination file opened for the duration of one transfer
///
/// Consumed by [`Downloader::cancel`], so a handle cannot be cancelled twice.
pub struct OpenFile {
    path: PathBuf,
    writer: FileWriter,
}

impl OpenFile {
    pub(crate) fn new(path: PathBuf, writer: FileWriter) -> Self {
        Self { path, writer }
    }

    /// Location of the file on disk
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for OpenFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenFile")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Outcome of a successful transfer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedDownload {
    /// Identifier minted for the item
    pub id: ItemId,
    /// The record saved in the store
    pub item: StoredItem,
    /// Bytes actually written to disk
    pub bytes_written: u64,
    /// Location of the stored file
    pub path: PathBuf,
}

impl Downloader {
    /// Create an orchestrator from its collaborators
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn Fetcher>,
        fs: Arc<dyn FileSystem>,
        store: Arc<RecordStore>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            config,
            fetcher,
            fs,
            store,
            notifier,
        }
    }

    /// The record store completed items are saved to
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// The configuration this orchestrator was built with
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }
}
