//! Application state for the API server

use crate::{Config, Downloader, RecordStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the downloader, the record store and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The download orchestrator
    pub downloader: Arc<Downloader>,

    /// Configuration (read-only)
    pub config: Arc<Config>,

    /// Cancelled when the server shuts down; transfers run on child tokens
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<Downloader>, config: Arc<Config>) -> Self {
        Self {
            downloader,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// The record store shared with the downloader
    pub fn store(&self) -> &Arc<RecordStore> {
        self.downloader.store()
    }
}
