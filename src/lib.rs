//! # media-dl
//!
//! Fetch a remote media resource, store it locally, announce it, and serve it
//! back over HTTP exactly once.
//!
//! ## Pipeline
//!
//! - The [`Downloader`] resolves a URL through a [`Fetcher`], streams the first
//!   offered encoding to `{video_dir}/{id}.{ext}` while reporting to a
//!   [`ProgressSink`], saves a [`StoredItem`] in the [`RecordStore`] and calls
//!   the configured [`Notifier`].
//! - The HTTP API ([`api`]) starts downloads in the background and serves each
//!   stored file once; the file and its record are deleted when the transfer
//!   ends, fails or is abandoned.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{
//!     Config, DownloadRequest, Downloader, HttpFetcher, LocalFileSystem, RecordStore,
//!     TerminalProgress,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::load(None)?);
//!     config.ensure_dirs().await?;
//!
//!     let downloader = Downloader::new(
//!         config.clone(),
//!         Arc::new(HttpFetcher::default()),
//!         Arc::new(LocalFileSystem),
//!         Arc::new(RecordStore::new()),
//!         media_dl::notifier::from_config(&config.notifier),
//!     );
//!
//!     let request = DownloadRequest::new("https://example.com/clip.mp4");
//!     let completed = downloader
//!         .download(&request, &TerminalProgress::new(), &CancellationToken::new())
//!         .await?;
//!     println!("stored {} as {}", completed.id, completed.path.display());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP API module
pub mod api;
/// Configuration types
pub mod config;
/// Download orchestrator
pub mod downloader;
/// Error types
pub mod error;
/// Resource fetching capability
pub mod fetcher;
/// Filename sanitization
pub mod filename;
/// File-system port
pub mod fs;
/// Log setup for the binary
pub mod logging;
/// Outbound notifications
pub mod notifier;
/// Progress sinks
pub mod progress;
/// Record store
pub mod store;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{
    Config, NotifierConfig, NotifierKind, ServerConfig, StorageConfig, WebhookMethod,
};
pub use downloader::{CompletedDownload, Downloader, OpenFile};
pub use error::{ApiError, ErrorDetail, Error, NotifyError, Result, ToHttpStatus};
pub use fetcher::{Fetcher, HttpFetcher};
pub use fs::{FileSystem, LocalFileSystem};
pub use notifier::{CommandNotifier, Notifier, WebhookNotifier};
pub use progress::{LogProgress, NoProgress, ProgressSink, TerminalProgress};
pub use store::RecordStore;
pub use types::{DownloadRequest, ItemId, Notification, StoredItem, TransferProgress};

/// Wait for a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Used by the HTTP server for graceful shutdown and by the CLI to cancel a
/// running transfer.
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Wait for a termination signal (Ctrl+C).
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
