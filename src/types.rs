//! Core types shared by the orchestrator, the record store and the API

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Unique identifier minted once per completed download
///
/// Joins the stored record, the on-disk filename and the retrieval URL.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Mint a fresh, globally unique identifier (UUID v4)
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Record of a completed download, owned by the record store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredItem {
    /// URL the media was fetched from
    pub source_url: String,

    /// Human filename derived from the resolved title (no extension)
    pub filename: String,

    /// Who asked for the download (may be empty for CLI invocations)
    pub requester: String,

    /// MIME type of the chosen encoding (e.g., "video/mp4")
    pub media_type: String,

    /// Name of the backing file inside the video directory (`{id}.{ext}`)
    pub stored_name: String,

    /// When the transfer finished
    pub created_at: DateTime<Utc>,
}

impl StoredItem {
    /// Extension of the backing file, if any
    pub fn extension(&self) -> Option<&str> {
        std::path::Path::new(&self.stored_name)
            .extension()
            .and_then(|e| e.to_str())
    }

    /// Filename offered to HTTP clients in `Content-Disposition`
    pub fn attachment_name(&self) -> String {
        match self.extension() {
            Some(ext) => format!("{}.{}", self.filename, ext),
            None => self.filename.clone(),
        }
    }
}

/// A request to download one resource
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// Resource URL (required)
    #[serde(default)]
    pub url: String,

    /// Requester identity (required on the network-facing entry point)
    #[serde(default)]
    pub requester: Option<String>,
}

impl DownloadRequest {
    /// Create a request for a single-user invocation (no requester)
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            requester: None,
        }
    }

    /// Attach a requester identity
    #[must_use]
    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    /// Check required fields, naming the first one that is missing
    pub fn validate(&self, require_requester: bool) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::MissingField("url"));
        }
        if require_requester && self.requester().trim().is_empty() {
            return Err(Error::MissingField("requester"));
        }
        Ok(())
    }

    /// Requester identity, empty when none was given
    pub fn requester(&self) -> &str {
        self.requester.as_deref().unwrap_or("")
    }
}

/// One outbound notification about a completed item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Resolved title of the media
    pub title: String,
    /// Message body; carries the item identifier
    pub message: String,
    /// Who should receive the notification
    pub recipient: String,
}

/// JSON body sent to the webhook endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Public retrieval URL of the stored item
    pub url: String,
    /// Recipient of the notification
    pub to: String,
}

/// Byte counters for a single transfer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferProgress {
    /// Size announced by the source (may differ from what is delivered)
    pub total_bytes: u64,
    /// Bytes written to disk so far
    pub current_bytes: u64,
}

impl TransferProgress {
    /// Start tracking a transfer of `total_bytes`
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            current_bytes: 0,
        }
    }

    /// Record `written` more bytes and return the cumulative count
    pub fn advance(&mut self, written: usize) -> u64 {
        self.current_bytes = self.current_bytes.saturating_add(written as u64);
        self.current_bytes
    }
}

/// Acknowledgement returned by the start-download endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StartDownloadResponse {
    /// Always "download started"
    pub message: String,
}

impl StartDownloadResponse {
    /// The acknowledgement sent once a transfer has been dispatched
    pub fn started() -> Self {
        Self {
            message: "download started".to_string(),
        }
    }
}
