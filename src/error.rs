//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - One variant per failure kind of the download and serving pipeline
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::ItemId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error used at capability boundaries (fetchers, custom backends)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for media-dl
///
/// Each variant carries the context of the operation that was being attempted
/// so callers can print a meaningful message without extra wrapping.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "video_dir")
        key: Option<String>,
    },

    /// Resolving resource metadata failed. Nothing was written to disk.
    #[error("error fetching resource info for {url}: {source}")]
    Fetch {
        /// The resource URL that could not be resolved
        url: String,
        /// Underlying cause reported by the fetcher
        #[source]
        source: BoxError,
    },

    /// Opening the byte stream failed. Nothing was written to disk.
    #[error("error opening stream for {url}: {source}")]
    Stream {
        /// The resource URL whose stream could not be opened
        url: String,
        /// Underlying cause reported by the fetcher
        #[source]
        source: BoxError,
    },

    /// Local file create/write/close/remove failed
    ///
    /// A partial file may remain on disk; reconciling it is the caller's concern.
    #[error("storage error while {operation} {}: {source}", path.display())]
    Storage {
        /// What was being attempted (e.g., "creating file", "writing to")
        operation: &'static str,
        /// The file the operation targeted
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The external notification failed. The download itself is complete.
    #[error("error notifying about item {id}: {source}")]
    Notify {
        /// Identifier of the completed item
        id: ItemId,
        /// Why the notification failed
        #[source]
        source: NotifyError,
    },

    /// The transfer was cancelled before completion and its partial file removed
    #[error("download {id} cancelled")]
    Cancelled {
        /// Identifier minted for the cancelled transfer
        id: ItemId,
    },

    /// Lookup miss in the record store or on disk
    #[error("not found: {0}")]
    NotFound(String),

    /// Path containment violation
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A required request field was missing or empty
    #[error("{0} parameter is required")]
    MissingField(&'static str),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

impl Error {
    /// Build a [`Error::Storage`] for the given operation and path
    pub(crate) fn storage(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Error::Storage {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Notification failures
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The endpoint answered with a non-success status code
    #[error("received non-success response: {0}")]
    Status(u16),

    /// The request could not be sent
    #[error("error sending request: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint did not answer in time
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A notification command failed to run or exited unsuccessfully
    #[error("command `{command}` failed: {reason}")]
    Command {
        /// The command that was executed
        command: String,
        /// Exit status or spawn error
        reason: String,
    },

    /// The payload could not be encoded
    #[error("error creating json payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "not found: item 3f1c...",
///     "details": { "id": "3f1c..." }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "missing_field")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::MissingField(_) => 400,
            Error::Config { .. } => 400,

            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,

            // 502 Bad Gateway - the remote side failed
            Error::Fetch { .. } => 502,
            Error::Stream { .. } => 502,
            Error::Notify { .. } => 502,

            // 500 Internal Server Error - Server-side issues
            Error::Storage { .. } => 500,
            Error::Cancelled { .. } => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Fetch { .. } => "fetch_error",
            Error::Stream { .. } => "stream_error",
            Error::Storage { .. } => "storage_error",
            Error::Notify { .. } => "notify_error",
            Error::Cancelled { .. } => "cancelled",
            Error::NotFound(_) => "not_found",
            Error::Forbidden(_) => "forbidden",
            Error::MissingField(_) => "missing_field",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::MissingField(field) => Some(serde_json::json!({ "field": field })),
            Error::Notify { id, .. } | Error::Cancelled { id } => {
                Some(serde_json::json!({ "id": id }))
            }
            Error::Fetch { url, .. } | Error::Stream { url, .. } => {
                Some(serde_json::json!({ "url": url }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
