//! Resource fetching capability
//!
//! Given a resource URL, a [`Fetcher`] reports metadata (title and available
//! encodings) and opens a byte stream for one encoding. The orchestrator treats
//! it as opaque and wraps every failure with its own context.

use crate::error::BoxError;
use async_trait::async_trait;
use std::pin::Pin;
use tokio::io::AsyncRead;

mod http;

pub use http::HttpFetcher;

/// Readable byte stream of one encoding
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// One container/codec variant offered by the source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encoding {
    /// MIME type, possibly with parameters (`video/mp4; codecs="avc1"`)
    pub mime_type: String,
    /// Size announced by the source, when known up front
    pub content_length: Option<u64>,
    /// Where this encoding's bytes are fetched from
    pub url: String,
}

/// Metadata resolved for a resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceInfo {
    /// Human title of the resource
    pub title: String,
    /// Available encodings, in the source's preference order
    pub encodings: Vec<Encoding>,
}

impl ResourceInfo {
    /// The encoding to download: the first one offered
    pub fn preferred_encoding(&self) -> Option<&Encoding> {
        self.encodings.first()
    }
}

/// An opened stream and the total size announced for it
pub struct OpenedStream {
    /// The bytes of the encoding
    pub reader: ByteStream,
    /// Total length announced by the source (the stream may deliver fewer bytes)
    pub total_bytes: u64,
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream")
            .field("total_bytes", &self.total_bytes)
            .finish_non_exhaustive()
    }
}

/// Resolves resources and opens their byte streams
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Resolve metadata for `url`
    ///
    /// # Errors
    ///
    /// Fails when the resource does not exist, the identifier is malformed or
    /// the network is unavailable.
    async fn resolve(&self, url: &str) -> Result<ResourceInfo, BoxError>;

    /// Open the byte stream of `encoding`
    async fn open_stream(
        &self,
        info: &ResourceInfo,
        encoding: &Encoding,
    ) -> Result<OpenedStream, BoxError>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}
