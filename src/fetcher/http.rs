//! Plain HTTP(S) fetcher
//!
//! Resolves a direct media URL with a HEAD request (title from
//! `Content-Disposition` or the URL path, a single encoding from
//! `Content-Type`) and streams it with a GET.

use super::{Encoding, Fetcher, OpenedStream, ResourceInfo};
use crate::error::BoxError;
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use tokio_util::io::StreamReader;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// [`Fetcher`] for resources served directly over HTTP(S)
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher using the given client
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn resolve(&self, url: &str) -> Result<ResourceInfo, BoxError> {
        let parsed =
            url::Url::parse(url).map_err(|e| format!("malformed resource URL '{url}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("unsupported scheme '{}' in '{url}'", parsed.scheme()).into());
        }

        let response = self.client.head(parsed).send().await?;
        if !response.status().is_success() {
            return Err(format!("resource {url} answered {}", response.status()).into());
        }

        let headers = response.headers();
        let mime_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let title = title_from_headers(headers, url);

        tracing::debug!(url = %url, title = %title, mime_type = %mime_type, "resolved resource");

        Ok(ResourceInfo {
            title,
            encodings: vec![Encoding {
                mime_type,
                content_length,
                url: response.url().to_string(),
            }],
        })
    }

    async fn open_stream(
        &self,
        _info: &ResourceInfo,
        encoding: &Encoding,
    ) -> Result<OpenedStream, BoxError> {
        let response = self
            .client
            .get(&encoding.url)
            .send()
            .await?
            .error_for_status()?;

        let total_bytes = response
            .content_length()
            .or(encoding.content_length)
            .unwrap_or(0);
        let body = response.bytes_stream().map_err(std::io::Error::other);

        Ok(OpenedStream {
            reader: Box::pin(StreamReader::new(body)),
            total_bytes,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Extract a title from `Content-Disposition`, falling back to the URL path
///
/// The extension is dropped. Returns "download" when nothing useful is found.
fn title_from_headers(headers: &HeaderMap, url: &str) -> String {
    if let Some(value) = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
    {
        // attachment; filename="file.mp4" or filename*=UTF-8''file.mp4
        for part in value.split(';').map(str::trim) {
            if let Some(filename) = part.strip_prefix("filename*=") {
                if let Some(idx) = filename.rfind('\'')
                    && let Ok(decoded) = urlencoding::decode(&filename[idx + 1..])
                {
                    return file_stem(&decoded);
                }
            } else if let Some(filename) = part.strip_prefix("filename=") {
                return file_stem(filename.trim_matches('"'));
            }
        }
    }

    if let Ok(parsed) = url::Url::parse(url)
        && let Some(mut segments) = parsed.path_segments()
        && let Some(last) = segments.next_back()
        && !last.is_empty()
    {
        let decoded = urlencoding::decode(last)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| last.to_string());
        return file_stem(&decoded);
    }

    "download".to_string()
}

fn file_stem(name: &str) -> String {
    std::path::Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}
