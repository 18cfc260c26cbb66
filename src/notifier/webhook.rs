use super::Notifier;
use crate::config::{NotifierConfig, WebhookMethod};
use crate::error::NotifyError;
use crate::types::{Notification, WebhookPayload};
use async_trait::async_trait;
use std::time::Duration;

/// Sends a JSON `{url, to}` payload to a webhook endpoint
///
/// The body goes out on a GET request unless [`WebhookMethod::Post`] is
/// configured.
///
/// `url` is the public retrieval link of the item, built from the configured
/// base URL and the item id carried in the notification message.
#[derive(Clone, Debug)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
    method: WebhookMethod,
    public_base_url: String,
    auth_header: Option<String>,
    timeout: Duration,
}

impl WebhookNotifier {
    /// Create a notifier sending GET requests to `endpoint`
    pub fn new(
        endpoint: impl Into<String>,
        public_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            method: WebhookMethod::default(),
            public_base_url: public_base_url.into(),
            auth_header: None,
            timeout,
        }
    }

    /// Create a notifier from the notifier section of the configuration
    pub fn from_config(config: &NotifierConfig) -> Self {
        Self::new(
            config.webhook_url.clone(),
            config.public_base_url.clone(),
            config.timeout,
        )
        .with_method(config.method)
        .with_auth_header(config.auth_header.clone())
    }

    /// Use `method` for every request
    #[must_use]
    pub fn with_method(mut self, method: WebhookMethod) -> Self {
        self.method = method;
        self
    }

    /// Send `Authorization: {value}` with every request
    #[must_use]
    pub fn with_auth_header(mut self, value: Option<String>) -> Self {
        self.auth_header = value;
        self
    }

    /// Public retrieval URL for an item id
    pub fn retrieval_url(&self, id: &str) -> String {
        format!("{}/video/{}", self.public_base_url.trim_end_matches('/'), id)
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            url: self.retrieval_url(&notification.message),
            to: notification.recipient.clone(),
        };
        let body = serde_json::to_vec(&payload)?;

        let mut request = self
            .client
            .request(self.method.as_reqwest(), &self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        if let Some(auth) = &self.auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(url = %self.endpoint, error = %e, "webhook failed");
                return Err(NotifyError::Transport(e));
            }
            Err(_) => {
                tracing::warn!(url = %self.endpoint, timeout = ?self.timeout, "webhook timeout");
                return Err(NotifyError::Timeout(self.timeout));
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %self.endpoint, status = status.as_u16(), "webhook failed");
            return Err(NotifyError::Status(status.as_u16()));
        }

        tracing::debug!(url = %self.endpoint, item = %payload.url, "webhook sent successfully");
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
