//! Outbound notifications about completed downloads
//!
//! A [`Notifier`] makes one attempt to deliver a [`Notification`]. There is no
//! retry or queueing; the outcome is reported back to the orchestrator as-is.

use crate::config::{NotifierConfig, NotifierKind};
use crate::error::NotifyError;
use crate::types::Notification;
use async_trait::async_trait;
use std::sync::Arc;

mod command;
mod webhook;

pub use command::CommandNotifier;
pub use webhook::WebhookNotifier;

/// Delivers a single notification to an external recipient
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `notification`, making exactly one attempt
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

/// Build the notifier selected by the configuration
///
/// Returns `None` for [`NotifierKind::None`].
pub fn from_config(config: &NotifierConfig) -> Option<Arc<dyn Notifier>> {
    match config.kind {
        NotifierKind::Webhook => Some(Arc::new(WebhookNotifier::from_config(config))),
        NotifierKind::Command => Some(Arc::new(CommandNotifier::new(
            config.command.clone(),
            config.timeout,
        ))),
        NotifierKind::None => None,
    }
}
