use super::Notifier;
use crate::error::NotifyError;
use crate::types::Notification;
use async_trait::async_trait;
use std::time::Duration;

/// Runs a local notification program (`termux-notification` by default)
///
/// Invoked as `{program} --title <title> --content <message>`.
#[derive(Clone, Debug)]
pub struct CommandNotifier {
    program: String,
    timeout: Duration,
}

impl CommandNotifier {
    /// Create a notifier running `program`, killed after `timeout`
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let output = tokio::process::Command::new(&self.program)
            .arg("--title")
            .arg(&notification.title)
            .arg("--content")
            .arg(&notification.message)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) if output.status.success() => {
                tracing::debug!(command = %self.program, "notification command succeeded");
                Ok(())
            }
            Ok(Ok(output)) => {
                tracing::warn!(
                    command = %self.program,
                    code = ?output.status.code(),
                    "notification command failed"
                );
                Err(NotifyError::Command {
                    command: self.program.clone(),
                    reason: format!("exited with {}", output.status),
                })
            }
            Ok(Err(e)) => {
                tracing::warn!(command = %self.program, error = %e, "failed to run notification command");
                Err(NotifyError::Command {
                    command: self.program.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                tracing::warn!(command = %self.program, timeout = ?self.timeout, "notification command timed out");
                Err(NotifyError::Timeout(self.timeout))
            }
        }
    }

    fn name(&self) -> &str {
        "command"
    }
}
