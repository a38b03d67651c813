#![cfg(feature = "runtime")]

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::diff::json_patch;
use crate::settings::SlackSettings;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifications are disabled: no webhook URL configured")]
    Disabled,
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook responded with status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
}

/// Posts human-readable messages to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
    channel: Option<String>,
}

impl SlackNotifier {
    pub fn from_settings(settings: &SlackSettings) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self {
            client,
            webhook_url: settings.webhook_url.clone(),
            channel: settings.channel.clone(),
        })
    }

    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: None,
            channel: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = self.webhook_url.as_deref().ok_or(NotifyError::Disabled)?;
        let message = SlackMessage {
            text,
            channel: self.channel.as_deref(),
        };

        let response = self.client.post(url).json(&message).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(status = status.as_u16(), "slack notification delivered");
        Ok(())
    }

    /// Reports a metadata edit. Returns the delivery task, or `None` when disabled.
    /// Delivery failures are logged and never reach the caller.
    pub fn notify_metadata_change(
        &self,
        user: &str,
        dataset_id: &str,
        old_metadata: &Value,
        new_metadata: &Value,
    ) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }
        let text = metadata_change_message(user, dataset_id, old_metadata, new_metadata);
        Some(self.dispatch(text, "metadata_change"))
    }

    pub fn notify_update_failed(
        &self,
        user: &str,
        dataset_id: &str,
        error: &str,
    ) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }
        let text = update_failed_message(user, dataset_id, error);
        Some(self.dispatch(text, "metadata_update_failed"))
    }

    fn dispatch(&self, text: String, kind: &'static str) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(err) = notifier.send(&text).await {
                warn!(kind, error = %err, "slack notification failed");
            }
        })
    }
}

pub fn metadata_change_message(
    user: &str,
    dataset_id: &str,
    old_metadata: &Value,
    new_metadata: &Value,
) -> String {
    let dataset_name = old_metadata
        .pointer("/metaspace_options/Dataset_Name")
        .and_then(Value::as_str)
        .unwrap_or("");
    let patch = json_patch(old_metadata, new_metadata);
    let rendered = serde_json::to_string_pretty(&patch).unwrap_or_else(|_| "[]".to_string());

    format!("{user} edited metadata of {dataset_name} (id: {dataset_id})\nDifferences:\n{rendered}")
}

pub fn update_failed_message(user: &str, dataset_id: &str, error: &str) -> String {
    format!("{user} tried to edit metadata (ds_id={dataset_id})\nError: {error}")
}
