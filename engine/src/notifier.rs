//! Client status callbacks.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::store::{StoreError, TaskStore};

const CALLBACK_PATH: &str = "processstatus";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook answered with status {0}")]
    Status(u16),

    #[error("no webhook registered for client {0}")]
    MissingWebhook(String),

    #[error("unknown task {0}")]
    UnknownTask(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Reports the current state of a task to its client.
///
/// Blocking; failures are for logging only and never stop processing.
pub trait Notifier: Send + Sync {
    fn notify(&self, task_id: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub task_id: String,
    pub status: String,
    pub task_result: String,
    pub client_id: String,
    pub upload_dir: String,
}

/// POSTs the task status to `{baseUrl}/processstatus` of the client's
/// registered webhook.
pub struct WebhookNotifier {
    store: Arc<dyn TaskStore>,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn payload(&self, task_id: &str) -> Result<(StatusPayload, String), NotifyError> {
        let details = self
            .store
            .task(task_id)?
            .ok_or_else(|| NotifyError::UnknownTask(task_id.to_string()))?;
        let base_url = self
            .store
            .webhook_url(&details.client_id)?
            .ok_or_else(|| NotifyError::MissingWebhook(details.client_id.clone()))?;

        let payload = StatusPayload {
            task_id: details.task_id,
            status: details.status.as_str().to_string(),
            task_result: details.task_result,
            client_id: details.client_id,
            upload_dir: details.upload_dir,
        };
        Ok((payload, callback_url(&base_url)))
    }
}

fn callback_url(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), CALLBACK_PATH)
}

impl Notifier for WebhookNotifier {
    fn notify(&self, task_id: &str) -> Result<(), NotifyError> {
        let (payload, url) = self.payload(task_id)?;

        // built per call: the blocking client must not be created or dropped
        // on an async worker thread
        let client = Client::builder().timeout(self.timeout).build()?;
        let response = client.post(&url).json(&payload).send()?;

        let status = response.status();
        if status != StatusCode::OK {
            log::warn!("[Notifier] {} answered {} for task {}", url, status, task_id);
            return Err(NotifyError::Status(status.as_u16()));
        }
        log::info!(
            "[Notifier] task {} reported as {} to {}",
            task_id,
            payload.status,
            url
        );
        Ok(())
    }
}
