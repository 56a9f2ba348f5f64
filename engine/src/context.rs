//! Shared handles for discovery and workers.

use std::sync::Arc;

use ocrr_ocr::{OcrEngine, QrDetector};

use crate::config::EngineConfig;
use crate::notifier::Notifier;
use crate::store::TaskStore;

pub struct EngineContext {
    pub config: EngineConfig,
    pub store: Arc<dyn TaskStore>,
    pub ocr: Arc<dyn OcrEngine>,
    pub qr: Arc<dyn QrDetector>,
    pub notifier: Arc<dyn Notifier>,
}

impl EngineContext {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn TaskStore>,
        ocr: Arc<dyn OcrEngine>,
        qr: Arc<dyn QrDetector>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            store,
            ocr,
            qr,
            notifier,
        }
    }

    /// Sends the webhook for `task_id`, logging failures.
    pub fn notify(&self, task_id: &str) {
        if let Err(e) = self.notifier.notify(task_id) {
            log::warn!("[Notifier] task {}: {}", task_id, e);
        }
    }
}
