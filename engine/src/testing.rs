//! Fakes and fixtures shared by the engine tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use image::{GrayImage, ImageFormat, Luma};
use ocrr_core::{OcrPage, ProcessingState};
use ocrr_ocr::{NoopQrDetector, OcrEngine, OcrError};

use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::notifier::{Notifier, NotifyError};
use crate::store::{SqliteStore, TaskStore};
use crate::task::{source_path, FileDetails, InFlightTask};

/// Returns the same page for every image.
pub struct FakeOcr {
    page: OcrPage,
}

impl FakeOcr {
    pub fn new(page: OcrPage) -> Self {
        Self { page }
    }
}

impl OcrEngine for FakeOcr {
    fn name(&self) -> &str {
        "fake"
    }

    fn recognize_file(&self, _image_path: &Path) -> Result<OcrPage, OcrError> {
        Ok(self.page.clone())
    }
}

/// Sleeps before returning an empty page. With a deadline it stops early
/// and times out, the way a killed external engine does.
pub struct SlowOcr(pub Duration);

impl OcrEngine for SlowOcr {
    fn name(&self) -> &str {
        "slow"
    }

    fn recognize_file(&self, _image_path: &Path) -> Result<OcrPage, OcrError> {
        std::thread::sleep(self.0);
        Ok(OcrPage::default())
    }

    fn recognize_file_until(&self, image_path: &Path, deadline: Instant) -> Result<OcrPage, OcrError> {
        let left = deadline.saturating_duration_since(Instant::now());
        if left >= self.0 {
            return self.recognize_file(image_path);
        }
        std::thread::sleep(left);
        Err(OcrError::Timeout("slow engine stopped".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn notified(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, task_id: &str) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(task_id.to_string());
        }
        Ok(())
    }
}

/// Front side of an Aadhaar card.
pub fn aadhaar_page() -> OcrPage {
    OcrPage::from_rows(&[
        "GOVERNMENT OF INDIA",
        "Ravi Sharma",
        "DOB: 01/01/1990",
        "Male",
        "1234 5678 9012",
    ])
}

pub fn test_config(root: &Path) -> EngineConfig {
    EngineConfig {
        upload_path: root.join("upload"),
        workspace_path: root.join("workspace"),
        log_path: root.join("logs"),
        database_path: root.join("ocrr.db"),
        poll_interval_secs: 1,
        task_timeout_secs: 10,
        ..Default::default()
    }
}

pub fn context_with(
    root: &Path,
    ocr: Arc<dyn OcrEngine>,
    notifier: Arc<dyn Notifier>,
    tweak: impl FnOnce(&mut EngineConfig),
) -> EngineContext {
    let mut config = test_config(root);
    tweak(&mut config);
    let store: Arc<dyn TaskStore> = Arc::new(SqliteStore::in_memory().unwrap());
    EngineContext::new(config, store, ocr, Arc::new(NoopQrDetector), notifier)
}

pub fn context(root: &Path, notifier: Arc<dyn Notifier>) -> EngineContext {
    context_with(root, Arc::new(FakeOcr::new(aadhaar_page())), notifier, |_| {})
}

/// Writes a blank 400x300 grayscale JPEG at `<root>/upload/<upload_dir>`.
pub fn write_upload(root: &Path, upload_dir: &str) -> PathBuf {
    let path = source_path(&root.join("upload"), upload_dir);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    GrayImage::from_pixel(400, 300, Luma([255]))
        .save_with_format(&path, ImageFormat::Jpeg)
        .unwrap();
    path
}

/// Registers an upload and moves it to IN_QUEUE the way discovery does.
pub fn queue_task(ctx: &EngineContext, root: &Path, task_id: &str, upload_dir: &str) -> InFlightTask {
    write_upload(root, upload_dir);
    let details = FileDetails::discovered(task_id, "c1", upload_dir);
    ctx.store.insert_task(&details).unwrap();
    let task = InFlightTask::plan(&details, &ctx.config).unwrap();
    ctx.store.insert_in_flight(&task).unwrap();
    assert!(ctx
        .store
        .transition(task_id, ProcessingState::Discovered, ProcessingState::InQueue, None)
        .unwrap());
    task
}
