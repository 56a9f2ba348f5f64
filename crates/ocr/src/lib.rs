//! OCR token provider, QR detection and image pre-processing.
//!
//! External tools are wrapped behind traits so the redaction engine can be
//! driven by a fake provider in tests.

mod command;
mod error;
pub mod preprocess;
pub mod qr;
pub mod tesseract;

pub use error::OcrError;
pub use qr::{CommandQrDetector, NoopQrDetector, QrDetector, QrDetectorConfig};
pub use tesseract::{get_tesseract_version, TesseractConfig, TesseractEngine};

use std::path::Path;
use std::time::Instant;

use ocrr_core::OcrPage;

/// Produces tokens and lines for a document image.
pub trait OcrEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    fn recognize_file(&self, image_path: &Path) -> Result<OcrPage, OcrError>;

    /// Like [`recognize_file`](Self::recognize_file), but gives up with
    /// [`OcrError::Timeout`] once `deadline` passes. Engines that cannot be
    /// interrupted ignore the deadline.
    fn recognize_file_until(&self, image_path: &Path, _deadline: Instant) -> Result<OcrPage, OcrError> {
        self.recognize_file(image_path)
    }
}

impl<T: OcrEngine + ?Sized> OcrEngine for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize_file(&self, image_path: &Path) -> Result<OcrPage, OcrError> {
        (**self).recognize_file(image_path)
    }

    fn recognize_file_until(&self, image_path: &Path, deadline: Instant) -> Result<OcrPage, OcrError> {
        (**self).recognize_file_until(image_path, deadline)
    }
}
