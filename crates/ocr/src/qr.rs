//! QR code detection.
//!
//! Detection is delegated to an external command that prints a JSON array of
//! `[x1, y1, x2, y2]` boxes for the image path passed as its last argument.
//! Without a configured command no QR codes are reported.

use std::path::Path;
use std::process::Command;
use std::time::Instant;

use ocrr_core::BBox;
use serde::{Deserialize, Serialize};

use crate::{command, OcrError};

pub trait QrDetector: Send + Sync {
    fn detect(&self, image_path: &Path) -> Result<Vec<BBox>, OcrError>;

    /// Like [`detect`](Self::detect), but gives up once `deadline` passes.
    fn detect_until(&self, image_path: &Path, _deadline: Instant) -> Result<Vec<BBox>, OcrError> {
        self.detect(image_path)
    }
}

impl<T: QrDetector + ?Sized> QrDetector for std::sync::Arc<T> {
    fn detect(&self, image_path: &Path) -> Result<Vec<BBox>, OcrError> {
        (**self).detect(image_path)
    }

    fn detect_until(&self, image_path: &Path, deadline: Instant) -> Result<Vec<BBox>, OcrError> {
        (**self).detect_until(image_path, deadline)
    }
}

/// Reports no QR codes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopQrDetector;

impl QrDetector for NoopQrDetector {
    fn detect(&self, _image_path: &Path) -> Result<Vec<BBox>, OcrError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QrDetectorConfig {
    pub command: Option<String>,
    pub args: Vec<String>,
}

impl QrDetectorConfig {
    /// The configured detector, or [`NoopQrDetector`] when no command is set.
    pub fn build(&self) -> Box<dyn QrDetector> {
        match &self.command {
            Some(command) if !command.trim().is_empty() => {
                Box::new(CommandQrDetector::new(command.clone(), self.args.clone()))
            }
            _ => Box::new(NoopQrDetector),
        }
    }
}

pub struct CommandQrDetector {
    command: String,
    args: Vec<String>,
}

impl CommandQrDetector {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl QrDetector for CommandQrDetector {
    fn detect(&self, image_path: &Path) -> Result<Vec<BBox>, OcrError> {
        self.run(image_path, None)
    }

    fn detect_until(&self, image_path: &Path, deadline: Instant) -> Result<Vec<BBox>, OcrError> {
        self.run(image_path, Some(deadline))
    }
}

impl CommandQrDetector {
    fn run(&self, image_path: &Path, deadline: Option<Instant>) -> Result<Vec<BBox>, OcrError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).arg(image_path);
        let output = command::output_until(&mut cmd, deadline)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition(format!(
                "qr detector failed: {}",
                stderr.trim()
            )));
        }

        let boxes = parse_qr_output(&String::from_utf8_lossy(&output.stdout))?;
        log::debug!(
            "[QrDetector] {} qr code(s) in {}",
            boxes.len(),
            image_path.display()
        );
        Ok(boxes)
    }
}

/// Parses `[[x1, y1, x2, y2], ...]`. Blank output means no codes.
pub fn parse_qr_output(stdout: &str) -> Result<Vec<BBox>, OcrError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<[i32; 4]> = serde_json::from_str(trimmed)?;
    Ok(raw
        .into_iter()
        .map(|[x1, y1, x2, y2]| BBox::new(x1, y1, x2, y2))
        .collect())
}
