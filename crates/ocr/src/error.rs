//! OCR error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("image processing failed: {0}")]
    ImageProcess(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid detector output: {0}")]
    Json(#[from] serde_json::Error),
}
