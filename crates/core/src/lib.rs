//! Classification, field extraction and redaction planning for scanned
//! identity documents.

pub mod classify;
pub mod document;
pub mod extract;
pub mod geometry;
pub mod lifecycle;
pub mod profiles;
pub mod redaction;
pub mod rules;

pub use classify::{Classification, ClassificationPolicy, Classifier};
pub use document::DocumentKind;
pub use extract::{ExtractedField, ExtractionContext, FieldSpec, MaskPolicy, Strategy};
pub use geometry::{BBox, OcrPage, OcrToken};
pub use lifecycle::ProcessingState;
pub use redaction::{analyze_page, RedactionLevel, Verdict, VerdictStatus};

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: ProcessingState,
        to: ProcessingState,
    },
    #[error("unknown processing state: {0}")]
    UnknownState(String),
    #[error("unknown document type: {0}")]
    UnknownDocumentKind(String),
}
