//! Task records and upload path conventions.
//!
//! An upload directory looks like `/<room>/<roomId>/<document>`. The working
//! copy of a document is named `room+roomId+document` and outputs go to
//! `<upload>/<room>/<roomId>/Redacted`.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ocrr_core::ProcessingState;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::EngineConfig;

pub const INVALID_DOCUMENT_RESULT: &str = "Invalid Document";
pub const REDACTED_DIR: &str = "Redacted";

/// Row of the `file_details` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetails {
    pub task_id: String,
    pub status: ProcessingState,
    pub task_result: String,
    pub client_id: String,
    pub upload_dir: String,
    pub file_extension: String,
    pub file_name: String,
    pub updated_at: String,
}

impl FileDetails {
    /// A freshly discovered upload.
    pub fn discovered(
        task_id: impl Into<String>,
        client_id: impl Into<String>,
        upload_dir: impl Into<String>,
    ) -> Self {
        let upload_dir = upload_dir.into();
        let file_name = upload_dir
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();
        let file_extension = Path::new(&file_name)
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("")
            .to_string();
        Self {
            task_id: task_id.into(),
            status: ProcessingState::Discovered,
            task_result: String::new(),
            client_id: client_id.into(),
            upload_dir,
            file_extension,
            file_name,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Segments of an upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLocation {
    pub room: String,
    pub room_id: String,
    pub document_name: String,
}

impl UploadLocation {
    /// Needs at least three non-empty `/`-separated segments; the last one is
    /// the document name.
    pub fn parse(upload_dir: &str) -> Option<Self> {
        let segments: Vec<&str> = upload_dir.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < 3 {
            return None;
        }
        Some(Self {
            room: segments[0].to_string(),
            room_id: segments[1].to_string(),
            document_name: segments[segments.len() - 1].to_string(),
        })
    }

    pub fn renamed_document(&self) -> String {
        format!("{}+{}+{}", self.room, self.room_id, self.document_name)
    }

    pub fn redacted_dir(&self, upload_root: &Path) -> PathBuf {
        upload_root
            .join(&self.room)
            .join(&self.room_id)
            .join(REDACTED_DIR)
    }
}

/// Why a discovered task cannot be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MalformedUploadDir,
    MissingFile(PathBuf),
    UnsupportedExtension(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MalformedUploadDir => f.write_str("malformed upload directory"),
            Rejection::MissingFile(path) => write!(f, "file not found: {}", path.display()),
            Rejection::UnsupportedExtension(ext) => write!(f, "unsupported extension: {:?}", ext),
        }
    }
}

/// Source path of an upload directory under `upload_root`.
pub fn source_path(upload_root: &Path, upload_dir: &str) -> PathBuf {
    upload_dir
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(upload_root.to_path_buf(), |path, segment| path.join(segment))
}

/// Row of the `ocrr` table: a task between enqueue and completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InFlightTask {
    pub task_id: String,
    pub upload_path: PathBuf,
    pub workspace_path: PathBuf,
    pub redacted_path: PathBuf,
    pub renamed_document: String,
    pub document_name: String,
    pub client_id: String,
    pub upload_dir: String,
    pub source_digest: String,
    pub queued_at: String,
}

impl InFlightTask {
    /// Validates a discovered task and plans its paths.
    pub fn plan(details: &FileDetails, config: &EngineConfig) -> Result<Self, Rejection> {
        let location =
            UploadLocation::parse(&details.upload_dir).ok_or(Rejection::MalformedUploadDir)?;

        let upload_path = source_path(&config.upload_path, &details.upload_dir);
        if !upload_path.is_file() {
            return Err(Rejection::MissingFile(upload_path));
        }
        if !config.is_allowed_extension(&details.file_extension) {
            return Err(Rejection::UnsupportedExtension(details.file_extension.clone()));
        }

        let source_digest = file_digest(&upload_path).map_err(|e| {
            log::warn!("[Task] cannot read {}: {}", upload_path.display(), e);
            Rejection::MissingFile(upload_path.clone())
        })?;

        let renamed_document = location.renamed_document();
        Ok(Self {
            task_id: details.task_id.clone(),
            workspace_path: config.workspace_path.join(&renamed_document),
            redacted_path: location.redacted_dir(&config.upload_path),
            upload_path,
            renamed_document,
            document_name: location.document_name,
            client_id: details.client_id.clone(),
            upload_dir: details.upload_dir.clone(),
            source_digest,
            queued_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Hex SHA-256 of a file.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
