//! Engine configuration.
//!
//! Loaded from a JSON file (`--config`, then `OCRR_CONFIG`, then
//! `./ocrr.json`). Missing files fall back to defaults; a few settings can be
//! overridden from the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ocrr_core::{ClassificationPolicy, RedactionLevel};
use ocrr_ocr::{QrDetectorConfig, TesseractConfig};
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "OCRR_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "ocrr.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    // ============ Paths ============
    /// Root that `uploadDir` values are relative to.
    pub upload_path: PathBuf,
    /// Scratch directory for working copies.
    pub workspace_path: PathBuf,
    pub log_path: PathBuf,
    pub database_path: PathBuf,

    // ============ Processing ============
    pub allowed_extensions: Vec<String>,
    pub redaction_level: RedactionLevel,
    pub classification_policy: ClassificationPolicy,
    pub poll_interval_secs: u64,
    pub worker_count: usize,
    pub task_timeout_secs: u64,

    pub log_level: String,

    // ============ External tools ============
    pub tesseract: TesseractConfig,
    pub qr_detector: QrDetectorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            upload_path: PathBuf::from("upload"),
            workspace_path: PathBuf::from("workspace"),
            log_path: PathBuf::from("logs"),
            database_path: PathBuf::from("ocrr.db"),
            allowed_extensions: vec!["jpg".into(), "jpeg".into(), "tiff".into()],
            redaction_level: RedactionLevel::default(),
            classification_policy: ClassificationPolicy::default(),
            poll_interval_secs: 5,
            worker_count: 2,
            task_timeout_secs: 120,
            log_level: "info".to_string(),
            tesseract: TesseractConfig::default(),
            qr_detector: QrDetectorConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse::<T>().ok()
}

/// Path of the config file to load.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

impl EngineConfig {
    /// Loads, applies environment overrides and validates.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = resolve_path(explicit);
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("[Config] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(level) = parse_env::<u8>("OCRR_REDACTION_LEVEL") {
            self.redaction_level = RedactionLevel::new(level);
        }
        if let Some(count) = parse_env::<usize>("OCRR_WORKER_COUNT").filter(|v| *v > 0) {
            self.worker_count = count;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid {
                field: "workerCount",
                reason: "must be at least 1".into(),
            });
        }
        if self.redaction_level.value() == 0 {
            return Err(ConfigError::Invalid {
                field: "redactionLevel",
                reason: "must be at least 1".into(),
            });
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "pollIntervalSecs",
                reason: "must be at least 1".into(),
            });
        }
        if self.task_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "taskTimeoutSecs",
                reason: "must be at least 1".into(),
            });
        }
        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid {
                field: "allowedExtensions",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Writes the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Case-insensitive extension check.
    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        let extension = extension.trim().trim_start_matches('.');
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}
