//! Console and daily-rolling file logging.
//!
//! Components log through the `log` facade; records are bridged into the
//! `tracing` subscriber installed here.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_PREFIX: &str = "ocrr.log";

/// Installs the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Returns false if a subscriber was already installed.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Err(e) = std::fs::create_dir_all(log_dir.as_ref()) {
        eprintln!(
            "cannot create log directory {}: {}",
            log_dir.as_ref().display(),
            e
        );
    }

    // ocrr.log.YYYY-MM-DD
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_target(false)
        .with_ansi(false);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
}
