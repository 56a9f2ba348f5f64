//! OCRR engine: picks up uploaded identity documents, works out which parts
//! must be hidden and hands the result to the downstream redaction tool.
//!
//! ```text
//! store ──> discovery ──> queue ──> workers ──> XML output
//!                │                     │
//!                └────── webhook <─────┘
//! ```

pub mod config;
pub mod context;
pub mod coordinator;
pub mod discovery;
mod error;
pub mod logging;
pub mod notifier;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod shutdown;
pub mod store;
pub mod task;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, EngineConfig};
pub use context::EngineContext;
pub use coordinator::Coordinator;
pub use error::{EngineError, Result};
pub use notifier::{Notifier, NotifyError, WebhookNotifier};
pub use store::{SqliteStore, StoreError, TaskStore};
