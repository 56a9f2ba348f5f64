//! SQLite task store.
//!
//! Three tables: `file_details` (one row per upload, owned by the upload
//! service), `webhooks` (client callback URLs) and `ocrr` (tasks currently
//! queued or being processed). Status changes are compare-and-set so that
//! discovery and workers never overwrite each other's transitions.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use ocrr_core::{CoreError, ProcessingState};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::task::{FileDetails, InFlightTask};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    State(#[from] CoreError),

    #[error("store connection poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Counts reported by startup recovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Recovery {
    pub cleared_in_flight: usize,
    pub reset_tasks: usize,
}

/// Persistence used by discovery, workers and the notifier.
///
/// Implementations are blocking; async callers go through `spawn_blocking`.
pub trait TaskStore: Send + Sync {
    /// Clears in-flight records and puts unfinished tasks back to DISCOVERED.
    fn recover(&self) -> StoreResult<Recovery>;

    fn insert_task(&self, details: &FileDetails) -> StoreResult<()>;

    fn task(&self, task_id: &str) -> StoreResult<Option<FileDetails>>;

    fn tasks_in_state(&self, state: ProcessingState) -> StoreResult<Vec<FileDetails>>;

    /// Moves `task_id` from `from` to `to`.
    ///
    /// Returns false if the task was not in `from` any more. Transitions the
    /// lifecycle does not allow are errors.
    fn transition(
        &self,
        task_id: &str,
        from: ProcessingState,
        to: ProcessingState,
        task_result: Option<&str>,
    ) -> StoreResult<bool>;

    fn insert_in_flight(&self, task: &InFlightTask) -> StoreResult<()>;

    fn in_flight(&self, task_id: &str) -> StoreResult<Option<InFlightTask>>;

    fn remove_in_flight(&self, task_id: &str) -> StoreResult<()>;

    fn webhook_url(&self, client_id: &str) -> StoreResult<Option<String>>;

    fn set_webhook(&self, client_id: &str, url: &str) -> StoreResult<()>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Stored labels of a state; DISCOVERED rows may still carry the legacy
/// `IN_PROGRESS` label.
fn stored_labels(state: ProcessingState) -> (&'static str, &'static str) {
    match state {
        ProcessingState::Discovered => ("DISCOVERED", "IN_PROGRESS"),
        other => (other.as_str(), other.as_str()),
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn row_to_details(row: &Row<'_>) -> rusqlite::Result<(FileDetails, String)> {
    let status: String = row.get(1)?;
    let details = FileDetails {
        task_id: row.get(0)?,
        // placeholder until the label is parsed outside the row closure
        status: ProcessingState::Discovered,
        task_result: row.get(2)?,
        client_id: row.get(3)?,
        upload_dir: row.get(4)?,
        file_extension: row.get(5)?,
        file_name: row.get(6)?,
        updated_at: row.get(7)?,
    };
    Ok((details, status))
}

fn with_status((mut details, status): (FileDetails, String)) -> StoreResult<FileDetails> {
    details.status = status.parse()?;
    Ok(details)
}

fn row_to_in_flight(row: &Row<'_>) -> rusqlite::Result<InFlightTask> {
    Ok(InFlightTask {
        task_id: row.get(0)?,
        upload_path: PathBuf::from(row.get::<_, String>(1)?),
        workspace_path: PathBuf::from(row.get::<_, String>(2)?),
        redacted_path: PathBuf::from(row.get::<_, String>(3)?),
        renamed_document: row.get(4)?,
        document_name: row.get(5)?,
        client_id: row.get(6)?,
        upload_dir: row.get(7)?,
        source_digest: row.get(8)?,
        queued_at: row.get(9)?,
    })
}

const DETAIL_COLUMNS: &str =
    "task_id, status, task_result, client_id, upload_dir, file_extension, file_name, updated_at";

impl SqliteStore {
    /// Opens or creates the store at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(dir) {
                log::warn!("[Store] cannot create {}: {}", dir.display(), e);
            }
        }
        let conn = Connection::open(path)?;
        let store = Self::with_connection(conn)?;
        log::info!("[Store] opened {}", path.display());
        Ok(store)
    }

    /// In-memory store for tests and dry runs.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS file_details (
                task_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                task_result TEXT NOT NULL DEFAULT '',
                client_id TEXT NOT NULL,
                upload_dir TEXT NOT NULL,
                file_extension TEXT NOT NULL DEFAULT '',
                file_name TEXT NOT NULL DEFAULT '',
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_file_details_status ON file_details(status);
            CREATE TABLE IF NOT EXISTS webhooks (
                client_id TEXT PRIMARY KEY,
                url TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS ocrr (
                task_id TEXT PRIMARY KEY,
                upload_path TEXT NOT NULL,
                workspace_path TEXT NOT NULL,
                redacted_path TEXT NOT NULL,
                renamed_document TEXT NOT NULL,
                document_name TEXT NOT NULL,
                client_id TEXT NOT NULL,
                upload_dir TEXT NOT NULL,
                source_digest TEXT NOT NULL,
                queued_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl TaskStore for SqliteStore {
    fn recover(&self) -> StoreResult<Recovery> {
        let conn = self.conn()?;
        let cleared_in_flight = conn.execute("DELETE FROM ocrr", [])?;
        let reset_tasks = conn.execute(
            "UPDATE file_details SET status = 'DISCOVERED', updated_at = ?1
             WHERE status IN ('IN_QUEUE', 'PROCESSING')",
            params![now()],
        )?;
        Ok(Recovery {
            cleared_in_flight,
            reset_tasks,
        })
    }

    fn insert_task(&self, details: &FileDetails) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO file_details
             (task_id, status, task_result, client_id, upload_dir, file_extension, file_name, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                details.task_id,
                details.status.as_str(),
                details.task_result,
                details.client_id,
                details.upload_dir,
                details.file_extension,
                details.file_name,
                details.updated_at,
            ],
        )?;
        Ok(())
    }

    fn task(&self, task_id: &str) -> StoreResult<Option<FileDetails>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM file_details WHERE task_id = ?1", DETAIL_COLUMNS),
                params![task_id],
                row_to_details,
            )
            .optional()?;
        row.map(with_status).transpose()
    }

    fn tasks_in_state(&self, state: ProcessingState) -> StoreResult<Vec<FileDetails>> {
        let (label, legacy) = stored_labels(state);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM file_details WHERE status IN (?1, ?2) ORDER BY updated_at, task_id",
            DETAIL_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![label, legacy], row_to_details)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(with_status).collect()
    }

    fn transition(
        &self,
        task_id: &str,
        from: ProcessingState,
        to: ProcessingState,
        task_result: Option<&str>,
    ) -> StoreResult<bool> {
        from.transition(to)?;
        let (label, legacy) = stored_labels(from);
        let changed = self.conn()?.execute(
            "UPDATE file_details
             SET status = ?1, task_result = COALESCE(?2, task_result), updated_at = ?3
             WHERE task_id = ?4 AND status IN (?5, ?6)",
            params![to.as_str(), task_result, now(), task_id, label, legacy],
        )?;
        if changed == 0 {
            log::warn!(
                "[Store] task {} was not {} when moving to {}",
                task_id,
                from,
                to
            );
        }
        Ok(changed == 1)
    }

    fn insert_in_flight(&self, task: &InFlightTask) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO ocrr
             (task_id, upload_path, workspace_path, redacted_path, renamed_document,
              document_name, client_id, upload_dir, source_digest, queued_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                task.task_id,
                task.upload_path.to_string_lossy(),
                task.workspace_path.to_string_lossy(),
                task.redacted_path.to_string_lossy(),
                task.renamed_document,
                task.document_name,
                task.client_id,
                task.upload_dir,
                task.source_digest,
                task.queued_at,
            ],
        )?;
        Ok(())
    }

    fn in_flight(&self, task_id: &str) -> StoreResult<Option<InFlightTask>> {
        let conn = self.conn()?;
        let task = conn
            .query_row(
                "SELECT task_id, upload_path, workspace_path, redacted_path, renamed_document,
                        document_name, client_id, upload_dir, source_digest, queued_at
                 FROM ocrr WHERE task_id = ?1",
                params![task_id],
                row_to_in_flight,
            )
            .optional()?;
        Ok(task)
    }

    fn remove_in_flight(&self, task_id: &str) -> StoreResult<()> {
        self.conn()?
            .execute("DELETE FROM ocrr WHERE task_id = ?1", params![task_id])?;
        Ok(())
    }

    fn webhook_url(&self, client_id: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        let url = conn
            .query_row(
                "SELECT url FROM webhooks WHERE client_id = ?1",
                params![client_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(url)
    }

    fn set_webhook(&self, client_id: &str, url: &str) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO webhooks (client_id, url) VALUES (?1, ?2)
             ON CONFLICT(client_id) DO UPDATE SET url = excluded.url",
            params![client_id, url],
        )?;
        Ok(())
    }
}
