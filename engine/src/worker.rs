//! Worker loop: drains the shared queue one task at a time.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;

use crate::context::EngineContext;
use crate::pipeline::{self, Outcome};
use crate::task::InFlightTask;

pub type SharedQueue = Arc<Mutex<UnboundedReceiver<InFlightTask>>>;

/// Processes tasks until the queue is closed and empty.
pub async fn run(id: usize, ctx: Arc<EngineContext>, queue: SharedQueue) {
    log::info!("[Worker {}] started", id);
    loop {
        let next = {
            let mut rx = queue.lock().await;
            rx.recv().await
        };
        match next {
            Some(task) => process(id, &ctx, task).await,
            None => break,
        }
    }
    log::info!("[Worker {}] queue closed, exiting", id);
}

/// Runs one task through the pipeline. Never fails: every claimed task ends
/// in a terminal state and its client is notified.
pub async fn process(id: usize, ctx: &Arc<EngineContext>, task: InFlightTask) {
    let task_id = task.task_id.clone();
    log::info!("[Worker {}] processing {} ({})", id, task_id, task.document_name);

    let claim_ctx = ctx.clone();
    let claim_task = task.clone();
    match tokio::task::spawn_blocking(move || pipeline::claim(&claim_ctx, &claim_task)).await {
        Ok(Ok(true)) => {}
        Ok(Ok(false)) => {
            log::warn!("[Worker {}] task {} is no longer queued, skipping", id, task_id);
            return;
        }
        Ok(Err(e)) => {
            log::error!("[Worker {}] cannot claim {}: {}", id, task_id, e);
            return;
        }
        Err(e) => {
            log::error!("[Worker {}] claim of {} panicked: {}", id, task_id, e);
            return;
        }
    }

    let outcome = analyse_bounded(id, ctx, &task).await;

    let finish_ctx = ctx.clone();
    let finished = tokio::task::spawn_blocking(move || {
        let result = pipeline::finish(&finish_ctx, &task, outcome);
        if matches!(result, Ok(Some(_))) {
            finish_ctx.notify(&task.task_id);
        }
        result
    })
    .await;

    match finished {
        Ok(Ok(Some(state))) => log::info!("[Worker {}] task {} finished as {}", id, task_id, state),
        Ok(Ok(None)) => log::warn!("[Worker {}] task {} changed state concurrently", id, task_id),
        Ok(Err(e)) => log::error!("[Worker {}] cannot finish {}: {}", id, task_id, e),
        Err(e) => log::error!("[Worker {}] finishing {} panicked: {}", id, task_id, e),
    }
}

/// Stages and analyses inside the task timeout.
///
/// The same deadline is handed to the blocking side, which stops external
/// tools and drops its working copy once it passes.
async fn analyse_bounded(id: usize, ctx: &Arc<EngineContext>, task: &InFlightTask) -> Outcome {
    let timeout = ctx.config.task_timeout();
    let deadline = std::time::Instant::now() + timeout;
    let analysis_ctx = ctx.clone();
    let analysis_task = task.clone();
    let handle = tokio::task::spawn_blocking(move || {
        pipeline::stage_and_analyze(&analysis_ctx, &analysis_task, deadline)
    });

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            log::error!("[Worker {}] analysis of {} panicked: {}", id, task.task_id, e);
            Outcome::Failed("Unexpected error while processing document".to_string())
        }
        Err(_) => {
            log::error!(
                "[Worker {}] analysis of {} timed out after {}s",
                id,
                task.task_id,
                timeout.as_secs()
            );
            Outcome::Failed(pipeline::timed_out(ctx))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    use crate::output;
    use crate::testing::{
        aadhaar_page, context_with, queue_task, FakeOcr, RecordingNotifier, SlowOcr,
    };
    use ocrr_core::ProcessingState;

    #[tokio::test]
    async fn test_redacts_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = Arc::new(context_with(
            dir.path(),
            Arc::new(FakeOcr::new(aadhaar_page())),
            notifier.clone(),
            |_| {},
        ));
        let task = queue_task(&ctx, dir.path(), "t1", "/roomA/42/12F3A-DOC001_front.jpg");
        let redacted_dir = task.redacted_path.clone();
        let workspace = task.workspace_path.clone();

        process(0, &ctx, task).await;

        let details = ctx.store.task("t1").unwrap().unwrap();
        assert_eq!(details.status, ProcessingState::Redacted);
        assert_eq!(details.task_result, "Successfully Redacted Aadhaar document");
        assert!(redacted_dir.join("12F3A-DOC001_front.xml").is_file());
        assert!(redacted_dir.join("12F3A-DOC001-RD_front.xml").is_file());
        assert!(!workspace.exists());
        assert!(ctx.store.in_flight("t1").unwrap().is_none());
        assert_eq!(notifier.notified(), vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn test_timeout_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = Arc::new(context_with(
            dir.path(),
            Arc::new(SlowOcr(Duration::from_secs(3))),
            notifier.clone(),
            |config| config.task_timeout_secs = 1,
        ));
        let task = queue_task(&ctx, dir.path(), "t1", "/roomA/42/scan.jpg");
        let coordinates = task.redacted_path.join("scan.xml");
        let workspace = task.workspace_path.clone();

        process(0, &ctx, task).await;

        let details = ctx.store.task("t1").unwrap().unwrap();
        assert_eq!(details.status, ProcessingState::Rejected);
        assert_eq!(details.task_result, "Processing timed out after 1s");
        assert_eq!(output::read_coordinates(&coordinates).unwrap().len(), 1);
        assert_eq!(notifier.notified(), vec!["t1".to_string()]);

        // the abandoned analysis stops at the deadline and leaves no working copy
        for _ in 0..20 {
            if !workspace.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn test_unidentified_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(context_with(
            dir.path(),
            Arc::new(FakeOcr::new(ocrr_core::OcrPage::default())),
            Arc::new(RecordingNotifier::default()),
            |_| {},
        ));
        let task = queue_task(&ctx, dir.path(), "t1", "/roomA/42/scan.jpg");
        let redacted_dir = task.redacted_path.clone();

        process(0, &ctx, task).await;

        let details = ctx.store.task("t1").unwrap().unwrap();
        assert_eq!(details.status, ProcessingState::Rejected);
        assert_eq!(details.task_result, "Document Un-identified");
        let entries: Vec<_> = fs::read_dir(&redacted_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
