//! Polls the store for newly uploaded documents and feeds the work queue.

use std::sync::Arc;

use ocrr_core::ProcessingState;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::MissedTickBehavior;

use crate::context::EngineContext;
use crate::shutdown::Shutdown;
use crate::store::StoreError;
use crate::task::{InFlightTask, INVALID_DOCUMENT_RESULT};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub queued: usize,
    pub invalid: usize,
    pub skipped: usize,
}

/// One discovery pass. Blocking.
///
/// Valid tasks get an in-flight record, move to IN_QUEUE and are sent to
/// `queue`. Invalid ones become INVALID_DOCUMENT and their client is
/// notified.
pub fn discover_once(
    ctx: &EngineContext,
    queue: &UnboundedSender<InFlightTask>,
) -> Result<DiscoveryReport, StoreError> {
    let mut report = DiscoveryReport::default();

    for details in ctx.store.tasks_in_state(ProcessingState::Discovered)? {
        let task = match InFlightTask::plan(&details, &ctx.config) {
            Ok(task) => task,
            Err(reason) => {
                log::warn!(
                    "[Discovery] task {} ({}) is invalid: {}",
                    details.task_id,
                    details.upload_dir,
                    reason
                );
                let moved = ctx.store.transition(
                    &details.task_id,
                    ProcessingState::Discovered,
                    ProcessingState::InvalidDocument,
                    Some(INVALID_DOCUMENT_RESULT),
                )?;
                if moved {
                    report.invalid += 1;
                    ctx.notify(&details.task_id);
                } else {
                    report.skipped += 1;
                }
                continue;
            }
        };

        ctx.store.insert_in_flight(&task)?;
        let claimed = ctx.store.transition(
            &task.task_id,
            ProcessingState::Discovered,
            ProcessingState::InQueue,
            None,
        )?;
        if !claimed {
            ctx.store.remove_in_flight(&task.task_id)?;
            report.skipped += 1;
            continue;
        }

        log::info!("[Discovery] queued {} ({})", task.task_id, details.file_name);
        if queue.send(task).is_err() {
            // workers are gone; recovery puts the task back on next start
            log::warn!("[Discovery] queue closed, stopping pass");
            break;
        }
        report.queued += 1;
    }

    Ok(report)
}

/// Runs discovery passes every poll interval until shutdown.
///
/// Dropping `queue` on return lets the workers drain and exit.
pub async fn run(
    ctx: Arc<EngineContext>,
    queue: UnboundedSender<InFlightTask>,
    mut shutdown: Shutdown,
) {
    let mut ticker = tokio::time::interval(ctx.config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log::info!(
        "[Discovery] polling every {}s",
        ctx.config.poll_interval_secs
    );
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let pass_ctx = ctx.clone();
                let pass_queue = queue.clone();
                let result = tokio::task::spawn_blocking(move || {
                    discover_once(&pass_ctx, &pass_queue)
                })
                .await;
                match result {
                    Ok(Ok(report)) if report != DiscoveryReport::default() => {
                        log::info!(
                            "[Discovery] {} queued, {} invalid, {} skipped",
                            report.queued,
                            report.invalid,
                            report.skipped
                        );
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => log::error!("[Discovery] pass failed: {}", e),
                    Err(e) => log::error!("[Discovery] pass panicked: {}", e),
                }
            }
        }
    }
    log::info!("[Discovery] stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, write_upload, RecordingNotifier};
    use crate::task::FileDetails;

    #[test]
    fn test_missing_file_becomes_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(dir.path(), notifier.clone());
        ctx.store
            .insert_task(&FileDetails::discovered("t1", "c1", "/roomA/42/missing.jpg"))
            .unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let report = discover_once(&ctx, &tx).unwrap();

        assert_eq!(report.invalid, 1);
        assert_eq!(report.queued, 0);
        assert!(rx.try_recv().is_err());
        let task = ctx.store.task("t1").unwrap().unwrap();
        assert_eq!(task.status, ProcessingState::InvalidDocument);
        assert_eq!(task.task_result, "Invalid Document");
        assert!(ctx.store.in_flight("t1").unwrap().is_none());
        assert_eq!(notifier.notified(), vec!["t1".to_string()]);
    }

    #[test]
    fn test_valid_file_is_queued() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(dir.path(), notifier.clone());
        write_upload(dir.path(), "/roomA/42/scan.jpg");
        ctx.store
            .insert_task(&FileDetails::discovered("t1", "c1", "/roomA/42/scan.jpg"))
            .unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let report = discover_once(&ctx, &tx).unwrap();
        assert_eq!(report.queued, 1);

        let queued = rx.try_recv().unwrap();
        assert_eq!(queued.task_id, "t1");
        assert_eq!(queued.renamed_document, "roomA+42+scan.jpg");
        assert_eq!(
            ctx.store.task("t1").unwrap().unwrap().status,
            ProcessingState::InQueue
        );
        assert_eq!(ctx.store.in_flight("t1").unwrap(), Some(queued));
        assert!(notifier.notified().is_empty());

        // already queued tasks are not picked up again
        assert_eq!(discover_once(&ctx, &tx).unwrap(), DiscoveryReport::default());
    }

    #[test]
    fn test_disallowed_extension_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Arc::new(RecordingNotifier::default()));
        write_upload(dir.path(), "/roomA/42/scan.png");
        ctx.store
            .insert_task(&FileDetails::discovered("t1", "c1", "/roomA/42/scan.png"))
            .unwrap();

        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let report = discover_once(&ctx, &tx).unwrap();
        assert_eq!(report.invalid, 1);
    }
}
