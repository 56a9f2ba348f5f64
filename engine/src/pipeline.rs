//! Processing steps of a single queued document.
//!
//! The steps are blocking and split so that the worker can bound the
//! analysis with a timeout: [`claim`], then [`stage`] and [`analyze`] inside
//! the timeout, then [`finish`] which writes outputs and the terminal state.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;

use ocrr_core::{
    analyze_page, BBox, ClassificationPolicy, ProcessingState, RedactionLevel, Verdict,
};
use ocrr_ocr::{preprocess, OcrEngine, OcrError, QrDetector};
use serde::Serialize;

use crate::context::EngineContext;
use crate::error::Result;
use crate::output;
use crate::store::StoreResult;
use crate::task::{file_digest, InFlightTask};

/// Verdict plus the image size it was computed on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub verdict: Verdict,
    pub width: u32,
    pub height: u32,
}

/// Result of the bounded part of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Analysed(Analysis),
    /// Staging or analysis failed, panicked or timed out.
    Failed(String),
}

/// Moves a queued task to PROCESSING. False if it is no longer queued.
pub fn claim(ctx: &EngineContext, task: &InFlightTask) -> StoreResult<bool> {
    ctx.store.transition(
        &task.task_id,
        ProcessingState::InQueue,
        ProcessingState::Processing,
        None,
    )
}

/// Copies the upload into the workspace.
pub fn stage(task: &InFlightTask) -> io::Result<()> {
    if let Some(dir) = task.workspace_path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::copy(&task.upload_path, &task.workspace_path)?;

    match file_digest(&task.workspace_path) {
        Ok(digest) if digest != task.source_digest => log::warn!(
            "[Pipeline] {} changed after discovery",
            task.upload_path.display()
        ),
        Ok(_) => {}
        Err(e) => log::warn!("[Pipeline] cannot hash {}: {}", task.workspace_path.display(), e),
    }
    Ok(())
}

/// Normalises, recognises, classifies and extracts a working copy.
///
/// External tools still running at `deadline` are stopped.
pub fn analyze(
    ocr: &dyn OcrEngine,
    qr: &dyn QrDetector,
    image_path: &Path,
    policy: ClassificationPolicy,
    level: RedactionLevel,
    deadline: Option<Instant>,
) -> std::result::Result<Analysis, OcrError> {
    let (width, height, normalised) = preprocess::prepare_for_ocr(image_path)?;
    log::debug!(
        "[Pipeline] {} is {}x{}, normalised: {}",
        image_path.display(),
        width,
        height,
        normalised
    );

    let page = match deadline {
        Some(deadline) => ocr.recognize_file_until(image_path, deadline)?,
        None => ocr.recognize_file(image_path)?,
    };
    let detected = match deadline {
        Some(deadline) => qr.detect_until(image_path, deadline),
        None => qr.detect(image_path),
    };
    let qr_boxes = detected.unwrap_or_else(|e| {
        log::warn!("[Pipeline] QR detection failed for {}: {}", image_path.display(), e);
        Vec::new()
    });

    let verdict = analyze_page(&page, &qr_boxes, policy, level);
    Ok(Analysis {
        verdict,
        width,
        height,
    })
}

/// Stages and analyses a task using the engine's adapters.
///
/// Past `deadline` the worker has already finished the task, so nothing is
/// staged and a late working copy is removed again.
pub fn stage_and_analyze(ctx: &EngineContext, task: &InFlightTask, deadline: Instant) -> Outcome {
    if Instant::now() >= deadline {
        log::warn!("[Pipeline] {} reached its deadline before staging", task.task_id);
        return Outcome::Failed(timed_out(ctx));
    }
    if let Err(e) = stage(task) {
        log::error!("[Pipeline] cannot stage {}: {}", task.task_id, e);
        return Outcome::Failed(format!("Failed to stage document: {}", e));
    }

    let outcome = match analyze(
        ctx.ocr.as_ref(),
        ctx.qr.as_ref(),
        &task.workspace_path,
        ctx.config.classification_policy,
        ctx.config.redaction_level,
        Some(deadline),
    ) {
        Ok(analysis) => Outcome::Analysed(analysis),
        Err(e) => {
            log::error!("[Pipeline] analysis of {} failed: {}", task.task_id, e);
            Outcome::Failed(e.to_string())
        }
    };

    if Instant::now() >= deadline {
        log::warn!("[Pipeline] {} finished after its deadline, discarding", task.task_id);
        remove_working_copy(task);
        return Outcome::Failed(timed_out(ctx));
    }
    outcome
}

/// Task result of a document that ran out of time.
pub fn timed_out(ctx: &EngineContext) -> String {
    format!("Processing timed out after {}s", ctx.config.task_timeout().as_secs())
}

/// Box covering a rejected document, from the working copy or the upload.
fn rejection_cover(task: &InFlightTask) -> Option<BBox> {
    [&task.workspace_path, &task.upload_path]
        .into_iter()
        .find_map(|path| preprocess::image_dimensions(path).ok())
        .map(|(w, h)| BBox::rejection_cover(w, h))
}

/// Writes the rejection coordinates. A write failure replaces the message;
/// the task is rejected either way.
fn reject(task: &InFlightTask, cover: Option<BBox>, message: String) -> (ProcessingState, String) {
    match output::write_rejected(&task.redacted_path, &task.document_name, cover) {
        Ok(_) => (ProcessingState::Rejected, message),
        Err(e) => {
            log::error!("[Pipeline] cannot write rejection of {}: {}", task.task_id, e);
            (ProcessingState::Rejected, format!("Failed to write output: {}", e))
        }
    }
}

/// Writes outputs, records the terminal state and cleans up.
///
/// Output failures reject the task instead of aborting, so only store errors
/// are returned. Returns the terminal state, or `None` if the task had left
/// PROCESSING.
pub fn finish(ctx: &EngineContext, task: &InFlightTask, outcome: Outcome) -> Result<Option<ProcessingState>> {
    let (state, message) = match outcome {
        Outcome::Analysed(analysis) if analysis.verdict.is_redacted() => {
            match output::write_redacted(&task.redacted_path, &task.document_name, &analysis.verdict) {
                Ok(_) => (ProcessingState::Redacted, analysis.verdict.message),
                Err(e) => {
                    log::error!("[Pipeline] cannot write output of {}: {}", task.task_id, e);
                    let cover = BBox::rejection_cover(analysis.width, analysis.height);
                    reject(task, Some(cover), format!("Failed to write output: {}", e))
                }
            }
        }
        Outcome::Analysed(analysis) => {
            let cover = BBox::rejection_cover(analysis.width, analysis.height);
            reject(task, Some(cover), analysis.verdict.message)
        }
        Outcome::Failed(message) => {
            let cover = rejection_cover(task);
            if cover.is_none() {
                log::warn!("[Pipeline] no readable image for {}, empty rejection", task.task_id);
            }
            reject(task, cover, message)
        }
    };

    let moved = ctx.store.transition(
        &task.task_id,
        ProcessingState::Processing,
        state,
        Some(&message),
    );

    remove_working_copy(task);
    ctx.store.remove_in_flight(&task.task_id)?;

    if !moved? {
        return Ok(None);
    }
    log::info!("[Pipeline] task {} {}: {}", task.task_id, state, message);
    Ok(Some(state))
}

fn remove_working_copy(task: &InFlightTask) {
    if let Err(e) = fs::remove_file(&task.workspace_path) {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("[Pipeline] cannot remove {}: {}", task.workspace_path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use std::time::Duration;

    use crate::task::FileDetails;
    use crate::testing::{
        aadhaar_page, context, context_with, queue_task, FakeOcr, RecordingNotifier, SlowOcr,
    };
    use ocrr_core::DocumentKind;
    use ocrr_ocr::NoopQrDetector;

    #[test]
    fn test_analyze_with_fake_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        image::GrayImage::from_pixel(640, 480, image::Luma([255]))
            .save(&path)
            .unwrap();

        let ocr = FakeOcr::new(aadhaar_page());
        let analysis = analyze(
            &ocr,
            &NoopQrDetector,
            &path,
            ClassificationPolicy::FirstMatch,
            RedactionLevel::BEST_EFFORT,
            None,
        )
        .unwrap();

        assert_eq!((analysis.width, analysis.height), (640, 480));
        assert_eq!(analysis.verdict.kind, Some(DocumentKind::Aadhaar));
        assert!(analysis.verdict.is_redacted());
    }

    #[test]
    fn test_unreadable_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.jpg");
        fs::write(&path, b"not an image").unwrap();
        let ocr = FakeOcr::new(aadhaar_page());
        assert!(analyze(
            &ocr,
            &NoopQrDetector,
            &path,
            ClassificationPolicy::FirstMatch,
            RedactionLevel::BEST_EFFORT,
            None,
        )
        .is_err());
    }

    #[test]
    fn test_failed_task_is_rejected_with_cover() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Arc::new(RecordingNotifier::default()));
        let task = queue_task(&ctx, dir.path(), "t1", "/roomA/42/DOC12345_front.jpg");
        assert!(claim(&ctx, &task).unwrap());

        let state = finish(&ctx, &task, Outcome::Failed("Processing timed out".into()))
            .unwrap();
        assert_eq!(state, Some(ProcessingState::Rejected));

        let details: FileDetails = ctx.store.task("t1").unwrap().unwrap();
        assert_eq!(details.status, ProcessingState::Rejected);
        assert_eq!(details.task_result, "Processing timed out");

        let boxes = output::read_coordinates(&task.redacted_path.join("DOC12345_front.xml")).unwrap();
        // uploads written by the test helpers are 400x300
        assert_eq!(boxes, vec![BBox::new(0, 0, 400, 240)]);
        assert!(ctx.store.in_flight("t1").unwrap().is_none());
    }

    #[test]
    fn test_unclaimed_task_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Arc::new(RecordingNotifier::default()));
        let task = queue_task(&ctx, dir.path(), "t1", "/roomA/42/scan.jpg");
        assert!(claim(&ctx, &task).unwrap());
        assert!(!claim(&ctx, &task).unwrap());
    }

    #[test]
    fn test_unwritable_output_still_rejects_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Arc::new(RecordingNotifier::default()));
        let task = queue_task(&ctx, dir.path(), "t1", "/roomA/42/scan.jpg");
        assert!(claim(&ctx, &task).unwrap());
        stage(&task).unwrap();
        // a plain file where the Redacted directory belongs
        fs::write(&task.redacted_path, b"").unwrap();

        let state = finish(&ctx, &task, Outcome::Failed("boom".into())).unwrap();
        assert_eq!(state, Some(ProcessingState::Rejected));

        let details = ctx.store.task("t1").unwrap().unwrap();
        assert_eq!(details.status, ProcessingState::Rejected);
        assert!(details.task_result.starts_with("Failed to write output:"));
        assert!(ctx.store.in_flight("t1").unwrap().is_none());
        assert!(!task.workspace_path.exists());
    }

    #[test]
    fn test_unwritable_redacted_output_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Arc::new(RecordingNotifier::default()));
        let task = queue_task(&ctx, dir.path(), "t1", "/roomA/42/scan.jpg");
        assert!(claim(&ctx, &task).unwrap());
        fs::write(&task.redacted_path, b"").unwrap();

        let verdict = analyze_page(
            &aadhaar_page(),
            &[],
            ClassificationPolicy::FirstMatch,
            RedactionLevel::BEST_EFFORT,
        );
        assert!(verdict.is_redacted());
        let outcome = Outcome::Analysed(Analysis {
            verdict,
            width: 400,
            height: 300,
        });

        assert_eq!(finish(&ctx, &task, outcome).unwrap(), Some(ProcessingState::Rejected));
        let details = ctx.store.task("t1").unwrap().unwrap();
        assert_eq!(details.status, ProcessingState::Rejected);
        assert!(details.task_result.starts_with("Failed to write output:"));
    }

    #[test]
    fn test_nothing_staged_past_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Arc::new(RecordingNotifier::default()));
        let task = queue_task(&ctx, dir.path(), "t1", "/roomA/42/scan.jpg");

        let outcome = stage_and_analyze(&ctx, &task, Instant::now());
        assert_eq!(outcome, Outcome::Failed("Processing timed out after 10s".into()));
        assert!(!task.workspace_path.exists());
    }

    #[test]
    fn test_late_analysis_drops_working_copy() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_with(
            dir.path(),
            Arc::new(SlowOcr(Duration::from_secs(5))),
            Arc::new(RecordingNotifier::default()),
            |_| {},
        );
        let task = queue_task(&ctx, dir.path(), "t1", "/roomA/42/scan.jpg");

        let start = Instant::now();
        let outcome = stage_and_analyze(&ctx, &task, start + Duration::from_millis(300));
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(outcome, Outcome::Failed("Processing timed out after 10s".into()));
        assert!(!task.workspace_path.exists());
    }
}
