//! Drives one submission from payload to result

use crate::api::{MatrixBackend, MatrixResult};
use crate::config::ProgressConfig;
use crate::error::AppError;
use crate::notify::{ToastKind, ToastQueue};

use super::payload::{Submission, UploadPayload};
use super::progress::{JobProgress, ProgressSimulator, ProgressSink};

pub const PROCESSING_STARTED: &str =
    "Processing started - this may take several minutes for large files";
pub const PROCESSING_COMPLETED: &str = "File processing completed successfully";

/// Submit a sheet to the backend and wait for the computed matrix.
///
/// Progress goes out on `sink`: `Processing` at 0%, simulated increments while
/// the backend works, then `Completed` at 100% or `Error` at the last shown
/// percent. The simulator is stopped on every exit path.
pub async fn submit(
    backend: &dyn MatrixBackend,
    submission: &Submission,
    progress: &ProgressConfig,
    sink: &ProgressSink,
    toasts: &ToastQueue,
) -> Result<MatrixResult, AppError> {
    let total = submission.estimated_pairs();

    let payload = match UploadPayload::build(submission) {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("Upload not started: {}", e);
            let _ = sink.send(JobProgress::failed(0, total));
            toasts.notify(format!("Error: {}", e), ToastKind::Error);
            return Err(e);
        }
    };

    log::info!(
        "Submitting '{}' sheet '{}' ({} rows, ~{} pairs)",
        submission.source.name,
        submission.table.sheet,
        submission.table.len(),
        total
    );

    let _ = sink.send(JobProgress::processing(total));
    toasts.notify(PROCESSING_STARTED, ToastKind::Info);

    let simulator = ProgressSimulator::start(total, progress, sink.clone());
    let outcome = backend.upload_matrix(payload.form).await;
    let last_percent = simulator.stop().await;

    match outcome {
        Ok(result) => {
            log::info!(
                "Matrix ready: {} pairs, result file {:?}",
                result.total_pairs(),
                result.result_filename
            );
            let _ = sink.send(JobProgress::completed(result.total_pairs()));
            toasts.notify(PROCESSING_COMPLETED, ToastKind::Success);
            Ok(result)
        }
        Err(e) => {
            log::error!("Matrix upload failed at {}%: {}", last_percent, e);
            let _ = sink.send(JobProgress::failed(last_percent, total));
            toasts.notify(format!("Error: {}", e), ToastKind::Error);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IngestLimits, NotificationConfig};
    use crate::error::ErrorKind;
    use crate::ingest::{SourceFile, ingest};
    use crate::test_support::{FakeBackend, sample_result, sample_rows_xlsx};
    use crate::timeconv::{DepartureSelection, to_utc_unix};
    use crate::upload::JobStatus;
    use chrono_tz::America::Los_Angeles;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn submission(with_transit: bool, with_departure: bool) -> Submission {
        let source = SourceFile::new("sf.xlsx", sample_rows_xlsx(with_transit));
        let ingested = ingest(source, &IngestLimits::default()).unwrap();
        let departure = with_departure
            .then(|| DepartureSelection::parse("2025-03-25T10:30", Los_Angeles).unwrap());
        Submission {
            source: ingested.workbook.source().clone(),
            first_sheet: true,
            table: ingested.table,
            conversion: departure.as_ref().map(|d| to_utc_unix(d.local())),
            departure,
        }
    }

    fn toasts() -> ToastQueue {
        // Long enough that nothing expires while the fake upload sleeps
        ToastQueue::new(&NotificationConfig {
            default_ttl_ms: 600_000,
            ..NotificationConfig::default()
        })
    }

    fn collect(rx: &mut mpsc::UnboundedReceiver<JobProgress>) -> Vec<JobProgress> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_progress_sequence() {
        let backend = FakeBackend::default()
            .with_upload(Ok(sample_result(16)))
            .with_upload_delay(Duration::from_secs(30));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let toasts = toasts();

        let result = submit(&backend, &submission(true, true), &ProgressConfig::default(), &tx, &toasts)
            .await
            .unwrap();
        assert_eq!(result.total_pairs(), 16);
        assert!(result.result_filename.is_some());

        let updates = collect(&mut rx);
        let first = updates.first().unwrap();
        assert_eq!((first.percent, first.total, first.status), (0, 16, JobStatus::Processing));

        let last = updates.last().unwrap();
        assert_eq!(*last, JobProgress::completed(16));

        let percents: Vec<u8> = updates.iter().map(|u| u.percent).collect();
        assert!(percents.windows(2).all(|w| w[0] < w[1]), "{percents:?}");
        assert!(percents[..percents.len() - 1].iter().all(|p| *p <= 95));

        let uploads = backend.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].file_name, "sf.xlsx");
        assert_eq!(uploads[0].timestamp, Some(1_742_923_800));

        let texts: Vec<String> = toasts.snapshot().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec![PROCESSING_STARTED, PROCESSING_COMPLETED]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_departure_makes_no_backend_call() {
        let backend = FakeBackend::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let toasts = toasts();

        let err = submit(&backend, &submission(true, false), &ProgressConfig::default(), &tx, &toasts)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingDepartureTime);
        assert_eq!(backend.calls(), 0);
        assert_eq!(collect(&mut rx), vec![JobProgress::failed(0, 16)]);

        let snapshot = toasts.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].kind, ToastKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_failure_keeps_last_percent() {
        let backend = FakeBackend::default()
            .with_upload(Err(AppError::Server {
                status: 502,
                message: Some("Routing API unavailable".into()),
            }))
            .with_upload_delay(Duration::from_secs(10));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let toasts = toasts();

        let err = submit(&backend, &submission(false, true), &ProgressConfig::default(), &tx, &toasts)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);

        let updates = collect(&mut rx);
        let last = updates.last().unwrap();
        assert_eq!(last.status, JobStatus::Error);
        let shown_before = updates[updates.len() - 2].percent;
        assert_eq!(last.percent, shown_before);

        let errors: Vec<String> = toasts
            .snapshot()
            .into_iter()
            .filter(|t| t.kind == ToastKind::Error)
            .map(|t| t.text)
            .collect();
        assert_eq!(errors, vec!["Error: Routing API unavailable"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_progress_after_completion() {
        let backend = FakeBackend::default().with_upload_delay(Duration::from_secs(3));
        let (tx, mut rx) = mpsc::unbounded_channel();

        submit(&backend, &submission(false, true), &ProgressConfig::default(), &tx, &toasts())
            .await
            .unwrap();
        let before = collect(&mut rx).len();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(collect(&mut rx).is_empty(), "simulator kept running after {before} updates");
    }
}
