//! One hotel run.
//!
//! ```text
//! PENDING → WINDOW_RESOLVED → EXTRACTED → RAW_STORED → TRANSFORMED
//!         → ARTIFACTS_STORED → REGISTERED → MARKER_ADVANCED → NOTIFIED
//! ```
//!
//! A failure anywhere ends the run as `Failed` with the stage that was being
//! attempted. The marker only moves after every registration is acknowledged,
//! so a failed run is retried from scratch by the next invocation.

use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{
    CanonicalArtifact, DataKind, FileRegistration, HotelOutcome, HotelRef, HotelReport,
    QueueTrigger, RawBundle, RawPayload, RunStage, SyncWindow,
};
use crate::pipeline::{Pipeline, window};
use crate::storage::{BucketRole, artifact_key};
use crate::transform::transform_all;

/// Progress of a single hotel through the stages.
#[derive(Debug, Clone)]
pub struct HotelRun {
    pub hotel: HotelRef,
    /// Last stage completed
    pub reached: RunStage,
    /// Stage currently being attempted
    pub attempting: RunStage,
    pub window: Option<SyncWindow>,
}

impl HotelRun {
    pub fn new(hotel: HotelRef) -> Self {
        Self {
            hotel,
            reached: RunStage::Pending,
            attempting: RunStage::Pending,
            window: None,
        }
    }

    fn enter(&mut self, stage: RunStage) {
        self.attempting = stage;
    }

    fn complete(&mut self, stage: RunStage) {
        log::debug!("[{}] {}", self.hotel.key, stage);
        self.reached = stage;
    }

    pub fn run_timestamp(&self) -> Option<String> {
        self.window.as_ref().map(SyncWindow::run_timestamp)
    }
}

/// Report plus the error that must stop the batch, if any.
#[derive(Debug)]
pub struct HotelRunResult {
    pub report: HotelReport,
    pub fatal: Option<AppError>,
}

/// Predicate for the queue send: every notify failure is worth another try.
fn notify_retryable(err: &AppError) -> bool {
    matches!(err, AppError::Notify(_)) || err.is_retryable()
}

impl Pipeline {
    /// Drive one hotel to a terminal state. Never panics on hotel errors;
    /// they come back in the report.
    pub async fn run_hotel(&self, hotel: &HotelRef, deadline: Option<Instant>) -> HotelRunResult {
        let started_at = Utc::now();
        let mut run = HotelRun::new(hotel.clone());
        log::info!("[{}] Starting run", hotel.key);

        let result = self.drive(&mut run, deadline, started_at).await;

        let (outcome, fatal) = match result {
            Ok(()) => {
                log::info!("[{}] Run complete", hotel.key);
                (HotelOutcome::Succeeded, None)
            }
            Err(err) if run.attempting == RunStage::Notified => {
                log::error!(
                    "[{}] Committed but trigger not sent, redeliver only: {}",
                    hotel.key,
                    err
                );
                (
                    HotelOutcome::NotifyFailed {
                        reason: err.to_string(),
                    },
                    None,
                )
            }
            Err(err) => {
                log::error!("[{}] Failed at {}: {}", hotel.key, run.attempting, err);
                let outcome = HotelOutcome::Failed {
                    stage: run.attempting,
                    reason: err.to_string(),
                };
                let fatal = err.is_batch_fatal().then_some(err);
                (outcome, fatal)
            }
        };

        HotelRunResult {
            report: HotelReport {
                hotel_key: hotel.key.clone(),
                outcome,
                run_timestamp: run.run_timestamp(),
                started_at,
                finished_at: Utc::now(),
            },
            fatal,
        }
    }

    async fn drive(
        &self,
        run: &mut HotelRun,
        deadline: Option<Instant>,
        started_at: DateTime<Utc>,
    ) -> Result<()> {
        let hotel = run.hotel.clone();
        let key = hotel.key.as_str();

        // WINDOW_RESOLVED
        run.enter(RunStage::WindowResolved);
        check_deadline(deadline, run)?;
        let registry = self.connectors.registry.as_ref();
        let marker = self
            .retry
            .run(&format!("[{key}] get marker"), || registry.get_marker(&hotel))
            .await?;
        // Bounded by the run start, not by when the marker lookup returned.
        let window = window::resolve(&marker, started_at)?;
        let run_ts = window.run_timestamp();
        run.window = Some(window);
        log::info!(
            "[{}] Window {} .. {}{}",
            key,
            window.update_from(),
            run_ts,
            if window.is_full_history() { " (full history)" } else { "" }
        );
        run.complete(RunStage::WindowResolved);

        // EXTRACTED
        run.enter(RunStage::Extracted);
        check_deadline(deadline, run)?;
        let bundle = RawBundle {
            config: self.fetch(DataKind::Config, &hotel, &window).await?,
            reservations: self.fetch(self.reservation_source, &hotel, &window).await?,
            inventory: self.fetch(DataKind::Inventory, &hotel, &window).await?,
            revenue: self.fetch(DataKind::Revenue, &hotel, &window).await?,
        };
        run.complete(RunStage::Extracted);

        // RAW_STORED
        run.enter(RunStage::RawStored);
        check_deadline(deadline, run)?;
        for payload in bundle.payloads() {
            let name = payload.kind.artifact_name();
            let body = serde_json::to_vec(&payload.body)?;
            self.store(BucketRole::Raw, &artifact_key(key, name, &run_ts), body)
                .await?;
        }
        run.complete(RunStage::RawStored);

        // TRANSFORMED
        run.enter(RunStage::Transformed);
        check_deadline(deadline, run)?;
        let artifacts = transform_all(&bundle, &self.rules)?;
        run.complete(RunStage::Transformed);

        // ARTIFACTS_STORED
        run.enter(RunStage::ArtifactsStored);
        check_deadline(deadline, run)?;
        let mut stored: Vec<(&CanonicalArtifact, String)> = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            let storage_key = artifact_key(key, artifact.kind().artifact_name(), &run_ts);
            self.store(BucketRole::Processed, &storage_key, artifact.to_json_bytes()?)
                .await?;
            log::debug!(
                "[{}] Stored {} ({} records)",
                key,
                artifact.kind(),
                artifact.record_count()
            );
            stored.push((artifact, storage_key));
        }
        run.complete(RunStage::ArtifactsStored);

        // Commit sequence: runs to completion regardless of the deadline.

        // REGISTERED
        run.enter(RunStage::Registered);
        let complete = window.is_full_history();
        for (artifact, storage_key) in &stored {
            let registration = FileRegistration {
                hotel_key: key.to_string(),
                kind: artifact.kind(),
                recorded_at: run_ts.clone(),
                updated_at: run_ts.clone(),
                complete,
                storage_key: storage_key.clone(),
            };
            self.retry
                .run(&format!("[{key}] register {}", artifact.kind()), || {
                    registry.register_file(&registration)
                })
                .await?;
        }
        run.complete(RunStage::Registered);

        // MARKER_ADVANCED
        run.enter(RunStage::MarkerAdvanced);
        self.retry
            .run(&format!("[{key}] set marker"), || {
                registry.set_marker(key, &run_ts)
            })
            .await?;
        log::info!("[{}] Marker advanced to {}", key, run_ts);
        run.complete(RunStage::MarkerAdvanced);

        // NOTIFIED
        run.enter(RunStage::Notified);
        let notifier = self.connectors.notifier.as_ref();
        let trigger = QueueTrigger::for_hotel(key, &run_ts);
        self.retry
            .clone()
            .with_predicate(notify_retryable)
            .run(&format!("[{key}] enqueue"), || notifier.enqueue(&trigger))
            .await?;
        run.complete(RunStage::Notified);

        Ok(())
    }

    async fn fetch(&self, kind: DataKind, hotel: &HotelRef, window: &SyncWindow) -> Result<RawPayload> {
        let source = self.connectors.source.as_ref();
        self.retry
            .run(&format!("[{}] fetch {}", hotel.key, kind), || {
                source.fetch(kind, hotel, window)
            })
            .await
    }

    async fn store(&self, role: BucketRole, key: &str, body: Vec<u8>) -> Result<()> {
        let store = self.connectors.store.as_ref();
        self.retry
            .run(&format!("put {}", store.describe(role, key)), || {
                store.put(role, key, body.clone())
            })
            .await
    }
}

fn check_deadline(deadline: Option<Instant>, run: &HotelRun) -> Result<()> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(AppError::Deadline(format!(
            "[{}] not starting {}",
            run.hotel.key, run.attempting
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::models::ArtifactKind;
    use crate::pipeline::testing::Harness;
    use crate::pipeline::RetryPolicy;
    use crate::utils::time::parse_timestamp;

    #[tokio::test]
    async fn test_end_to_end_unset_marker() {
        let harness = Harness::new(&["H1"]);
        let pipeline = harness.pipeline();

        let result = pipeline.run_hotel(&HotelRef::new("H1"), None).await;

        assert_eq!(result.report.outcome, HotelOutcome::Succeeded);
        assert!(result.fatal.is_none());
        let run_ts = result.report.run_timestamp.clone().unwrap();

        // Marker advanced to the run's upper bound
        assert_eq!(harness.registry.marker("H1"), Some(run_ts.clone()));

        // Exactly one trigger with the hotel key as body and group
        let sent = harness.notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "H1");
        assert_eq!(sent[0].group_key, "H1");

        // Canonical inventory record
        let inventory_key = format!("H1/inventory-{run_ts}.json");
        let inventory = harness
            .store
            .json(BucketRole::Processed, &inventory_key)
            .unwrap();
        assert_eq!(
            inventory["roomInventory"][0],
            serde_json::json!({
                "calendarDate": "[2021-02-02,)",
                "inventory": 1,
                "inventoryOOO": 0,
                "inventoryOOI": 0,
                "roomCode": "D"
            })
        );

        // One registration per processed artifact, all complete (full history)
        let registrations = harness.registry.registrations_for("H1");
        assert_eq!(registrations.len(), ArtifactKind::ALL.len());
        assert!(registrations.iter().all(|r| r.complete));
        assert!(registrations.iter().all(|r| r.recorded_at == run_ts));
        assert_eq!(
            harness.store.keys(BucketRole::Raw),
            vec![
                format!("H1/hotel-configs-{run_ts}.json"),
                format!("H1/inventory-{run_ts}.json"),
                format!("H1/reservations-{run_ts}.json"),
                format!("H1/revenue-{run_ts}.json"),
            ]
        );
    }

    #[tokio::test]
    async fn test_incremental_run_is_not_complete() {
        let harness = Harness::new(&["H1"]);
        harness.registry.set("H1", "2024-07-01T00:00:00Z");

        let result = harness.pipeline().run_hotel(&HotelRef::new("H1"), None).await;

        assert!(result.report.outcome.is_success());
        let registrations = harness.registry.registrations_for("H1");
        assert!(!registrations.is_empty());
        assert!(registrations.iter().all(|r| !r.complete));
    }

    #[tokio::test]
    async fn test_processed_storage_failure_leaves_marker() {
        let harness = Harness::new(&["H1"]);
        harness.registry.set("H1", "2024-07-01T00:00:00Z");
        harness.store.fail_role(BucketRole::Processed);

        let result = harness.pipeline().run_hotel(&HotelRef::new("H1"), None).await;

        match &result.report.outcome {
            HotelOutcome::Failed { stage, .. } => assert_eq!(*stage, RunStage::ArtifactsStored),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(result.fatal.is_none());
        // Retry budget was spent on the first artifact
        assert_eq!(harness.store.failed_puts.load(Ordering::SeqCst), 3);
        assert_eq!(
            harness.registry.marker("H1").as_deref(),
            Some("2024-07-01T00:00:00Z")
        );
        assert!(harness.registry.registrations_for("H1").is_empty());
        assert!(harness.notifier.sent.lock().unwrap().is_empty());
        // Raw artifacts may stay behind; they are inert until registered
        assert_eq!(harness.store.keys(BucketRole::Raw).len(), 4);
    }

    #[tokio::test]
    async fn test_transient_source_errors_are_retried() {
        let harness = Harness::new(&["H1"]);
        harness.source.flaky.store(2, Ordering::SeqCst);

        let result = harness.pipeline().run_hotel(&HotelRef::new("H1"), None).await;

        assert!(result.report.outcome.is_success());
        // 4 kinds plus 2 failed attempts
        assert_eq!(harness.source.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_permanent_source_error_fails_extraction() {
        let harness = Harness::new(&["H1"]);
        harness.source.break_hotel("H1");

        let result = harness.pipeline().run_hotel(&HotelRef::new("H1"), None).await;

        assert!(matches!(
            result.report.outcome,
            HotelOutcome::Failed {
                stage: RunStage::Extracted,
                ..
            }
        ));
        // Not retried
        assert_eq!(harness.source.calls.load(Ordering::SeqCst), 1);
        assert!(harness.registry.marker("H1").is_none());
    }

    #[tokio::test]
    async fn test_notify_failure_is_reported_separately() {
        let harness = Harness::new(&["H1"]);
        harness.notifier.failing.store(true, Ordering::SeqCst);

        let result = harness.pipeline().run_hotel(&HotelRef::new("H1"), None).await;

        assert!(matches!(
            result.report.outcome,
            HotelOutcome::NotifyFailed { .. }
        ));
        // Data and marker are committed
        assert_eq!(harness.registry.marker("H1"), result.report.run_timestamp);
        assert_eq!(
            harness.registry.registrations_for("H1").len(),
            ArtifactKind::ALL.len()
        );
    }

    #[tokio::test]
    async fn test_rejected_registration_fails_hotel_only() {
        let harness = Harness::new(&["H1"]);
        harness.registry.rejecting.lock().unwrap().insert("H1".into());

        let result = harness.pipeline().run_hotel(&HotelRef::new("H1"), None).await;

        assert!(matches!(
            result.report.outcome,
            HotelOutcome::Failed {
                stage: RunStage::Registered,
                ..
            }
        ));
        assert!(result.fatal.is_none());
        assert!(harness.registry.marker("H1").is_none());
        assert!(harness.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal() {
        let harness = Harness::new(&["H1"]);
        harness.registry.unauthorized.lock().unwrap().insert("H1".into());

        let result = harness.pipeline().run_hotel(&HotelRef::new("H1"), None).await;

        assert!(matches!(
            result.report.outcome,
            HotelOutcome::Failed {
                stage: RunStage::WindowResolved,
                ..
            }
        ));
        assert!(matches!(result.fatal, Some(AppError::PermanentRegistry(_))));
    }

    #[tokio::test]
    async fn test_malformed_marker_is_validation_failure() {
        let harness = Harness::new(&["H1"]);
        harness.registry.set("H1", "yesterday");

        let result = harness.pipeline().run_hotel(&HotelRef::new("H1"), None).await;

        match result.report.outcome {
            HotelOutcome::Failed { stage, reason } => {
                assert_eq!(stage, RunStage::WindowResolved);
                assert!(reason.contains("yesterday"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(harness.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_deadline_stops_before_first_stage() {
        let harness = Harness::new(&["H1"]);
        let pipeline = harness.pipeline().with_retry(RetryPolicy::immediate(1));

        let result = pipeline
            .run_hotel(&HotelRef::new("H1"), Some(Instant::now()))
            .await;

        assert!(matches!(
            result.report.outcome,
            HotelOutcome::Failed {
                stage: RunStage::WindowResolved,
                ..
            }
        ));
        assert!(result.report.run_timestamp.is_none());
    }

    #[tokio::test]
    async fn test_deadline_passing_mid_extraction_stops_before_raw_storage() {
        let harness = Harness::new(&["H1"]);
        harness.registry.set("H1", "2024-07-01T00:00:00Z");
        *harness.source.delay.lock().unwrap() = Duration::from_millis(50);

        let deadline = Instant::now() + Duration::from_millis(20);
        let result = harness
            .pipeline()
            .run_hotel(&HotelRef::new("H1"), Some(deadline))
            .await;

        match &result.report.outcome {
            HotelOutcome::Failed { stage, .. } => {
                assert!(matches!(stage, RunStage::RawStored | RunStage::Transformed))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(result.fatal.is_none());
        assert_eq!(
            harness.registry.marker("H1").as_deref(),
            Some("2024-07-01T00:00:00Z")
        );
        assert!(harness.registry.registrations_for("H1").is_empty());
        assert!(harness.store.keys(BucketRole::Processed).is_empty());
        assert!(harness.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_finishes_after_deadline() {
        let harness = Harness::new(&["H1"]);
        *harness.registry.register_delay.lock().unwrap() = Duration::from_millis(100);

        // Five registrations take longer than the remaining budget.
        let deadline = Instant::now() + Duration::from_millis(200);
        let result = harness
            .pipeline()
            .run_hotel(&HotelRef::new("H1"), Some(deadline))
            .await;

        assert_eq!(result.report.outcome, HotelOutcome::Succeeded);
        assert!(Instant::now() > deadline);
        assert_eq!(
            harness.registry.registrations_for("H1").len(),
            ArtifactKind::ALL.len()
        );
        assert_eq!(harness.registry.marker("H1"), result.report.run_timestamp);
        assert_eq!(harness.notifier.bodies(), vec!["H1"]);
    }

    #[tokio::test]
    async fn test_window_ends_at_run_start() {
        let harness = Harness::new(&["H1"]);
        *harness.registry.marker_delay.lock().unwrap() = Duration::from_millis(1100);

        let result = harness.pipeline().run_hotel(&HotelRef::new("H1"), None).await;

        assert!(result.report.outcome.is_success());
        let run_ts = result.report.run_timestamp.as_deref().unwrap();
        assert!(parse_timestamp(run_ts).unwrap() <= result.report.started_at);
    }

    #[tokio::test]
    async fn test_stat_daily_source_feeds_reservations() {
        let harness = Harness::new(&["H1"]);
        let pipeline = harness
            .pipeline()
            .with_reservation_source(DataKind::StatDaily);

        let result = pipeline.run_hotel(&HotelRef::new("H1"), None).await;

        assert_eq!(result.report.outcome, HotelOutcome::Succeeded);
        let run_ts = result.report.run_timestamp.clone().unwrap();
        assert_eq!(
            harness.store.keys(BucketRole::Raw),
            vec![
                format!("H1/hotel-configs-{run_ts}.json"),
                format!("H1/inventory-{run_ts}.json"),
                format!("H1/revenue-{run_ts}.json"),
                format!("H1/stat-daily-{run_ts}.json"),
            ]
        );
        let reservations = harness
            .store
            .json(BucketRole::Processed, &format!("H1/reservations-{run_ts}.json"))
            .unwrap();
        let records = reservations["reservations"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            harness.registry.registrations_for("H1").len(),
            ArtifactKind::ALL.len()
        );
    }
}
