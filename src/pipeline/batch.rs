//! Batch scheduling over all registry hotels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{BatchSummary, HotelOutcome, HotelRef, HotelReport};
use crate::pipeline::Pipeline;
use crate::pipeline::hotel::HotelRunResult;

impl Pipeline {
    /// Run every hotel (or just `only_hotel`) with bounded parallelism.
    ///
    /// Hotel failures end up in the summary. A batch-fatal error stops new
    /// hotels from starting and lets in-flight runs finish; the summary then
    /// carries every report collected so far plus the abort reason.
    pub async fn run_batch(&self, only_hotel: Option<&str>) -> Result<BatchSummary> {
        let deadline = self.time_budget.map(|budget| Instant::now() + budget);
        let hotels = self.select_hotels(only_hotel).await?;

        log::info!(
            "Starting batch: {} hotels, {} concurrent",
            hotels.len(),
            self.max_concurrent
        );

        let abort = AtomicBool::new(false);
        let mut fatal: Option<AppError> = None;
        let mut reports = Vec::with_capacity(hotels.len());

        let mut runs = stream::iter(hotels.iter())
            .map(|hotel| {
                let abort = &abort;
                async move {
                    if abort.load(Ordering::SeqCst) {
                        return skipped(hotel, "batch aborted");
                    }
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        return skipped(hotel, "batch time budget exhausted");
                    }
                    self.run_hotel(hotel, deadline).await
                }
            })
            .buffer_unordered(self.max_concurrent);

        while let Some(result) = runs.next().await {
            log::info!("{}", result.report);
            if let Some(err) = result.fatal {
                if fatal.is_none() {
                    log::error!("Aborting batch: {}", err);
                    abort.store(true, Ordering::SeqCst);
                    fatal = Some(err);
                }
            }
            reports.push(result.report);
        }
        drop(runs);

        reports.sort_by(|a, b| a.hotel_key.cmp(&b.hotel_key));
        let summary = BatchSummary {
            hotels: reports,
            aborted: fatal.map(|err| err.to_string()),
        };

        log::info!(
            "Batch finished: {} ok, {} need attention",
            summary.succeeded(),
            summary.failed()
        );
        for report in summary.failures() {
            log::warn!("{}", report);
        }
        if let Some(reason) = &summary.aborted {
            log::error!("Batch aborted: {}", reason);
        }

        Ok(summary)
    }

    async fn select_hotels(&self, only_hotel: Option<&str>) -> Result<Vec<HotelRef>> {
        let registry = self.connectors.registry.as_ref();
        let mut hotels = self
            .retry
            .run("list hotels", || registry.list_hotels())
            .await?;

        if let Some(key) = only_hotel {
            hotels.retain(|hotel| hotel.key == key);
            if hotels.is_empty() {
                log::warn!("Hotel {} is not listed by the registry, running it anyway", key);
                hotels.push(HotelRef::new(key));
            }
        }

        Ok(hotels)
    }
}

fn skipped(hotel: &HotelRef, reason: &str) -> HotelRunResult {
    let now = Utc::now();
    HotelRunResult {
        report: HotelReport {
            hotel_key: hotel.key.clone(),
            outcome: HotelOutcome::Skipped {
                reason: reason.to_string(),
            },
            run_timestamp: None,
            started_at: now,
            finished_at: now,
        },
        fatal: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::models::RunStage;
    use crate::pipeline::testing::Harness;

    #[tokio::test]
    async fn test_one_failure_does_not_stop_siblings() {
        let harness = Harness::new(&["H1", "H2", "H3"]);
        harness.source.break_hotel("H2");

        let summary = harness.pipeline().run_batch(None).await.unwrap();

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.succeeded(), 2);
        assert!(summary.has_failures());
        let failed: Vec<&str> = summary.failures().map(|r| r.hotel_key.as_str()).collect();
        assert_eq!(failed, vec!["H2"]);
        assert!(matches!(
            summary.hotels[1].outcome,
            HotelOutcome::Failed {
                stage: RunStage::Extracted,
                ..
            }
        ));

        let mut bodies = harness.notifier.bodies();
        bodies.sort();
        assert_eq!(bodies, vec!["H1", "H3"]);
        assert!(harness.registry.marker("H2").is_none());
    }

    #[tokio::test]
    async fn test_single_hotel_filter() {
        let harness = Harness::new(&["H1", "H2"]);

        let summary = harness.pipeline().run_batch(Some("H2")).await.unwrap();

        assert_eq!(summary.total(), 1);
        assert_eq!(summary.hotels[0].hotel_key, "H2");
        assert_eq!(harness.notifier.bodies(), vec!["H2"]);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_batch() {
        let harness = Harness::new(&["H1", "H2", "H3"]);
        harness.registry.unauthorized.lock().unwrap().insert("H1".into());

        let mut pipeline = harness.pipeline();
        pipeline.max_concurrent = 1;
        let summary = pipeline.run_batch(None).await.unwrap();

        assert!(summary.aborted.as_deref().unwrap().contains("HTTP 403"));
        assert!(summary.has_failures());
        // Nothing after the fatal hotel was started
        assert_eq!(harness.source.calls.load(Ordering::SeqCst), 0);
        assert!(harness.notifier.bodies().is_empty());
        assert!(matches!(
            summary.hotels[1].outcome,
            HotelOutcome::Skipped { .. }
        ));
    }

    #[tokio::test]
    async fn test_abort_keeps_committed_reports() {
        let harness = Harness::new(&["H1", "H2", "H3"]);
        harness.registry.unauthorized.lock().unwrap().insert("H2".into());

        let mut pipeline = harness.pipeline();
        pipeline.max_concurrent = 1;
        let summary = pipeline.run_batch(None).await.unwrap();

        assert_eq!(summary.total(), 3);
        assert!(summary.aborted.is_some());
        assert_eq!(summary.hotels[0].hotel_key, "H1");
        assert_eq!(summary.hotels[0].outcome, HotelOutcome::Succeeded);
        assert!(harness.registry.marker("H1").is_some());
        assert_eq!(harness.notifier.bodies(), vec!["H1"]);

        assert!(matches!(
            summary.hotels[1].outcome,
            HotelOutcome::Failed {
                stage: RunStage::WindowResolved,
                ..
            }
        ));
        assert!(matches!(
            summary.hotels[2].outcome,
            HotelOutcome::Skipped { .. }
        ));
    }

    #[tokio::test]
    async fn test_spent_budget_skips_hotels() {
        let harness = Harness::new(&["H1", "H2"]);
        let pipeline = harness
            .pipeline()
            .with_time_budget(Some(Duration::ZERO));

        let summary = pipeline.run_batch(None).await.unwrap();

        assert_eq!(summary.total(), 2);
        assert!(
            summary
                .hotels
                .iter()
                .all(|r| matches!(r.outcome, HotelOutcome::Skipped { .. }))
        );
        assert!(harness.registry.registrations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notify_failure_counts_as_attention() {
        let harness = Harness::new(&["H1"]);
        harness.notifier.failing.store(true, Ordering::SeqCst);

        let summary = harness.pipeline().run_batch(None).await.unwrap();

        assert_eq!(summary.succeeded(), 0);
        assert!(summary.has_failures());
        assert!(matches!(
            summary.hotels[0].outcome,
            HotelOutcome::NotifyFailed { .. }
        ));
    }
}
