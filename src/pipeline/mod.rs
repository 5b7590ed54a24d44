//! Hotel run orchestration.
//!
//! - `window`: import marker to sync window
//! - `retry`: the backoff policy applied at every external call
//! - `hotel`: one hotel run through its stages
//! - `batch`: all hotels under a concurrency limit and a time budget

pub mod batch;
pub mod hotel;
pub mod retry;
pub mod window;

use std::sync::Arc;

use crate::error::Result;
use crate::models::{BatchSummary, Config, DataKind, TransformConfig};
use crate::notify::Notifier;
use crate::registry::{HttpRegistry, Registry};
use crate::source::{HostApiClient, SourceAdapter};
use crate::storage::ArtifactStore;

pub use hotel::HotelRun;
pub use retry::RetryPolicy;

/// The four external collaborators of a run.
#[derive(Clone)]
pub struct Connectors {
    pub source: Arc<dyn SourceAdapter>,
    pub store: Arc<dyn ArtifactStore>,
    pub registry: Arc<dyn Registry>,
    pub notifier: Arc<dyn Notifier>,
}

impl Connectors {
    /// Build production connectors for the configured backends.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let source: Arc<dyn SourceAdapter> = Arc::new(HostApiClient::new(&config.source)?);
        let registry: Arc<dyn Registry> = Arc::new(HttpRegistry::new(&config.registry)?);

        let store = crate::storage::open_store(&config.storage).await?;
        let notifier = crate::notify::open_notifier(config).await?;

        Ok(Self {
            source,
            store,
            registry,
            notifier,
        })
    }
}

/// Everything a batch needs: collaborators plus the run-wide policies.
pub struct Pipeline {
    pub connectors: Connectors,
    pub retry: RetryPolicy,
    pub rules: TransformConfig,
    /// Endpoint that feeds the reservations slot of each bundle
    pub reservation_source: DataKind,
    pub max_concurrent: usize,
    pub time_budget: Option<std::time::Duration>,
}

impl Pipeline {
    pub fn new(connectors: Connectors, config: &Config) -> Self {
        Self {
            connectors,
            retry: RetryPolicy::from_config(&config.retry),
            rules: config.transform,
            reservation_source: config.source.reservation_source.data_kind(),
            max_concurrent: config.batch.max_concurrent.max(1),
            time_budget: Some(config.batch.time_budget()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_reservation_source(mut self, kind: DataKind) -> Self {
        self.reservation_source = kind;
        self
    }

    pub fn with_time_budget(mut self, budget: Option<std::time::Duration>) -> Self {
        self.time_budget = budget;
        self
    }
}

/// Run the batch with connectors built from `config`.
pub async fn run_from_config(
    config: &Config,
    only_hotel: Option<&str>,
) -> Result<BatchSummary> {
    let connectors = Connectors::from_config(config).await?;
    Pipeline::new(connectors, config).run_batch(only_hotel).await
}
