//! Storage abstractions for raw and processed artifacts.
//!
//! Two logical roles share one key layout:
//!
//! ```text
//! raw/                                   # unmodified source responses
//! └── {hotelKey}/
//!     ├── hotel-configs-{runTs}.json
//!     ├── reservations-{runTs}.json     # or stat-daily-{runTs}.json
//!     ├── inventory-{runTs}.json
//!     └── revenue-{runTs}.json
//! processed/                             # canonical documents
//! └── {hotelKey}/
//!     ├── hotel-configs-{runTs}.json
//!     ├── segments-{runTs}.json
//!     ├── reservations-{runTs}.json
//!     ├── inventory-{runTs}.json
//!     └── revenue-{runTs}.json
//! ```
//!
//! Writes are whole-object. Nothing is ever appended or deleted; an artifact
//! is inert until the registry knows about it.

pub mod local;
#[cfg(feature = "aws")]
pub mod s3;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{
    DataKind, RawBundle, RawPayload, StorageBackend, StorageConfig, SyncWindow,
};

// Re-export for convenience
pub use local::LocalStorage;
#[cfg(feature = "aws")]
pub use s3::S3Storage;

/// Which pre-provisioned location an artifact goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketRole {
    Raw,
    Processed,
}

impl BucketRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketRole::Raw => "raw",
            BucketRole::Processed => "processed",
        }
    }
}

impl fmt::Display for BucketRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object key for one artifact of one run.
pub fn artifact_key(hotel_key: &str, artifact_name: &str, run_timestamp: &str) -> String {
    format!("{hotel_key}/{artifact_name}-{run_timestamp}.json")
}

/// Trait for artifact storage backends.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write a whole object, replacing any previous content under `key`.
    async fn put(&self, role: BucketRole, key: &str, body: Vec<u8>) -> Result<()>;

    /// Read an object back, `None` if it does not exist.
    async fn get(&self, role: BucketRole, key: &str) -> Result<Option<Vec<u8>>>;

    /// Human-readable location of an object, for logs.
    fn describe(&self, role: BucketRole, key: &str) -> String;
}

/// Open the configured storage backend.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn ArtifactStore>> {
    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalStorage::new(&config.local_dir))),
        #[cfg(feature = "aws")]
        StorageBackend::S3 => Ok(Arc::new(S3Storage::from_config(config).await?)),
        #[cfg(not(feature = "aws"))]
        StorageBackend::S3 => Err(AppError::config(
            "storage backend 's3' requires the 'aws' feature",
        )),
    }
}

/// Read back the raw payloads of a stored run, for replay.
///
/// The reservations slot is whichever of `reservations` or `stat-daily` the
/// run stored.
pub async fn load_raw_bundle(
    store: &dyn ArtifactStore,
    hotel_key: &str,
    run_timestamp: &str,
    window: SyncWindow,
) -> Result<RawBundle> {
    let load =
        move |kind: DataKind| load_raw(store, kind, hotel_key, run_timestamp, window);
    let missing = |name: &str| {
        let key = artifact_key(hotel_key, name, run_timestamp);
        AppError::storage(format!("{} not found", store.describe(BucketRole::Raw, &key)))
    };

    let mut reservations = None;
    for kind in DataKind::RESERVATION_SOURCES {
        if let Some(payload) = load(kind).await? {
            reservations = Some(payload);
            break;
        }
    }

    Ok(RawBundle {
        config: load(DataKind::Config)
            .await?
            .ok_or_else(|| missing(DataKind::Config.artifact_name()))?,
        reservations: reservations
            .ok_or_else(|| missing(DataKind::Reservations.artifact_name()))?,
        inventory: load(DataKind::Inventory)
            .await?
            .ok_or_else(|| missing(DataKind::Inventory.artifact_name()))?,
        revenue: load(DataKind::Revenue)
            .await?
            .ok_or_else(|| missing(DataKind::Revenue.artifact_name()))?,
    })
}

async fn load_raw(
    store: &dyn ArtifactStore,
    kind: DataKind,
    hotel_key: &str,
    run_timestamp: &str,
    window: SyncWindow,
) -> Result<Option<RawPayload>> {
    let key = artifact_key(hotel_key, kind.artifact_name(), run_timestamp);
    let Some(bytes) = store.get(BucketRole::Raw, &key).await? else {
        return Ok(None);
    };
    let body = serde_json::from_slice(&bytes)?;
    Ok(Some(RawPayload::new(kind, hotel_key, window, body)))
}
