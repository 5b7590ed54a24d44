//! Registry and queue messages produced by a run.

use serde::{Deserialize, Serialize};

use crate::models::ArtifactKind;

/// Announces one processed artifact to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRegistration {
    pub hotel_key: String,
    pub kind: ArtifactKind,
    pub recorded_at: String,
    pub updated_at: String,
    pub complete: bool,
    pub storage_key: String,
}

impl FileRegistration {
    /// Registry wire payload.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "payload": {
                "code": self.hotel_key,
                "record_date": self.recorded_at,
                "last_updated": self.updated_at,
                "complete": self.complete,
                "file": self.storage_key,
            }
        })
    }
}

/// The single processing trigger sent per committed hotel run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTrigger {
    pub group_key: String,
    pub body: String,
    /// Run timestamp; only used to derive the deduplication id.
    pub run_timestamp: String,
}

impl QueueTrigger {
    pub fn for_hotel(hotel_key: &str, run_timestamp: &str) -> Self {
        Self {
            group_key: hotel_key.to_string(),
            body: hotel_key.to_string(),
            run_timestamp: run_timestamp.to_string(),
        }
    }

    /// Stable id so a redelivered send for the same run is collapsed by the queue.
    pub fn deduplication_id(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.group_key.as_bytes());
        hasher.update(b"|");
        hasher.update(self.run_timestamp.as_bytes());
        hex::encode(hasher.finalize())
    }
}
