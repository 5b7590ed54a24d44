//! Hotel identity, import markers and sync windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::time::{beginning_of_time, format_timestamp};

/// A hotel known to the registry.
///
/// `key` is what storage paths, registrations and queue groups use;
/// `source_code` is what the PMS API expects. They usually match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HotelRef {
    pub key: String,
    pub source_code: String,
}

impl HotelRef {
    /// Hotel whose source code equals its key.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            source_code: key.clone(),
            key,
        }
    }

    pub fn with_source_code(mut self, source_code: impl Into<String>) -> Self {
        self.source_code = source_code.into();
        self
    }
}

/// Last successful import for a hotel, as stored by the registry.
///
/// The timestamp is kept as the registry wrote it; parsing happens when the
/// window is resolved so a malformed value fails the hotel, not the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMarker {
    pub hotel_key: String,
    pub last_imported_at: Option<String>,
}

impl ImportMarker {
    pub fn new(hotel_key: impl Into<String>, last_imported_at: Option<String>) -> Self {
        Self {
            hotel_key: hotel_key.into(),
            last_imported_at,
        }
    }

    /// Marker for a hotel that has never been imported.
    pub fn unset(hotel_key: impl Into<String>) -> Self {
        Self::new(hotel_key, None)
    }
}

/// Extraction range for one hotel run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl SyncWindow {
    /// True when this run re-fetches the hotel's whole history.
    pub fn is_full_history(&self) -> bool {
        self.from <= beginning_of_time()
    }

    /// The run timestamp threaded through every key, registration and marker.
    pub fn run_timestamp(&self) -> String {
        format_timestamp(self.to)
    }

    /// Lower bound as sent to the source API.
    pub fn update_from(&self) -> String {
        format_timestamp(self.from)
    }
}
