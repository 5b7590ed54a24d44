//! Raw source payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::SyncWindow;

/// Data kinds fetched from the source API.
///
/// `StatDaily` is an alternative reservation source: per-day occupancy and
/// revenue statistics that stand in for the reservation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Config,
    Reservations,
    Inventory,
    Revenue,
    StatDaily,
}

impl DataKind {
    /// Extraction order. Config comes first since it drives the segment catalog.
    pub const ALL: [DataKind; 4] = [
        DataKind::Config,
        DataKind::Reservations,
        DataKind::Inventory,
        DataKind::Revenue,
    ];

    /// Kinds that can feed the reservations artifact.
    pub const RESERVATION_SOURCES: [DataKind; 2] = [DataKind::Reservations, DataKind::StatDaily];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Config => "config",
            DataKind::Reservations => "reservations",
            DataKind::Inventory => "inventory",
            DataKind::Revenue => "revenue",
            DataKind::StatDaily => "stat_daily",
        }
    }

    /// Name used in the raw artifact key.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            DataKind::Config => "hotel-configs",
            DataKind::Reservations => "reservations",
            DataKind::Inventory => "inventory",
            DataKind::Revenue => "revenue",
            DataKind::StatDaily => "stat-daily",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataKind::ALL
            .into_iter()
            .chain([DataKind::StatDaily])
            .find(|k| k.as_str() == s || k.artifact_name() == s)
            .ok_or_else(|| AppError::validation(format!("unknown data kind '{s}'")))
    }
}

/// One aggregated response from the source API, kept exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    pub kind: DataKind,
    pub hotel_key: String,
    pub window: SyncWindow,
    pub body: serde_json::Value,
}

impl RawPayload {
    pub fn new(
        kind: DataKind,
        hotel_key: impl Into<String>,
        window: SyncWindow,
        body: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            hotel_key: hotel_key.into(),
            window,
            body,
        }
    }
}

/// Everything extracted for one hotel run.
#[derive(Debug, Clone)]
pub struct RawBundle {
    pub config: RawPayload,
    /// `Reservations` or `StatDaily`, depending on the configured source
    pub reservations: RawPayload,
    pub inventory: RawPayload,
    pub revenue: RawPayload,
}

impl RawBundle {
    pub fn payloads(&self) -> [&RawPayload; 4] {
        [
            &self.config,
            &self.reservations,
            &self.inventory,
            &self.revenue,
        ]
    }
}
