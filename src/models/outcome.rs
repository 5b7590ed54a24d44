//! Per-hotel run states and batch summaries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Stages of a hotel run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStage {
    Pending,
    WindowResolved,
    Extracted,
    RawStored,
    Transformed,
    ArtifactsStored,
    Registered,
    MarkerAdvanced,
    Notified,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Pending => "PENDING",
            RunStage::WindowResolved => "WINDOW_RESOLVED",
            RunStage::Extracted => "EXTRACTED",
            RunStage::RawStored => "RAW_STORED",
            RunStage::Transformed => "TRANSFORMED",
            RunStage::ArtifactsStored => "ARTIFACTS_STORED",
            RunStage::Registered => "REGISTERED",
            RunStage::MarkerAdvanced => "MARKER_ADVANCED",
            RunStage::Notified => "NOTIFIED",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a hotel run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HotelOutcome {
    /// All stages through NOTIFIED completed.
    Succeeded,
    /// Run stopped while attempting `stage`; the marker was not advanced.
    Failed { stage: RunStage, reason: String },
    /// Data and marker are committed but the trigger was not sent.
    NotifyFailed { reason: String },
    /// Never started because the batch ran out of time or was aborted.
    Skipped { reason: String },
}

impl HotelOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, HotelOutcome::Succeeded)
    }

    /// Whether operators need to look at this hotel.
    pub fn needs_attention(&self) -> bool {
        !self.is_success()
    }
}

/// Result record for one hotel.
#[derive(Debug, Clone, Serialize)]
pub struct HotelReport {
    pub hotel_key: String,
    pub outcome: HotelOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_timestamp: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl fmt::Display for HotelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            HotelOutcome::Succeeded => write!(f, "{}: ok", self.hotel_key),
            HotelOutcome::Failed { stage, reason } => {
                write!(f, "{}: failed at {}: {}", self.hotel_key, stage, reason)
            }
            HotelOutcome::NotifyFailed { reason } => write!(
                f,
                "{}: committed, notification pending: {}",
                self.hotel_key, reason
            ),
            HotelOutcome::Skipped { reason } => write!(f, "{}: skipped: {}", self.hotel_key, reason),
        }
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub hotels: Vec<HotelReport>,
    /// Batch-fatal error that stopped new hotels from starting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.hotels.len()
    }

    pub fn succeeded(&self) -> usize {
        self.hotels.iter().filter(|h| h.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Hotels that should raise an alert.
    pub fn failures(&self) -> impl Iterator<Item = &HotelReport> {
        self.hotels.iter().filter(|h| h.outcome.needs_attention())
    }

    pub fn has_failures(&self) -> bool {
        self.aborted.is_some() || self.failures().next().is_some()
    }
}
