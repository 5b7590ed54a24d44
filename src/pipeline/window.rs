//! Sync window resolution.
//!
//! The window's lower bound comes from the registry's import marker; the
//! upper bound is the moment the hotel run started.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{ImportMarker, SyncWindow};
use crate::utils::time::{beginning_of_time, parse_timestamp};

/// Compute the extraction window for a hotel run.
///
/// An absent, blank or sentinel marker yields a full-history window. A marker
/// that cannot be parsed, or that lies after `now`, is a validation error.
pub fn resolve(marker: &ImportMarker, now: DateTime<Utc>) -> Result<SyncWindow> {
    let from = match marker.last_imported_at.as_deref().map(str::trim) {
        None | Some("") => beginning_of_time(),
        Some(raw) => {
            let parsed = parse_timestamp(raw).ok_or_else(|| {
                AppError::validation(format!(
                    "[{}] import marker '{}' is not a timestamp",
                    marker.hotel_key, raw
                ))
            })?;
            // Anything at or before the sentinel means "never imported".
            parsed.max(beginning_of_time())
        }
    };

    if from > now {
        return Err(AppError::validation(format!(
            "[{}] import marker {} is later than the run start {}",
            marker.hotel_key, from, now
        )));
    }

    Ok(SyncWindow { from, to: now })
}
