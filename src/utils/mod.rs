//! Utility functions and helpers.

pub mod http;
pub mod time;

use url::Url;

use crate::error::{AppError, Result};

/// Join an API path onto a base URL, keeping any path prefix of the base.
///
/// `https://host/rms-v2` + `/ExternalRms/Config` gives
/// `https://host/rms-v2/ExternalRms/Config`, which `Url::join` alone would not.
pub fn join_url(base: &str, path: &str) -> Result<Url> {
    let base = if base.ends_with('/') {
        Url::parse(base)?
    } else {
        Url::parse(&format!("{base}/"))?
    };
    Ok(base.join(path.trim_start_matches('/'))?)
}

/// Append path segments to a base URL, percent-encoding each one.
///
/// Segments come from data (hotel keys), so `/` or `?` inside one stays part
/// of that segment. Empty, `.` and `..` segments are refused.
pub fn segment_url(base: &str, segments: &[&str]) -> Result<Url> {
    if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
        return Err(AppError::validation(format!("'{bad}' is not a usable path segment")));
    }

    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| AppError::config(format!("'{base}' cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
