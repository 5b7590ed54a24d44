// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{AppError, Result};

/// Create a configured asynchronous HTTP client.
pub fn create_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))
}

/// How a non-success HTTP status should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// 401 / 403
    Unauthorized,
    /// 429, 408 and 5xx
    Transient,
    /// Any other 4xx
    Rejected,
}

pub fn classify_status(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        StatusClass::Unauthorized
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        StatusClass::Transient
    } else {
        StatusClass::Rejected
    }
}

/// Truncate a response body for inclusion in an error message.
pub fn body_excerpt(body: &str) -> String {
    const MAX: usize = 300;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), StatusClass::Success);
        assert_eq!(classify_status(StatusCode::NO_CONTENT), StatusClass::Success);
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            StatusClass::Unauthorized
        );
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN),
            StatusClass::Unauthorized
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            StatusClass::Transient
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY),
            StatusClass::Transient
        );
        assert_eq!(classify_status(StatusCode::NOT_FOUND), StatusClass::Rejected);
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            StatusClass::Rejected
        );
    }

    #[test]
    fn test_body_excerpt() {
        assert_eq!(body_excerpt("short"), "short");
        let long = "x".repeat(400);
        assert_eq!(body_excerpt(&long).len(), 303);
    }
}
