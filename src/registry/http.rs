//! Registry client over the ESB REST API.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{FileRegistration, HotelRef, ImportMarker, RegistryConfig};
use crate::registry::Registry;
use crate::utils::http::{StatusClass, body_excerpt, classify_status, create_client};
use crate::utils::segment_url;

/// ESB registry client with a per-instance OAuth token cache.
pub struct HttpRegistry {
    client: Client,
    base_url: String,
    auth_url: String,
    basic_auth: String,
    token: Mutex<Option<String>>,
}

impl HttpRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(&config.user_agent, config.timeout_secs)?,
            base_url: config.base_url.clone(),
            auth_url: config.auth_url.clone(),
            basic_auth: config.basic_auth.clone(),
            token: Mutex::new(None),
        })
    }

    fn uses_auth(&self) -> bool {
        !self.auth_url.is_empty()
    }

    /// Cached bearer token, fetched on first use.
    async fn bearer(&self) -> Result<Option<String>> {
        if !self.uses_auth() {
            return Ok(None);
        }

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(Some(token.clone()));
        }

        let token = self.fetch_token().await?;
        *cached = Some(token.clone());
        Ok(Some(token))
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn fetch_token(&self) -> Result<String> {
        log::debug!("Requesting registry token from {}", self.auth_url);

        let response = self
            .client
            .post(&self.auth_url)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", self.basic_auth))
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| AppError::TransientRegistry(format!("token request: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::TransientRegistry(format!("token request: {e}")))?;

        if !status.is_success() {
            return Err(status_error("token request", status, &body));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| AppError::PermanentRegistry(format!("token response: {e}")))?;
        parsed
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::PermanentRegistry("no access_token in token response".into()))
    }

    /// Send one request; a 401 triggers a single token refresh and resend.
    async fn request(&self, method: Method, path: &[&str], body: Option<&Value>) -> Result<Value> {
        let url = segment_url(&self.base_url, path)?;
        let operation = format!("{} {}", method, url.path());

        let mut refreshed = false;
        loop {
            let mut builder = self.client.request(method.clone(), url.clone());
            if let Some(token) = self.bearer().await? {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| AppError::TransientRegistry(format!("{operation}: {e}")))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| AppError::TransientRegistry(format!("{operation}: {e}")))?;

            if status == StatusCode::UNAUTHORIZED && self.uses_auth() && !refreshed {
                log::info!("{} returned 401, refreshing registry token", operation);
                self.invalidate_token().await;
                refreshed = true;
                continue;
            }

            if !status.is_success() {
                return Err(status_error(&operation, status, &text));
            }

            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(|e| AppError::RegistryRejected {
                status: status.as_u16(),
                message: format!("{operation}: undecodable body: {e}"),
            });
        }
    }
}

/// Map a non-success registry status onto the error taxonomy.
fn status_error(operation: &str, status: StatusCode, body: &str) -> AppError {
    let message = format!("{operation}: HTTP {status}: {}", body_excerpt(body));
    match classify_status(status) {
        StatusClass::Unauthorized => AppError::PermanentRegistry(message),
        StatusClass::Transient | StatusClass::Success => AppError::TransientRegistry(message),
        StatusClass::Rejected => AppError::RegistryRejected {
            status: status.as_u16(),
            message,
        },
    }
}

/// Accepts `{"hotels": [...]}` or a bare list. Items carry `code` or
/// `hotelCode`, and optionally a distinct `sourceCode`.
fn parse_hotels(body: Value) -> Result<Vec<HotelRef>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("hotels") {
            Some(Value::Array(items)) => items,
            _ => return Err(AppError::validation("hotel list has no 'hotels' array")),
        },
        _ => return Err(AppError::validation("hotel list is not a JSON object")),
    };

    let mut hotels = Vec::with_capacity(items.len());
    for item in items {
        let key = item
            .get("code")
            .or_else(|| item.get("hotelCode"))
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty());

        let Some(key) = key else {
            log::warn!("Ignoring hotel entry without a code: {}", item);
            continue;
        };

        let hotel = match item.get("sourceCode").and_then(Value::as_str) {
            Some(source) if !source.is_empty() => HotelRef::new(key).with_source_code(source),
            _ => HotelRef::new(key),
        };
        hotels.push(hotel);
    }

    Ok(hotels)
}

fn parse_marker(hotel_key: &str, body: &Value) -> ImportMarker {
    let last = body
        .get("lastImportDate")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    ImportMarker::new(hotel_key, last)
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn list_hotels(&self) -> Result<Vec<HotelRef>> {
        let body = self.request(Method::GET, &["hotels"], None).await?;
        let hotels = parse_hotels(body)?;
        log::info!("Registry lists {} hotels", hotels.len());
        Ok(hotels)
    }

    async fn get_marker(&self, hotel: &HotelRef) -> Result<ImportMarker> {
        let path = ["hotels", hotel.key.as_str(), "parameters"];
        let body = self.request(Method::GET, &path, None).await?;
        Ok(parse_marker(&hotel.key, &body))
    }

    async fn register_file(&self, registration: &FileRegistration) -> Result<()> {
        let path = ["files", registration.kind.artifact_name()];
        self.request(Method::POST, &path, Some(&registration.to_payload()))
            .await?;
        log::debug!(
            "[{}] Registered {}",
            registration.hotel_key,
            registration.storage_key
        );
        Ok(())
    }

    async fn set_marker(&self, hotel_key: &str, run_timestamp: &str) -> Result<()> {
        let path = ["hotels", hotel_key, "import-dates"];
        let body = json!({ "lastImportDate": run_timestamp });
        self.request(Method::PUT, &path, Some(&body)).await?;
        Ok(())
    }
}
