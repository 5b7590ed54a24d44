// src/lambda/mod.rs

//! AWS Lambda handler for the connector.
//!
//! One invocation runs one batch:
//! 1. Loads configuration (S3 object if configured, then environment)
//! 2. Builds the S3 / SQS / HTTP connectors
//! 3. Runs every hotel, or only `hotelCode` when given
//! 4. Returns the per-hotel outcomes

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::{LambdaConfigLoader, prepare};
use crate::error::Result;
use crate::models::{BatchSummary, Config, HotelReport, QueueBackend, StorageBackend};
use crate::pipeline;

const DEFAULT_CONFIG_KEY: &str = "pms-connector/config.toml";

/// Lambda invocation payload.
#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    /// Run only this hotel (runs all registry hotels when absent)
    #[serde(rename = "hotelCode", default)]
    pub hotel_code: Option<String>,
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct SyncResponse {
    /// True when every hotel succeeded
    pub success: bool,

    pub total_hotels: usize,

    pub successful_hotels: usize,

    pub failed_hotels: usize,

    pub hotels: Vec<HotelReport>,

    /// Batch-level error, if the batch could not complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl SyncResponse {
    pub fn from_summary(summary: BatchSummary) -> Self {
        Self {
            success: !summary.has_failures(),
            total_hotels: summary.total(),
            successful_hotels: summary.succeeded(),
            failed_hotels: summary.failed(),
            error: summary.aborted,
            hotels: summary.hotels,
            execution_time_ms: 0,
        }
    }
}

/// Main Lambda handler function. Always answers with a response body.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<SyncRequest>,
) -> std::result::Result<SyncResponse, LambdaError> {
    let start = std::time::Instant::now();
    let (request, _context) = event.into_parts();

    info!("Starting sync: hotel={:?}", request.hotel_code);

    let mut response = match run_sync(&request).await {
        Ok(summary) => SyncResponse::from_summary(summary),
        Err(e) => {
            error!("Sync aborted: {}", e);
            SyncResponse {
                success: false,
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    };
    response.execution_time_ms = start.elapsed().as_millis() as u64;

    if response.success {
        info!(
            "Sync completed: {} hotels in {}ms",
            response.total_hotels, response.execution_time_ms
        );
    } else {
        warn!(
            "Sync finished with {} of {} hotels needing attention",
            response.failed_hotels, response.total_hotels
        );
    }

    Ok(response)
}

async fn run_sync(request: &SyncRequest) -> Result<BatchSummary> {
    let config = load_lambda_config().await?;
    pipeline::run_from_config(&config, request.hotel_code.as_deref()).await
}

/// Configuration from `PMS_CONFIG_BUCKET`/`PMS_CONFIG_KEY` when set,
/// otherwise [`lambda_defaults`] plus environment.
async fn load_lambda_config() -> Result<Config> {
    match std::env::var("PMS_CONFIG_BUCKET") {
        Ok(bucket) if !bucket.is_empty() => {
            let key = std::env::var("PMS_CONFIG_KEY")
                .unwrap_or_else(|_| DEFAULT_CONFIG_KEY.to_string());
            let sdk_config =
                aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let client = aws_sdk_s3::Client::new(&sdk_config);
            LambdaConfigLoader::new(client, &bucket, &key)
                .load_config()
                .await
        }
        _ => prepare(lambda_defaults()),
    }
}

/// Defaults for a Lambda without a config object: artifacts go to S3 and
/// triggers to SQS. `PMS_STORAGE_BACKEND` / `PMS_QUEUE_BACKEND` still win.
fn lambda_defaults() -> Config {
    let mut config = Config::default();
    config.storage.backend = StorageBackend::S3;
    config.queue.backend = QueueBackend::Sqs;
    config
}
