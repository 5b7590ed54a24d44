//! SQS FIFO notifier.

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{QueueConfig, QueueTrigger};
use crate::notify::Notifier;

/// Sends triggers to a FIFO queue, grouped by hotel.
#[derive(Clone)]
pub struct SqsNotifier {
    client: Client,
    queue_url: String,
}

impl SqsNotifier {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Build from config, resolving the queue URL by name when none is given.
    pub async fn from_config(config: &QueueConfig) -> Result<Self> {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&sdk_config);

        let queue_url = if config.queue_url.is_empty() {
            let response = client
                .get_queue_url()
                .queue_name(&config.queue_name)
                .send()
                .await
                .map_err(|e| {
                    AppError::config(format!(
                        "queue '{}' lookup failed: {}",
                        config.queue_name,
                        e.into_service_error()
                    ))
                })?;
            response
                .queue_url
                .ok_or_else(|| AppError::config(format!("queue '{}' has no URL", config.queue_name)))?
        } else {
            config.queue_url.clone()
        };

        info!("Using SQS queue {}", queue_url);
        Ok(Self::new(client, queue_url))
    }
}

#[async_trait]
impl Notifier for SqsNotifier {
    async fn enqueue(&self, trigger: &QueueTrigger) -> Result<()> {
        let response = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_group_id(&trigger.group_key)
            .message_deduplication_id(trigger.deduplication_id())
            .message_body(&trigger.body)
            .send()
            .await
            .map_err(|e| AppError::notify(format!("sqs send: {}", e.into_service_error())))?;

        debug!(
            "Sent trigger for {} (message {})",
            trigger.group_key,
            response.message_id.unwrap_or_default()
        );
        Ok(())
    }
}
