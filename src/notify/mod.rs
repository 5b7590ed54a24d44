//! Processing-trigger notification.
//!
//! One message per committed hotel run, grouped by hotel so the downstream
//! processes a hotel's runs in order.

pub mod local;
#[cfg(feature = "aws")]
pub mod sqs;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Config, QueueBackend, QueueTrigger};

pub use local::LocalQueue;
#[cfg(feature = "aws")]
pub use sqs::SqsNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn enqueue(&self, trigger: &QueueTrigger) -> Result<()>;
}

/// Open the configured queue backend. The local queue lives next to local storage.
pub async fn open_notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    match config.queue.backend {
        QueueBackend::Local => Ok(Arc::new(LocalQueue::new(&config.storage.local_dir))),
        #[cfg(feature = "aws")]
        QueueBackend::Sqs => Ok(Arc::new(SqsNotifier::from_config(&config.queue).await?)),
        #[cfg(not(feature = "aws"))]
        QueueBackend::Sqs => Err(crate::error::AppError::config(
            "queue backend 'sqs' requires the 'aws' feature",
        )),
    }
}
