//! JSON-lines queue for local runs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::QueueTrigger;
use crate::notify::Notifier;

pub const QUEUE_FILE: &str = "queue.jsonl";

/// One line of the local queue file, shaped like the FIFO message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMessage {
    pub message_group_id: String,
    pub message_deduplication_id: String,
    pub message_body: String,
}

/// Appends triggers to `{dir}/queue.jsonl`.
#[derive(Debug)]
pub struct LocalQueue {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalQueue {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(QUEUE_FILE),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Everything enqueued so far, oldest first.
    pub async fn messages(&self) -> Result<Vec<QueuedMessage>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AppError::from))
            .collect()
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
}

#[async_trait]
impl Notifier for LocalQueue {
    async fn enqueue(&self, trigger: &QueueTrigger) -> Result<()> {
        let message = QueuedMessage {
            message_group_id: trigger.group_key.clone(),
            message_deduplication_id: trigger.deduplication_id(),
            message_body: trigger.body.clone(),
        };
        let line = serde_json::to_string(&message)?;

        let _guard = self.write_lock.lock().await;
        self.append(&line)
            .await
            .map_err(|e| AppError::notify(format!("append {}: {}", self.path.display(), e)))?;

        log::debug!("Queued trigger for {} in {}", trigger.group_key, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_enqueue_appends_lines() {
        let dir = TempDir::new().unwrap();
        let queue = LocalQueue::new(dir.path());

        assert!(queue.messages().await.unwrap().is_empty());

        queue
            .enqueue(&QueueTrigger::for_hotel("H1", "2024-07-04T10:00:00Z"))
            .await
            .unwrap();
        queue
            .enqueue(&QueueTrigger::for_hotel("H2", "2024-07-04T10:00:00Z"))
            .await
            .unwrap();

        let messages = queue.messages().await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message_group_id, "H1");
        assert_eq!(messages[0].message_body, "H1");
        assert_eq!(messages[1].message_body, "H2");
        assert_ne!(
            messages[0].message_deduplication_id,
            messages[1].message_deduplication_id
        );
    }

    #[tokio::test]
    async fn test_unwritable_location_is_notify_error() {
        let dir = TempDir::new().unwrap();
        // A regular file where the queue directory should be
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"x").unwrap();

        let queue = LocalQueue::new(&blocker);
        let err = queue
            .enqueue(&QueueTrigger::for_hotel("H1", "2024-07-04T10:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Notify(_)));
    }
}
