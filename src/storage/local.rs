//! Local filesystem storage implementation.
//!
//! Mirrors the bucket layout under one root directory, one subdirectory per
//! role. Used for development runs and tests; production uses `S3Storage`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{ArtifactStore, BucketRole};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a key within a role.
    fn path(&self, role: BucketRole, key: &str) -> Result<PathBuf> {
        if key.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(AppError::storage(format!("invalid artifact key '{key}'")));
        }
        Ok(self.root_dir.join(role.as_str()).join(key))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl ArtifactStore for LocalStorage {
    async fn put(&self, role: BucketRole, key: &str, body: Vec<u8>) -> Result<()> {
        let path = self.path(role, key)?;
        self.write_bytes(&path, &body)
            .await
            .map_err(|e| AppError::storage(format!("write {}: {}", path.display(), e)))?;
        log::debug!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(())
    }

    async fn get(&self, role: BucketRole, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(role, key)?;
        self.read_bytes(&path).await
    }

    fn describe(&self, role: BucketRole, key: &str) -> String {
        self.root_dir
            .join(role.as_str())
            .join(key)
            .display()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage
            .put(BucketRole::Raw, "H1/revenue-2024.json", b"{}".to_vec())
            .await
            .unwrap();
        let data = storage
            .get(BucketRole::Raw, "H1/revenue-2024.json")
            .await
            .unwrap();
        assert_eq!(data, Some(b"{}".to_vec()));
        assert!(tmp.path().join("raw/H1/revenue-2024.json").exists());
        assert!(!tmp.path().join("raw/H1/revenue-2024.tmp").exists());
    }

    #[tokio::test]
    async fn test_roles_are_separate() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage
            .put(BucketRole::Processed, "H1/a.json", b"[1]".to_vec())
            .await
            .unwrap();
        assert!(storage.get(BucketRole::Raw, "H1/a.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_whole_object() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage
            .put(BucketRole::Raw, "H1/a.json", b"first version".to_vec())
            .await
            .unwrap();
        storage
            .put(BucketRole::Raw, "H1/a.json", b"second".to_vec())
            .await
            .unwrap();
        let data = storage.get(BucketRole::Raw, "H1/a.json").await.unwrap();
        assert_eq!(data, Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let data = storage.get(BucketRole::Raw, "nope.json").await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let err = storage
            .put(BucketRole::Raw, "../outside.json", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
