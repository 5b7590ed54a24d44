// src/config.rs

//! Configuration loading for the binaries.
//!
//! The file (local path or S3 object) provides the structure; environment
//! variables override it and carry the secrets. The result is validated once
//! and any problem is fatal.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Load configuration from a TOML file, or start from defaults when no file
/// is given or it does not exist.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) if path.exists() => Config::load(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?,
        Some(path) => {
            log::warn!("Config file {} not found, using defaults", path.display());
            Config::default()
        }
        None => Config::default(),
    };
    prepare(config)
}

/// Apply environment overrides, fill conventional names and validate.
pub fn prepare(mut config: Config) -> Result<Config> {
    config.apply_env();
    config.resolve_names();
    config.validate()?;
    Ok(config)
}

/// Config loader for the Lambda environment: one TOML object in S3.
#[cfg(feature = "aws")]
pub struct LambdaConfigLoader {
    client: aws_sdk_s3::Client,
    bucket: String,
    key: String,
}

#[cfg(feature = "aws")]
impl LambdaConfigLoader {
    pub fn new(client: aws_sdk_s3::Client, bucket: &str, key: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    async fn load_toml(&self) -> Result<Config> {
        tracing::info!("Loading config from s3://{}/{}", self.bucket, self.key);
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(|e| {
                AppError::config(format!(
                    "Config object s3://{}/{} unavailable: {}",
                    self.bucket,
                    self.key,
                    e.into_service_error()
                ))
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::config(format!("Config object read failed: {e}")))?
            .into_bytes();

        let text = String::from_utf8(bytes.to_vec()).map_err(|e| {
            AppError::config(format!("Config object {} is not valid UTF-8: {}", self.key, e))
        })?;
        Config::from_toml(&text)
            .map_err(|e| AppError::config(format!("Config object {}: {}", self.key, e)))
    }

    /// Load, override from the environment and validate.
    pub async fn load_config(&self) -> Result<Config> {
        prepare(self.load_toml().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_falls_back_to_defaults_then_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        // Defaults lack the subscription key unless the environment has one
        let result = load_config(Some(&path));
        if std::env::var("PMS_SOURCE_KEY").is_err() {
            assert!(matches!(result, Err(AppError::Config(_))));
        }
    }

    #[test]
    fn test_file_is_loaded_and_names_resolved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                environment = "staging"

                [source]
                subscription_key = "abc"

                [registry]
                base_url = "https://esb.example.com"
            "#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        if std::env::var("PMS_RAW_BUCKET").is_err() && std::env::var("PMS_ENVIRONMENT").is_err() {
            assert_eq!(config.storage.raw_bucket, "staging-pms-raw");
        }
        assert!(!config.source.subscription_key.is_empty());
    }

    #[test]
    fn test_unparseable_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "environment = [").unwrap();

        assert!(matches!(
            load_config(Some(&path)),
            Err(AppError::Config(_))
        ));
    }
}
