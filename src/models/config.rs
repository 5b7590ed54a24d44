//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::DataKind;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Deployment environment (dev, staging, prod); drives default resource names
    #[serde(default = "defaults::environment")]
    pub environment: String,

    /// Host PMS API access
    #[serde(default)]
    pub source: SourceConfig,

    /// Hotel registry (ESB) access
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Raw and processed artifact locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Processing trigger queue
    #[serde(default)]
    pub queue: QueueConfig,

    /// Backoff applied at every external call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Batch scheduling limits
    #[serde(default)]
    pub batch: BatchConfig,

    /// Business rules used by the transformers
    #[serde(default)]
    pub transform: TransformConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override settings from environment variables.
    ///
    /// Secrets are expected to arrive this way rather than through the file.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(env) = var("PMS_ENVIRONMENT") {
            self.environment = env;
        }

        let set = |field: &mut String, name: &str| {
            if let Some(value) = var(name) {
                *field = value;
            }
        };
        set(&mut self.source.base_url, "PMS_SOURCE_URL");
        set(&mut self.source.subscription_key, "PMS_SOURCE_KEY");
        set(&mut self.registry.base_url, "PMS_REGISTRY_URL");
        set(&mut self.registry.auth_url, "PMS_REGISTRY_AUTH_URL");
        set(&mut self.registry.basic_auth, "PMS_REGISTRY_BASIC_AUTH");
        set(&mut self.storage.raw_bucket, "PMS_RAW_BUCKET");
        set(&mut self.storage.processed_bucket, "PMS_PROCESSED_BUCKET");
        set(&mut self.queue.queue_url, "PMS_QUEUE_URL");
        set(&mut self.storage.local_dir, "PMS_LOCAL_DIR");

        match var("PMS_STORAGE_BACKEND").as_deref() {
            Some("local") => self.storage.backend = StorageBackend::Local,
            Some("s3") => self.storage.backend = StorageBackend::S3,
            Some(other) => log::warn!("Ignoring unknown PMS_STORAGE_BACKEND '{}'", other),
            None => {}
        }
        match var("PMS_QUEUE_BACKEND").as_deref() {
            Some("local") => self.queue.backend = QueueBackend::Local,
            Some("sqs") => self.queue.backend = QueueBackend::Sqs,
            Some(other) => log::warn!("Ignoring unknown PMS_QUEUE_BACKEND '{}'", other),
            None => {}
        }
        set(&mut self.queue.queue_name, "PMS_QUEUE_NAME");

        if let Some(n) = var("PMS_MAX_CONCURRENT").and_then(|v| v.parse().ok()) {
            self.batch.max_concurrent = n;
        }
        if let Some(secs) = var("PMS_TIME_BUDGET_SECS").and_then(|v| v.parse().ok()) {
            self.batch.time_budget_secs = secs;
        }
    }

    /// Fill resource names left blank with the environment's conventional names.
    pub fn resolve_names(&mut self) {
        let env = self.environment.trim().to_string();
        if self.storage.raw_bucket.is_empty() {
            self.storage.raw_bucket = format!("{env}-pms-raw");
        }
        if self.storage.processed_bucket.is_empty() {
            self.storage.processed_bucket = format!("{env}-pms-processed");
        }
        if self.queue.queue_name.is_empty() {
            self.queue.queue_name = format!("{env}-pms-processor-queue.fifo");
        }
    }

    /// Validate configuration values once at startup.
    ///
    /// Every failure is a configuration error and therefore fatal.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.environment.as_str(), "dev" | "staging" | "prod") {
            return Err(AppError::config(format!(
                "environment must be dev, staging or prod (got '{}')",
                self.environment
            )));
        }
        if self.source.base_url.trim().is_empty() {
            return Err(AppError::config("source.base_url is empty"));
        }
        if self.source.subscription_key.trim().is_empty() {
            return Err(AppError::config(
                "source.subscription_key is empty (set PMS_SOURCE_KEY)",
            ));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::config("source.timeout_secs must be > 0"));
        }
        if self.source.page_size == 0 {
            return Err(AppError::config("source.page_size must be > 0"));
        }
        if self.source.inventory_horizon_days == 0 {
            return Err(AppError::config(
                "source.inventory_horizon_days must be > 0",
            ));
        }
        if self.source.stat_daily_days_back_start < self.source.stat_daily_days_back_end {
            return Err(AppError::config(
                "source.stat_daily_days_back_start must be >= source.stat_daily_days_back_end",
            ));
        }
        if self.registry.base_url.trim().is_empty() {
            return Err(AppError::config("registry.base_url is empty"));
        }
        if !self.registry.auth_url.trim().is_empty() && self.registry.basic_auth.trim().is_empty()
        {
            return Err(AppError::config(
                "registry.basic_auth is required when registry.auth_url is set",
            ));
        }
        if self.registry.timeout_secs == 0 {
            return Err(AppError::config("registry.timeout_secs must be > 0"));
        }
        match self.storage.backend {
            StorageBackend::Local if self.storage.local_dir.trim().is_empty() => {
                return Err(AppError::config("storage.local_dir is empty"));
            }
            StorageBackend::S3
                if self.storage.raw_bucket.is_empty() || self.storage.processed_bucket.is_empty() =>
            {
                return Err(AppError::config("storage buckets must be named"));
            }
            _ => {}
        }
        if self.storage.backend == StorageBackend::S3 && !cfg!(feature = "aws") {
            return Err(AppError::config(
                "storage.backend = \"s3\" requires the `aws` feature",
            ));
        }
        if self.queue.backend == QueueBackend::Sqs {
            if !cfg!(feature = "aws") {
                return Err(AppError::config(
                    "queue.backend = \"sqs\" requires the `aws` feature",
                ));
            }
            if self.queue.queue_url.trim().is_empty() && self.queue.queue_name.trim().is_empty() {
                return Err(AppError::config("queue.queue_url or queue.queue_name is required"));
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::config("retry.max_attempts must be > 0"));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(AppError::config(
                "retry.max_delay_ms must be >= retry.base_delay_ms",
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(AppError::config("retry.jitter must be within 0.0..=1.0"));
        }
        if self.batch.max_concurrent == 0 {
            return Err(AppError::config("batch.max_concurrent must be > 0"));
        }
        if self.batch.time_budget_secs == 0 {
            return Err(AppError::config("batch.time_budget_secs must be > 0"));
        }
        for (name, rate) in [
            ("transform.vat_room", self.transform.vat_room),
            ("transform.vat_food", self.transform.vat_food),
            ("transform.vat_other", self.transform.vat_other),
        ] {
            if !(0.0..1.0).contains(&rate) {
                return Err(AppError::config(format!("{name} must be within 0.0..1.0")));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: defaults::environment(),
            source: SourceConfig::default(),
            registry: RegistryConfig::default(),
            storage: StorageConfig::default(),
            queue: QueueConfig::default(),
            retry: RetryConfig::default(),
            batch: BatchConfig::default(),
            transform: TransformConfig::default(),
        }
    }
}

/// Host PMS API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "defaults::source_url")]
    pub base_url: String,

    /// Value of the `Ocp-Apim-Subscription-Key` header
    #[serde(default)]
    pub subscription_key: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Rows requested per page for paginated endpoints
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Days ahead of the run date covered by the inventory grid
    #[serde(default = "defaults::inventory_horizon_days")]
    pub inventory_horizon_days: u32,

    /// Endpoint the reservations artifact is built from
    #[serde(default)]
    pub reservation_source: ReservationSource,

    /// First StatDaily day, in days before the run date
    #[serde(default = "defaults::stat_daily_days_back_start")]
    pub stat_daily_days_back_start: u32,

    /// Last StatDaily day, in days before the run date
    #[serde(default = "defaults::stat_daily_days_back_end")]
    pub stat_daily_days_back_end: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationSource {
    /// `/ExternalRms/Reservation`, updated since the import marker
    #[default]
    Reservations,
    /// `/ExternalRms/StatDaily`, one request per hotel day in a fixed range
    StatDaily,
}

impl ReservationSource {
    pub fn data_kind(self) -> DataKind {
        match self {
            ReservationSource::Reservations => DataKind::Reservations,
            ReservationSource::StatDaily => DataKind::StatDaily,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::source_url(),
            subscription_key: String::new(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
            inventory_horizon_days: defaults::inventory_horizon_days(),
            reservation_source: ReservationSource::default(),
            stat_daily_days_back_start: defaults::stat_daily_days_back_start(),
            stat_daily_days_back_end: defaults::stat_daily_days_back_end(),
        }
    }
}

/// Registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub base_url: String,

    /// OAuth token endpoint; when empty, requests are sent without a bearer token
    #[serde(default)]
    pub auth_url: String,

    /// Base64 client credentials for the token request
    #[serde(default)]
    pub basic_auth: String,

    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_url: String::new(),
            basic_auth: String::new(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

/// Artifact storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the local backend
    #[serde(default = "defaults::local_dir")]
    pub local_dir: String,

    /// Bucket for unmodified source responses; `{environment}-pms-raw` when empty
    #[serde(default)]
    pub raw_bucket: String,

    /// Bucket for canonical documents; `{environment}-pms-processed` when empty
    #[serde(default)]
    pub processed_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            local_dir: defaults::local_dir(),
            raw_bucket: String::new(),
            processed_bucket: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// Append triggers to `{storage.local_dir}/queue.jsonl`
    #[default]
    Local,
    Sqs,
}

/// Trigger queue settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub backend: QueueBackend,

    /// Full queue URL; looked up from `queue_name` when empty
    #[serde(default)]
    pub queue_url: String,

    /// FIFO queue name; `{environment}-pms-processor-queue.fifo` when empty
    #[serde(default)]
    pub queue_name: String,
}

/// Retry and backoff parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "defaults::base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "defaults::max_delay_ms")]
    pub max_delay_ms: u64,

    /// Up to this fraction of the delay is added at random
    #[serde(default = "defaults::jitter")]
    pub jitter: f64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay_ms(),
            max_delay_ms: defaults::max_delay_ms(),
            jitter: defaults::jitter(),
        }
    }
}

/// Batch scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum hotel runs in flight
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Wall-clock budget after which no new hotel run is started
    #[serde(default = "defaults::time_budget_secs")]
    pub time_budget_secs: u64,
}

impl BatchConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            time_budget_secs: defaults::time_budget_secs(),
        }
    }
}

/// VAT rates removed from reservation charges, by sales group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Sales group 0
    #[serde(default = "defaults::vat_room")]
    pub vat_room: f64,

    /// Sales group 1
    #[serde(default = "defaults::vat_food")]
    pub vat_food: f64,

    /// Every other sales group
    #[serde(default = "defaults::vat_other")]
    pub vat_other: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            vat_room: defaults::vat_room(),
            vat_food: defaults::vat_food(),
            vat_other: defaults::vat_other(),
        }
    }
}

mod defaults {
    pub fn environment() -> String {
        "dev".into()
    }

    // Source defaults
    pub fn source_url() -> String {
        "https://hostapi.azure-api.net/rms-v2".into()
    }
    pub fn user_agent() -> String {
        "pms-connector/0.1".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_size() -> u32 {
        100
    }
    pub fn inventory_horizon_days() -> u32 {
        365
    }
    pub fn stat_daily_days_back_start() -> u32 {
        95
    }
    pub fn stat_daily_days_back_end() -> u32 {
        30
    }

    // Storage defaults
    pub fn local_dir() -> String {
        "storage".into()
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn base_delay_ms() -> u64 {
        1_000
    }
    pub fn max_delay_ms() -> u64 {
        30_000
    }
    pub fn jitter() -> f64 {
        0.1
    }

    // Batch defaults
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn time_budget_secs() -> u64 {
        840
    }

    // Transform defaults
    pub fn vat_room() -> f64 {
        0.06
    }
    pub fn vat_food() -> f64 {
        0.13
    }
    pub fn vat_other() -> f64 {
        0.23
    }
}
