//! PMS connector CLI
//!
//! Local execution entry point. For AWS Lambda, use `pms-connector-lambda`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use pms_connector::{
    config::load_config,
    error::{AppError, Result},
    models::{CanonicalArtifact, Config, DataKind, RawPayload, SyncWindow},
    pipeline::{self, Connectors},
    registry::{HttpRegistry, Registry},
    storage::{load_raw_bundle, open_store},
    transform::{transform_all, transform_one},
    utils::time::{beginning_of_time, parse_timestamp},
};
use serde_json::{Map, Value};

/// Hotel PMS to canonical pipeline connector
#[derive(Parser, Debug)]
#[command(
    name = "pms-connector",
    version,
    about = "Extracts hotel PMS data, transforms it and registers it downstream"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "pms-connector.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the batch over all registry hotels
    Run {
        /// Only run this hotel key
        #[arg(long)]
        hotel: Option<String>,
    },

    /// Transform a stored raw payload offline and print the canonical JSON
    Transform {
        /// Data kind of the input (config, reservations, inventory, revenue)
        #[arg(long)]
        kind: DataKind,

        /// Raw payload file
        #[arg(long)]
        input: PathBuf,

        /// Raw hotel config payload, needed for reservations
        #[arg(long = "hotel-config")]
        hotel_config: Option<PathBuf>,

        /// Hotel key to stamp on the output
        #[arg(long, default_value = "LOCAL")]
        hotel: String,
    },

    /// Re-transform the raw artifacts of a stored run
    Replay {
        #[arg(long)]
        hotel: String,

        /// Run timestamp used in the artifact keys, e.g. 2024-07-04T10:00:00Z
        #[arg(long)]
        run_ts: String,
    },

    /// Validate the configuration
    Validate,

    /// List hotels known to the registry
    Hotels,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run { hotel } => {
            let config = load_config(Some(&cli.config))?;
            log::info!("Environment: {}", config.environment);

            let connectors = Connectors::from_config(&config).await?;
            let summary = pipeline::Pipeline::new(connectors, &config)
                .run_batch(hotel.as_deref())
                .await?;

            println!(
                "{} hotels: {} ok, {} need attention",
                summary.total(),
                summary.succeeded(),
                summary.failed()
            );
            if summary.has_failures() {
                if let Some(reason) = &summary.aborted {
                    eprintln!("Batch aborted: {reason}");
                }
                for report in summary.failures() {
                    eprintln!("  {report}");
                }
                std::process::exit(1);
            }
        }

        Command::Transform {
            kind,
            input,
            hotel_config,
            hotel,
        } => {
            let window = offline_window(None)?;
            let raw = read_payload(kind, &hotel, window, &input)?;
            let config = hotel_config
                .map(|path| read_payload(DataKind::Config, &hotel, window, &path))
                .transpose()?;

            // Offline transforms only need the business rules, not credentials
            let rules = Config::load_or_default(&cli.config).transform;
            let artifacts = transform_one(&raw, config.as_ref(), &rules)?;
            print_artifacts(&artifacts)?;
        }

        Command::Replay { hotel, run_ts } => {
            let config = load_config(Some(&cli.config))?;
            let window = offline_window(Some(&run_ts))?;
            let store = open_store(&config.storage).await?;

            let bundle = load_raw_bundle(store.as_ref(), &hotel, &run_ts, window).await?;
            let artifacts = transform_all(&bundle, &config.transform)?;
            print_artifacts(&artifacts)?;
        }

        Command::Validate => {
            let config = load_config(Some(&cli.config))?;
            println!("Configuration OK (environment: {})", config.environment);
            println!("  raw bucket:       {}", config.storage.raw_bucket);
            println!("  processed bucket: {}", config.storage.processed_bucket);
            println!("  queue:            {}", config.queue.queue_name);
            println!("  concurrency:      {}", config.batch.max_concurrent);
        }

        Command::Hotels => {
            let config = load_config(Some(&cli.config))?;
            let registry = HttpRegistry::new(&config.registry)?;
            for hotel in registry.list_hotels().await? {
                if hotel.source_code == hotel.key {
                    println!("{}", hotel.key);
                } else {
                    println!("{} (source {})", hotel.key, hotel.source_code);
                }
            }
        }
    }

    Ok(())
}

/// Window for offline transforms: full history up to `to` (or now).
fn offline_window(to: Option<&str>) -> Result<SyncWindow> {
    let to = match to {
        Some(raw) => parse_timestamp(raw)
            .ok_or_else(|| AppError::validation(format!("'{raw}' is not a timestamp")))?,
        None => Utc::now(),
    };
    Ok(SyncWindow {
        from: beginning_of_time(),
        to,
    })
}

fn read_payload(kind: DataKind, hotel: &str, window: SyncWindow, path: &Path) -> Result<RawPayload> {
    let text = std::fs::read_to_string(path)?;
    let body: Value = serde_json::from_str(&text)?;
    Ok(RawPayload::new(kind, hotel, window, body))
}

/// One artifact prints as its body; several print keyed by artifact name.
fn print_artifacts(artifacts: &[CanonicalArtifact]) -> Result<()> {
    let output = match artifacts {
        [single] => serde_json::to_value(&single.body)?,
        many => {
            let mut map = Map::new();
            for artifact in many {
                map.insert(
                    artifact.kind().artifact_name().to_string(),
                    serde_json::to_value(&artifact.body)?,
                );
            }
            Value::Object(map)
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
