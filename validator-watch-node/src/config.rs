use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use validator_watch_engine::config::{
    DEFAULT_CONFIRMATION_TTL_SECS, DEFAULT_DELIVERY_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_MAX_CONCURRENT_RECORDS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RANK_WATCH_THRESHOLD,
    DEFAULT_SIGNING_WINDOW_SIZE, DEFAULT_SOURCE_BASE_URL,
};
use validator_watch_engine::WatchConfig;

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct Config {
    pub storage_path: Option<PathBuf>,
    pub logs_path: Option<PathBuf>,
    pub logs_enabled: Option<bool>,
    pub log_level: Option<String>,
    pub source_base_url: Option<String>,
    /// Serve the bundled devnet payloads instead of calling the explorer.
    pub devnet_source: Option<bool>,
    pub poll_interval_secs: Option<u64>,
    pub rank_watch_threshold: Option<u32>,
    pub fetch_timeout_secs: Option<u64>,
    pub delivery_timeout_secs: Option<u64>,
    pub signing_window_size: Option<usize>,
    pub max_concurrent_records: Option<usize>,
    pub confirmation_ttl_secs: Option<u64>,
    /// Alerts are only logged when unset.
    pub delivery_webhook_url: Option<String>,
    /// The inbound command endpoint is off when unset.
    pub inbound_port: Option<u16>,
}

impl Config {
    pub fn from_filepath(path: &Path) -> Result<Config> {
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let mut config: Config = serde_json::from_reader(file)
            .context("Failed to parse config file")?;

        let config_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if let Some(storage_path) = config.storage_path.take() {
            config.storage_path = Some(to_absolute_path(&config_dir, &storage_path)?);
        }
        if let Some(logs_path) = config.logs_path.take() {
            config.logs_path = Some(to_absolute_path(&config_dir, &logs_path)?);
        }

        Ok(config)
    }

    pub fn read_or_create(path: &Path) -> Result<Config> {
        if path.exists() {
            return Self::from_filepath(path);
        }
        let config = Config::default();
        let file = fs::File::create(path)
            .context("Failed to create config file")?;
        serde_json::to_writer_pretty(file, &config)
            .context("Failed to write default config file")?;
        Ok(config)
    }

    pub fn to_watch_config(&self) -> Result<WatchConfig> {
        let poll_interval_secs = self.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if poll_interval_secs == 0 {
            return Err(anyhow!("poll_interval_secs must be at least 1"));
        }
        let fetch_timeout_secs = self.fetch_timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
        if fetch_timeout_secs == 0 {
            return Err(anyhow!("fetch_timeout_secs must be at least 1"));
        }
        let delivery_timeout_secs = self.delivery_timeout_secs.unwrap_or(DEFAULT_DELIVERY_TIMEOUT_SECS);
        if delivery_timeout_secs == 0 {
            return Err(anyhow!("delivery_timeout_secs must be at least 1"));
        }

        Ok(WatchConfig {
            source_base_url: self
                .source_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_SOURCE_BASE_URL.to_string()),
            poll_interval: Duration::from_secs(poll_interval_secs),
            rank_watch_threshold: self.rank_watch_threshold.unwrap_or(DEFAULT_RANK_WATCH_THRESHOLD),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            delivery_timeout: Duration::from_secs(delivery_timeout_secs),
            signing_window_size: self.signing_window_size.unwrap_or(DEFAULT_SIGNING_WINDOW_SIZE),
            max_concurrent_records: self
                .max_concurrent_records
                .unwrap_or(DEFAULT_MAX_CONCURRENT_RECORDS)
                .max(1),
            confirmation_ttl: Duration::from_secs(
                self.confirmation_ttl_secs.unwrap_or(DEFAULT_CONFIRMATION_TTL_SECS),
            ),
        })
    }
}

pub fn to_absolute_path<P: AsRef<Path>>(base_dir: P, relative_path: P) -> Result<PathBuf> {
    let path = relative_path.as_ref();
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let base_dir = base_dir
        .as_ref()
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", base_dir.as_ref().display()))?;
    Ok(base_dir.join(path))
}
