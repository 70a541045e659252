use std::time::Duration;

pub const DEFAULT_SOURCE_BASE_URL: &str = "https://testnet.story.api.explorers.guru/api/v1";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_RANK_WATCH_THRESHOLD: u32 = 200;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SIGNING_WINDOW_SIZE: usize = 100;
pub const DEFAULT_MAX_CONCURRENT_RECORDS: usize = 8;
pub const DEFAULT_CONFIRMATION_TTL_SECS: u64 = 300;

/// Tunables of the poll/diff/notify engine.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    pub source_base_url: String,
    pub poll_interval: Duration,
    /// Rank changes are only reported while the previous rank is below this.
    pub rank_watch_threshold: u32,
    pub fetch_timeout: Duration,
    /// Upper bound on one alert delivery to one observer.
    pub delivery_timeout: Duration,
    pub signing_window_size: usize,
    pub max_concurrent_records: usize,
    pub confirmation_ttl: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            source_base_url: DEFAULT_SOURCE_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            rank_watch_threshold: DEFAULT_RANK_WATCH_THRESHOLD,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS),
            signing_window_size: DEFAULT_SIGNING_WINDOW_SIZE,
            max_concurrent_records: DEFAULT_MAX_CONCURRENT_RECORDS,
            confirmation_ttl: Duration::from_secs(DEFAULT_CONFIRMATION_TTL_SECS),
        }
    }
}
