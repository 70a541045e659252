use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WatchError {
    /// Network failure, timeout or non-success status from the explorer.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The explorer answered with a payload we cannot read.
    #[error("Source payload malformed: {0}")]
    SourceMalformed(String),

    #[error("Store failure: {0}")]
    StoreFailure(String),

    #[error("Delivery to observer {observer_id} failed: {reason}")]
    DeliveryFailure { observer_id: String, reason: String },
}

impl WatchError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        WatchError::StoreFailure(err.to_string())
    }

    pub fn is_source_failure(&self) -> bool {
        matches!(self, WatchError::SourceUnavailable(_) | WatchError::SourceMalformed(_))
    }
}

impl From<validator_watch_datastore::Error> for WatchError {
    fn from(err: validator_watch_datastore::Error) -> Self {
        WatchError::StoreFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
