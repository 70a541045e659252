pub mod log_only;
pub mod same_process;

pub use log_only::LogDelivery;
pub use same_process::SameProcess;

use anyhow::Result;

/// Outbound channel to observers. Best effort: an `Err` is reported for that
/// observer and never retried.
#[async_trait::async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, observer_id: &str, message: &str) -> Result<()>;
}
