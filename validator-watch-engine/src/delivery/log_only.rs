use anyhow::Result;
use async_trait::async_trait;

use super::Delivery;

/// Writes every message to the log instead of sending it anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

#[async_trait]
impl Delivery for LogDelivery {
    async fn deliver(&self, observer_id: &str, message: &str) -> Result<()> {
        log::info!("to observer {}: {}", observer_id, message.replace('\n', " | "));
        Ok(())
    }
}
