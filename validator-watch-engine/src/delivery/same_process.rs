use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use super::Delivery;

/// Keeps delivered messages in per-observer inboxes. Observers marked offline
/// reject delivery, the way a transport rejects a user who blocked the bot.
#[derive(Debug, Default)]
pub struct SameProcess {
    inboxes: Mutex<HashMap<String, Vec<String>>>,
    offline_observers: Mutex<HashSet<String>>,
}

impl SameProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_offline(&self, observer_id: &str, offline: bool) {
        let mut offline_observers = self.offline_observers.lock().await;
        if offline {
            offline_observers.insert(observer_id.to_string());
        } else {
            offline_observers.remove(observer_id);
        }
    }

    pub async fn inbox(&self, observer_id: &str) -> Vec<String> {
        self.inboxes.lock().await.get(observer_id).cloned().unwrap_or_default()
    }

    pub async fn total_delivered(&self) -> usize {
        self.inboxes.lock().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl Delivery for SameProcess {
    async fn deliver(&self, observer_id: &str, message: &str) -> Result<()> {
        if self.offline_observers.lock().await.contains(observer_id) {
            return Err(anyhow!("observer {} is not reachable", observer_id));
        }
        self.inboxes
            .lock()
            .await
            .entry(observer_id.to_string())
            .or_default()
            .push(message.to_string());
        Ok(())
    }
}
