use crate::model::Model;
use crate::watch_datastore::BatchOp;
use crate::WatchDatastore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const SUBSCRIBERS_PREFIX: &str = "/subscribers";

/// The single validator an observer is tracking.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Subscription {
    pub observer_id: String,
    pub operator_address: String,
    pub subscribed_at: i64,
}

#[async_trait]
impl Model for Subscription {
    const ID_PATH: &'static str = "/subscriptions/${observer_id}";

    const FIELDS: &'static [&'static str] = &["observer_id", "operator_address", "subscribed_at"];

    const FIELD_DEFAULTS: &'static [(&'static str, serde_json::Value)] = &[
        ("subscribed_at", serde_json::json!(0)),
    ];

    fn get_id_keys(&self) -> HashMap<String, String> {
        let mut keys = HashMap::new();
        keys.insert("observer_id".to_string(), self.observer_id.clone());
        keys
    }
}

impl Subscription {
    pub fn new(observer_id: &str, operator_address: &str, subscribed_at: i64) -> Self {
        Self {
            observer_id: observer_id.to_string(),
            operator_address: operator_address.to_string(),
            subscribed_at,
        }
    }

    pub async fn find_by_observer(datastore: &WatchDatastore, observer_id: &str) -> Result<Option<Self>> {
        let keys = HashMap::from([("observer_id".to_string(), observer_id.to_string())]);
        Self::find_one(datastore, keys).await
    }

    fn index_key(operator_address: &str, observer_id: &str) -> String {
        format!(
            "{}/{}/{}",
            SUBSCRIBERS_PREFIX,
            escape_segment(operator_address),
            escape_segment(observer_id)
        )
    }

    /// Writes the record and moves its subscriber index entry in a single batch,
    /// so the index never disagrees with the record.
    pub async fn save_replacing(&self, datastore: &WatchDatastore, previous: Option<&Subscription>) -> Result<()> {
        let mut ops = Vec::with_capacity(3);
        if let Some(previous) = previous {
            if previous.operator_address != self.operator_address {
                ops.push(BatchOp::Delete(Self::index_key(&previous.operator_address, &previous.observer_id)));
            }
        }
        ops.push(BatchOp::Put(self.get_id(), self.to_json_string()?.into_bytes()));
        ops.push(BatchOp::Put(Self::index_key(&self.operator_address, &self.observer_id), Vec::new()));
        datastore.write_batch(ops).await
            .context("Failed to save subscription")
    }

    /// Observers whose stored subscription points at `operator_address`.
    pub async fn find_observers_of(datastore: &WatchDatastore, operator_address: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/{}", SUBSCRIBERS_PREFIX, escape_segment(operator_address));
        let children = datastore.child_keys(&prefix).await
            .context("Failed to read subscriber index")?;
        // a nested key belongs to a longer address, never to this one
        Ok(children
            .iter()
            .filter(|child| !child.contains('/'))
            .map(|child| unescape_segment(child))
            .collect())
    }
}

/// Keeps a value inside a single key segment.
fn escape_segment(value: &str) -> String {
    value.replace('%', "%25").replace('/', "%2F")
}

fn unescape_segment(segment: &str) -> String {
    segment.replace("%2F", "/").replace("%25", "%")
}
