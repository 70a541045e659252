use async_trait::async_trait;
use std::sync::Arc;

use crate::change_detector::{ChangeDetector, ChangeEvent};
use crate::key_locks::KeyLocks;
use crate::source::RawValidatorRecord;
use crate::{Result, WatchError};
use validator_watch_datastore::{Model, ValidatorSnapshot, WatchDatastore};

/// Last-known snapshot per operator address.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// `None` means the address was never observed.
    async fn get(&self, operator_address: &str) -> Result<Option<ValidatorSnapshot>>;

    /// Replaces the whole stored record.
    async fn upsert(&self, snapshot: &ValidatorSnapshot) -> Result<()>;
}

pub struct DatastoreSnapshotStore {
    datastore: Arc<WatchDatastore>,
}

impl DatastoreSnapshotStore {
    pub fn new(datastore: Arc<WatchDatastore>) -> Self {
        Self { datastore }
    }
}

#[async_trait]
impl SnapshotStore for DatastoreSnapshotStore {
    async fn get(&self, operator_address: &str) -> Result<Option<ValidatorSnapshot>> {
        ValidatorSnapshot::find_by_operator_address(&self.datastore, operator_address)
            .await
            .map_err(WatchError::store)
    }

    async fn upsert(&self, snapshot: &ValidatorSnapshot) -> Result<()> {
        snapshot.save(&self.datastore).await.map_err(WatchError::store)
    }
}

/// The result of folding one fresh record into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked {
    pub events: Vec<ChangeEvent>,
    pub snapshot: ValidatorSnapshot,
    pub first_observation: bool,
}

/// Serialises read -> diff -> upsert per operator address over a [`SnapshotStore`].
pub struct SnapshotTracker {
    store: Arc<dyn SnapshotStore>,
    detector: ChangeDetector,
    locks: KeyLocks,
}

impl SnapshotTracker {
    pub fn new(store: Arc<dyn SnapshotStore>, detector: ChangeDetector) -> Self {
        Self { store, detector, locks: KeyLocks::new() }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    pub async fn get(&self, operator_address: &str) -> Result<Option<ValidatorSnapshot>> {
        let _guard = self.locks.lock(operator_address).await;
        self.store.get(operator_address).await
    }

    /// Upserts even when nothing changed so `last_seen_at` stays fresh.
    pub async fn track(&self, record: RawValidatorRecord, seen_at: i64) -> Result<Tracked> {
        let _guard = self.locks.lock(&record.operator_address).await;

        let previous = self.store.get(&record.operator_address).await?;
        let events = self.detector.diff(previous.as_ref(), &record);
        let snapshot = record.into_snapshot(seen_at);
        self.store.upsert(&snapshot).await?;

        Ok(Tracked { events, snapshot, first_observation: previous.is_none() })
    }
}
