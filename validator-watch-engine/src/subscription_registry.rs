use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::clock::Clock;
use crate::key_locks::KeyLocks;
use crate::{Result, WatchError};
use validator_watch_datastore::{Subscription, WatchDatastore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Created,
    AlreadySubscribed,
    /// Nothing was written. The observer must answer this request before the
    /// stored subscription moves.
    PendingConfirmation { existing_address: String, request_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnchangedReason {
    Declined,
    NoPendingRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Updated { previous_address: String, current_address: String },
    Unchanged(UnchangedReason),
}

/// An unanswered request to move an observer's subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOverwrite {
    pub request_id: String,
    pub existing_address: String,
    pub requested_address: String,
    pub created_at: i64,
}

pub struct SubscriptionRegistry {
    datastore: Arc<WatchDatastore>,
    clock: Arc<dyn Clock>,
    confirmation_ttl: Duration,
    pending: Mutex<HashMap<String, PendingOverwrite>>,
    observer_locks: KeyLocks,
}

impl SubscriptionRegistry {
    pub fn new(datastore: Arc<WatchDatastore>, clock: Arc<dyn Clock>, confirmation_ttl: Duration) -> Self {
        Self {
            datastore,
            clock,
            confirmation_ttl,
            pending: Mutex::new(HashMap::new()),
            observer_locks: KeyLocks::new(),
        }
    }

    pub async fn subscribe(&self, observer_id: &str, operator_address: &str) -> Result<SubscribeOutcome> {
        let _guard = self.observer_locks.lock(observer_id).await;

        let existing = Subscription::find_by_observer(&self.datastore, observer_id)
            .await
            .map_err(WatchError::store)?;

        match existing {
            None => {
                let subscription = Subscription::new(observer_id, operator_address, self.clock.now());
                subscription
                    .save_replacing(&self.datastore, None)
                    .await
                    .map_err(WatchError::store)?;
                self.pending.lock().await.remove(observer_id);
                log::info!("observer {} subscribed to {}", observer_id, operator_address);
                Ok(SubscribeOutcome::Created)
            }
            Some(existing) if existing.operator_address == operator_address => {
                self.pending.lock().await.remove(observer_id);
                Ok(SubscribeOutcome::AlreadySubscribed)
            }
            Some(existing) => {
                let request = PendingOverwrite {
                    request_id: Uuid::new_v4().to_string(),
                    existing_address: existing.operator_address,
                    requested_address: operator_address.to_string(),
                    created_at: self.clock.now(),
                };
                let outcome = SubscribeOutcome::PendingConfirmation {
                    existing_address: request.existing_address.clone(),
                    request_id: request.request_id.clone(),
                };
                // replaces any older request from the same observer
                self.pending.lock().await.insert(observer_id.to_string(), request);
                Ok(outcome)
            }
        }
    }

    /// Resolves the observer's live pending request if it asks for `new_address`.
    pub async fn confirm_overwrite(&self, observer_id: &str, new_address: &str, accepted: bool) -> Result<ConfirmOutcome> {
        let _guard = self.observer_locks.lock(observer_id).await;
        let request = match self.live_pending(observer_id).await {
            Some(request) if request.requested_address == new_address => request,
            _ => return Ok(ConfirmOutcome::Unchanged(UnchangedReason::NoPendingRequest)),
        };
        self.resolve(observer_id, request, accepted).await
    }

    /// Answers whatever request the observer currently has open.
    pub async fn respond(&self, observer_id: &str, accepted: bool) -> Result<ConfirmOutcome> {
        let _guard = self.observer_locks.lock(observer_id).await;
        match self.live_pending(observer_id).await {
            Some(request) => self.resolve(observer_id, request, accepted).await,
            None => Ok(ConfirmOutcome::Unchanged(UnchangedReason::NoPendingRequest)),
        }
    }

    async fn resolve(&self, observer_id: &str, request: PendingOverwrite, accepted: bool) -> Result<ConfirmOutcome> {
        if !accepted {
            self.pending.lock().await.remove(observer_id);
            return Ok(ConfirmOutcome::Unchanged(UnchangedReason::Declined));
        }

        let previous = Subscription::find_by_observer(&self.datastore, observer_id)
            .await
            .map_err(WatchError::store)?;
        let subscription = Subscription::new(observer_id, &request.requested_address, self.clock.now());
        subscription
            .save_replacing(&self.datastore, previous.as_ref())
            .await
            .map_err(WatchError::store)?;
        // a failed write leaves the request open for another answer
        self.pending.lock().await.remove(observer_id);

        let previous_address = previous
            .map(|p| p.operator_address)
            .unwrap_or(request.existing_address);
        log::info!(
            "observer {} moved subscription from {} to {}",
            observer_id,
            previous_address,
            request.requested_address
        );
        Ok(ConfirmOutcome::Updated {
            previous_address,
            current_address: request.requested_address,
        })
    }

    /// Drops expired requests on the way.
    async fn live_pending(&self, observer_id: &str) -> Option<PendingOverwrite> {
        let mut pending = self.pending.lock().await;
        let request = pending.get(observer_id)?;
        let age = self.clock.now().saturating_sub(request.created_at);
        if age >= self.confirmation_ttl.as_secs() as i64 {
            pending.remove(observer_id);
            return None;
        }
        Some(request.clone())
    }

    pub async fn pending_request(&self, observer_id: &str) -> Option<PendingOverwrite> {
        let _guard = self.observer_locks.lock(observer_id).await;
        self.live_pending(observer_id).await
    }

    pub async fn cancel_pending(&self, observer_id: &str) -> bool {
        let _guard = self.observer_locks.lock(observer_id).await;
        self.pending.lock().await.remove(observer_id).is_some()
    }

    pub async fn get_subscription(&self, observer_id: &str) -> Result<Option<String>> {
        let subscription = Subscription::find_by_observer(&self.datastore, observer_id)
            .await
            .map_err(WatchError::store)?;
        Ok(subscription.map(|s| s.operator_address))
    }

    pub async fn subscribers_of(&self, operator_address: &str) -> Result<BTreeSet<String>> {
        let observers = Subscription::find_observers_of(&self.datastore, operator_address)
            .await
            .map_err(WatchError::store)?;
        Ok(observers.into_iter().collect())
    }
}
