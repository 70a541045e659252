use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::change_detector::ChangeEvent;
use crate::config::DEFAULT_DELIVERY_TIMEOUT_SECS;
use crate::delivery::Delivery;
use crate::format::format_alert;
use crate::subscription_registry::SubscriptionRegistry;
use crate::{Result, WatchError};
use validator_watch_datastore::ValidatorSnapshot;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotifyReport {
    pub subscribers: usize,
    pub delivered: usize,
    pub failed: Vec<WatchError>,
}

/// An alert handed off for delivery. Dropping it leaves the deliveries running.
#[derive(Debug)]
pub struct Dispatch {
    pub subscribers: usize,
    deliveries: Option<JoinHandle<NotifyReport>>,
}

impl Dispatch {
    /// Waits until every delivery of this alert has succeeded, failed or timed out.
    pub async fn report(self) -> NotifyReport {
        let Dispatch { subscribers, deliveries } = self;
        let Some(deliveries) = deliveries else {
            return NotifyReport::default();
        };
        match deliveries.await {
            Ok(report) => report,
            Err(err) => {
                log::error!("alert delivery task failed: {}", err);
                NotifyReport { subscribers, ..Default::default() }
            }
        }
    }
}

/// Fans change events out to everyone subscribed to the changed validator.
pub struct Notifier {
    registry: Arc<SubscriptionRegistry>,
    delivery: Arc<dyn Delivery>,
    delivery_timeout: Duration,
    in_flight: TaskTracker,
}

impl Notifier {
    pub fn new(registry: Arc<SubscriptionRegistry>, delivery: Arc<dyn Delivery>) -> Self {
        Self {
            registry,
            delivery,
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS),
            in_flight: TaskTracker::new(),
        }
    }

    pub fn with_delivery_timeout(mut self, delivery_timeout: Duration) -> Self {
        self.delivery_timeout = delivery_timeout;
        self
    }

    /// Resolves subscribers and formats the alert, then delivers on a background
    /// task. Only resolving subscribers can fail the call.
    pub async fn notify(
        &self,
        operator_address: &str,
        events: &[ChangeEvent],
        snapshot: &ValidatorSnapshot,
    ) -> Result<Dispatch> {
        if events.is_empty() {
            return Ok(Dispatch { subscribers: 0, deliveries: None });
        }
        let subscribers = self.registry.subscribers_of(operator_address).await?;
        if subscribers.is_empty() {
            return Ok(Dispatch { subscribers: 0, deliveries: None });
        }

        let message = format_alert(operator_address, events);
        log::debug!(
            "notifying {} observers of {} ({}, rank {})",
            subscribers.len(),
            operator_address,
            snapshot.moniker,
            snapshot.rank
        );

        let count = subscribers.len();
        let deliveries = self.in_flight.spawn(deliver_all(
            self.delivery.clone(),
            subscribers,
            message,
            self.delivery_timeout,
        ));
        Ok(Dispatch { subscribers: count, deliveries: Some(deliveries) })
    }

    /// Waits for every alert handed off so far.
    pub async fn wait_idle(&self) {
        self.in_flight.close();
        self.in_flight.wait().await;
        self.in_flight.reopen();
    }
}

async fn deliver_all(
    delivery: Arc<dyn Delivery>,
    subscribers: BTreeSet<String>,
    message: String,
    timeout: Duration,
) -> NotifyReport {
    let deliveries = subscribers.iter().map(|observer_id| {
        let delivery = &delivery;
        let message = &message;
        async move {
            let reason = match tokio::time::timeout(timeout, delivery.deliver(observer_id, message)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => format!("{:#}", e),
                Err(_) => format!("timed out after {}ms", timeout.as_millis()),
            };
            Err(WatchError::DeliveryFailure { observer_id: observer_id.clone(), reason })
        }
    });

    let mut report = NotifyReport { subscribers: subscribers.len(), ..Default::default() };
    for result in join_all(deliveries).await {
        match result {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                log::warn!("{}", err);
                report.failed.push(err);
            }
        }
    }
    report
}
