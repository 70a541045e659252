use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::notifier::Notifier;
use crate::snapshot_store::SnapshotTracker;
use crate::source::{RawValidatorRecord, Source};
use crate::WatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CycleState {
    Idle = 0,
    Fetching = 1,
    Processing = 2,
}

impl CycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CycleState::Fetching,
            2 => CycleState::Processing,
            _ => CycleState::Idle,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub records: usize,
    pub changes: usize,
    pub notified_validators: usize,
    /// Alerts handed off for delivery, one per subscribed observer.
    pub alerts_dispatched: usize,
    pub store_failures: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Completed(CycleSummary),
    /// Another cycle was still running.
    Skipped,
    /// The fetch failed and nothing was processed.
    Aborted(WatchError),
}

#[derive(Default)]
struct RecordOutcome {
    changes: usize,
    subscribers_notified: usize,
    store_failure: bool,
}

pub struct RunnerProps {
    pub source: Arc<dyn Source>,
    pub tracker: Arc<SnapshotTracker>,
    pub notifier: Arc<Notifier>,
    pub clock: Arc<dyn Clock>,
    pub max_concurrent_records: usize,
}

/// Runs one fetch -> diff -> store -> notify pass at a time.
#[derive(Clone)]
pub struct Runner {
    source: Arc<dyn Source>,
    tracker: Arc<SnapshotTracker>,
    notifier: Arc<Notifier>,
    clock: Arc<dyn Clock>,
    max_concurrent_records: usize,
    cycle_guard: Arc<Mutex<()>>,
    state: Arc<AtomicU8>,
}

struct StateGuard<'a>(&'a AtomicU8);

impl<'a> StateGuard<'a> {
    fn enter(state: &'a AtomicU8, next: CycleState) -> Self {
        state.store(next as u8, Ordering::SeqCst);
        Self(state)
    }

    fn advance(&self, next: CycleState) {
        self.0.store(next as u8, Ordering::SeqCst);
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.0.store(CycleState::Idle as u8, Ordering::SeqCst);
    }
}

impl Runner {
    pub fn create(props: RunnerProps) -> Self {
        Runner {
            source: props.source,
            tracker: props.tracker,
            notifier: props.notifier,
            clock: props.clock,
            max_concurrent_records: props.max_concurrent_records.max(1),
            cycle_guard: Arc::new(Mutex::new(())),
            state: Arc::new(AtomicU8::new(CycleState::Idle as u8)),
        }
    }

    pub fn state(&self) -> CycleState {
        CycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub async fn run_tick(&self) -> TickOutcome {
        let Ok(_cycle) = self.cycle_guard.try_lock() else {
            log::debug!("previous poll cycle still {:?}, dropping tick", self.state());
            return TickOutcome::Skipped;
        };
        let state = StateGuard::enter(&self.state, CycleState::Fetching);

        let records = match self.source.fetch_all().await {
            Ok(records) => records,
            Err(err) => {
                match &err {
                    WatchError::SourceMalformed(reason) => {
                        log::error!("aborting poll cycle, validator list malformed (likely upstream contract change): {}", reason)
                    }
                    other => log::warn!("aborting poll cycle: {}", other),
                }
                return TickOutcome::Aborted(err);
            }
        };

        state.advance(CycleState::Processing);
        let seen_at = self.clock.now();
        let mut summary = CycleSummary { records: records.len(), ..Default::default() };

        let outcomes: Vec<RecordOutcome> = stream::iter(records)
            .map(|record| self.process_record(record, seen_at))
            .buffer_unordered(self.max_concurrent_records)
            .collect()
            .await;

        for outcome in outcomes {
            summary.changes += outcome.changes;
            if outcome.store_failure {
                summary.store_failures += 1;
            }
            if outcome.subscribers_notified > 0 {
                summary.notified_validators += 1;
                summary.alerts_dispatched += outcome.subscribers_notified;
            }
        }

        log::info!(
            "poll cycle done: {} records, {} changes, {} validators notified, {} alerts dispatched, {} store failures",
            summary.records,
            summary.changes,
            summary.notified_validators,
            summary.alerts_dispatched,
            summary.store_failures
        );
        TickOutcome::Completed(summary)
    }

    /// Waits for alerts handed off by earlier cycles to finish delivering.
    pub async fn wait_for_deliveries(&self) {
        self.notifier.wait_idle().await;
    }

    async fn process_record(&self, record: RawValidatorRecord, seen_at: i64) -> RecordOutcome {
        let operator_address = record.operator_address.clone();
        let tracked = match self.tracker.track(record, seen_at).await {
            Ok(tracked) => tracked,
            Err(err) => {
                log::warn!("skipping {}: {}", operator_address, err);
                return RecordOutcome { store_failure: true, ..Default::default() };
            }
        };
        if tracked.events.is_empty() {
            return RecordOutcome::default();
        }

        let mut outcome = RecordOutcome { changes: tracked.events.len(), ..Default::default() };
        match self
            .notifier
            .notify(&operator_address, &tracked.events, &tracked.snapshot)
            .await
        {
            Ok(dispatch) => outcome.subscribers_notified = dispatch.subscribers,
            Err(err) => {
                log::warn!("could not notify subscribers of {}: {}", operator_address, err);
                outcome.store_failure = true;
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_detector::ChangeDetector;
    use crate::clock::ManualClock;
    use crate::delivery::{Delivery, SameProcess};
    use crate::snapshot_store::{DatastoreSnapshotStore, SnapshotStore};
    use crate::source::StaticSource;
    use crate::subscription_registry::SubscriptionRegistry;
    use crate::Result;
    use async_trait::async_trait;
    use std::time::Duration;
    use validator_watch_datastore::{ValidatorSnapshot, WatchDatastore};

    fn record_json(address: &str, rank: u32, tokens: u64) -> String {
        format!(
            r#"{{"operatorAddress":"{}","rank":{},"hexAddress":"AA","jailed":false,"bondStatus":"bonded","uptime":99.0,"commission":5,"moniker":"m","votingPowerPercent":1.0,"tokens":{},"cumulativeShare":1.0,"validatorId":1}}"#,
            address, rank, tokens
        )
    }

    fn payload(records: &[(&str, u32, u64)]) -> String {
        let items: Vec<String> = records.iter().map(|(a, r, t)| record_json(a, *r, *t)).collect();
        format!("[{}]", items.join(","))
    }

    /// Fails every upsert for one address.
    struct FlakyStore {
        inner: DatastoreSnapshotStore,
        broken_address: String,
    }

    #[async_trait]
    impl SnapshotStore for FlakyStore {
        async fn get(&self, operator_address: &str) -> Result<Option<ValidatorSnapshot>> {
            self.inner.get(operator_address).await
        }

        async fn upsert(&self, snapshot: &ValidatorSnapshot) -> Result<()> {
            if snapshot.operator_address == self.broken_address {
                return Err(WatchError::StoreFailure("disk full".to_string()));
            }
            self.inner.upsert(snapshot).await
        }
    }

    struct Harness {
        source: Arc<StaticSource>,
        store: Arc<dyn SnapshotStore>,
        registry: Arc<SubscriptionRegistry>,
        delivery: Arc<SameProcess>,
        runner: Runner,
    }

    fn harness(initial: &str, broken_address: Option<&str>) -> Harness {
        let datastore = Arc::new(WatchDatastore::create_in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(1_000));
        let source = Arc::new(StaticSource::new(initial, "[]"));
        let inner = DatastoreSnapshotStore::new(datastore.clone());
        let store: Arc<dyn SnapshotStore> = match broken_address {
            Some(address) => Arc::new(FlakyStore { inner, broken_address: address.to_string() }),
            None => Arc::new(inner),
        };
        let tracker = Arc::new(SnapshotTracker::new(store.clone(), ChangeDetector::default()));
        let registry = Arc::new(SubscriptionRegistry::new(datastore, clock.clone(), Duration::from_secs(60)));
        let delivery = Arc::new(SameProcess::new());
        let notifier = Arc::new(Notifier::new(registry.clone(), delivery.clone()));
        let runner = Runner::create(RunnerProps {
            source: source.clone(),
            tracker,
            notifier,
            clock,
            max_concurrent_records: 4,
        });
        Harness { source, store, registry, delivery, runner }
    }

    fn completed(outcome: TickOutcome) -> CycleSummary {
        match outcome {
            TickOutcome::Completed(summary) => summary,
            other => panic!("expected a completed cycle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_first_cycle_only_populates() {
        let h = harness(&payload(&[("v1", 50, 10), ("v2", 300, 10)]), None);
        let summary = completed(h.runner.run_tick().await);
        assert_eq!(summary.records, 2);
        assert_eq!(summary.changes, 0);
        assert_eq!(h.store.get("v1").await.unwrap().unwrap().last_seen_at, 1_000);
        assert_eq!(h.runner.state(), CycleState::Idle);
    }

    #[tokio::test]
    async fn test_changes_reach_subscribers() {
        let h = harness(&payload(&[("v1", 50, 10), ("v2", 300, 10)]), None);
        h.registry.subscribe("alice", "v1").await.unwrap();
        h.registry.subscribe("bob", "v2").await.unwrap();
        completed(h.runner.run_tick().await);

        h.source.set_validators_payload(payload(&[("v1", 55, 10), ("v2", 310, 10)])).await;
        let summary = completed(h.runner.run_tick().await);
        assert_eq!(summary.changes, 1);
        assert_eq!(summary.notified_validators, 1);
        assert_eq!(summary.alerts_dispatched, 1);
        h.runner.wait_for_deliveries().await;

        let inbox = h.delivery.inbox("alice").await;
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].contains("Old Rank: 50, New rank: 55"));
        assert!(h.delivery.inbox("bob").await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_without_writes() {
        let h = harness(&payload(&[("v1", 50, 10)]), None);
        completed(h.runner.run_tick().await);
        let before = h.store.get("v1").await.unwrap();

        h.source.set_validators_payload(payload(&[("v1", 51, 99), ("v9", 1, 1)])).await;
        h.source.fail_with(Some(crate::source::FailureMode::Unavailable)).await;
        let outcome = h.runner.run_tick().await;
        assert!(matches!(outcome, TickOutcome::Aborted(WatchError::SourceUnavailable(_))));

        assert_eq!(h.store.get("v1").await.unwrap(), before);
        assert_eq!(h.store.get("v9").await.unwrap(), None);
        assert_eq!(h.runner.state(), CycleState::Idle);
    }

    #[tokio::test]
    async fn test_store_failure_is_isolated_to_its_record() {
        let h = harness(&payload(&[("v1", 50, 10), ("v2", 60, 10), ("v3", 70, 10)]), Some("v2"));
        let summary = completed(h.runner.run_tick().await);
        assert_eq!(summary.records, 3);
        assert_eq!(summary.store_failures, 1);
        assert!(h.store.get("v1").await.unwrap().is_some());
        assert!(h.store.get("v3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let h = harness(&payload(&[("v1", 50, 10)]), None);
        h.source.hold_fetches().await;

        let first = {
            let runner = h.runner.clone();
            tokio::spawn(async move { runner.run_tick().await })
        };
        while h.source.fetch_all_calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(h.runner.state(), CycleState::Fetching);
        assert_eq!(h.runner.run_tick().await, TickOutcome::Skipped);

        h.source.release_fetches().await;
        let summary = completed(first.await.unwrap());
        assert_eq!(summary.records, 1);
        assert_eq!(h.source.fetch_all_calls(), 1);
    }

    /// Accepts the alert and never answers.
    struct Unresponsive;

    #[async_trait]
    impl Delivery for Unresponsive {
        async fn deliver(&self, _observer_id: &str, _message: &str) -> anyhow::Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unresponsive_delivery_does_not_hold_the_cycle() {
        let datastore = Arc::new(WatchDatastore::create_in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(1_000));
        let source = Arc::new(StaticSource::new(payload(&[("v1", 50, 10)]), "[]"));
        let store = Arc::new(DatastoreSnapshotStore::new(datastore.clone()));
        let registry = Arc::new(SubscriptionRegistry::new(datastore, clock.clone(), Duration::from_secs(60)));
        registry.subscribe("alice", "v1").await.unwrap();
        let notifier = Notifier::new(registry, Arc::new(Unresponsive))
            .with_delivery_timeout(Duration::from_millis(100));
        let runner = Runner::create(RunnerProps {
            source: source.clone(),
            tracker: Arc::new(SnapshotTracker::new(store, ChangeDetector::default())),
            notifier: Arc::new(notifier),
            clock,
            max_concurrent_records: 4,
        });
        completed(runner.run_tick().await);

        source.set_validators_payload(payload(&[("v1", 51, 10)])).await;
        let tick = tokio::time::timeout(Duration::from_secs(5), runner.run_tick()).await;
        let summary = completed(tick.expect("the cycle must not wait on delivery"));
        assert_eq!(summary.alerts_dispatched, 1);
        assert_eq!(runner.state(), CycleState::Idle);

        source.set_validators_payload(payload(&[("v1", 52, 10)])).await;
        let next = runner.run_tick().await;
        assert!(matches!(next, TickOutcome::Completed(CycleSummary { changes: 1, .. })));

        // the stuck deliveries are cut off by the timeout
        tokio::time::timeout(Duration::from_secs(5), runner.wait_for_deliveries()).await.unwrap();
    }
}
