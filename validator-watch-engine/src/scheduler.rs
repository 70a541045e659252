use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::runner::{Runner, TickOutcome};

#[derive(Debug, Default)]
pub struct SchedulerStats {
    ticks: AtomicUsize,
    completed: AtomicUsize,
    skipped: AtomicUsize,
    aborted: AtomicUsize,
}

impl SchedulerStats {
    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }

    fn record(&self, outcome: &TickOutcome) {
        let counter = match outcome {
            TickOutcome::Completed(_) => &self.completed,
            TickOutcome::Skipped => &self.skipped,
            TickOutcome::Aborted(_) => &self.aborted,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fires a poll cycle every `interval`, starting immediately. Each tick runs on
/// its own task, so a long cycle makes the following ticks come back as skipped
/// rather than queueing up.
pub struct Scheduler {
    runner: Runner,
    interval: Duration,
    stats: Arc<SchedulerStats>,
    cancel: CancellationToken,
    ticks: TaskTracker,
}

impl Scheduler {
    pub fn new(runner: Runner, interval: Duration) -> Self {
        Self {
            runner,
            interval,
            stats: Arc::new(SchedulerStats::default()),
            cancel: CancellationToken::new(),
            ticks: TaskTracker::new(),
        }
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        self.stats.clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn start(&self) -> JoinHandle<()> {
        let runner = self.runner.clone();
        let stats = self.stats.clone();
        let cancel = self.cancel.clone();
        let ticks = self.ticks.clone();
        let period = self.interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            log::info!("polling every {}s", period.as_secs());

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        stats.ticks.fetch_add(1, Ordering::SeqCst);
                        let runner = runner.clone();
                        let stats = stats.clone();
                        ticks.spawn(async move {
                            let outcome = runner.run_tick().await;
                            stats.record(&outcome);
                        });
                    }
                }
            }
            log::info!("scheduler stopped");
        })
    }

    /// Stops new ticks. A cycle already running finishes on its own.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stops new ticks, then waits for the loop returned by [`Scheduler::start`]
    /// and for the cycle in flight, if any.
    pub async fn shutdown(&self, ticker: JoinHandle<()>) -> Result<(), JoinError> {
        self.stop();
        let joined = ticker.await;
        self.ticks.close();
        self.ticks.wait().await;
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_detector::ChangeDetector;
    use crate::clock::ManualClock;
    use crate::delivery::LogDelivery;
    use crate::notifier::Notifier;
    use crate::runner::RunnerProps;
    use crate::snapshot_store::{DatastoreSnapshotStore, SnapshotTracker};
    use crate::source::StaticSource;
    use crate::subscription_registry::SubscriptionRegistry;
    use validator_watch_datastore::WatchDatastore;

    fn scheduler(source: Arc<StaticSource>) -> Scheduler {
        let datastore = Arc::new(WatchDatastore::create_in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(DatastoreSnapshotStore::new(datastore.clone()));
        let registry = Arc::new(SubscriptionRegistry::new(datastore, clock.clone(), Duration::from_secs(60)));
        let runner = Runner::create(RunnerProps {
            source,
            tracker: Arc::new(SnapshotTracker::new(store, ChangeDetector::default())),
            notifier: Arc::new(Notifier::new(registry, Arc::new(LogDelivery))),
            clock,
            max_concurrent_records: 2,
        });
        Scheduler::new(runner, Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_interval() {
        let source = Arc::new(StaticSource::new("[]", "[]"));
        let scheduler = scheduler(source.clone());
        let handle = scheduler.start();

        // ticks at 0s, 60s, 120s
        tokio::time::sleep(Duration::from_secs(150)).await;
        let stats = scheduler.stats();
        assert_eq!(stats.ticks(), 3);
        assert_eq!(stats.completed(), 3);
        assert_eq!(source.fetch_all_calls(), 3);

        scheduler.stop();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(stats.ticks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_cycle_drops_following_ticks() {
        let source = Arc::new(StaticSource::new("[]", "[]"));
        source.hold_fetches().await;
        let scheduler = scheduler(source.clone());
        let handle = scheduler.start();

        tokio::time::sleep(Duration::from_secs(150)).await;
        let stats = scheduler.stats();
        assert_eq!(stats.ticks(), 3);
        assert_eq!(stats.skipped(), 2);
        assert_eq!(stats.completed(), 0);
        assert_eq!(source.fetch_all_calls(), 1);

        source.release_fetches().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(stats.completed(), 1);

        scheduler.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_counts_as_aborted() {
        let source = Arc::new(StaticSource::new("not json", "[]"));
        let scheduler = scheduler(source);
        let handle = scheduler.start();

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(scheduler.stats().aborted(), 2);

        scheduler.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_cycle_in_flight() {
        let source = Arc::new(StaticSource::new("[]", "[]"));
        source.hold_fetches().await;
        let scheduler = Arc::new(scheduler(source.clone()));
        let ticker = scheduler.start();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.fetch_all_calls(), 1);

        let stopping = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.shutdown(ticker).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!stopping.is_finished());

        source.release_fetches().await;
        stopping.await.unwrap().unwrap();
        assert_eq!(scheduler.stats().completed(), 1);
        assert_eq!(scheduler.stats().ticks(), 1);
    }
}
