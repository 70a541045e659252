use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use validator_watch_datastore::WatchDatastore;
use validator_watch_devnet::Devnet;
use validator_watch_engine::source::{ExplorerClient, StaticSource};
use validator_watch_engine::{
    ChangeDetector, CommandRouter, DatastoreSnapshotStore, Delivery, LogDelivery, Notifier, Runner,
    RunnerProps, Scheduler, SnapshotTracker, Source, StatusService, SubscriptionRegistry, SystemClock,
    TickOutcome, WatchConfig,
};

use crate::config::Config;
use crate::delivery::WebhookDelivery;
use crate::inbound_server;

/// Everything a running watcher needs, wired from one [`Config`].
pub struct Node {
    pub config: Config,
    pub watch_config: WatchConfig,
    pub datastore: Arc<WatchDatastore>,
    pub source: Arc<dyn Source>,
    pub registry: Arc<SubscriptionRegistry>,
    pub status: Arc<StatusService>,
    pub router: Arc<CommandRouter>,
    pub runner: Runner,
    shutdown: CancellationToken,
}

impl Node {
    pub async fn from_config_filepath(config_filepath: PathBuf) -> Result<Node> {
        let config = Config::from_filepath(&config_filepath)?;
        Node::from_config(config).await
    }

    pub async fn from_config(config: Config) -> Result<Node> {
        let watch_config = config.to_watch_config()?;

        let datastore = match &config.storage_path {
            Some(path) => WatchDatastore::create_in_directory(path)
                .with_context(|| format!("Failed to open storage at {}", path.display()))?,
            None => {
                log::warn!("No storage_path configured, snapshots and subscriptions will not survive a restart");
                WatchDatastore::create_in_memory().context("Failed to create in-memory storage")?
            }
        };
        let datastore = Arc::new(datastore);

        let source: Arc<dyn Source> = if config.devnet_source.unwrap_or(false) {
            log::info!("Using bundled devnet validator data");
            let devnet = Devnet::new();
            Arc::new(StaticSource::new(
                devnet.validators_payload(),
                devnet.signing_window_payload(watch_config.signing_window_size),
            ))
        } else {
            Arc::new(ExplorerClient::new(&watch_config.source_base_url, watch_config.fetch_timeout)?)
        };

        let delivery: Arc<dyn Delivery> = match &config.delivery_webhook_url {
            Some(url) => Arc::new(WebhookDelivery::new(url, watch_config.delivery_timeout)?),
            None => {
                log::info!("No delivery_webhook_url configured, alerts are only logged");
                Arc::new(LogDelivery)
            }
        };

        let clock = Arc::new(SystemClock);
        let registry = Arc::new(SubscriptionRegistry::new(
            datastore.clone(),
            clock.clone(),
            watch_config.confirmation_ttl,
        ));
        let status = Arc::new(StatusService::new(source.clone(), watch_config.signing_window_size));
        let router = Arc::new(CommandRouter::new(registry.clone(), status.clone()));

        let store = Arc::new(DatastoreSnapshotStore::new(datastore.clone()));
        let tracker = Arc::new(SnapshotTracker::new(
            store,
            ChangeDetector::new(watch_config.rank_watch_threshold),
        ));
        let notifier = Arc::new(
            Notifier::new(registry.clone(), delivery).with_delivery_timeout(watch_config.delivery_timeout),
        );
        let runner = Runner::create(RunnerProps {
            source: source.clone(),
            tracker,
            notifier,
            clock,
            max_concurrent_records: watch_config.max_concurrent_records,
        });

        Ok(Node {
            config,
            watch_config,
            datastore,
            source,
            registry,
            status,
            router,
            runner,
            shutdown: CancellationToken::new(),
        })
    }

    /// Cancelling this token makes [`Node::run`] return.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs one cycle and waits for its alerts to be delivered.
    pub async fn poll_once(&self) -> TickOutcome {
        let outcome = self.runner.run_tick().await;
        self.runner.wait_for_deliveries().await;
        outcome
    }

    /// Polls on the configured interval, and serves inbound commands when a
    /// port is configured, until Ctrl+C or the shutdown token fires.
    pub async fn run(&self) -> Result<()> {
        let scheduler = Scheduler::new(self.runner.clone(), self.watch_config.poll_interval);
        let scheduler_task = scheduler.start();

        let inbound = match self.config.inbound_port {
            Some(port) => Some(inbound_server::start_inbound_server(
                port,
                self.router.clone(),
                self.shutdown.child_token(),
            )?),
            None => None,
        };

        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("Failed to listen for Ctrl+C")?;
                log::info!("Ctrl+C received, shutting down");
            }
            _ = self.shutdown.cancelled() => {
                log::info!("Shutdown requested");
            }
        }

        self.shutdown.cancel();
        scheduler.shutdown(scheduler_task).await.context("Scheduler task panicked")?;
        if let Some((_, server_task)) = inbound {
            server_task.await.context("Inbound server task panicked")?;
        }
        self.runner.wait_for_deliveries().await;

        let stats = scheduler.stats();
        log::info!(
            "Stopped after {} ticks ({} completed, {} skipped, {} aborted)",
            stats.ticks(),
            stats.completed(),
            stats.skipped(),
            stats.aborted()
        );
        self.datastore.flush().context("Failed to flush storage")?;
        Ok(())
    }
}
