pub mod change_detector;
pub mod clock;
pub mod commands;
pub mod config;
pub mod delivery;
pub mod error;
pub mod format;
pub mod key_locks;
pub mod notifier;
pub mod runner;
pub mod scheduler;
pub mod snapshot_store;
pub mod source;
pub mod status;
pub mod subscription_registry;

pub use change_detector::{ChangeDetector, ChangeEvent, WatchedField};
pub use clock::{Clock, ManualClock, SystemClock};
pub use commands::CommandRouter;
pub use config::WatchConfig;
pub use delivery::{Delivery, LogDelivery};
pub use error::{Result, WatchError};
pub use notifier::{Dispatch, Notifier, NotifyReport};
pub use runner::{CycleState, CycleSummary, Runner, RunnerProps, TickOutcome};
pub use scheduler::{Scheduler, SchedulerStats};
pub use snapshot_store::{DatastoreSnapshotStore, SnapshotStore, SnapshotTracker, Tracked};
pub use source::{RawValidatorRecord, SignedBlock, Source};
pub use status::{StatusService, ValidatorStatus};
pub use subscription_registry::{
    ConfirmOutcome, PendingOverwrite, SubscribeOutcome, SubscriptionRegistry, UnchangedReason,
};
