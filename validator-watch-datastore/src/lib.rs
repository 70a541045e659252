mod error;

pub mod model;
pub mod models;
pub mod watch_datastore;

pub use error::Error;
pub use model::Model;
pub use models::{BondStatus, Subscription, ValidatorSnapshot};
pub use watch_datastore::WatchDatastore;

pub type Result<T> = std::result::Result<T, Error>;
