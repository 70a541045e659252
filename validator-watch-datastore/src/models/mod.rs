pub mod subscription;
pub mod validator_snapshot;

pub use subscription::Subscription;
pub use validator_snapshot::{BondStatus, ValidatorSnapshot};
