pub mod explorer;
pub mod static_source;

pub use explorer::ExplorerClient;
pub use static_source::{FailureMode, StaticSource};

use crate::{Result, WatchError};
use serde::{Deserialize, Serialize};
use validator_watch_datastore::{BondStatus, ValidatorSnapshot};

/// One validator as listed by the explorer. Every field except `avatar` is required.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawValidatorRecord {
    pub operator_address: String,
    pub rank: u32,
    pub hex_address: String,
    pub jailed: bool,
    pub bond_status: BondStatus,
    pub uptime: f64,
    pub commission: f64,
    pub moniker: String,
    pub voting_power_percent: f64,
    #[serde(default)]
    pub avatar: Option<String>,
    pub tokens: u64,
    pub cumulative_share: f64,
    pub validator_id: i64,
}

impl RawValidatorRecord {
    pub fn into_snapshot(self, seen_at: i64) -> ValidatorSnapshot {
        ValidatorSnapshot {
            operator_address: self.operator_address,
            rank: self.rank,
            hex_address: self.hex_address,
            jailed: self.jailed,
            bond_status: self.bond_status,
            uptime: self.uptime,
            commission: self.commission,
            moniker: self.moniker,
            voting_power_percent: self.voting_power_percent,
            avatar: self.avatar.filter(|a| !a.is_empty()),
            tokens: self.tokens,
            cumulative_share: self.cumulative_share,
            validator_id: self.validator_id,
            last_seen_at: seen_at,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.operator_address.trim().is_empty() {
            return Err(WatchError::SourceMalformed("record without operatorAddress".to_string()));
        }
        if self.rank == 0 {
            return Err(WatchError::SourceMalformed(format!(
                "rank 0 for {}",
                self.operator_address
            )));
        }
        Ok(())
    }
}

/// One block of a validator's signing window.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SignedBlock {
    pub signed: bool,
    #[serde(default)]
    pub height: Option<u64>,
}

/// Read access to the remote explorer. Implementations report failures and never retry.
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<RawValidatorRecord>>;

    /// Most recent block first.
    async fn fetch_signing_window(&self, operator_address: &str, window_size: usize) -> Result<Vec<SignedBlock>>;
}

pub fn parse_validator_list(body: &[u8]) -> Result<Vec<RawValidatorRecord>> {
    let records: Vec<RawValidatorRecord> = serde_json::from_slice(body)
        .map_err(|e| WatchError::SourceMalformed(format!("validator list: {}", e)))?;
    for record in &records {
        record.validate()?;
    }
    Ok(records)
}

pub fn parse_signing_window(body: &[u8], window_size: usize) -> Result<Vec<SignedBlock>> {
    let mut blocks: Vec<SignedBlock> = serde_json::from_slice(body)
        .map_err(|e| WatchError::SourceMalformed(format!("signing window: {}", e)))?;
    blocks.truncate(window_size);
    Ok(blocks)
}
