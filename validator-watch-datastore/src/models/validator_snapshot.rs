use crate::model::Model;
use crate::WatchDatastore;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Staking state of a validator as reported by the explorer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BondStatus {
    #[serde(rename = "bonded", alias = "Bonded", alias = "BOND_STATUS_BONDED")]
    Bonded,
    #[serde(rename = "unbonding", alias = "Unbonding", alias = "BOND_STATUS_UNBONDING")]
    Unbonding,
    #[serde(rename = "unbonded", alias = "Unbonded", alias = "BOND_STATUS_UNBONDED")]
    Unbonded,
}

impl BondStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BondStatus::Bonded => "bonded",
            BondStatus::Unbonding => "unbonding",
            BondStatus::Unbonded => "unbonded",
        }
    }
}

impl fmt::Display for BondStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BondStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.trim_start_matches("bond_status_") {
            "bonded" => Ok(BondStatus::Bonded),
            "unbonding" => Ok(BondStatus::Unbonding),
            "unbonded" => Ok(BondStatus::Unbonded),
            _ => Err(anyhow!("Unknown bond status: {}", s)),
        }
    }
}

/// Last known attribute set of one validator, replaced as a whole on every poll.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ValidatorSnapshot {
    pub operator_address: String,
    pub rank: u32,
    pub hex_address: String,
    pub jailed: bool,
    pub bond_status: BondStatus,
    pub uptime: f64,
    pub commission: f64,
    pub moniker: String,
    pub voting_power_percent: f64,
    pub avatar: Option<String>,
    pub tokens: u64,
    pub cumulative_share: f64,
    pub validator_id: i64,
    /// Unix seconds of the poll that last wrote this record.
    pub last_seen_at: i64,
}

#[async_trait]
impl Model for ValidatorSnapshot {
    const ID_PATH: &'static str = "/validators/${operator_address}";

    const FIELDS: &'static [&'static str] = &[
        "operator_address",
        "rank",
        "hex_address",
        "jailed",
        "bond_status",
        "uptime",
        "commission",
        "moniker",
        "voting_power_percent",
        "avatar",
        "tokens",
        "cumulative_share",
        "validator_id",
        "last_seen_at",
    ];

    const FIELD_DEFAULTS: &'static [(&'static str, serde_json::Value)] = &[
        ("avatar", serde_json::Value::Null),
    ];

    fn get_id_keys(&self) -> HashMap<String, String> {
        let mut keys = HashMap::new();
        keys.insert("operator_address".to_string(), self.operator_address.clone());
        keys
    }
}

impl ValidatorSnapshot {
    pub async fn find_by_operator_address(
        datastore: &WatchDatastore,
        operator_address: &str,
    ) -> Result<Option<Self>> {
        let keys = HashMap::from([("operator_address".to_string(), operator_address.to_string())]);
        Self::find_one(datastore, keys).await
    }
}
