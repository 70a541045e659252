use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{self, Value};

pub const VALIDATORS_JSON: &str = include_str!("../fixtures/validators.json");
pub const UPTIME_JSON: &str = include_str!("../fixtures/uptime.json");

lazy_static! {
    pub static ref VALIDATORS: Vec<Value> = {
        serde_json::from_str(VALIDATORS_JSON).expect("Failed to parse static validators.json")
    };
    pub static ref UPTIME: Vec<UptimeBlock> = {
        serde_json::from_str(UPTIME_JSON).expect("Failed to parse static uptime.json")
    };
}

/// One entry of the explorer's uptime endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UptimeBlock {
    pub height: u64,
    pub signed: bool,
}

/// Explorer payloads for a small fixed validator set, in the explorer's own field naming.
#[derive(Debug, Clone)]
pub struct Devnet {
    validators: Vec<Value>,
}

impl Devnet {
    pub fn new() -> Self {
        Self { validators: VALIDATORS.clone() }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn operator_addresses(&self) -> Vec<String> {
        self.validators
            .iter()
            .filter_map(|v| v.get("operatorAddress"))
            .filter_map(|a| a.as_str())
            .map(String::from)
            .collect()
    }

    pub fn address_of(&self, index: usize) -> Option<String> {
        self.validators
            .get(index)
            .and_then(|v| v.get("operatorAddress"))
            .and_then(|a| a.as_str())
            .map(String::from)
    }

    pub fn index_of(&self, operator_address: &str) -> Option<usize> {
        self.validators.iter().position(|v| {
            v.get("operatorAddress").and_then(|a| a.as_str()) == Some(operator_address)
        })
    }

    pub fn validator(&self, operator_address: &str) -> Option<&Value> {
        self.index_of(operator_address).map(|i| &self.validators[i])
    }

    /// Overwrites fields of one validator, e.g. `json!({"rank": 55})`.
    pub fn patch(&mut self, operator_address: &str, changes: Value) -> Result<&mut Self> {
        let index = self
            .index_of(operator_address)
            .ok_or_else(|| anyhow!("Unknown validator {}", operator_address))?;
        let changes = changes
            .as_object()
            .ok_or_else(|| anyhow!("Patch must be a JSON object"))?;
        let record = self.validators[index]
            .as_object_mut()
            .ok_or_else(|| anyhow!("Fixture record is not an object"))?;
        for (field, value) in changes {
            record.insert(field.clone(), value.clone());
        }
        Ok(self)
    }

    /// Drops a field from one validator, producing a record the explorer contract does not allow.
    pub fn remove_field(&mut self, operator_address: &str, field: &str) -> Result<&mut Self> {
        let index = self
            .index_of(operator_address)
            .ok_or_else(|| anyhow!("Unknown validator {}", operator_address))?;
        if let Some(record) = self.validators[index].as_object_mut() {
            record.remove(field);
        }
        Ok(self)
    }

    pub fn validators_payload(&self) -> String {
        Value::Array(self.validators.clone()).to_string()
    }

    pub fn signing_window_payload(&self, limit: usize) -> String {
        let window: Vec<UptimeBlock> = UPTIME.iter().take(limit).copied().collect();
        serde_json::to_string(&window).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Default for Devnet {
    fn default() -> Self {
        Self::new()
    }
}

// Public interface
pub fn new() -> Devnet {
    Devnet::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixture_shape() {
        let devnet = Devnet::new();
        assert_eq!(devnet.len(), 4);
        assert_eq!(devnet.index_of(&devnet.address_of(2).unwrap()), Some(2));
        assert_eq!(UPTIME.len(), 100);
        let signed = UPTIME.iter().filter(|b| b.signed).count();
        assert_eq!(signed, 94);
    }

    #[test]
    fn test_patch_and_remove() -> Result<()> {
        let mut devnet = Devnet::new();
        let address = devnet.address_of(1).unwrap();
        devnet.patch(&address, json!({"rank": 55, "jailed": true}))?;
        assert_eq!(devnet.validator(&address).unwrap()["rank"], json!(55));

        devnet.remove_field(&address, "commission")?;
        assert!(devnet.validator(&address).unwrap().get("commission").is_none());

        assert!(devnet.patch("storyvaloper1unknown", json!({})).is_err());
        Ok(())
    }

    #[test]
    fn test_payloads_parse() {
        let devnet = Devnet::new();
        let parsed: Vec<Value> = serde_json::from_str(&devnet.validators_payload()).unwrap();
        assert_eq!(parsed.len(), devnet.len());
        let window: Vec<Value> = serde_json::from_str(&devnet.signing_window_payload(10)).unwrap();
        assert_eq!(window.len(), 10);
    }
}
