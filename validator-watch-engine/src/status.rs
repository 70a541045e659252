use std::sync::Arc;

use crate::format::{format_number, format_thousands};
use crate::source::{RawValidatorRecord, SignedBlock, Source};
use crate::{Result, WatchError};

pub const USER_FETCH_ERROR: &str = "An error occurred while fetching the validator data. ⚠️";
pub const USER_NOT_FOUND: &str = "Validator not found. Check the operator address and try again. 🔍";

/// A validator's current record plus its recent signing history, fetched live.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorStatus {
    pub record: RawValidatorRecord,
    pub window: Vec<SignedBlock>,
}

impl ValidatorStatus {
    pub fn signed_blocks(&self) -> usize {
        self.window.iter().filter(|b| b.signed).count()
    }

    /// One glyph per block, most recent first.
    pub fn block_strip(&self) -> String {
        self.window
            .iter()
            .map(|b| if b.signed { '🟩' } else { '🟥' })
            .collect()
    }

    pub fn render(&self) -> String {
        let r = &self.record;
        let jailed = if r.jailed { "❌ JAILED" } else { "✅ Free" };
        format!(
            "✨ Validator Info ✨\n\n\
             {}\n\n\
             🔹 Rank: {}\n\
             🔹 Jailed: {}\n\
             🔹 Tokens: {}\n\
             🔹 Bond Status: {}\n\
             🔹 Uptime: {}%\n\
             🔹 Commission: {}%\n\
             🔹 Voting Power: {}%\n\
             🔹 Successful blocks: {}/{}\n\n\
             Latest {} blocks:\n\n\
             {}",
            r.operator_address,
            r.rank,
            jailed,
            format_thousands(r.tokens),
            r.bond_status,
            format_number(r.uptime),
            format_number(r.commission),
            format_number(r.voting_power_percent),
            self.signed_blocks(),
            self.window.len(),
            self.window.len(),
            self.block_strip()
        )
    }
}

/// Read-through status lookups. Nothing here touches the snapshot store.
pub struct StatusService {
    source: Arc<dyn Source>,
    window_size: usize,
}

impl StatusService {
    pub fn new(source: Arc<dyn Source>, window_size: usize) -> Self {
        Self { source, window_size }
    }

    /// `Ok(None)` when the explorer does not list the address.
    pub async fn check(&self, operator_address: &str) -> Result<Option<ValidatorStatus>> {
        let record = self
            .source
            .fetch_all()
            .await?
            .into_iter()
            .find(|r| r.operator_address == operator_address);
        let Some(record) = record else {
            return Ok(None);
        };
        let window = self
            .source
            .fetch_signing_window(operator_address, self.window_size)
            .await?;
        Ok(Some(ValidatorStatus { record, window }))
    }

    /// The text shown to a user. Failure details stay in the log.
    pub async fn check_message(&self, operator_address: &str) -> String {
        match self.check(operator_address).await {
            Ok(Some(status)) => status.render(),
            Ok(None) => USER_NOT_FOUND.to_string(),
            Err(err) => {
                log_failure(operator_address, &err);
                USER_FETCH_ERROR.to_string()
            }
        }
    }
}

fn log_failure(operator_address: &str, err: &WatchError) {
    match err {
        WatchError::SourceMalformed(_) => log::error!("status check of {} failed: {}", operator_address, err),
        _ => log::warn!("status check of {} failed: {}", operator_address, err),
    }
}
