use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use super::{parse_signing_window, parse_validator_list, RawValidatorRecord, SignedBlock, Source};
use crate::{Result, WatchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Unavailable,
    Malformed,
}

/// Serves fixed explorer payloads from memory. Payloads go through the same parsing
/// as the HTTP client, so contract violations surface identically.
pub struct StaticSource {
    validators_payload: Mutex<String>,
    signing_window_payload: Mutex<String>,
    failure: Mutex<Option<FailureMode>>,
    gate: Mutex<Option<Arc<Notify>>>,
    fetch_all_calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(validators_payload: impl Into<String>, signing_window_payload: impl Into<String>) -> Self {
        Self {
            validators_payload: Mutex::new(validators_payload.into()),
            signing_window_payload: Mutex::new(signing_window_payload.into()),
            failure: Mutex::new(None),
            gate: Mutex::new(None),
            fetch_all_calls: AtomicUsize::new(0),
        }
    }

    pub async fn set_validators_payload(&self, payload: impl Into<String>) {
        *self.validators_payload.lock().await = payload.into();
    }

    pub async fn set_signing_window_payload(&self, payload: impl Into<String>) {
        *self.signing_window_payload.lock().await = payload.into();
    }

    /// Makes every following fetch fail, or succeed again with `None`.
    pub async fn fail_with(&self, failure: Option<FailureMode>) {
        *self.failure.lock().await = failure;
    }

    /// Holds `fetch_all` until the returned notify is signalled.
    pub async fn hold_fetches(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().await = Some(notify.clone());
        notify
    }

    pub async fn release_fetches(&self) {
        if let Some(gate) = self.gate.lock().await.take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    pub fn fetch_all_calls(&self) -> usize {
        self.fetch_all_calls.load(Ordering::SeqCst)
    }

    async fn check_failure(&self) -> Result<()> {
        match *self.failure.lock().await {
            Some(FailureMode::Unavailable) => {
                Err(WatchError::SourceUnavailable("static source offline".to_string()))
            }
            Some(FailureMode::Malformed) => {
                Err(WatchError::SourceMalformed("static source returned garbage".to_string()))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Source for StaticSource {
    async fn fetch_all(&self) -> Result<Vec<RawValidatorRecord>> {
        self.fetch_all_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().await.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_failure().await?;
        let payload = self.validators_payload.lock().await.clone();
        parse_validator_list(payload.as_bytes())
    }

    async fn fetch_signing_window(&self, _operator_address: &str, window_size: usize) -> Result<Vec<SignedBlock>> {
        self.check_failure().await?;
        let payload = self.signing_window_payload.lock().await.clone();
        parse_signing_window(payload.as_bytes(), window_size)
    }
}
