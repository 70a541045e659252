//! HTTP client for the validator explorer API.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

use super::{parse_signing_window, parse_validator_list, RawValidatorRecord, SignedBlock, Source};
use crate::{Result, WatchError};

pub struct ExplorerClient {
    client: Client,
    base_url: Url,
}

impl ExplorerClient {
    /// Every request made by this client gives up after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid source base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Source base URL cannot carry a path: {}", base_url));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| WatchError::SourceUnavailable(format!("bad base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_body(&self, url: Url) -> Result<Vec<u8>> {
        log::debug!("Fetching {}", url);
        let response = self.client.get(url.clone()).send().await.map_err(|e| unavailable(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::SourceUnavailable(format!("HTTP {} from {}", status, url)));
        }

        let body = response.bytes().await.map_err(|e| unavailable(&url, e))?;
        Ok(body.to_vec())
    }
}

fn unavailable(url: &Url, err: reqwest::Error) -> WatchError {
    if err.is_timeout() {
        WatchError::SourceUnavailable(format!("timed out fetching {}", url))
    } else {
        WatchError::SourceUnavailable(format!("request to {} failed: {}", url, err))
    }
}

#[async_trait]
impl Source for ExplorerClient {
    async fn fetch_all(&self) -> Result<Vec<RawValidatorRecord>> {
        let url = self.endpoint(&["validators"])?;
        let body = self.get_body(url).await?;
        parse_validator_list(&body)
    }

    async fn fetch_signing_window(&self, operator_address: &str, window_size: usize) -> Result<Vec<SignedBlock>> {
        let mut url = self.endpoint(&["validators", operator_address, "uptime"])?;
        url.query_pairs_mut().append_pair("limit", &window_size.to_string());
        let body = self.get_body(url).await?;
        parse_signing_window(&body, window_size)
    }
}
