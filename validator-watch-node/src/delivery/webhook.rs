use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use validator_watch_engine::Delivery;

/// Body posted to the webhook for every outbound message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboundMessage {
    pub observer_id: String,
    pub text: String,
}

/// Hands messages to a chat transport over HTTP. Any non-2xx answer counts as
/// a failed delivery to that observer.
pub struct WebhookDelivery {
    client: Client,
    url: String,
}

impl WebhookDelivery {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        reqwest::Url::parse(url).with_context(|| format!("Invalid delivery webhook URL: {}", url))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, url: url.to_string() })
    }
}

#[async_trait]
impl Delivery for WebhookDelivery {
    async fn deliver(&self, observer_id: &str, message: &str) -> Result<()> {
        let body = OutboundMessage {
            observer_id: observer_id.to_string(),
            text: message.to_string(),
        };
        let res = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.url))?;

        let status = res.status();
        if !status.is_success() {
            let error = res.text().await.unwrap_or_default();
            return Err(anyhow!("HTTP {}: {}", status, error.trim()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use warp::http::StatusCode;
    use warp::Filter;

    async fn spawn_transport(received: Arc<Mutex<Vec<OutboundMessage>>>) -> std::net::SocketAddr {
        let accept = warp::path!("send")
            .and(warp::post())
            .and(warp::body::json())
            .then(move |message: OutboundMessage| {
                let received = received.clone();
                async move {
                    received.lock().await.push(message);
                    warp::reply::with_status("ok", StatusCode::OK)
                }
            });
        let blocked = warp::path!("blocked")
            .map(|| warp::reply::with_status("bot was blocked by the user", StatusCode::FORBIDDEN));

        let (addr, server) = warp::serve(accept.or(blocked)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }

    #[tokio::test]
    async fn test_posts_message() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let addr = spawn_transport(received.clone()).await;
        let delivery = WebhookDelivery::new(&format!("http://{}/send", addr), Duration::from_secs(2)).unwrap();

        delivery.deliver("42", "hello").await.unwrap();
        assert_eq!(
            *received.lock().await,
            vec![OutboundMessage { observer_id: "42".into(), text: "hello".into() }]
        );
    }

    #[tokio::test]
    async fn test_rejection_is_a_failure() {
        let addr = spawn_transport(Arc::new(Mutex::new(Vec::new()))).await;
        let delivery = WebhookDelivery::new(&format!("http://{}/blocked", addr), Duration::from_secs(2)).unwrap();

        let err = delivery.deliver("42", "hello").await.unwrap_err();
        assert!(err.to_string().contains("403"), "{err}");
        assert!(err.to_string().contains("blocked"), "{err}");
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(WebhookDelivery::new("not a url", Duration::from_secs(1)).is_err());
    }
}
