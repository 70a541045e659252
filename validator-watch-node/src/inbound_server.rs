//! HTTP endpoint through which a chat transport forwards observer messages.
//!
//! `POST /commands` takes `{"observer_id", "text"}` and answers `{"reply"}`,
//! where `reply` is null when the message needs no answer. `GET /health`
//! answers `{"status": "ok"}`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use warp::http::StatusCode;
use warp::Filter;

use validator_watch_engine::CommandRouter;

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundCommand {
    pub observer_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandReply {
    pub reply: Option<String>,
}

pub fn routes(
    router: Arc<CommandRouter>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    let commands = warp::path!("commands")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_router(router))
        .and_then(command_handler);

    health.or(commands)
}

fn with_router(
    router: Arc<CommandRouter>,
) -> impl Filter<Extract = (Arc<CommandRouter>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || router.clone())
}

async fn command_handler(
    command: InboundCommand,
    router: Arc<CommandRouter>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if command.observer_id.trim().is_empty() {
        let body = serde_json::json!({ "error": "observer_id must not be empty" });
        return Ok(warp::reply::with_status(warp::reply::json(&body), StatusCode::BAD_REQUEST));
    }
    let reply = router.handle(command.observer_id.trim(), &command.text).await;
    Ok(warp::reply::with_status(
        warp::reply::json(&CommandReply { reply }),
        StatusCode::OK,
    ))
}

/// Serves until `shutdown` is cancelled. Port 0 picks a free port; the bound
/// address is returned.
pub fn start_inbound_server(
    port: u16,
    router: Arc<CommandRouter>,
    shutdown: CancellationToken,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let (addr, server) = warp::serve(routes(router))
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            shutdown.cancelled().await
        })
        .with_context(|| format!("Failed to bind inbound command server on port {}", port))?;

    log::info!("Inbound command server listening on http://{}", addr);
    let handle = tokio::spawn(server);
    Ok((addr, handle))
}
