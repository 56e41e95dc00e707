//! HTTP server: health probe and the Slack Events API endpoint.

use crate::config::Config;
use crate::dispatch::{DispatchError, EventDispatcher, Outcome, IGNORED_BOT_BODY};
use crate::store;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

const CHALLENGE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Shared state for request handlers.
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<EventDispatcher>,
}

impl ServerState {
    pub fn new(config: Config, dispatcher: EventDispatcher) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Routes: `GET /` health and `POST {gateway.eventsPath}` events.
pub fn router(state: ServerState) -> Router {
    let events_path = state.config.gateway.events_path.clone();
    Router::new()
        .route("/", get(health_http))
        .route(&events_path, post(slack_events))
        .with_state(state)
}

/// Run the server on config.gateway.bind:config.gateway.port until SIGINT/SIGTERM.
/// `config_path` anchors relative store paths.
pub async fn run_server(config: Config, config_path: PathBuf) -> Result<()> {
    let path = config.gateway.events_path.as_str();
    if !path.starts_with('/') || path == "/" {
        anyhow::bail!(
            "gateway.eventsPath must be an absolute path other than \"/\" (got {:?})",
            path
        );
    }
    let store = store::open_store(&config, &config_path)?;
    let dispatcher = EventDispatcher::new(store, config.store.collection.clone());
    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let events_path = config.gateway.events_path.clone();
    let app = router(ServerState::new(config, dispatcher));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("listening on {} (events at {})", bind_addr, events_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited")?;
    log::info!("server stopped");
    Ok(())
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST {eventsPath}: read the whole body, dispatch it, map the outcome to a response.
async fn slack_events(State(state): State<ServerState>, body: Body) -> Response {
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            log::debug!("events: reading request body failed: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    match state.dispatcher.dispatch(&body).await {
        Ok(Outcome::Challenge(challenge)) => {
            ([(header::CONTENT_TYPE, CHALLENGE_CONTENT_TYPE)], challenge).into_response()
        }
        Ok(Outcome::IgnoredBot) => (StatusCode::OK, IGNORED_BOT_BODY).into_response(),
        Ok(Outcome::Persisted) | Ok(Outcome::Acknowledged) => StatusCode::OK.into_response(),
        Err(e @ DispatchError::Persistence(_)) => {
            log::error!("events: {}", e);
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            (status, status.canonical_reason().unwrap_or_default()).into_response()
        }
        Err(e) => {
            log::warn!("events: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<ServerState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "eventsPath": state.config.gateway.events_path,
    }))
}
