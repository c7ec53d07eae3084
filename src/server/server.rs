use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use prometheus::Registry;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::settings::{MetricsConfig, ServerConfig};
use crate::helpers::context::CallContext;
use crate::observability::routes::MetricsState;
use crate::wrapper::TransportWrapper;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub wrapper: TransportWrapper,
    pub freshness: Duration,
}

impl AppState {
    pub fn new(registry: Registry, wrapper: TransportWrapper, freshness: Duration) -> Self {
        Self {
            metrics_state: MetricsState::new(registry),
            wrapper,
            freshness,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct TokenQuery {
    /// minimum remaining lifetime in seconds, overrides the configured window
    pub freshness: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenBody {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Router with the token route and, when enabled, the metrics route.
pub fn router(
    state: AppState,
    server_config: &ServerConfig,
    metrics_config: Option<&MetricsConfig>,
) -> Router {
    let mut app = Router::new().route(server_config.token_path.as_str(), get(get_token));
    if let Some(metrics_config) = metrics_config {
        app = app.merge(state.metrics_state.router(metrics_config));
    }
    app.with_state(state)
}

async fn get_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Response {
    let freshness = query
        .freshness
        .map(Duration::from_secs)
        .unwrap_or(state.freshness);
    match state
        .wrapper
        .get_token(&CallContext::background(), Some(freshness))
        .await
    {
        Ok(tokens) => {
            let body = TokenBody {
                access_token: tokens.access,
                refresh_token: Some(tokens.refresh).filter(|t| !t.is_empty()),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            warn!("can't get tokens: {}", e);
            let body = ErrorBody {
                error: e.to_string(),
            };
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
    }
}

/// Serves the token and metrics routes until the process receives ctrl-c.
pub async fn start(
    state: AppState,
    server_config: &ServerConfig,
    metrics_config: Option<&MetricsConfig>,
) -> Result<()> {
    let app = router(state, server_config, metrics_config);

    let bind_addr = format!("{}:{}", server_config.host, server_config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("can't bind '{}'", bind_addr))?;
    info!("listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tokio::signal::ctrl_c()))
        .await
        .context("server failed")?;

    Ok(())
}

/// Resolves once `signal` fires. If the signal handler can't be installed the
/// error is logged and the server keeps running.
async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutting down"),
        Err(e) => {
            error!("can't listen for shutdown signal, serving until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
