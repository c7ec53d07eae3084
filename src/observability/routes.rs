use std::sync::Arc;

use axum::routing::get;
use axum::{extract::State, response::IntoResponse, Router};
use http::{header::CONTENT_TYPE, StatusCode};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::error;

use crate::config::settings::MetricsConfig;
use crate::server::server::AppState;

#[derive(Clone)]
pub struct MetricsState {
    pub registry: Arc<Registry>,
}

impl MetricsState {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn router(&self, metrics_config: &MetricsConfig) -> Router<AppState> {
        let mut router = Router::new();
        if metrics_config.is_enabled {
            router = router.route(metrics_config.path.as_str(), get(get_metrics));
        }
        router
    }
}

async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics_state.registry.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("can't encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(CONTENT_TYPE, "text/plain")],
            String::new(),
        );
    }

    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        String::from_utf8_lossy(&buffer).into_owned(),
    )
}
