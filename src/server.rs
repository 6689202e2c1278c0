use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    config::ScanConfig,
    directory::InstanceDirectory,
    inspector::SchemaInspector,
    scanner,
    types::Endpoint,
};

/// Process-wide collaborators for the HTTP entrypoint. The scan itself is
/// stateless: each request builds its own configuration and runs to
/// completion before responding.
#[derive(Clone)]
pub struct AppState {
    pub config: ScanConfig,
    pub directory: Arc<dyn InstanceDirectory>,
    pub inspector: Arc<dyn SchemaInspector>,
}

/// Per-request overrides. Anything omitted falls back to the process config;
/// an inline `endpoints` list bypasses the instance directory entirely.
#[derive(Debug, Deserialize, Default)]
pub struct ScanRequest {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub max_schema_count: Option<i64>,
    #[serde(default)]
    pub host_prefix: Option<String>,
    #[serde(default)]
    pub schema_marker: Option<String>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

pub async fn spawn_server(bind: &str, state: AppState) -> Result<()> {
    let app = Router::new()
        .route("/api/healthz", get(get_healthz))
        .route("/api/scan", post(post_scan))
        .with_state(state);

    info!(bind, "serving scan API");
    axum::serve(tokio::net::TcpListener::bind(bind).await?, app).await?;
    Ok(())
}

async fn get_healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn post_scan(State(app): State<AppState>, Json(req): Json<ScanRequest>) -> impl IntoResponse {
    let mut config = app.config.clone();
    if let Some(max) = req.max_schema_count {
        config.max_schema_count = max;
    }
    if let Some(prefix) = req.host_prefix {
        config.host_prefix = prefix;
    }
    if let Some(marker) = req.schema_marker {
        config.schema_marker = marker;
    }
    if let Some(concurrency) = req.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(ms) = req.timeout_ms {
        config.inspect_timeout = Duration::from_millis(ms);
    }
    if let Err(e) = config.validate() {
        return (StatusCode::BAD_REQUEST, format!("invalid scan request: {e}")).into_response();
    }

    let endpoints = if req.endpoints.is_empty() {
        match app.directory.list_endpoints().await {
            Ok(eps) => eps,
            Err(e) => {
                error!(error = %e, "instance directory unreachable");
                return (StatusCode::BAD_GATEWAY, format!("directory error: {e}")).into_response();
            }
        }
    } else {
        req.endpoints
    };

    match scanner::scan(&endpoints, app.inspector.clone(), &config).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, format!("invalid scan request: {e}")).into_response(),
    }
}
