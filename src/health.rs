//! Health/status HTTP surface.
//!
//! An axum `Router` exposing liveness and per-job last-run bookkeeping, the
//! in-process counterpart of the `status` CLI command.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct HealthState {
    inner: Arc<RwLock<HealthInner>>,
}

#[derive(Default)]
struct HealthInner {
    last_discovery_at: Option<DateTime<Utc>>,
    last_pre_start_at: Option<DateTime<Utc>>,
    last_midnight_at: Option<DateTime<Utc>>,
    consecutive_errors: usize,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_discovery(&self) {
        self.inner.write().await.last_discovery_at = Some(Utc::now());
        self.reset_errors().await;
    }

    pub async fn record_pre_start(&self) {
        self.inner.write().await.last_pre_start_at = Some(Utc::now());
        self.reset_errors().await;
    }

    pub async fn record_midnight(&self) {
        self.inner.write().await.last_midnight_at = Some(Utc::now());
        self.reset_errors().await;
    }

    pub async fn record_error(&self) {
        self.inner.write().await.consecutive_errors += 1;
    }

    async fn reset_errors(&self) {
        self.inner.write().await.consecutive_errors = 0;
    }
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

pub async fn serve(state: HealthState, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("health endpoint listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler(State(state): State<HealthState>) -> (StatusCode, Json<serde_json::Value>) {
    let inner = state.inner.read().await;
    let status = if inner.consecutive_errors > 5 { "degraded" } else { "ok" };
    let http_status = if inner.consecutive_errors > 10 {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (
        http_status,
        Json(json!({
            "service": "oddspattern-engine",
            "status": status,
            "consecutive_errors": inner.consecutive_errors,
        })),
    )
}

async fn status_handler(State(state): State<HealthState>) -> Json<serde_json::Value> {
    let inner = state.inner.read().await;
    Json(json!({
        "last_discovery_at": inner.last_discovery_at.map(|t| t.to_rfc3339()),
        "last_pre_start_at": inner.last_pre_start_at.map(|t| t.to_rfc3339()),
        "last_midnight_at": inner.last_midnight_at.map(|t| t.to_rfc3339()),
        "consecutive_errors": inner.consecutive_errors,
    }))
}

/// Wall-clock elapsed since `start`, for logging a tick's duration.
pub fn elapsed_ms(start: Instant) -> u128 {
    start.elapsed().as_millis()
}
