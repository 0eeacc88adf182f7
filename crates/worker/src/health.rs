use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::services::Services;

#[derive(Debug, Serialize)]
pub struct CacheCounts {
    pub profiles: usize,
    pub dirty_profiles: usize,
    pub guilds: usize,
    pub users: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub cache: CacheCounts,
}

/// GET /health -- backing store reachability and cache sizes.
async fn health_check(State(services): State<Services>) -> Json<HealthResponse> {
    let db_healthy = services.backend.ping().await.is_ok();
    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        cache: CacheCounts {
            profiles: services.profiles.len().await,
            dirty_profiles: services.profiles.dirty_count().await,
            guilds: services.guilds.len().await,
            users: services.users.len().await,
        },
    })
}

pub fn router(services: Services) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(services)
}
