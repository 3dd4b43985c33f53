//! API router.
//!
//! Combines the routers of all feature modules into the versioned API
//! surface served by `main`.

use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::shared::state::AppState;

/// All API routes from all modules, mounted under /api/v1 by the caller.
pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::auth::configure())
        .merge(crate::orgs::configure())
        .merge(crate::contacts::configure())
        .merge(crate::deals::configure())
        .merge(crate::tasks::configure())
        .merge(crate::activities::configure())
        .merge(crate::analytics::configure())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", configure_api_routes())
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_health() -> Result<Json<serde_json::Value>, StatusCode> {
    Ok(Json(
        serde_json::json!({"status": "healthy", "timestamp": chrono::Utc::now().to_rfc3339()}),
    ))
}
