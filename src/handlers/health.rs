use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use super::quote::AppState;

/// GET /health - liveness probe
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// GET /ready - readiness probe; not ready until a price book with at
/// least one product is loaded
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let products = state.catalog.current().products.len();
    if products > 0 {
        (
            StatusCode::OK,
            Json(json!({ "status": "ready", "products": products })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "empty_catalog" })),
        )
    }
}
