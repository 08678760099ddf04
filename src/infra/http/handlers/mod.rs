pub mod admin;
pub mod interactions;
pub mod posts;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::models::HealthResponse;
use super::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.health.healthy().await {
        (StatusCode::OK, Json(HealthResponse { status: "ok" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
            }),
        )
    }
}
