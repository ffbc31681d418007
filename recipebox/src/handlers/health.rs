use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// Liveness probe. Pings the store so a dead database shows up here too.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_status = match state.db.ping().await {
        Ok(()) => "Connected",
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the store");
            "Disconnected"
        }
    };

    let response = HealthResponse {
        status: "Recipe Box is healthy".to_string(),
        database: db_status.to_string(),
    };

    (StatusCode::OK, Json(response))
}
