use axum::{Json, Router, http::StatusCode, routing::get};
use serde_json::{Value, json};

use crate::response::ApiResponse;
use common::state::AppState;

/// GET `/api/health`
///
/// Liveness probe; carries the project name so a load balancer page shows
/// what answered.
async fn health() -> (StatusCode, Json<ApiResponse<Value>>) {
    (
        StatusCode::OK,
        Json(ApiResponse::success(
            json!({ "service": common::config::project_name() }),
            "ok",
        )),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health))
}
