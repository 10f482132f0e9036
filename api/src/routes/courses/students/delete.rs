use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::response::ApiResponse;
use common::state::AppState;
use db::models::user_course_role::Model as RoleModel;

/// DELETE `/api/courses/{course_id}/students/{user_id}`
///
/// **Auth**: course faculty. Removes the member's role row; their historical
/// check-ins stay in the ledger.
pub async fn remove_member(
    State(state): State<AppState>,
    Path((course_id, user_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match RoleModel::remove_user_from_course(state.db(), user_id, course_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success((), "Course membership removed")),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Failed to remove course membership")),
        ),
    }
}
