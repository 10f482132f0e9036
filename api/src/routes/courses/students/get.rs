use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::response::ApiResponse;
use crate::routes::auth::ProfileResponse;
use common::state::AppState;
use db::models::user_course_role::Model as RoleModel;

#[derive(Deserialize)]
pub struct RosterQuery {
    /// Fuzzy match on name or student number.
    pub q: Option<String>,
}

/// GET `/api/courses/{course_id}/students`
///
/// **Auth**: anyone assigned to the course. The roster the manual check-in
/// screen works from.
pub async fn list_students(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Query(q): Query<RosterQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<ProfileResponse>>>) {
    let roster = match RoleModel::enrolled_students(state.db(), course_id).await {
        Ok(r) => r,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error retrieving roster")),
            );
        }
    };

    let filtered: Vec<ProfileResponse> = match q.q.as_ref().map(|s| s.trim().to_lowercase()) {
        Some(needle) if !needle.is_empty() => roster
            .into_iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&needle)
                    || s.username.to_lowercase().contains(&needle)
            })
            .map(ProfileResponse::from)
            .collect(),
        _ => roster.into_iter().map(ProfileResponse::from).collect(),
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(filtered, "Roster retrieved")),
    )
}
