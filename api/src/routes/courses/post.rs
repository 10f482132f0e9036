use axum::{Json, extract::State, http::StatusCode};

use super::common::{CourseResponse, CreateCourseReq};
use crate::response::ApiResponse;
use common::state::AppState;
use db::models::course::Model as CourseModel;

/// POST `/api/courses`
///
/// **Auth**: Admin. Registers a course offering.
pub async fn create_course(
    State(state): State<AppState>,
    Json(body): Json<CreateCourseReq>,
) -> (StatusCode, Json<ApiResponse<Option<CourseResponse>>>) {
    if body.code.trim().is_empty() || body.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Course code and name are required")),
        );
    }

    match CourseModel::create(
        state.db(),
        body.code.trim(),
        body.name.trim(),
        &body.department,
        body.year,
    )
    .await
    {
        Ok(course) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(Some(course.into()), "Course created")),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!("Failed to create course: {e}"))),
        ),
    }
}
