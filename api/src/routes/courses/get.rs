use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::common::CourseResponse;
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use common::state::AppState;
use db::models::course::Model as CourseModel;

/// GET `/api/courses`
///
/// Admins see every course; everyone else sees the courses they hold a role
/// in.
pub async fn list_courses(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Vec<CourseResponse>>>) {
    let db = state.db();

    let result = if claims.admin {
        CourseModel::get_all(db).await
    } else {
        CourseModel::for_user(db, claims.sub).await
    };

    match result {
        Ok(courses) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                courses.into_iter().map(CourseResponse::from).collect(),
                "Courses retrieved",
            )),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Database error retrieving courses")),
        ),
    }
}

/// GET `/api/courses/{course_id}`
///
/// **Auth**: anyone assigned to the course (router layer).
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Option<CourseResponse>>>) {
    match CourseModel::get_by_id(state.db(), course_id).await {
        Ok(Some(course)) => (
            StatusCode::OK,
            Json(ApiResponse::success(Some(course.into()), "Course retrieved")),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Course not found")),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Database error retrieving course")),
        ),
    }
}
