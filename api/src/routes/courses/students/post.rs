use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sea_orm::SqlErr;
use serde::Deserialize;

use crate::response::ApiResponse;
use common::state::AppState;
use db::models::user::Model as UserModel;
use db::models::user_course_role::{Model as RoleModel, Role};

#[derive(Deserialize)]
pub struct AddMemberReq {
    pub user_id: i64,
    /// Defaults to enrolling as a student.
    pub role: Option<Role>,
}

/// POST `/api/courses/{course_id}/students`
///
/// **Auth**: course faculty (admins pass the guard too). Enrolls a student
/// or assigns faculty to the course.
pub async fn add_member(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Json(body): Json<AddMemberReq>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    let db = state.db();

    match UserModel::get_by_id(db, body.user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("User not found")),
            );
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error looking up user")),
            );
        }
    }

    let role = body.role.unwrap_or(Role::Student);
    match RoleModel::assign_user_to_course(db, body.user_id, course_id, role).await {
        Ok(_) => (
            StatusCode::CREATED,
            Json(ApiResponse::success((), "Course membership added")),
        ),
        Err(e) => match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => (
                StatusCode::CONFLICT,
                Json(ApiResponse::error("User already holds a role in this course")),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to add course membership")),
            ),
        },
    }
}
