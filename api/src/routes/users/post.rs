use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use validator::Validate;

use crate::response::ApiResponse;
use crate::routes::auth::ProfileResponse;
use common::state::AppState;
use db::models::user::Model as UserModel;

#[derive(Deserialize, Validate)]
pub struct CreateUserReq {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(email(message = "email must be valid"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub department: Option<String>,
    #[serde(default)]
    pub admin: bool,
}

/// POST `/api/users`
///
/// **Auth**: Admin. Creates a student or staff account.
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserReq>,
) -> (StatusCode, Json<ApiResponse<Option<ProfileResponse>>>) {
    if let Err(errors) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(errors.to_string())),
        );
    }

    match UserModel::create(
        state.db(),
        &body.username,
        &body.email,
        &body.password,
        body.admin,
        &body.name,
        body.department.as_deref(),
    )
    .await
    {
        Ok(user) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(Some(user.into()), "User created")),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!("Failed to create user: {e}"))),
        ),
    }
}
