use axum::{Json, extract::State, http::StatusCode};

use super::post::ProfileResponse;
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use common::state::AppState;
use db::models::user::Model as UserModel;

/// GET `/api/auth/me`
///
/// Profile of the authenticated caller.
pub async fn me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> (StatusCode, Json<ApiResponse<Option<ProfileResponse>>>) {
    match UserModel::get_by_id(state.db(), claims.sub).await {
        Ok(Some(user)) => (
            StatusCode::OK,
            Json(ApiResponse::success(Some(user.into()), "Profile retrieved")),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("User no longer exists")),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Database error retrieving profile")),
        ),
    }
}
