use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::generate_jwt;
use crate::response::ApiResponse;
use common::state::AppState;
use db::models::user::Model as UserModel;

#[derive(Deserialize)]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Default)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
    pub user: Option<ProfileResponse>,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub department: Option<String>,
    pub admin: bool,
}

impl From<UserModel> for ProfileResponse {
    fn from(u: UserModel) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            name: u.name,
            department: u.department,
            admin: u.admin,
        }
    }
}

/// POST `/api/auth/login`
///
/// Verifies credentials and issues a JWT. A wrong username and a wrong
/// password answer identically.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginReq>,
) -> (StatusCode, Json<ApiResponse<LoginResponse>>) {
    let db = state.db();

    let user = match UserModel::find_by_username(db, &body.username).await {
        Ok(found) => found,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error during login")),
            );
        }
    };

    let Some(user) = user.filter(|u| u.verify_password(&body.password)) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Invalid username or password")),
        );
    };

    let (token, expires_at) = generate_jwt(user.id, user.admin);

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            LoginResponse {
                token,
                expires_at,
                user: Some(user.into()),
            },
            "Login successful",
        )),
    )
}
