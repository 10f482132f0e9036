use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;

use crate::response::ApiResponse;
use crate::routes::auth::ProfileResponse;
use common::state::AppState;
use db::models::user::{Column as UserCol, Entity as UserEntity};

#[derive(Deserialize)]
pub struct UsersQuery {
    /// Fuzzy match on name, username, or email.
    pub q: Option<String>,
}

/// GET `/api/users`
///
/// **Auth**: Admin. Lists accounts, optionally filtered by `q`.
pub async fn list_users(
    State(state): State<AppState>,
    Query(q): Query<UsersQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<ProfileResponse>>>) {
    let mut sel = UserEntity::find().order_by_asc(UserCol::Username);

    if let Some(needle) = q.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        sel = sel.filter(
            Condition::any()
                .add(UserCol::Name.contains(needle))
                .add(UserCol::Username.contains(needle))
                .add(UserCol::Email.contains(needle)),
        );
    }

    match sel.all(state.db()).await {
        Ok(users) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                users.into_iter().map(ProfileResponse::from).collect(),
                "Users retrieved",
            )),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Database error retrieving users")),
        ),
    }
}
