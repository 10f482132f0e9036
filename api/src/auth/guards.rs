use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use sea_orm::DatabaseConnection;
use std::collections::{HashMap, HashSet};

use crate::auth::claims::AuthUser;
use crate::response::ApiResponse;
use common::{config, state::AppState};
use db::models::user;

// --- Superuser ---
use once_cell::sync::Lazy;

pub static SUPERUSER_IDS: Lazy<HashSet<i64>> =
    Lazy::new(|| config::super_users().into_iter().collect());

pub async fn is_superuser(user_id: i64) -> bool {
    SUPERUSER_IDS.contains(&user_id)
}

// --- Role Based Access Guards ---

#[derive(serde::Serialize, Default)]
pub struct Empty;

/// Helper to extract, validate user from request extensions and insert them back into the request
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), (StatusCode, Json<ApiResponse<Empty>>)> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Authentication required")),
            )
        })?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Helper to check if user has any of the specified roles
async fn user_has_any_role(
    db: &DatabaseConnection,
    user_id: i64,
    course_id: i64,
    roles: &[&str],
) -> bool {
    if roles.is_empty() {
        // No roles specified -> deny (fail-safe)
        return false;
    }

    for role in roles {
        match user::Model::is_in_role(db, user_id, course_id, role).await {
            Ok(true) => return true,
            Ok(false) => continue,
            Err(e) => {
                // Log and deny on DB error (fail-safe)
                tracing::warn!(
                    error = %e,
                    user_id, course_id, role,
                    "DB error while checking role; denying access"
                );
                return false;
            }
        }
    }
    false
}

/// Basic guard to ensure the request is authenticated.
pub async fn allow_authenticated(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, _user) = extract_and_insert_authuser(req).await?;

    Ok(next.run(req).await)
}

/// Admin-only guard.
pub async fn allow_admin(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    if !user.0.admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Admin access required")),
        ));
    }

    Ok(next.run(req).await)
}

/// Base role-based access guard that other guards can build upon
async fn allow_role_base(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
    required_roles: &[&str],
    failure_msg: &str,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let db: &DatabaseConnection = app_state.db();

    let (req, user) = extract_and_insert_authuser(req).await?;

    let course_id = params
        .get("course_id")
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Missing or invalid course_id")),
        ))?;

    if user.0.admin {
        return Ok(next.run(req).await);
    }

    if is_superuser(user.0.sub).await {
        return Ok(next.run(req).await);
    }

    if user_has_any_role(db, user.0.sub, course_id, required_roles).await {
        Ok(next.run(req).await)
    } else {
        Err((StatusCode::FORBIDDEN, Json(ApiResponse::error(failure_msg))))
    }
}

/// Guard for course faculty only.
pub async fn allow_faculty(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    allow_role_base(
        State(app_state),
        Path(params),
        req,
        next,
        &["Faculty"],
        "Faculty access required for this course",
    )
    .await
}

/// Guard for anyone assigned to the course (faculty or enrolled student).
pub async fn allow_assigned_to_course(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    allow_role_base(
        State(app_state),
        Path(params),
        req,
        next,
        &["Faculty", "Student"],
        "You are not assigned to this course",
    )
    .await
}
