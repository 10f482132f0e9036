//! HTTP route entry point for `/api/...`.
//!
//! Routes are organized by domain and protected via access-control
//! middleware at the router boundary — handlers never re-derive roles
//! themselves beyond what a specific flow demands.
//!
//! Route groups:
//! - `/health` → Health check endpoint (public)
//! - `/auth` → Login and current-profile endpoints
//! - `/users` → User management (admin-only)
//! - `/courses` → Courses, rosters, and attendance (authenticated users)
//! - `/me` → The caller's own attendance summary

use axum::{Router, middleware::from_fn};

use crate::auth::guards::{allow_admin, allow_authenticated};
use crate::routes::{
    auth::auth_routes, courses::courses_routes, health::health_routes, me::me_routes,
    users::users_routes,
};
use common::state::AppState;

pub mod auth;
pub mod courses;
pub mod health;
pub mod me;
pub mod users;

/// Builds the complete application router for all HTTP endpoints.
pub fn routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/health", health_routes())
        .nest("/auth", auth_routes())
        .nest("/users", users_routes().route_layer(from_fn(allow_admin)))
        .nest(
            "/courses",
            courses_routes(app_state.clone()).route_layer(from_fn(allow_authenticated)),
        )
        .nest("/me", me_routes().route_layer(from_fn(allow_authenticated)))
        .with_state(app_state)
}
