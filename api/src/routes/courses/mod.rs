use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::auth::guards::{allow_admin, allow_assigned_to_course};
use ::common::state::AppState;

pub mod attendance;
mod common;
mod get;
mod post;
pub mod students;

pub use get::{get_course, list_courses};
pub use post::create_course;

pub fn courses_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_course).route_layer(from_fn(allow_admin)))
        .route("/", get(list_courses))
        .route(
            "/{course_id}",
            get(get_course).route_layer(from_fn_with_state(
                app_state.clone(),
                allow_assigned_to_course,
            )),
        )
        .nest(
            "/{course_id}/students",
            students::students_routes(app_state.clone()),
        )
        .nest(
            "/{course_id}/attendance",
            attendance::attendance_routes(app_state.clone()),
        )
        .with_state(app_state)
}
