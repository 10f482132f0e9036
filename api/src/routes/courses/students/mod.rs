use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};

use crate::auth::guards::{allow_assigned_to_course, allow_faculty};
use common::state::AppState;

mod delete;
mod get;
mod post;

pub use delete::remove_member;
pub use get::list_students;
pub use post::add_member;

pub fn students_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_students).route_layer(from_fn_with_state(
                app_state.clone(),
                allow_assigned_to_course,
            )),
        )
        .route(
            "/",
            post(add_member).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)),
        )
        .route(
            "/{user_id}",
            delete(remove_member).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)),
        )
        .with_state(app_state)
}
