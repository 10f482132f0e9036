use axum::{
    Router,
    routing::{get, post},
};

use common::state::AppState;

mod get;
mod post;

pub use get::list_users;
pub use post::create_user;

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/", post(create_user))
}
