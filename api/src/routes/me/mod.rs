use axum::{Router, routing::get};

use common::state::AppState;

mod attendance;

pub use attendance::my_attendance;

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/attendance", get(my_attendance))
}
