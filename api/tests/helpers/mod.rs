use axum::Router;

use api::routes::routes;
use common::state::AppState;

/// Fresh app over an in-memory database with migrations applied.
pub async fn make_test_app() -> (Router, AppState) {
    let db = db::test_utils::setup_test_db().await;
    let state = AppState::new(db);

    let app = Router::new()
        .nest("/api", routes(state.clone()))
        .with_state(state.clone());

    (app, state)
}
