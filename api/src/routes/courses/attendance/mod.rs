use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::auth::guards::{allow_assigned_to_course, allow_faculty};
use ::common::state::AppState;

mod common;
mod get;
mod post;

pub use get::{
    export_session_records, get_session, get_session_qr, get_session_summary,
    list_session_records, list_sessions,
};
pub use post::{
    activate_session, check_in, close_session, create_session, kiosk_check_in, reissue_token,
    roll_call,
};

pub fn attendance_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).route_layer(from_fn_with_state(app_state.clone(), allow_assigned_to_course)))
        .route("/sessions", post(create_session).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)))
        .route("/sessions/{session_id}", get(get_session).route_layer(from_fn_with_state(app_state.clone(), allow_assigned_to_course)))
        .route("/sessions/{session_id}/activate", post(activate_session).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)))
        .route("/sessions/{session_id}/token", post(reissue_token).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)))
        .route("/sessions/{session_id}/close", post(close_session).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)))
        .route("/sessions/{session_id}/qr", get(get_session_qr).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)))
        .route("/sessions/{session_id}/check-in", post(check_in))
        .route("/sessions/{session_id}/roll-call", post(roll_call).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)))
        .route("/sessions/{session_id}/kiosk", post(kiosk_check_in))
        .route("/sessions/{session_id}/records", get(list_session_records).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)))
        .route("/sessions/{session_id}/records/export", get(export_session_records).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)))
        .route("/sessions/{session_id}/summary", get(get_session_summary).route_layer(from_fn_with_state(app_state.clone(), allow_assigned_to_course)))
        .with_state(app_state)
}
