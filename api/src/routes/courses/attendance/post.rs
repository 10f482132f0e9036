use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{Value, json};

use crate::auth::AuthUser;
use crate::response::{ApiResponse, error_response};
use common::state::AppState;

use super::common::{
    AttendanceSessionResponse, CheckInReq, CheckInResponse, CreateSessionReq, KioskReq,
    RollCallReq,
};
use db::models::attendance_session::{Column as SessionCol, Entity as SessionEntity};
use db::models::check_in::Channel;
use db::models::user;
use services::ledger::{self, CheckInAttempt, RollCallEntry};
use services::session_registry::{self, NewSession};
use services::token::{self, QrPayload};
use services::{ServiceError, identity};

/// POST `/api/courses/{course_id}/attendance/sessions`
///
/// **Auth**: course faculty. Creates a Scheduled session.
pub async fn create_session(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<CreateSessionReq>,
) -> (StatusCode, Json<ApiResponse<Option<AttendanceSessionResponse>>>) {
    let coordinates = match (body.latitude, body.longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        (None, None) => None,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    "Latitude and longitude must be supplied together",
                )),
            );
        }
    };

    let params = NewSession {
        title: body.title,
        starts_at: body.starts_at,
        ends_at: body.ends_at,
        location_name: body.location_name,
        coordinates,
        channels: body.channels,
    };

    match session_registry::create_session(state.db(), course_id, claims.sub, params).await {
        Ok(row) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                Some(AttendanceSessionResponse::from(row)),
                "Attendance session created",
            )),
        ),
        Err(e) => error_response(&e),
    }
}

/// Loads the session scoped to its course, so a session id from another
/// course 404s instead of leaking.
async fn fetch_in_course(
    state: &AppState,
    course_id: i64,
    session_id: i64,
) -> Result<(), ServiceError> {
    SessionEntity::find()
        .filter(SessionCol::Id.eq(session_id))
        .filter(SessionCol::CourseId.eq(course_id))
        .one(state.db())
        .await?
        .map(|_| ())
        .ok_or(ServiceError::UnknownSession(session_id))
}

/// POST `/api/courses/{course_id}/attendance/sessions/{session_id}/activate`
///
/// **Auth**: course faculty. Scheduled → Active; mints a fresh token.
pub async fn activate_session(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<Option<AttendanceSessionResponse>>>) {
    if let Err(e) = fetch_in_course(&state, course_id, session_id).await {
        return error_response(&e);
    }

    match session_registry::activate(state.db(), session_id, Utc::now()).await {
        Ok(row) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(AttendanceSessionResponse::from(row)),
                "Attendance session activated",
            )),
        ),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/courses/{course_id}/attendance/sessions/{session_id}/token`
///
/// **Auth**: course faculty. Re-issues the token; the previous QR payload is
/// dead immediately.
pub async fn reissue_token(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<Option<AttendanceSessionResponse>>>) {
    if let Err(e) = fetch_in_course(&state, course_id, session_id).await {
        return error_response(&e);
    }

    match session_registry::reissue_token(state.db(), session_id, Utc::now()).await {
        Ok(row) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(AttendanceSessionResponse::from(row)),
                "Attendance token re-issued",
            )),
        ),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/courses/{course_id}/attendance/sessions/{session_id}/close`
///
/// **Auth**: course faculty. Terminal; all later check-ins are refused.
pub async fn close_session(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<Option<AttendanceSessionResponse>>>) {
    if let Err(e) = fetch_in_course(&state, course_id, session_id).await {
        return error_response(&e);
    }

    match session_registry::close(state.db(), session_id, Utc::now()).await {
        Ok(row) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(AttendanceSessionResponse::from(row)),
                "Attendance session closed",
            )),
        ),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/courses/{course_id}/attendance/sessions/{session_id}/check-in`
///
/// Student self check-in with a scanned QR payload. Validation and the
/// ledger append run in one request; the single-use permit minted in between
/// never leaves the server.
pub async fn check_in(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<CheckInReq>,
) -> (StatusCode, Json<ApiResponse<CheckInResponse>>) {
    let db = state.db();
    let now = Utc::now();

    // Only students of this course may check themselves in.
    let is_student = user::Model::is_in_role(db, claims.sub, course_id, "Student")
        .await
        .unwrap_or(false);
    if !is_student {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error(
                "Only enrolled students can check in to a session",
            )),
        );
    }

    let payload = match QrPayload::parse(&body.payload) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    let coordinates = match (body.latitude, body.longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    };

    let permit = match token::validate(
        db,
        state.permits(),
        session_id,
        claims.sub,
        &payload,
        now,
        coordinates,
    )
    .await
    {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    let attempt = CheckInAttempt {
        session_id,
        user_id: claims.sub,
        channel: Channel::Qr,
        permit_id: Some(permit.id),
        coordinates,
        recorded_by: None,
    };

    match ledger::record(db, state.permits(), attempt, now).await {
        Ok(rec) => (
            StatusCode::OK,
            Json(ApiResponse::success(rec.into(), "Attendance recorded")),
        ),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/courses/{course_id}/attendance/sessions/{session_id}/roll-call`
///
/// **Auth**: course faculty. Bulk manual check-in; one outcome per student,
/// duplicates never sink the batch.
pub async fn roll_call(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<RollCallReq>,
) -> (StatusCode, Json<ApiResponse<Vec<RollCallEntry>>>) {
    if body.student_ids.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("student_ids must not be empty")),
        );
    }

    if let Err(e) = fetch_in_course(&state, course_id, session_id).await {
        return error_response(&e);
    }

    match ledger::record_roll_call(
        state.db(),
        session_id,
        &body.student_ids,
        claims.sub,
        Utc::now(),
    )
    .await
    {
        Ok(entries) => (
            StatusCode::OK,
            Json(ApiResponse::success(entries, "Roll-call processed")),
        ),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/courses/{course_id}/attendance/sessions/{session_id}/kiosk`
///
/// Walk-up kiosk check-in: resolves a typed name or student number against
/// the course roster, then records on the kiosk (or card) channel. An
/// ambiguous query returns the candidate pick-list instead of guessing.
pub async fn kiosk_check_in(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, i64)>,
    Json(body): Json<KioskReq>,
) -> (StatusCode, Json<ApiResponse<Value>>) {
    let db = state.db();
    let now = Utc::now();

    let channel = body.channel.unwrap_or(Channel::Kiosk);
    if !matches!(channel, Channel::Kiosk | Channel::Card) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                "Kiosk terminals record on the kiosk or card channel only",
            )),
        );
    }

    if let Err(e) = fetch_in_course(&state, course_id, session_id).await {
        return error_response(&e);
    }

    let student = match identity::resolve(db, course_id, &body.query).await {
        Ok(s) => s,
        Err(ServiceError::AmbiguousMatch { candidates }) => {
            return (
                StatusCode::CONFLICT,
                Json(ApiResponse {
                    success: false,
                    data: json!({ "candidates": candidates }),
                    message: "Several students match; pick one".into(),
                }),
            );
        }
        Err(e) => return error_response(&e),
    };

    let attempt = CheckInAttempt {
        session_id,
        user_id: student.id,
        channel,
        permit_id: None,
        coordinates: None,
        recorded_by: None,
    };

    match ledger::record(db, state.permits(), attempt, now).await {
        Ok(rec) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                json!({
                    "student": { "id": student.id, "name": student.name, "username": student.username },
                    "status": rec.status,
                    "taken_at": rec.taken_at.to_rfc3339(),
                }),
                format!("Welcome, {}", student.name),
            )),
        ),
        Err(e) => error_response(&e),
    }
}
