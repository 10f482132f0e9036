//! Attendance: read-only routes (list sessions, get session, fetch the
//! current QR payload, list records, export rows, summaries).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;

use crate::response::{ApiResponse, error_response};
use common::state::AppState;

use super::common::{
    AttendanceRecordDto, AttendanceSessionResponse, ListQuery, ListResponse, QrResponse,
    RecordsListQuery, RecordsListResponse,
};
use db::models::attendance_session::{
    Column as SessionCol, Entity as SessionEntity, Model as Session,
};
use db::models::check_in::{Column as RecordCol, Entity as RecordEntity};
use db::models::user::{Column as UserCol, Entity as UserEntity};
use db::models::user_course_role::Model as RoleModel;
use services::aggregator::{self, ExportRow, SessionSummary};
use services::token::QrPayload;

async fn checked_in_count(db: &sea_orm::DatabaseConnection, session_id: i64) -> i64 {
    RecordEntity::find()
        .filter(RecordCol::SessionId.eq(session_id))
        .count(db)
        .await
        .unwrap_or(0) as i64
}

/// GET `/api/courses/{course_id}/attendance/sessions`
///
/// List attendance sessions for a course.
///
/// **Auth**: any user assigned to the course (router layer).
///
/// **Query**:
/// - `q` *(optional)*: fuzzy match on title
/// - `status` *(optional)*: `scheduled` | `active` | `closed`
/// - `sort` *(optional)*: `created_at` | `title` | `starts_at` (prefix `-` for desc)
/// - `page` *(default 1)*
/// - `per_page` *(default 20, max 100)*
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Query(q): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<ListResponse>>) {
    let db = state.db();
    let page = q.page.unwrap_or(1).max(1) as u64;
    let per_page = q.per_page.unwrap_or(20).clamp(1, 100) as u64;

    let mut sel = SessionEntity::find().filter(SessionCol::CourseId.eq(course_id));
    if let Some(s) = q.q.as_ref().filter(|s| !s.trim().is_empty()) {
        sel = sel.filter(SessionCol::Title.contains(s));
    }
    if let Some(status) = q.status.clone() {
        sel = sel.filter(SessionCol::Status.eq(status));
    }
    sel = match q.sort.as_deref() {
        Some(sort) if sort.starts_with('-') => match &sort[1..] {
            "created_at" => sel.order_by_desc(SessionCol::CreatedAt),
            "title" => sel.order_by_desc(SessionCol::Title),
            "starts_at" => sel.order_by_desc(SessionCol::StartsAt),
            _ => sel.order_by_desc(SessionCol::CreatedAt),
        },
        Some("created_at") => sel.order_by_asc(SessionCol::CreatedAt),
        Some("title") => sel.order_by_asc(SessionCol::Title),
        Some("starts_at") => sel.order_by_asc(SessionCol::StartsAt),
        _ => sel.order_by_desc(SessionCol::CreatedAt),
    };

    let paginator = sel.paginate(db, per_page);
    let total = paginator.num_items().await.unwrap_or(0) as i32;
    let rows: Vec<Session> = paginator
        .fetch_page(page.saturating_sub(1))
        .await
        .unwrap_or_default();

    let student_count = RoleModel::student_count(db, course_id).await.unwrap_or(0);

    let mut sessions = Vec::with_capacity(rows.len());
    for s in rows {
        let attended = checked_in_count(db, s.id).await;
        sessions.push(AttendanceSessionResponse::from_with_counts(
            s,
            attended,
            student_count,
        ));
    }

    let resp = ListResponse {
        sessions,
        page: page as i32,
        per_page: per_page as i32,
        total,
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(resp, "Attendance sessions retrieved")),
    )
}

/// GET `/api/courses/{course_id}/attendance/sessions/{session_id}`
///
/// Fetch a single attendance session with counts.
///
/// **Auth**: any user assigned to the course.
pub async fn get_session(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<Option<AttendanceSessionResponse>>>) {
    let db = state.db();

    let m = SessionEntity::find()
        .filter(
            Condition::all()
                .add(SessionCol::Id.eq(session_id))
                .add(SessionCol::CourseId.eq(course_id)),
        )
        .one(db)
        .await;

    match m {
        Ok(Some(row)) => {
            let student_count = RoleModel::student_count(db, course_id).await.unwrap_or(0);
            let attended = checked_in_count(db, session_id).await;
            let resp = AttendanceSessionResponse::from_with_counts(row, attended, student_count);

            (
                StatusCode::OK,
                Json(ApiResponse::success(
                    Some(resp),
                    "Attendance session retrieved",
                )),
            )
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Attendance session not found")),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(
                "Database error retrieving attendance session",
            )),
        ),
    }
}

/// GET `/api/courses/{course_id}/attendance/sessions/{session_id}/qr`
///
/// The **current QR payload** for an active session, ready to render as an
/// image on the projector screen.
///
/// **Auth**: course faculty.
///
/// **Notes**:
/// - Returns `409` while the session is not active.
pub async fn get_session_qr(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<Option<QrResponse>>>) {
    let db = state.db();

    let Some(sess) = SessionEntity::find()
        .filter(SessionCol::Id.eq(session_id))
        .filter(SessionCol::CourseId.eq(course_id))
        .one(db)
        .await
        .ok()
        .flatten()
    else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Attendance session not found")),
        );
    };

    match QrPayload::for_session(&sess, Utc::now()) {
        Ok(payload) => {
            let resp = QrResponse {
                payload: payload.encode(),
                token_expires_at: sess
                    .token_expires_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            };
            (
                StatusCode::OK,
                Json(ApiResponse::success(Some(resp), "Current QR payload")),
            )
        }
        Err(e) => error_response(&e),
    }
}

/// GET `/api/courses/{course_id}/attendance/sessions/{session_id}/records`
///
/// List **accepted check-ins** for a session with pagination, sorting, and
/// search.
///
/// **Auth**: course faculty (router layer).
pub async fn list_session_records(
    State(state): State<AppState>,
    Path((_, session_id)): Path<(i64, i64)>,
    Query(q): Query<RecordsListQuery>,
) -> (StatusCode, Json<ApiResponse<Option<RecordsListResponse>>>) {
    let db = state.db();

    let page = q.page.unwrap_or(1).max(1) as u64;
    let per_page = q.per_page.unwrap_or(20).clamp(1, 200) as u64;

    let mut sel = RecordEntity::find().filter(RecordCol::SessionId.eq(session_id));

    if let Some(raw) = q
        .q
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        if let Ok(uid) = raw.parse::<i64>() {
            sel = sel.filter(RecordCol::UserId.eq(uid));
        } else {
            // name or student number contains → resolve user_ids and filter
            let name_ids: Vec<i64> = UserEntity::find()
                .filter(
                    Condition::any()
                        .add(UserCol::Name.contains(&raw))
                        .add(UserCol::Username.contains(&raw)),
                )
                .all(db)
                .await
                .unwrap_or_default()
                .into_iter()
                .map(|u| u.id)
                .collect();
            sel = sel.filter(RecordCol::UserId.is_in(name_ids));
        }
    }

    sel = match q.sort.as_deref() {
        Some(sort) if sort.starts_with('-') => match &sort[1..] {
            "taken_at" => sel.order_by_desc(RecordCol::TakenAt),
            "user_id" => sel.order_by_desc(RecordCol::UserId),
            _ => sel.order_by_desc(RecordCol::TakenAt),
        },
        Some("user_id") => sel.order_by_asc(RecordCol::UserId),
        _ => sel.order_by_asc(RecordCol::TakenAt), // default: check-in order
    };

    let paginator = sel.paginate(db, per_page);
    let total = paginator.num_items().await.unwrap_or(0) as i32;
    let rows = paginator
        .fetch_page(page.saturating_sub(1))
        .await
        .unwrap_or_default();

    // Resolve identities only for the page results
    let user_ids: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
    let mut ident_map = HashMap::<i64, (String, String)>::new();
    if !user_ids.is_empty() {
        let users = UserEntity::find()
            .filter(UserCol::Id.is_in(user_ids))
            .all(db)
            .await
            .unwrap_or_default();
        for u in users {
            ident_map.insert(u.id, (u.username, u.name));
        }
    }

    let records = rows
        .into_iter()
        .map(|r| {
            let ident = ident_map.get(&r.user_id);
            AttendanceRecordDto {
                session_id,
                user_id: r.user_id,
                username: ident.map(|(u, _)| u.clone()),
                name: ident.map(|(_, n)| n.clone()),
                taken_at: r.taken_at.to_rfc3339(),
                channel: r.channel,
                status: r.status,
                recorded_by: r.recorded_by,
            }
        })
        .collect::<Vec<_>>();

    let resp = RecordsListResponse {
        records,
        page: page as i32,
        per_page: per_page as i32,
        total,
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            Some(resp),
            "Attendance records retrieved",
        )),
    )
}

/// GET `/api/courses/{course_id}/attendance/sessions/{session_id}/records/export`
///
/// Flat export rows for one session: student name and number, check-in time,
/// status, channel. Rendering (CSV, spreadsheet) is the consumer's concern.
///
/// **Auth**: course faculty.
pub async fn export_session_records(
    State(state): State<AppState>,
    Path((_, session_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<Vec<ExportRow>>>) {
    match aggregator::export_rows(state.db(), session_id).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(ApiResponse::success(rows, "Attendance export generated")),
        ),
        Err(e) => error_response(&e),
    }
}

/// GET `/api/courses/{course_id}/attendance/sessions/{session_id}/summary`
///
/// Aggregated per-session counts: by channel, present/late, absent.
///
/// **Auth**: any user assigned to the course.
pub async fn get_session_summary(
    State(state): State<AppState>,
    Path((_, session_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<Option<SessionSummary>>>) {
    match aggregator::session_summary(state.db(), session_id).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(summary),
                "Session summary computed",
            )),
        ),
        Err(e) => error_response(&e),
    }
}
