use serde::{Deserialize, Serialize};

use db::models::attendance_session::{Model as SessionModel, SessionStatus};
use db::models::check_in::{Channel, CheckInStatus, Model as CheckInModel};

#[derive(Debug, Serialize)]
pub struct AttendanceSessionResponse {
    pub id: i64,
    pub course_id: i64,
    pub created_by: i64,
    pub title: String,
    pub starts_at: String,
    pub ends_at: String,
    pub location_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub channels: Vec<Channel>,
    pub status: SessionStatus,
    pub token_expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub checked_in_count: i64, // students with an accepted record
    pub student_count: i64,    // enrolled students in the course
}

impl From<SessionModel> for AttendanceSessionResponse {
    fn from(m: SessionModel) -> Self {
        let channels = m.channel_set();
        Self {
            id: m.id,
            course_id: m.course_id,
            created_by: m.created_by,
            title: m.title,
            starts_at: m.starts_at.to_rfc3339(),
            ends_at: m.ends_at.to_rfc3339(),
            location_name: m.location_name,
            latitude: m.latitude,
            longitude: m.longitude,
            channels,
            status: m.status,
            token_expires_at: m.token_expires_at.map(|t| t.to_rfc3339()),
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.to_rfc3339(),
            checked_in_count: 0,
            student_count: 0,
        }
    }
}

impl AttendanceSessionResponse {
    pub fn from_with_counts(m: SessionModel, checked_in_count: i64, student_count: i64) -> Self {
        let mut base = Self::from(m);
        base.checked_in_count = checked_in_count;
        base.student_count = student_count;
        base
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i32>,
    pub per_page: Option<i32>,
    pub q: Option<String>,              // search in title
    pub status: Option<SessionStatus>,  // filter by lifecycle state
    pub sort: Option<String>,           // "created_at", "-created_at", "title", "starts_at"
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub sessions: Vec<AttendanceSessionResponse>,
    pub page: i32,
    pub per_page: i32,
    pub total: i32,
}

#[derive(Deserialize)]
pub struct CreateSessionReq {
    pub title: String,
    pub starts_at: chrono::DateTime<chrono::Utc>,
    pub ends_at: chrono::DateTime<chrono::Utc>,
    pub location_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub channels: Vec<Channel>,
}

/// Body of a student QR check-in. `payload` is the raw scanned text and is
/// treated as untrusted until the validator has taken it apart.
#[derive(Deserialize)]
pub struct CheckInReq {
    pub payload: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Deserialize)]
pub struct RollCallReq {
    pub student_ids: Vec<i64>,
}

/// Walk-up kiosk entry: a free-text identity query plus the terminal's
/// channel (kiosk by default, card when a reader produced the query).
#[derive(Deserialize)]
pub struct KioskReq {
    pub query: String,
    pub channel: Option<Channel>,
}

#[derive(Serialize)]
pub struct QrResponse {
    /// JSON payload to render as a QR image.
    pub payload: String,
    pub token_expires_at: String,
}

#[derive(Serialize, Default)]
pub struct CheckInResponse {
    pub session_id: i64,
    pub user_id: i64,
    pub taken_at: String,
    pub channel: Option<Channel>,
    pub status: Option<CheckInStatus>,
}

impl From<CheckInModel> for CheckInResponse {
    fn from(m: CheckInModel) -> Self {
        Self {
            session_id: m.session_id,
            user_id: m.user_id,
            taken_at: m.taken_at.to_rfc3339(),
            channel: Some(m.channel),
            status: Some(m.status),
        }
    }
}

/// A single attendance record (DTO) for API responses.
#[derive(Serialize)]
pub struct AttendanceRecordDto {
    pub session_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub name: Option<String>,
    pub taken_at: String, // ISO-8601 (UTC)
    pub channel: Channel,
    pub status: CheckInStatus,
    pub recorded_by: Option<i64>,
}

/// Query params for listing session records.
#[derive(Deserialize)]
pub struct RecordsListQuery {
    /// Free-text search:
    /// - numeric → matches `user_id`
    /// - text   → matches student name or number (contains)
    pub q: Option<String>,
    /// Sort by: `taken_at` | `user_id` (prefix with `-` for desc). Default `taken_at`.
    pub sort: Option<String>,
    /// 1-based page index (default 1).
    pub page: Option<i32>,
    /// Items per page (default 20, max 200).
    pub per_page: Option<i32>,
}

/// Paged response for records list.
#[derive(Serialize)]
pub struct RecordsListResponse {
    pub records: Vec<AttendanceRecordDto>,
    pub page: i32,
    pub per_page: i32,
    pub total: i32,
}
