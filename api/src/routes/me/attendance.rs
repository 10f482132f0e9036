use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::response::{ApiResponse, error_response};
use common::state::AppState;
use services::aggregator::{self, StudentSummary};

#[derive(Deserialize)]
pub struct RangeQuery {
    /// RFC 3339; defaults to 30 days ago.
    pub from: Option<DateTime<Utc>>,
    /// RFC 3339; defaults to now.
    pub to: Option<DateTime<Utc>>,
}

/// GET `/api/me/attendance?from=&to=`
///
/// The caller's own attendance summary over a date range: present, late, and
/// derived absences across every course they are enrolled in.
pub async fn my_attendance(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Query(range): Query<RangeQuery>,
) -> (StatusCode, Json<ApiResponse<Option<StudentSummary>>>) {
    let to = range.to.unwrap_or_else(Utc::now);
    let from = range.from.unwrap_or(to - Duration::days(30));

    match aggregator::student_summary(state.db(), claims.sub, from, to).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(summary),
                "Attendance summary computed",
            )),
        ),
        Err(e) => error_response(&e),
    }
}
