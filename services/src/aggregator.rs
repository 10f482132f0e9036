//! Read-side summaries derived from the ledger.
//!
//! Nothing here mutates. Every number is recomputed from the authoritative
//! `check_ins` rows on demand — client-held "checked in" sets are display
//! hints, not state.

use chrono::{DateTime, Utc};
use db::models::attendance_session::{Column as SessionCol, Entity as SessionEntity, SessionStatus};
use db::models::check_in::{self, Channel, CheckInStatus, Column as CheckInCol, Entity as CheckInEntity};
use db::models::user::{Column as UserCol, Entity as UserEntity};
use db::models::user_course_role::{Column as RoleCol, Entity as RoleEntity, Role};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::ServiceError;
use crate::session_registry;

/// Attendance picture of one session.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: i64,
    pub enrolled: i64,
    /// Distinct students with an accepted record (the PK makes rows distinct).
    pub checked_in: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub by_channel: BTreeMap<String, i64>,
}

/// One student's attendance over a date range.
#[derive(Debug, Serialize)]
pub struct StudentSummary {
    pub user_id: i64,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Sessions of the student's courses that ran in the range.
    pub total_sessions: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    /// Fraction of sessions attended, as a percentage.
    pub attendance_rate: f64,
}

/// One line of a session export: who, when, how.
#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub student_name: String,
    pub student_number: String,
    pub checked_in_at: DateTime<Utc>,
    pub status: CheckInStatus,
    pub channel: Channel,
}

pub async fn session_summary(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<SessionSummary, ServiceError> {
    let session = session_registry::fetch(db, session_id).await?;
    let rows = check_in::Model::for_session(db, session_id).await?;
    let enrolled =
        db::models::user_course_role::Model::student_count(db, session.course_id).await?;

    let mut by_channel: BTreeMap<String, i64> = BTreeMap::new();
    let mut present = 0i64;
    let mut late = 0i64;
    for row in &rows {
        *by_channel.entry(row.channel.to_string()).or_insert(0) += 1;
        match row.status {
            CheckInStatus::Present => present += 1,
            CheckInStatus::Late => late += 1,
        }
    }

    let checked_in = rows.len() as i64;
    Ok(SessionSummary {
        session_id,
        enrolled,
        checked_in,
        present,
        late,
        absent: (enrolled - checked_in).max(0),
        by_channel,
    })
}

pub async fn student_summary(
    db: &DatabaseConnection,
    user_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<StudentSummary, ServiceError> {
    if to < from {
        return Err(ServiceError::Validation(
            "range end precedes range start".into(),
        ));
    }

    let course_ids: Vec<i64> = RoleEntity::find()
        .filter(RoleCol::UserId.eq(user_id))
        .filter(RoleCol::Role.eq(Role::Student))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.course_id)
        .collect();

    // Only sessions that actually ran count toward absence; a Scheduled
    // session nobody could check in to is not an absence.
    let session_ids: Vec<i64> = if course_ids.is_empty() {
        Vec::new()
    } else {
        SessionEntity::find()
            .filter(SessionCol::CourseId.is_in(course_ids))
            .filter(SessionCol::Status.ne(SessionStatus::Scheduled))
            .filter(SessionCol::StartsAt.gte(from))
            .filter(SessionCol::StartsAt.lte(to))
            .all(db)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect()
    };

    let total_sessions = session_ids.len() as i64;

    let mut present = 0i64;
    let mut late = 0i64;
    if !session_ids.is_empty() {
        let records = CheckInEntity::find()
            .filter(CheckInCol::UserId.eq(user_id))
            .filter(CheckInCol::SessionId.is_in(session_ids))
            .all(db)
            .await?;
        for r in records {
            match r.status {
                CheckInStatus::Present => present += 1,
                CheckInStatus::Late => late += 1,
            }
        }
    }

    let attended = present + late;
    let attendance_rate = if total_sessions > 0 {
        (attended as f64 / total_sessions as f64) * 100.0
    } else {
        0.0
    };

    Ok(StudentSummary {
        user_id,
        from,
        to,
        total_sessions,
        present,
        late,
        absent: total_sessions - attended,
        attendance_rate,
    })
}

/// Flat export of one session's accepted check-ins, earliest first.
pub async fn export_rows(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<Vec<ExportRow>, ServiceError> {
    session_registry::fetch(db, session_id).await?;
    let records = check_in::Model::for_session(db, session_id).await?;

    let user_ids: Vec<i64> = records.iter().map(|r| r.user_id).collect();
    let mut names = HashMap::<i64, (String, String)>::new();
    if !user_ids.is_empty() {
        let users = UserEntity::find()
            .filter(UserCol::Id.is_in(user_ids))
            .all(db)
            .await?;
        for u in users {
            names.insert(u.id, (u.name, u.username));
        }
    }

    Ok(records
        .into_iter()
        .map(|r| {
            let (name, number) = names
                .get(&r.user_id)
                .cloned()
                .unwrap_or_else(|| (String::new(), String::new()));
            ExportRow {
                student_name: name,
                student_number: number,
                checked_in_at: r.taken_at,
                status: r.status,
                channel: r.channel,
            }
        })
        .collect())
}
