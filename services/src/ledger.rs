//! The append-only check-in ledger.
//!
//! This module is the only writer of `check_ins` rows. The duplicate rule is
//! enforced twice: a pre-check that produces the friendly outcome, and the
//! composite primary key that settles races — if two attempts for the same
//! (session, student) pair interleave, the second insert violates the key and
//! is mapped to `DuplicateCheckIn` instead of overwriting anything.

use chrono::{DateTime, Duration, Utc};
use common::config;
use common::permits::PermitStore;
use db::models::attendance_session::{self, SessionStatus};
use db::models::check_in::{self, Channel, CheckInStatus};
use db::models::user_course_role;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set, SqlErr};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ServiceError;

/// A single check-in attempt.
#[derive(Debug, Clone)]
pub struct CheckInAttempt {
    pub session_id: i64,
    pub user_id: i64,
    pub channel: Channel,
    /// Permit id from a successful QR validation; required iff channel is QR.
    pub permit_id: Option<Uuid>,
    /// Coordinates presented with the attempt, stored for audit.
    pub coordinates: Option<(f64, f64)>,
    /// Faculty member entering a manual roll-call row.
    pub recorded_by: Option<i64>,
}

/// Per-student outcome of a bulk roll-call.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RollCallOutcome {
    Accepted { status: CheckInStatus },
    Duplicate,
    NotEnrolled,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollCallEntry {
    pub user_id: i64,
    pub outcome: RollCallOutcome,
}

/// Records one accepted check-in, or explains why the attempt was refused.
pub async fn record(
    db: &DatabaseConnection,
    permits: &PermitStore,
    attempt: CheckInAttempt,
    now: DateTime<Utc>,
) -> Result<check_in::Model, ServiceError> {
    let session = attendance_session::Model::get_by_id(db, attempt.session_id)
        .await?
        .ok_or(ServiceError::UnknownSession(attempt.session_id))?;

    let result = record_inner(db, permits, &session, &attempt, now).await;

    if let Err(refusal) = &result {
        // Refused attempts never reach the ledger; the audit trail lives here.
        tracing::info!(
            session_id = attempt.session_id,
            user_id = attempt.user_id,
            channel = %attempt.channel,
            refusal = %refusal,
            "check-in attempt refused"
        );
    }

    result
}

async fn record_inner(
    db: &DatabaseConnection,
    permits: &PermitStore,
    session: &attendance_session::Model,
    attempt: &CheckInAttempt,
    now: DateTime<Utc>,
) -> Result<check_in::Model, ServiceError> {
    match session.status {
        SessionStatus::Scheduled => return Err(ServiceError::SessionNotActive),
        SessionStatus::Closed => return Err(ServiceError::SessionClosed),
        SessionStatus::Active => {}
    }

    if !session.allows(&attempt.channel) {
        return Err(ServiceError::Validation(format!(
            "channel \"{}\" is not enabled for this session",
            attempt.channel
        )));
    }

    if !user_course_role::Model::is_enrolled(db, attempt.user_id, session.course_id).await? {
        return Err(ServiceError::NotFound(format!(
            "user {} is not enrolled in this course",
            attempt.user_id
        )));
    }

    // A QR attempt must carry the capability minted by the validator; the
    // other channels are vouched for by the session's channel policy alone.
    if attempt.channel == Channel::Qr {
        let permit_id = attempt
            .permit_id
            .ok_or_else(|| ServiceError::Validation("QR check-in requires a validated scan".into()))?;
        permits
            .consume(permit_id, session.id, attempt.user_id, now)
            .ok_or(ServiceError::ExpiredToken)?;
    }

    if check_in::Model::exists(db, session.id, attempt.user_id).await? {
        return Err(ServiceError::DuplicateCheckIn);
    }

    let status = classify(session.starts_at, now);

    let row = check_in::ActiveModel {
        session_id: Set(session.id),
        user_id: Set(attempt.user_id),
        taken_at: Set(now),
        channel: Set(attempt.channel.clone()),
        status: Set(status),
        latitude: Set(attempt.coordinates.map(|(lat, _)| lat)),
        longitude: Set(attempt.coordinates.map(|(_, lon)| lon)),
        recorded_by: Set(attempt.recorded_by),
    };

    match row.insert(db).await {
        Ok(model) => Ok(model),
        Err(err) => Err(map_insert_err(err)),
    }
}

/// Bulk manual roll-call.
///
/// Session-level conditions (existence, Active, manual channel enabled) gate
/// the whole batch; per-student conditions are judged independently so one
/// duplicate never sinks the rest.
pub async fn record_roll_call(
    db: &DatabaseConnection,
    session_id: i64,
    user_ids: &[i64],
    recorded_by: i64,
    now: DateTime<Utc>,
) -> Result<Vec<RollCallEntry>, ServiceError> {
    let session = attendance_session::Model::get_by_id(db, session_id)
        .await?
        .ok_or(ServiceError::UnknownSession(session_id))?;

    match session.status {
        SessionStatus::Scheduled => return Err(ServiceError::SessionNotActive),
        SessionStatus::Closed => return Err(ServiceError::SessionClosed),
        SessionStatus::Active => {}
    }
    if !session.allows(&Channel::Manual) {
        return Err(ServiceError::Validation(
            "manual roll-call is not enabled for this session".into(),
        ));
    }

    let mut entries = Vec::with_capacity(user_ids.len());

    for &user_id in user_ids {
        if !user_course_role::Model::is_enrolled(db, user_id, session.course_id).await? {
            entries.push(RollCallEntry {
                user_id,
                outcome: RollCallOutcome::NotEnrolled,
            });
            continue;
        }

        if check_in::Model::exists(db, session.id, user_id).await? {
            entries.push(RollCallEntry {
                user_id,
                outcome: RollCallOutcome::Duplicate,
            });
            continue;
        }

        let status = classify(session.starts_at, now);
        let row = check_in::ActiveModel {
            session_id: Set(session.id),
            user_id: Set(user_id),
            taken_at: Set(now),
            channel: Set(Channel::Manual),
            status: Set(status.clone()),
            latitude: Set(None),
            longitude: Set(None),
            recorded_by: Set(Some(recorded_by)),
        };

        let outcome = match row.insert(db).await {
            Ok(_) => RollCallOutcome::Accepted { status },
            Err(err) => match map_insert_err(err) {
                ServiceError::DuplicateCheckIn => RollCallOutcome::Duplicate,
                other => return Err(other),
            },
        };
        entries.push(RollCallEntry { user_id, outcome });
    }

    Ok(entries)
}

/// Present up to and including the grace boundary, late after it.
fn classify(starts_at: DateTime<Utc>, taken_at: DateTime<Utc>) -> CheckInStatus {
    let grace = Duration::minutes(config::grace_period_minutes());
    if taken_at <= starts_at + grace {
        CheckInStatus::Present
    } else {
        CheckInStatus::Late
    }
}

fn map_insert_err(err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::DuplicateCheckIn,
        _ => ServiceError::Db(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_registry::{self, NewSession};
    use crate::token::{self, QrPayload};
    use chrono::TimeZone;
    use db::models::{
        course::Model as CourseModel,
        user::Model as UserModel,
        user_course_role::{Model as RoleModel, Role},
    };
    use db::test_utils::setup_test_db;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, min, 0).unwrap()
    }

    fn at_sec(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, min, sec).unwrap()
    }

    struct Ctx {
        session: attendance_session::Model,
        students: Vec<i64>,
        faculty: i64,
    }

    /// 08:00-10:00 session with QR + manual + kiosk, activated at 08:05 so
    /// the token stays valid through the scenario timestamps below.
    async fn seed(db: &DatabaseConnection, student_count: usize) -> Ctx {
        let faculty = UserModel::create(db, "staff1", "staff1@uni.test", "pw", false, "Dr. Mensah", None)
            .await
            .unwrap();
        let course = CourseModel::create(db, "CS301", "Software Engineering", "Computer Science", 2026)
            .await
            .unwrap();

        let mut students = Vec::new();
        for i in 0..student_count {
            let number = format!("CS/2024/{:03}", i + 1);
            let email = format!("s{}@uni.test", i + 1);
            let user = UserModel::create(db, &number, &email, "pw", false, &format!("Student {}", i + 1), None)
                .await
                .unwrap();
            RoleModel::assign_user_to_course(db, user.id, course.id, Role::Student)
                .await
                .unwrap();
            students.push(user.id);
        }

        let session = session_registry::create_session(
            db,
            course.id,
            faculty.id,
            NewSession {
                title: "Lecture 5".into(),
                starts_at: at(8, 0),
                ends_at: at(10, 0),
                location_name: "Lab 2".into(),
                coordinates: None,
                channels: vec![Channel::Qr, Channel::Manual, Channel::Kiosk],
            },
        )
        .await
        .unwrap();
        let session = session_registry::activate(db, session.id, at(8, 5)).await.unwrap();

        Ctx {
            session,
            students,
            faculty: faculty.id,
        }
    }

    fn qr_attempt(session_id: i64, user_id: i64, permit_id: Option<Uuid>) -> CheckInAttempt {
        CheckInAttempt {
            session_id,
            user_id,
            channel: Channel::Qr,
            permit_id,
            coordinates: None,
            recorded_by: None,
        }
    }

    #[tokio::test]
    async fn test_qr_check_in_accepts_then_rejects_duplicate() {
        let db = setup_test_db().await;
        let permits = PermitStore::new();
        let ctx = seed(&db, 1).await;
        let student = ctx.students[0];

        let payload = QrPayload::for_session(&ctx.session, at(8, 10)).unwrap();

        // Accepted at 08:10, inside the 15-minute grace window.
        let permit = token::validate(&db, &permits, ctx.session.id, student, &payload, at(8, 10), None)
            .await
            .unwrap();
        let rec = record(&db, &permits, qr_attempt(ctx.session.id, student, Some(permit.id)), at(8, 10))
            .await
            .unwrap();
        assert_eq!(rec.status, CheckInStatus::Present);
        assert_eq!(rec.channel, Channel::Qr);

        // Retry with the same still-valid token at 08:11 → duplicate.
        let permit = token::validate(&db, &permits, ctx.session.id, student, &payload, at(8, 11), None)
            .await
            .unwrap();
        let err = record(&db, &permits, qr_attempt(ctx.session.id, student, Some(permit.id)), at(8, 11))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateCheckIn));

        // Reissue, then a scan still carrying the old code at 08:12 → mismatch.
        session_registry::reissue_token(&db, ctx.session.id, at(8, 12))
            .await
            .unwrap();
        let err = token::validate(&db, &permits, ctx.session.id, student, &payload, at(8, 12), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TokenMismatch));
    }

    #[tokio::test]
    async fn test_qr_permit_is_single_use() {
        let db = setup_test_db().await;
        let permits = PermitStore::new();
        let ctx = seed(&db, 2).await;
        let (alice, bob) = (ctx.students[0], ctx.students[1]);

        let payload = QrPayload::for_session(&ctx.session, at(8, 5)).unwrap();
        let permit = token::validate(&db, &permits, ctx.session.id, alice, &payload, at(8, 5), None)
            .await
            .unwrap();

        // A permit issued to Alice cannot check Bob in.
        let err = record(&db, &permits, qr_attempt(ctx.session.id, bob, Some(permit.id)), at(8, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ExpiredToken));

        // Alice's own use still works once; the permit is then gone.
        record(&db, &permits, qr_attempt(ctx.session.id, alice, Some(permit.id)), at(8, 5))
            .await
            .unwrap();
        assert_eq!(permits.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_grace_boundary_is_inclusive() {
        let db = setup_test_db().await;
        let permits = PermitStore::new();
        let ctx = seed(&db, 2).await;

        // Exactly start + 15:00 → present.
        let on_boundary = record(
            &db,
            &permits,
            CheckInAttempt {
                session_id: ctx.session.id,
                user_id: ctx.students[0],
                channel: Channel::Kiosk,
                permit_id: None,
                coordinates: None,
                recorded_by: None,
            },
            at_sec(8, 15, 0),
        )
        .await
        .unwrap();
        assert_eq!(on_boundary.status, CheckInStatus::Present);

        // One second past the boundary → late.
        let past_boundary = record(
            &db,
            &permits,
            CheckInAttempt {
                session_id: ctx.session.id,
                user_id: ctx.students[1],
                channel: Channel::Kiosk,
                permit_id: None,
                coordinates: None,
                recorded_by: None,
            },
            at_sec(8, 15, 1),
        )
        .await
        .unwrap();
        assert_eq!(past_boundary.status, CheckInStatus::Late);
    }

    #[tokio::test]
    async fn test_channel_must_be_enabled_and_student_enrolled() {
        let db = setup_test_db().await;
        let permits = PermitStore::new();
        let ctx = seed(&db, 1).await;

        // Card was not enabled for this session.
        let err = record(
            &db,
            &permits,
            CheckInAttempt {
                session_id: ctx.session.id,
                user_id: ctx.students[0],
                channel: Channel::Card,
                permit_id: None,
                coordinates: None,
                recorded_by: None,
            },
            at(8, 5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        // The faculty member is not enrolled as a student.
        let err = record(
            &db,
            &permits,
            CheckInAttempt {
                session_id: ctx.session.id,
                user_id: ctx.faculty,
                channel: Channel::Kiosk,
                permit_id: None,
                coordinates: None,
                recorded_by: None,
            },
            at(8, 5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_closed_session_rejects_check_ins() {
        let db = setup_test_db().await;
        let permits = PermitStore::new();
        let ctx = seed(&db, 1).await;

        session_registry::close(&db, ctx.session.id, at(10, 0))
            .await
            .unwrap();

        let err = record(
            &db,
            &permits,
            CheckInAttempt {
                session_id: ctx.session.id,
                user_id: ctx.students[0],
                channel: Channel::Kiosk,
                permit_id: None,
                coordinates: None,
                recorded_by: None,
            },
            at(10, 1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::SessionClosed));
    }

    #[tokio::test]
    async fn test_roll_call_reports_per_student_outcomes() {
        let db = setup_test_db().await;
        let permits = PermitStore::new();
        let ctx = seed(&db, 3).await;
        let (a, b, c) = (ctx.students[0], ctx.students[1], ctx.students[2]);

        // B already has a record.
        record(
            &db,
            &permits,
            CheckInAttempt {
                session_id: ctx.session.id,
                user_id: b,
                channel: Channel::Kiosk,
                permit_id: None,
                coordinates: None,
                recorded_by: None,
            },
            at(8, 2),
        )
        .await
        .unwrap();

        let entries = record_roll_call(&db, ctx.session.id, &[a, b, c], ctx.faculty, at(8, 20))
            .await
            .unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0].outcome,
            RollCallOutcome::Accepted {
                status: CheckInStatus::Late
            }
        );
        assert_eq!(entries[1].outcome, RollCallOutcome::Duplicate);
        assert_eq!(
            entries[2].outcome,
            RollCallOutcome::Accepted {
                status: CheckInStatus::Late
            }
        );

        // B's original kiosk record was not overwritten by the roll-call.
        let rows = check_in::Model::for_session(&db, ctx.session.id).await.unwrap();
        let b_row = rows.iter().find(|r| r.user_id == b).unwrap();
        assert_eq!(b_row.channel, Channel::Kiosk);
    }

    #[tokio::test]
    async fn test_roll_call_flags_unenrolled_ids() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 1).await;

        let entries = record_roll_call(&db, ctx.session.id, &[ctx.students[0], 9999], ctx.faculty, at(8, 5))
            .await
            .unwrap();

        assert!(matches!(entries[0].outcome, RollCallOutcome::Accepted { .. }));
        assert_eq!(entries[1].outcome, RollCallOutcome::NotEnrolled);
    }
}
