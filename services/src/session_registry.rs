//! Session lifecycle: create, activate, re-issue token, close.
//!
//! The registry is the only writer of `attendance_sessions` rows. Token mint
//! and expiry always move together in a single row update, so a concurrent
//! validation reads either the old (nonce, expiry) pair or the new one,
//! never a torn mix.

use chrono::{DateTime, Duration, Utc};
use common::config;
use db::models::attendance_session::{self, SessionStatus};
use db::models::check_in::Channel;
use db::models::course;
use sea_orm::{ActiveModelTrait, DatabaseConnection, IntoActiveModel, Set};

use crate::error::ServiceError;

/// Parameters for a new scheduled session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location_name: String,
    /// Registered venue coordinates; presence turns on proximity enforcement.
    pub coordinates: Option<(f64, f64)>,
    pub channels: Vec<Channel>,
}

/// Creates a session in the Scheduled state.
pub async fn create_session(
    db: &DatabaseConnection,
    course_id: i64,
    created_by: i64,
    params: NewSession,
) -> Result<attendance_session::Model, ServiceError> {
    if params.ends_at <= params.starts_at {
        return Err(ServiceError::Validation(
            "session end time must be after its start time".into(),
        ));
    }
    if params.channels.is_empty() {
        return Err(ServiceError::Validation(
            "at least one check-in channel must be enabled".into(),
        ));
    }
    if params.title.trim().is_empty() {
        return Err(ServiceError::Validation("session title is required".into()));
    }

    if course::Model::get_by_id(db, course_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "course {course_id} does not exist"
        )));
    }

    // Dedupe while keeping the caller's order.
    let mut channels: Vec<Channel> = Vec::with_capacity(params.channels.len());
    for c in params.channels {
        if !channels.contains(&c) {
            channels.push(c);
        }
    }

    let session = attendance_session::Model::create(
        db,
        course_id,
        created_by,
        params.title.trim(),
        params.starts_at,
        params.ends_at,
        &params.location_name,
        params.coordinates,
        &channels,
        None,
    )
    .await?;

    Ok(session)
}

/// Transitions the session to Active and mints a fresh token.
///
/// Activating an already-Active session re-mints the token, which is the same
/// observable effect as [`reissue_token`].
pub async fn activate(
    db: &DatabaseConnection,
    session_id: i64,
    now: DateTime<Utc>,
) -> Result<attendance_session::Model, ServiceError> {
    let session = fetch(db, session_id).await?;

    match session.status {
        SessionStatus::Closed => Err(ServiceError::SessionClosed),
        SessionStatus::Scheduled | SessionStatus::Active => mint_token(db, session, now).await,
    }
}

/// Replaces the current token while Active.
///
/// The previous token is dead the instant the nonce moves: an in-flight scan
/// carrying it fails with `TokenMismatch` even inside the old expiry window.
pub async fn reissue_token(
    db: &DatabaseConnection,
    session_id: i64,
    now: DateTime<Utc>,
) -> Result<attendance_session::Model, ServiceError> {
    let session = fetch(db, session_id).await?;

    match session.status {
        SessionStatus::Scheduled => Err(ServiceError::SessionNotActive),
        SessionStatus::Closed => Err(ServiceError::SessionClosed),
        SessionStatus::Active => mint_token(db, session, now).await,
    }
}

/// Closes the session. Terminal and idempotent; every later check-in fails
/// with `SessionClosed`.
pub async fn close(
    db: &DatabaseConnection,
    session_id: i64,
    now: DateTime<Utc>,
) -> Result<attendance_session::Model, ServiceError> {
    let session = fetch(db, session_id).await?;

    if session.status == SessionStatus::Closed {
        return Ok(session);
    }

    let mut active = session.into_active_model();
    active.status = Set(SessionStatus::Closed);
    active.token_expires_at = Set(None);
    active.updated_at = Set(now);

    Ok(active.update(db).await?)
}

pub async fn fetch(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<attendance_session::Model, ServiceError> {
    attendance_session::Model::get_by_id(db, session_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("attendance session {session_id} does not exist"))
        })
}

/// Bumps the nonce and resets the expiry window in one row update.
async fn mint_token(
    db: &DatabaseConnection,
    session: attendance_session::Model,
    now: DateTime<Utc>,
) -> Result<attendance_session::Model, ServiceError> {
    let next_nonce = session.token_nonce + 1;
    let ttl = Duration::seconds(config::token_ttl_seconds());

    let mut active = session.into_active_model();
    active.status = Set(SessionStatus::Active);
    active.token_nonce = Set(next_nonce);
    active.token_expires_at = Set(Some(now + ttl));
    active.updated_at = Set(now);

    Ok(active.update(db).await?)
}
