use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

/// A student a free-text identity query could refer to.
///
/// Returned inside [`ServiceError::AmbiguousMatch`] so the caller can render
/// a pick-list instead of guessing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchCandidate {
    pub user_id: i64,
    pub username: String,
    pub name: String,
}

/// Every failure a check-in attempt or registry operation can surface.
///
/// These are outcomes, not crashes: handlers map each variant to an HTTP
/// status and a user-facing message, and no variant leaves the ledger or the
/// session registry partially updated.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input; the caller must fix the request before retrying.
    #[error("{0}")]
    Validation(String),

    /// The referenced entity does not exist (or is not enrolled).
    #[error("{0}")]
    NotFound(String),

    /// An identity query matched more than one enrolled student.
    #[error("query matches {} enrolled students", candidates.len())]
    AmbiguousMatch { candidates: Vec<MatchCandidate> },

    /// A scanned payload referenced a session this registry does not hold.
    #[error("attendance session {0} does not exist")]
    UnknownSession(i64),

    /// The session has not been activated yet.
    #[error("attendance session is not active")]
    SessionNotActive,

    /// The session is closed; no further check-ins are possible.
    #[error("attendance session is closed")]
    SessionClosed,

    /// The presented code is not the session's current token.
    #[error("attendance code does not match the current token")]
    TokenMismatch,

    /// The token (or the single-use permit derived from it) has lapsed.
    #[error("attendance token has expired")]
    ExpiredToken,

    /// The presented coordinates are missing or too far from the session venue.
    #[error("check-in location is out of range")]
    OutOfRange {
        distance_meters: Option<f64>,
        radius_meters: f64,
    },

    /// An accepted check-in already exists for this (session, student) pair.
    #[error("attendance already recorded for this session")]
    DuplicateCheckIn,

    #[error("database error: {0}")]
    Db(#[from] DbErr),
}
