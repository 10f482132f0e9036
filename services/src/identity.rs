//! Maps a scanned or typed identity query to exactly one enrolled student.
//!
//! Matching is scoped to the course roster, never the whole user table: a
//! kiosk query can only ever check in someone enrolled in the session's
//! course. An ambiguous query is an error carrying the candidates — picking
//! the first hit silently would mis-attribute attendance.

use db::models::user;
use db::models::user_course_role;
use sea_orm::DatabaseConnection;

use crate::error::{MatchCandidate, ServiceError};

/// Resolves `query` against the enrolled students of `course_id`.
///
/// An exact student-number match wins outright. Otherwise the query is a
/// case-insensitive substring of the student's name or number; exactly one
/// hit resolves, zero is `NotFound`, several are `AmbiguousMatch`. The same
/// query over the same roster always yields the same outcome.
pub async fn resolve(
    db: &DatabaseConnection,
    course_id: i64,
    query: &str,
) -> Result<user::Model, ServiceError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ServiceError::Validation("identity query is empty".into()));
    }

    let roster = user_course_role::Model::enrolled_students(db, course_id).await?;

    if let Some(exact) = roster
        .iter()
        .find(|s| s.username.eq_ignore_ascii_case(query))
    {
        return Ok(exact.clone());
    }

    let needle = query.to_lowercase();
    let matches: Vec<&user::Model> = roster
        .iter()
        .filter(|s| {
            s.name.to_lowercase().contains(&needle) || s.username.to_lowercase().contains(&needle)
        })
        .collect();

    match matches.as_slice() {
        [] => Err(ServiceError::NotFound(format!(
            "no enrolled student matches \"{query}\""
        ))),
        [single] => Ok((*single).clone()),
        several => Err(ServiceError::AmbiguousMatch {
            candidates: several
                .iter()
                .map(|s| MatchCandidate {
                    user_id: s.id,
                    username: s.username.clone(),
                    name: s.name.clone(),
                })
                .collect(),
        }),
    }
}
