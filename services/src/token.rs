//! QR payload validation.
//!
//! The payload a client scans and posts back is untrusted input: every field
//! is revalidated against the session row before a check-in permit is issued.
//! Showing the payload on a lecture screen is not a trust boundary.

use chrono::{DateTime, Utc};
use common::config;
use common::permits::{CheckInPermit, PermitStore};
use db::models::attendance_session::{self, SessionStatus};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// The structured content of a session QR code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QrPayload {
    pub session_id: i64,
    pub course_id: i64,
    /// When the payload was rendered; freshness hint for clients.
    pub issued_at: DateTime<Utc>,
    /// The session-bound opaque code (HMAC of the current token nonce).
    pub code: String,
}

impl QrPayload {
    /// Builds the payload for the session's currently minted token.
    ///
    /// Fails with `SessionNotActive` when no token exists to embed.
    pub fn for_session(
        session: &attendance_session::Model,
        now: DateTime<Utc>,
    ) -> Result<Self, ServiceError> {
        if !session.is_active() || session.token_expires_at.is_none() {
            return Err(ServiceError::SessionNotActive);
        }
        Ok(Self {
            session_id: session.id,
            course_id: session.course_id,
            issued_at: now,
            code: session.current_code(),
        })
    }

    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        serde_json::from_str(raw)
            .map_err(|e| ServiceError::Validation(format!("malformed QR payload: {e}")))
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("QR payload serializes")
    }
}

/// Validates a scanned payload for `user_id` and, on success, issues a
/// single-use [`CheckInPermit`] for exactly one ledger append.
///
/// The permit outlives the validation by `permit_ttl_seconds` at most, so a
/// payload captured now cannot be replayed later even while the session
/// token itself remains valid.
pub async fn validate(
    db: &DatabaseConnection,
    permits: &PermitStore,
    session_id: i64,
    user_id: i64,
    payload: &QrPayload,
    now: DateTime<Utc>,
    presented_coords: Option<(f64, f64)>,
) -> Result<CheckInPermit, ServiceError> {
    let session = attendance_session::Model::get_by_id(db, session_id)
        .await?
        .ok_or(ServiceError::UnknownSession(session_id))?;

    if payload.session_id != session.id || payload.course_id != session.course_id {
        return Err(ServiceError::Validation(
            "QR payload does not belong to this session".into(),
        ));
    }

    match session.status {
        SessionStatus::Scheduled => return Err(ServiceError::SessionNotActive),
        SessionStatus::Closed => return Err(ServiceError::SessionClosed),
        SessionStatus::Active => {}
    }

    let Some(expires_at) = session.token_expires_at else {
        return Err(ServiceError::ExpiredToken);
    };
    if payload.code != session.current_code() {
        return Err(ServiceError::TokenMismatch);
    }
    if now > expires_at {
        return Err(ServiceError::ExpiredToken);
    }

    if let Some(registered) = session.registered_coordinates() {
        let radius = config::geofence_radius_meters();
        match presented_coords {
            None => {
                return Err(ServiceError::OutOfRange {
                    distance_meters: None,
                    radius_meters: radius,
                });
            }
            Some(presented) => {
                let distance = haversine_meters(registered, presented);
                if distance > radius {
                    return Err(ServiceError::OutOfRange {
                        distance_meters: Some(distance),
                        radius_meters: radius,
                    });
                }
            }
        }
    }

    Ok(permits.issue(session.id, user_id, now, config::permit_ttl_seconds()))
}

/// Great-circle distance between two (latitude, longitude) points in meters.
pub fn haversine_meters(a: (f64, f64), b: (f64, f64)) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}
