//! Single-use check-in permits.
//!
//! A successful QR validation does not append to the ledger directly; it
//! issues a short-lived permit bound to one (session, student) pair. The
//! ledger consumes the permit exactly once, so a captured QR payload cannot
//! be replayed even while the session token itself is still valid.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Capability to append exactly one ledger record for a (session, student) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInPermit {
    pub id: Uuid,
    pub session_id: i64,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// Shared in-memory store of outstanding permits.
///
/// Lives on `AppState` so every handler sees the same set. The mutex is held
/// only for map operations, never across an `.await`.
#[derive(Clone, Default)]
pub struct PermitStore {
    inner: Arc<Mutex<HashMap<Uuid, CheckInPermit>>>,
}

impl PermitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a permit for the given pair, valid for `ttl_seconds` from `now`.
    ///
    /// Issuing replaces any earlier unconsumed permit for the same pair and
    /// drops permits that have already lapsed.
    pub fn issue(
        &self,
        session_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
        ttl_seconds: i64,
    ) -> CheckInPermit {
        let permit = CheckInPermit {
            id: Uuid::new_v4(),
            session_id,
            user_id,
            expires_at: now + Duration::seconds(ttl_seconds),
        };

        let mut map = self.inner.lock().expect("permit store poisoned");
        map.retain(|_, p| p.expires_at > now && !(p.session_id == session_id && p.user_id == user_id));
        map.insert(permit.id, permit.clone());
        permit
    }

    /// Atomically takes the permit out of the store.
    ///
    /// Returns the permit only if it exists, is not past its expiry, and is
    /// bound to the given (session, student) pair. The entry is removed in
    /// every case, so a second consume of the same id always fails.
    pub fn consume(
        &self,
        permit_id: Uuid,
        session_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Option<CheckInPermit> {
        let mut map = self.inner.lock().expect("permit store poisoned");
        let permit = map.remove(&permit_id)?;
        if permit.session_id != session_id || permit.user_id != user_id {
            return None;
        }
        if now > permit.expires_at {
            return None;
        }
        Some(permit)
    }

    /// Number of outstanding permits (test visibility).
    pub fn outstanding(&self) -> usize {
        self.inner.lock().expect("permit store poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, sec).unwrap()
    }

    #[test]
    fn consume_is_single_use() {
        let store = PermitStore::new();
        let p = store.issue(1, 7, at(0), 30);

        assert!(store.consume(p.id, 1, 7, at(5)).is_some());
        assert!(store.consume(p.id, 1, 7, at(6)).is_none());
    }

    #[test]
    fn consume_rejects_wrong_pair_and_expiry() {
        let store = PermitStore::new();

        let p = store.issue(1, 7, at(0), 30);
        assert!(store.consume(p.id, 2, 7, at(1)).is_none());

        let p = store.issue(1, 7, at(0), 30);
        assert!(store.consume(p.id, 1, 8, at(1)).is_none());

        let p = store.issue(1, 7, at(0), 30);
        assert!(store.consume(p.id, 1, 7, at(31)).is_none());
    }

    #[test]
    fn reissue_replaces_previous_permit_for_pair() {
        let store = PermitStore::new();
        let first = store.issue(1, 7, at(0), 30);
        let second = store.issue(1, 7, at(1), 30);

        assert!(store.consume(first.id, 1, 7, at(2)).is_none());
        assert!(store.consume(second.id, 1, 7, at(2)).is_some());
        assert_eq!(store.outstanding(), 0);
    }
}
