//! Application state container shared across Axum route handlers and services.
//!
//! This struct holds shared resources such as the database connection and the
//! check-in permit store. It is cheap to clone and passed into route handlers
//! via Axum's `State<T>` extractor.

use crate::permits::PermitStore;
use sea_orm::DatabaseConnection;

/// Central application state shared across the server.
///
/// This includes:
/// - A cloned, thread-safe database connection for use with SeaORM.
/// - The global [`PermitStore`] holding unconsumed check-in permits.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    permits: PermitStore,
}

impl AppState {
    /// Creates a new `AppState` from an established database connection.
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            permits: PermitStore::new(),
        }
    }

    /// Returns a shared reference to the internal `DatabaseConnection`.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Returns a cloned copy of the database connection.
    ///
    /// Useful for async contexts or spawning tasks that require ownership.
    pub fn db_clone(&self) -> DatabaseConnection {
        self.db.clone()
    }

    /// Returns a shared reference to the permit store.
    pub fn permits(&self) -> &PermitStore {
        &self.permits
    }
}
