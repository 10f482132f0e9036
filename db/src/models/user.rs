use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use std::str::FromStr;

use crate::models::user_course_role::{Column as RoleColumn, Entity as RoleEntity, Role};

/// Represents an account in the `users` table.
///
/// Students, faculty, and kiosk terminals are all rows here; what a user may
/// do in a course is decided by `user_course_roles`, and `admin` grants the
/// institution-wide dashboard.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Primary key ID (auto-incremented).
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique student or staff number, e.g. "CS/2024/001".
    pub username: String,
    /// User's unique email address.
    pub email: String,
    /// Securely hashed password string.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name shown on rosters and exports.
    pub name: String,
    /// Home department, if known.
    pub department: Option<String>,
    /// Whether the user has admin privileges.
    pub admin: bool,
    /// Timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// This enum would define relations if any exist. Currently unused.
#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("No RelationDef implemented")
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Creates a new user with a freshly hashed password.
    pub async fn create(
        db: &DatabaseConnection,
        username: &str,
        email: &str,
        password: &str,
        admin: bool,
        name: &str,
        department: Option<&str>,
    ) -> Result<Self, DbErr> {
        let password_hash = Self::hash_password(password)
            .map_err(|e| DbErr::Custom(format!("Failed to hash password: {e}")))?;

        let user = ActiveModel {
            username: Set(username.to_owned()),
            email: Set(email.to_owned()),
            password_hash: Set(password_hash),
            name: Set(name.to_owned()),
            department: Set(department.map(|d| d.to_owned())),
            admin: Set(admin),
            ..Default::default()
        };

        user.insert(db).await
    }

    /// Hashes a plaintext password with Argon2 and a random salt.
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Verifies a plaintext password against this user's stored hash.
    pub fn verify_password(&self, password: &str) -> bool {
        PasswordHash::new(&self.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    pub async fn get_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn find_by_username(
        db: &DatabaseConnection,
        username: &str,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::Username.eq(username))
            .one(db)
            .await
    }

    /// Checks whether the user holds `role` in the given course.
    ///
    /// `role` is matched case-insensitively against the [`Role`] enum; an
    /// unknown role name is simply not held.
    pub async fn is_in_role(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
        role: &str,
    ) -> Result<bool, DbErr> {
        let Ok(role) = Role::from_str(role) else {
            return Ok(false);
        };

        let found = RoleEntity::find()
            .filter(RoleColumn::UserId.eq(user_id))
            .filter(RoleColumn::CourseId.eq(course_id))
            .filter(RoleColumn::Role.eq(role))
            .one(db)
            .await?;

        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_create_and_verify_password() {
        let db = setup_test_db().await;

        let user = Model::create(
            &db,
            "CS/2024/001",
            "jdoe@uni.test",
            "hunter2",
            false,
            "John Doe",
            Some("Computer Science"),
        )
        .await
        .unwrap();

        assert_eq!(user.username, "CS/2024/001");
        assert!(user.verify_password("hunter2"));
        assert!(!user.verify_password("wrong"));

        let found = Model::find_by_username(&db, "CS/2024/001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
    }
}
