use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::user::{Column as UserColumn, Entity as UserEntity};

/// The central table for user-course-role relationships.
///
/// A `student` row is an enrollment; a `faculty` row owns the course's
/// sessions. Institution-wide admins are flagged on `users` instead.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_course_roles")]
pub struct Model {
    /// User ID (foreign key to `users`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    /// Course ID (foreign key to `courses`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_id: i64,

    /// Role type: Faculty or Student
    pub role: Role,
}

/// Enum representing user roles within a course.
/// Backed by a `user_course_role_type` enum in the database.
#[derive(
    Debug, Clone, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_course_role_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "faculty")]
    Faculty,

    #[sea_orm(string_value = "student")]
    Student,
}

/// Defines relationships for foreign key joins.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Belongs to a user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    /// Belongs to a course
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }

    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }

    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn assign_user_to_course(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
        role: Role,
    ) -> Result<Self, DbErr> {
        let row = ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course_id),
            role: Set(role),
        };

        row.insert(db).await
    }

    pub async fn remove_user_from_course(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
    ) -> Result<(), DbErr> {
        Entity::delete_many()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::CourseId.eq(course_id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Enrolled students of a course, ordered by student number.
    pub async fn enrolled_students(
        db: &DatabaseConnection,
        course_id: i64,
    ) -> Result<Vec<super::user::Model>, DbErr> {
        let student_ids: Vec<i64> = Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::Role.eq(Role::Student))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.user_id)
            .collect();

        if student_ids.is_empty() {
            return Ok(Vec::new());
        }

        UserEntity::find()
            .filter(UserColumn::Id.is_in(student_ids))
            .order_by_asc(UserColumn::Username)
            .all(db)
            .await
    }

    pub async fn student_count(db: &DatabaseConnection, course_id: i64) -> Result<i64, DbErr> {
        use sea_orm::PaginatorTrait;

        let count = Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::Role.eq(Role::Student))
            .count(db)
            .await?;
        Ok(count as i64)
    }

    pub async fn is_enrolled(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
    ) -> Result<bool, DbErr> {
        let found = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::Role.eq(Role::Student))
            .one(db)
            .await?;
        Ok(found.is_some())
    }
}
