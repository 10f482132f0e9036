use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use serde::Serialize;

use crate::models::user_course_role::{Column as RoleColumn, Entity as RoleEntity};

/// Represents a university course offering.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Course code, e.g. "CS301".
    pub code: String,
    pub name: String,
    pub department: String,
    /// Academic year the offering runs in.
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_course_role::Entity")]
    Roles,
    #[sea_orm(has_many = "super::attendance_session::Entity")]
    Sessions,
}

impl Related<super::user_course_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Roles.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        code: &str,
        name: &str,
        department: &str,
        year: i32,
    ) -> Result<Self, DbErr> {
        let course = ActiveModel {
            code: Set(code.to_owned()),
            name: Set(name.to_owned()),
            department: Set(department.to_owned()),
            year: Set(year),
            ..Default::default()
        };

        course.insert(db).await
    }

    pub async fn get_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn get_all(db: &DatabaseConnection) -> Result<Vec<Self>, DbErr> {
        Entity::find().all(db).await
    }

    /// Courses the user holds any role in, newest first.
    pub async fn for_user(db: &DatabaseConnection, user_id: i64) -> Result<Vec<Self>, DbErr> {
        let course_ids: Vec<i64> = RoleEntity::find()
            .filter(RoleColumn::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.course_id)
            .collect();

        if course_ids.is_empty() {
            return Ok(Vec::new());
        }

        Entity::find()
            .filter(Column::Id.is_in(course_ids))
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Model as UserModel;
    use crate::models::user_course_role::{Model as RoleModel, Role};
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_course_create_and_find() {
        let db = setup_test_db().await;

        let created = Model::create(&db, "CS301", "Software Engineering", "Computer Science", 2026)
            .await
            .unwrap();

        let found = Model::get_by_id(&db, created.id).await.unwrap().unwrap();
        assert_eq!(found.code, "CS301");
        assert_eq!(found.year, 2026);
    }

    #[tokio::test]
    async fn test_courses_for_user_follow_roles() {
        let db = setup_test_db().await;

        let cs = Model::create(&db, "CS301", "Software Engineering", "Computer Science", 2026)
            .await
            .unwrap();
        let _other = Model::create(&db, "MA101", "Calculus", "Mathematics", 2026)
            .await
            .unwrap();

        let student = UserModel::create(
            &db,
            "CS/2024/001",
            "jdoe@uni.test",
            "pw",
            false,
            "John Doe",
            None,
        )
        .await
        .unwrap();

        RoleModel::assign_user_to_course(&db, student.id, cs.id, Role::Student)
            .await
            .unwrap();

        let courses = Model::for_user(&db, student.id).await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].id, cs.id);
    }
}
