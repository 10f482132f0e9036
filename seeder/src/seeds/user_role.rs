use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};

use crate::seed::Seeder;
use db::models::course::{Column as CourseCol, Entity as CourseEntity};
use db::models::user::{Column as UserCol, Entity as UserEntity};
use db::models::user_course_role::{Model as RoleModel, Role};

pub struct UserRoleSeeder;

#[async_trait]
impl Seeder for UserRoleSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        let courses = CourseEntity::find()
            .order_by_asc(CourseCol::Code)
            .all(db)
            .await?;
        let staff = UserEntity::find()
            .filter(UserCol::Username.starts_with("STAFF/"))
            .order_by_asc(UserCol::Username)
            .all(db)
            .await?;
        let students = UserEntity::find()
            .filter(UserCol::Username.starts_with("CS/"))
            .order_by_asc(UserCol::Username)
            .all(db)
            .await?;

        for (i, course) in courses.iter().enumerate() {
            let faculty = &staff[i % staff.len()];
            RoleModel::assign_user_to_course(db, faculty.id, course.id, Role::Faculty).await?;
        }

        // Every student takes two of the three courses.
        for (i, student) in students.iter().enumerate() {
            for offset in 0..2 {
                let course = &courses[(i + offset) % courses.len()];
                RoleModel::assign_user_to_course(db, student.id, course.id, Role::Student).await?;
            }
        }

        Ok(())
    }
}
