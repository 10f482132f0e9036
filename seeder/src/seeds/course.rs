use async_trait::async_trait;
use chrono::{Datelike, Utc};
use sea_orm::{DatabaseConnection, DbErr};

use crate::seed::Seeder;
use db::models::course::Model as CourseModel;

pub struct CourseSeeder;

#[async_trait]
impl Seeder for CourseSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        let year = Utc::now().year();

        for (code, name) in [
            ("CS301", "Software Engineering"),
            ("CS212", "Data Structures"),
            ("CS115", "Discrete Mathematics"),
        ] {
            CourseModel::create(db, code, name, "Computer Science", year).await?;
        }

        Ok(())
    }
}
