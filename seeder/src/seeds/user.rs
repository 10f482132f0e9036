use async_trait::async_trait;
use fake::Fake;
use fake::faker::name::en::Name;
use sea_orm::{DatabaseConnection, DbErr};

use crate::seed::Seeder;
use db::models::user::Model as UserModel;

pub const STUDENT_COUNT: usize = 12;

pub struct UserSeeder;

#[async_trait]
impl Seeder for UserSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        UserModel::create(
            db,
            "ADMIN/001",
            "registrar@uni.test",
            "admin-password",
            true,
            "University Registrar",
            None,
        )
        .await?;

        for (i, name) in ["Dr. Amina Mensah", "Prof. Samuel Kariuki"].iter().enumerate() {
            UserModel::create(
                db,
                &format!("STAFF/{:03}", i + 1),
                &format!("staff{}@uni.test", i + 1),
                "faculty-password",
                false,
                name,
                Some("Computer Science"),
            )
            .await?;
        }

        for i in 0..STUDENT_COUNT {
            let name: String = Name().fake();
            UserModel::create(
                db,
                &format!("CS/2025/{:03}", i + 1),
                &format!("student{}@uni.test", i + 1),
                "student-password",
                false,
                &name,
                Some("Computer Science"),
            )
            .await?;
        }

        Ok(())
    }
}
