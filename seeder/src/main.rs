use crate::seed::{Seeder, run_seeder};
use crate::seeds::{
    attendance::AttendanceSeeder, course::CourseSeeder, user::UserSeeder,
    user_role::UserRoleSeeder,
};

mod seed;
mod seeds;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let db = db::connect().await;

    for (seeder, name) in [
        (Box::new(UserSeeder) as Box<dyn Seeder + Send + Sync>, "User"),
        (Box::new(CourseSeeder), "Course"),
        (Box::new(UserRoleSeeder), "UserRole"),
        (Box::new(AttendanceSeeder), "Attendance"),
    ] {
        run_seeder(&*seeder, name, &db).await;
    }
}
