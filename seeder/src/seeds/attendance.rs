use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};

use crate::seed::Seeder;
use common::permits::PermitStore;
use db::models::check_in::Channel;
use db::models::course::Entity as CourseEntity;
use db::models::user_course_role::Model as RoleModel;
use services::ledger::{self, CheckInAttempt};
use services::session_registry::{self, NewSession};

pub struct AttendanceSeeder;

fn custom(e: services::ServiceError) -> DbErr {
    DbErr::Custom(e.to_string())
}

#[async_trait]
impl Seeder for AttendanceSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        let permits = PermitStore::new();
        let now = Utc::now();

        for course in CourseEntity::find().all(db).await? {
            let faculty_id = course_faculty(db, course.id).await?;
            let roster = RoleModel::enrolled_students(db, course.id).await?;

            // A week and a half of past lectures, already closed.
            for back in 1..=5 {
                let starts_at = now - Duration::days(back * 2);
                let session = session_registry::create_session(
                    db,
                    course.id,
                    faculty_id,
                    NewSession {
                        title: format!("{} lecture {}", course.code, 6 - back),
                        starts_at,
                        ends_at: starts_at + Duration::hours(2),
                        location_name: format!("Lecture Hall {}", back),
                        coordinates: None,
                        channels: vec![Channel::Qr, Channel::Manual, Channel::Kiosk],
                    },
                )
                .await
                .map_err(custom)?;

                session_registry::activate(db, session.id, starts_at)
                    .await
                    .map_err(custom)?;

                for student in &roster {
                    // Roughly a quarter of the roster misses any given lecture.
                    if fastrand::u8(0..4) == 0 {
                        continue;
                    }
                    let minutes_in = fastrand::i64(0..40);
                    let channel = if fastrand::bool() {
                        Channel::Kiosk
                    } else {
                        Channel::Manual
                    };
                    let recorded_by =
                        (channel == Channel::Manual).then_some(faculty_id);

                    ledger::record(
                        db,
                        &permits,
                        CheckInAttempt {
                            session_id: session.id,
                            user_id: student.id,
                            channel,
                            permit_id: None,
                            coordinates: None,
                            recorded_by,
                        },
                        starts_at + Duration::minutes(minutes_in),
                    )
                    .await
                    .map_err(custom)?;
                }

                session_registry::close(db, session.id, starts_at + Duration::hours(2))
                    .await
                    .map_err(custom)?;
            }

            // One upcoming session left on the schedule.
            let starts_at = now + Duration::days(1);
            session_registry::create_session(
                db,
                course.id,
                faculty_id,
                NewSession {
                    title: format!("{} lecture 6", course.code),
                    starts_at,
                    ends_at: starts_at + Duration::hours(2),
                    location_name: "Lecture Hall 1".into(),
                    coordinates: Some((-1.2921, 36.8219)),
                    channels: vec![Channel::Qr, Channel::Kiosk],
                },
            )
            .await
            .map_err(custom)?;
        }

        Ok(())
    }
}

async fn course_faculty(db: &DatabaseConnection, course_id: i64) -> Result<i64, DbErr> {
    use db::models::user_course_role::{Column as RoleCol, Entity as RoleEntity, Role};
    use sea_orm::{ColumnTrait, QueryFilter};

    RoleEntity::find()
        .filter(RoleCol::CourseId.eq(course_id))
        .filter(RoleCol::Role.eq(Role::Faculty))
        .one(db)
        .await?
        .map(|r| r.user_id)
        .ok_or_else(|| DbErr::Custom(format!("course {course_id} has no faculty assigned")))
}
