use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One accepted check-in.
///
/// The composite primary key is the at-most-one rule: a second accepted
/// check-in for the same (session, student) pair cannot be inserted.
/// Rejected attempts are never stored here; they only reach the audit log.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "check_ins")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    pub taken_at: DateTime<Utc>,
    pub channel: Channel,
    pub status: CheckInStatus,
    /// Coordinates presented at validation time, if any.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Faculty member who recorded a manual roll-call entry.
    pub recorded_by: Option<i64>,
}

/// How a student checked in.
#[derive(
    Debug, Clone, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "check_in_channel")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Channel {
    #[sea_orm(string_value = "qr")]
    Qr,

    #[sea_orm(string_value = "manual")]
    Manual,

    #[sea_orm(string_value = "card")]
    Card,

    #[sea_orm(string_value = "kiosk")]
    Kiosk,
}

/// Classification of an accepted check-in. Absence is never stored; it is
/// derived by the aggregator as "enrolled, session ran, no record".
#[derive(
    Debug, Clone, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "check_in_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CheckInStatus {
    #[sea_orm(string_value = "present")]
    Present,

    #[sea_orm(string_value = "late")]
    Late,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_session::Entity",
        from = "Column::SessionId",
        to = "super::attendance_session::Column::Id"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
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
    pub async fn exists(
        db: &DatabaseConnection,
        session_id: i64,
        user_id: i64,
    ) -> Result<bool, DbErr> {
        let found = Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::UserId.eq(user_id))
            .one(db)
            .await?;
        Ok(found.is_some())
    }

    /// All accepted check-ins of a session, earliest first.
    pub async fn for_session(
        db: &DatabaseConnection,
        session_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .order_by_asc(Column::TakenAt)
            .all(db)
            .await
    }
}
