use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::str::FromStr;
use strum::{Display, EnumString};

use crate::models::check_in::Channel;

type HmacSha256 = Hmac<Sha256>;

/// A class session students check in to.
///
/// The session carries its own token material: a per-session random secret
/// and a monotonically increasing `token_nonce`. The current check-in code is
/// derived from both, so bumping the nonce invalidates every previously
/// issued code at once.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub course_id: i64,
    pub created_by: i64,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Human-readable venue, e.g. "Lab 2".
    pub location_name: String,
    /// Registered coordinates. When present, check-in proximity is enforced.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Comma-separated set of permitted check-in channels.
    pub channels: String,
    pub status: SessionStatus,
    /// Per-session token secret (hex).
    #[serde(skip_serializing)]
    pub secret: String,
    /// Bumped on every token mint; keys the current code.
    pub token_nonce: i64,
    /// Expiry of the currently minted token; `None` before first activation.
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session lifecycle. Transitions are one-way: Scheduled → Active → Closed.
#[derive(
    Debug, Clone, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_session_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SessionStatus {
    #[sea_orm(string_value = "scheduled")]
    Scheduled,

    #[sea_orm(string_value = "active")]
    Active,

    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::check_in::Entity")]
    CheckIns,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::check_in::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckIns.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Inserts a session in the Scheduled state with a fresh random secret.
    ///
    /// Input validation (time ordering, channel set) belongs to the session
    /// registry; this is the mechanical insert.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &DatabaseConnection,
        course_id: i64,
        created_by: i64,
        title: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        location_name: &str,
        coordinates: Option<(f64, f64)>,
        channels: &[Channel],
        secret_hex: Option<&str>,
    ) -> Result<Self, DbErr> {
        let secret = match secret_hex {
            Some(s) => s.to_owned(),
            None => {
                use rand::RngCore;
                let mut buf = [0u8; 32];
                rand::rngs::OsRng.fill_bytes(&mut buf);
                hex::encode(buf)
            }
        };

        let session = ActiveModel {
            course_id: Set(course_id),
            created_by: Set(created_by),
            title: Set(title.to_owned()),
            starts_at: Set(starts_at),
            ends_at: Set(ends_at),
            location_name: Set(location_name.to_owned()),
            latitude: Set(coordinates.map(|(lat, _)| lat)),
            longitude: Set(coordinates.map(|(_, lon)| lon)),
            channels: Set(encode_channels(channels)),
            status: Set(SessionStatus::Scheduled),
            secret: Set(secret),
            token_nonce: Set(0),
            token_expires_at: Set(None),
            ..Default::default()
        };

        session.insert(db).await
    }

    pub async fn get_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Parses the stored channel set. Unknown entries were rejected on the
    /// way in, so they are silently skipped here.
    pub fn channel_set(&self) -> Vec<Channel> {
        self.channels
            .split(',')
            .filter_map(|c| Channel::from_str(c.trim()).ok())
            .collect()
    }

    pub fn allows(&self, channel: &Channel) -> bool {
        self.channel_set().contains(channel)
    }

    /// Registered coordinates, when the session declares a location constraint.
    pub fn registered_coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Derives the 6-digit check-in code for a given nonce.
    pub fn code_for_nonce(&self, nonce: i64) -> String {
        const DIGITS: u32 = 6;
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC key");
        mac.update(&nonce.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        let offset = (digest[31] & 0x0f) as usize;
        let slice = &digest[offset..offset + 4];
        let val = u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]) & 0x7fff_ffff;

        let modulus = 10u32.pow(DIGITS);
        let num = val % modulus;

        let mut s = num.to_string();
        while s.len() < DIGITS as usize {
            s.insert(0, '0');
        }
        s
    }

    /// The code bound to the currently minted token.
    pub fn current_code(&self) -> String {
        self.code_for_nonce(self.token_nonce)
    }
}

/// Serializes a channel set into its stored comma-separated form.
pub fn encode_channels(channels: &[Channel]) -> String {
    channels
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
