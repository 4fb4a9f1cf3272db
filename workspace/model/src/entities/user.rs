use sea_orm::entity::prelude::*;

/// Application role, stored as a string column.
/// Registration always starts at `User`; the elevated roles are only
/// reachable through the review workflow or the admin seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum UserRole {
    #[sea_orm(string_value = "USER")]
    User,
    #[sea_orm(string_value = "ANALYST")]
    Analyst,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

/// Represents an account of the platform.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    /// Argon2id hash; the plaintext password is never stored.
    pub password_hash: String,
    pub role: UserRole,
    /// Marks the seeded admin identity, which cannot be demoted or deleted.
    #[sea_orm(default_value = "false")]
    pub protected: bool,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A user can submit elevation requests over time.
    #[sea_orm(has_many = "super::elevation_request::Entity")]
    ElevationRequest,
    /// Live bearer sessions issued to this user.
    #[sea_orm(has_many = "super::session_token::Entity")]
    SessionToken,
}

impl Related<super::elevation_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ElevationRequest.def()
    }
}

impl Related<super::session_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SessionToken.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
