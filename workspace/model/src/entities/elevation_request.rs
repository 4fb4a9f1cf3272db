use super::user;
use sea_orm::entity::prelude::*;

/// Lifecycle state of a role-elevation request.
/// PENDING transitions to APPROVED or REJECTED exactly once; terminal
/// states are never re-opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RequestStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

/// A request by an account to be promoted above USER, backed by an
/// identity-proof document.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "elevation_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The requesting account. Usernames are unique and immutable.
    pub username: String,
    pub requested_role: user::UserRole,
    pub status: RequestStatus,
    /// Opaque reference into the proof-document store.
    pub document_id: i32,
    pub submitted_at: DateTimeUtc,
    /// Note left by the reviewing admin on approval or rejection.
    pub admin_note: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A request belongs to one account.
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::Username",
        to = "super::user::Column::Username"
    )]
    User,
    /// The identity-proof document backing the request.
    #[sea_orm(
        belongs_to = "super::proof_document::Entity",
        from = "Column::DocumentId",
        to = "super::proof_document::Column::Id"
    )]
    ProofDocument,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::proof_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProofDocument.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
