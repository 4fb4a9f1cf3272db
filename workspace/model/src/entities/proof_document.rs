use sea_orm::entity::prelude::*;

/// An uploaded identity-proof file, stored directly in the database so the
/// deployment has no file system to manage. Retrievable only by an admin
/// through the review endpoints.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "proof_documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Original filename as uploaded, e.g. "passport_front.jpg".
    pub file_name: String,
    /// MIME type: "image/jpeg", "image/png" or "application/pdf".
    pub content_type: String,
    /// Size kept separately so listings do not need to touch the blob.
    pub size_bytes: i64,
    pub data: Vec<u8>,
    pub uploaded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::elevation_request::Entity")]
    ElevationRequest,
}

impl Related<super::elevation_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ElevationRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
