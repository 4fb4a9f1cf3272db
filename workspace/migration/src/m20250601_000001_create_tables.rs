use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .col(string(Users::Email))
                    .col(string(Users::PasswordHash))
                    .col(string(Users::Role))
                    .col(boolean(Users::Protected).default(false))
                    .col(string_null(Users::DisplayName))
                    .col(string_null(Users::Phone))
                    .col(date_null(Users::DateOfBirth))
                    .col(string_null(Users::Gender))
                    .col(string_null(Users::AvatarUrl))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Create proof_documents table
        manager
            .create_table(
                Table::create()
                    .table(ProofDocuments::Table)
                    .if_not_exists()
                    .col(pk_auto(ProofDocuments::Id))
                    .col(string(ProofDocuments::FileName))
                    .col(string(ProofDocuments::ContentType))
                    .col(big_integer(ProofDocuments::SizeBytes))
                    .col(binary(ProofDocuments::Data))
                    .col(timestamp_with_time_zone(ProofDocuments::UploadedAt))
                    .to_owned(),
            )
            .await?;

        // Create elevation_requests table
        manager
            .create_table(
                Table::create()
                    .table(ElevationRequests::Table)
                    .if_not_exists()
                    .col(pk_auto(ElevationRequests::Id))
                    .col(string(ElevationRequests::Username))
                    .col(string(ElevationRequests::RequestedRole))
                    .col(string(ElevationRequests::Status))
                    .col(integer(ElevationRequests::DocumentId))
                    .col(timestamp_with_time_zone(ElevationRequests::SubmittedAt))
                    .col(string_null(ElevationRequests::AdminNote))
                    .col(string_null(ElevationRequests::ReviewedBy))
                    .col(timestamp_with_time_zone_null(ElevationRequests::ReviewedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_elevation_request_user")
                            .from(ElevationRequests::Table, ElevationRequests::Username)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_elevation_request_document")
                            .from(ElevationRequests::Table, ElevationRequests::DocumentId)
                            .to(ProofDocuments::Table, ProofDocuments::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create session_tokens table
        manager
            .create_table(
                Table::create()
                    .table(SessionTokens::Table)
                    .if_not_exists()
                    .col(pk_auto(SessionTokens::Id))
                    .col(string(SessionTokens::Token).unique_key())
                    .col(string(SessionTokens::Username))
                    .col(string(SessionTokens::Role))
                    .col(timestamp_with_time_zone(SessionTokens::CreatedAt))
                    .col(timestamp_with_time_zone(SessionTokens::ExpiresAt))
                    .col(boolean(SessionTokens::Revoked).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_token_user")
                            .from(SessionTokens::Table, SessionTokens::Username)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ElevationRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProofDocuments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    Role,
    Protected,
    DisplayName,
    Phone,
    DateOfBirth,
    Gender,
    AvatarUrl,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ProofDocuments {
    Table,
    Id,
    FileName,
    ContentType,
    SizeBytes,
    Data,
    UploadedAt,
}

#[derive(DeriveIden)]
enum ElevationRequests {
    Table,
    Id,
    Username,
    RequestedRole,
    Status,
    DocumentId,
    SubmittedAt,
    AdminNote,
    ReviewedBy,
    ReviewedAt,
}

#[derive(DeriveIden)]
enum SessionTokens {
    Table,
    Id,
    Token,
    Username,
    Role,
    CreatedAt,
    ExpiresAt,
    Revoked,
}
