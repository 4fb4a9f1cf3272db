//! SeaORM-backed store. This is the production implementation of the
//! persistence contract; approvals are committed inside a database
//! transaction so a half-applied state is never observable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::entities::{elevation_request, proof_document, session_token, user};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, instrument};

use crate::error::{AccessError, Result};
use crate::role::Role;
use crate::store::{
    Account, Directory, ElevationRequest, NewAccount, NewElevationRequest, NewProofDocument,
    Profile, ProfileUpdate, ProofDocument, RequestStatus, ReviewUpdate, SessionCarrier,
    StoredSession,
};

#[derive(Debug, Clone)]
pub struct OrmStore {
    db: DatabaseConnection,
}

impl OrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn role_to_db(role: Role) -> user::UserRole {
    match role {
        Role::User => user::UserRole::User,
        Role::Analyst => user::UserRole::Analyst,
        Role::Admin => user::UserRole::Admin,
    }
}

fn role_from_db(role: user::UserRole) -> Role {
    match role {
        user::UserRole::User => Role::User,
        user::UserRole::Analyst => Role::Analyst,
        user::UserRole::Admin => Role::Admin,
    }
}

fn status_to_db(status: RequestStatus) -> elevation_request::RequestStatus {
    match status {
        RequestStatus::Pending => elevation_request::RequestStatus::Pending,
        RequestStatus::Approved => elevation_request::RequestStatus::Approved,
        RequestStatus::Rejected => elevation_request::RequestStatus::Rejected,
    }
}

fn status_from_db(status: elevation_request::RequestStatus) -> RequestStatus {
    match status {
        elevation_request::RequestStatus::Pending => RequestStatus::Pending,
        elevation_request::RequestStatus::Approved => RequestStatus::Approved,
        elevation_request::RequestStatus::Rejected => RequestStatus::Rejected,
    }
}

fn account_from_model(model: user::Model) -> Account {
    Account {
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        role: role_from_db(model.role),
        protected: model.protected,
        profile: Profile {
            display_name: model.display_name,
            phone: model.phone,
            date_of_birth: model.date_of_birth,
            gender: model.gender,
            avatar_url: model.avatar_url,
        },
        created_at: model.created_at,
    }
}

fn request_from_model(model: elevation_request::Model) -> ElevationRequest {
    ElevationRequest {
        id: model.id,
        username: model.username,
        requested_role: role_from_db(model.requested_role),
        status: status_from_db(model.status),
        document_ref: model.document_id,
        submitted_at: model.submitted_at,
        admin_note: model.admin_note,
        reviewed_by: model.reviewed_by,
        reviewed_at: model.reviewed_at,
    }
}

fn session_from_model(model: session_token::Model) -> StoredSession {
    StoredSession {
        token: model.token,
        username: model.username,
        role: role_from_db(model.role),
        created_at: model.created_at,
        expires_at: model.expires_at,
        revoked: model.revoked,
    }
}

#[async_trait]
impl Directory for OrmStore {
    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;
        Ok(found.map(account_from_model))
    }

    #[instrument(skip(self, account), fields(username = %account.username))]
    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        let active = user::ActiveModel {
            username: Set(account.username),
            email: Set(account.email),
            password_hash: Set(account.password_hash),
            role: Set(role_to_db(account.role)),
            protected: Set(account.protected),
            display_name: Set(account.profile.display_name),
            phone: Set(account.profile.phone),
            date_of_birth: Set(account.profile.date_of_birth),
            gender: Set(account.profile.gender),
            avatar_url: Set(account.profile.avatar_url),
            created_at: Set(account.created_at),
            ..Default::default()
        };
        match active.insert(&self.db).await {
            Ok(model) => Ok(account_from_model(model)),
            Err(err) => {
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    Err(AccessError::DuplicateUsername)
                } else {
                    Err(err.into())
                }
            }
        }
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let accounts = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(&self.db)
            .await?;
        Ok(accounts.into_iter().map(account_from_model).collect())
    }

    async fn update_account_role(&self, username: &str, role: Role) -> Result<()> {
        let updated = user::Entity::update_many()
            .col_expr(user::Column::Role, Expr::value(role_to_db(role)))
            .filter(user::Column::Username.eq(username))
            .exec(&self.db)
            .await?;
        if updated.rows_affected == 0 {
            return Err(AccessError::NotFound);
        }
        Ok(())
    }

    async fn update_account_profile(
        &self,
        username: &str,
        update: ProfileUpdate,
    ) -> Result<Account> {
        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or(AccessError::NotFound)?;

        let mut active: user::ActiveModel = existing.into();
        if let Some(display_name) = update.display_name {
            active.display_name = Set(Some(display_name));
        }
        if let Some(phone) = update.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(date_of_birth) = update.date_of_birth {
            active.date_of_birth = Set(Some(date_of_birth));
        }
        if let Some(gender) = update.gender {
            active.gender = Set(Some(gender));
        }
        if let Some(avatar_url) = update.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        let updated = active.update(&self.db).await?;
        Ok(account_from_model(updated))
    }

    async fn update_account_password(&self, username: &str, password_hash: &str) -> Result<()> {
        let updated = user::Entity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .filter(user::Column::Username.eq(username))
            .exec(&self.db)
            .await?;
        if updated.rows_affected == 0 {
            return Err(AccessError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_account_record(&self, username: &str) -> Result<()> {
        // Explicit deletes keep referential integrity even on backends
        // where cascading foreign keys are not enabled.
        let txn = self.db.begin().await?;
        session_token::Entity::delete_many()
            .filter(session_token::Column::Username.eq(username))
            .exec(&txn)
            .await?;
        elevation_request::Entity::delete_many()
            .filter(elevation_request::Column::Username.eq(username))
            .exec(&txn)
            .await?;
        let deleted = user::Entity::delete_many()
            .filter(user::Column::Username.eq(username))
            .exec(&txn)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(AccessError::NotFound);
        }
        txn.commit().await?;
        debug!(username, "account record deleted");
        Ok(())
    }

    async fn insert_request(&self, request: NewElevationRequest) -> Result<ElevationRequest> {
        let txn = self.db.begin().await?;
        let pending = elevation_request::Entity::find()
            .filter(elevation_request::Column::Username.eq(&request.username))
            .filter(
                elevation_request::Column::Status.eq(elevation_request::RequestStatus::Pending),
            )
            .one(&txn)
            .await?;
        if pending.is_some() {
            return Err(AccessError::DuplicatePending);
        }
        let inserted = elevation_request::ActiveModel {
            username: Set(request.username),
            requested_role: Set(role_to_db(request.requested_role)),
            status: Set(elevation_request::RequestStatus::Pending),
            document_id: Set(request.document_ref),
            submitted_at: Set(request.submitted_at),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(request_from_model(inserted))
    }

    async fn find_request(&self, request_id: i32) -> Result<Option<ElevationRequest>> {
        let found = elevation_request::Entity::find_by_id(request_id)
            .one(&self.db)
            .await?;
        Ok(found.map(request_from_model))
    }

    async fn find_pending_request_for(&self, username: &str) -> Result<Option<ElevationRequest>> {
        let found = elevation_request::Entity::find()
            .filter(elevation_request::Column::Username.eq(username))
            .filter(
                elevation_request::Column::Status.eq(elevation_request::RequestStatus::Pending),
            )
            .one(&self.db)
            .await?;
        Ok(found.map(request_from_model))
    }

    async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<ElevationRequest>> {
        let requests = elevation_request::Entity::find()
            .filter(elevation_request::Column::Status.eq(status_to_db(status)))
            .order_by_asc(elevation_request::Column::SubmittedAt)
            .order_by_asc(elevation_request::Column::Id)
            .all(&self.db)
            .await?;
        Ok(requests.into_iter().map(request_from_model).collect())
    }

    async fn update_request_status(&self, request_id: i32, review: ReviewUpdate) -> Result<()> {
        // Conditional update: only a PENDING row may transition, so terminal
        // states are never re-opened even under concurrent reviewers.
        let updated = elevation_request::Entity::update_many()
            .col_expr(
                elevation_request::Column::Status,
                Expr::value(status_to_db(review.status)),
            )
            .col_expr(
                elevation_request::Column::AdminNote,
                Expr::value(review.admin_note),
            )
            .col_expr(
                elevation_request::Column::ReviewedBy,
                Expr::value(Some(review.reviewed_by)),
            )
            .col_expr(
                elevation_request::Column::ReviewedAt,
                Expr::value(Some(review.reviewed_at)),
            )
            .filter(elevation_request::Column::Id.eq(request_id))
            .filter(
                elevation_request::Column::Status.eq(elevation_request::RequestStatus::Pending),
            )
            .exec(&self.db)
            .await?;
        if updated.rows_affected == 0 {
            return Err(AccessError::NotFound);
        }
        Ok(())
    }

    // Transactional override: the role change and the status change commit
    // together or not at all.
    #[instrument(skip(self, review))]
    async fn commit_approval(
        &self,
        request_id: i32,
        review: ReviewUpdate,
    ) -> Result<ElevationRequest> {
        let txn = self.db.begin().await?;

        let request = elevation_request::Entity::find_by_id(request_id)
            .one(&txn)
            .await?
            .ok_or(AccessError::NotFound)?;
        if request.status != elevation_request::RequestStatus::Pending {
            return Err(AccessError::NotFound);
        }

        let account = user::Entity::find()
            .filter(user::Column::Username.eq(&request.username))
            .one(&txn)
            .await?
            .ok_or(AccessError::NotFound)?;
        let mut account: user::ActiveModel = account.into();
        account.role = Set(request.requested_role);
        account.update(&txn).await?;

        let mut updated: elevation_request::ActiveModel = request.into();
        updated.status = Set(status_to_db(review.status));
        updated.admin_note = Set(review.admin_note);
        updated.reviewed_by = Set(Some(review.reviewed_by));
        updated.reviewed_at = Set(Some(review.reviewed_at));
        let updated = updated.update(&txn).await?;

        txn.commit().await?;
        debug!(request_id, "approval committed");
        Ok(request_from_model(updated))
    }

    async fn store_document(&self, document: NewProofDocument) -> Result<i32> {
        let size_bytes = document.data.len() as i64;
        let inserted = proof_document::ActiveModel {
            file_name: Set(document.file_name),
            content_type: Set(document.content_type),
            size_bytes: Set(size_bytes),
            data: Set(document.data),
            uploaded_at: Set(document.uploaded_at),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(inserted.id)
    }

    async fn fetch_document(&self, document_ref: i32) -> Result<Option<ProofDocument>> {
        let found = proof_document::Entity::find_by_id(document_ref)
            .one(&self.db)
            .await?;
        Ok(found.map(|model| ProofDocument {
            id: model.id,
            file_name: model.file_name,
            content_type: model.content_type,
            size_bytes: model.size_bytes,
            data: model.data,
            uploaded_at: model.uploaded_at,
        }))
    }
}

#[async_trait]
impl SessionCarrier for OrmStore {
    async fn insert_session(&self, session: StoredSession) -> Result<()> {
        session_token::ActiveModel {
            token: Set(session.token),
            username: Set(session.username),
            role: Set(role_to_db(session.role)),
            created_at: Set(session.created_at),
            expires_at: Set(session.expires_at),
            revoked: Set(session.revoked),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<StoredSession>> {
        let found = session_token::Entity::find()
            .filter(session_token::Column::Token.eq(token))
            .one(&self.db)
            .await?;
        Ok(found.map(session_from_model))
    }

    async fn revoke_session(&self, token: &str) -> Result<()> {
        session_token::Entity::update_many()
            .col_expr(session_token::Column::Revoked, Expr::value(true))
            .filter(session_token::Column::Token.eq(token))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn revoke_sessions_for(&self, username: &str) -> Result<()> {
        session_token::Entity::update_many()
            .col_expr(session_token::Column::Revoked, Expr::value(true))
            .filter(session_token::Column::Username.eq(username))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let deleted = session_token::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(session_token::Column::ExpiresAt.lte(now))
                    .add(session_token::Column::Revoked.eq(true)),
            )
            .exec(&self.db)
            .await?;
        Ok(deleted.rows_affected)
    }
}
