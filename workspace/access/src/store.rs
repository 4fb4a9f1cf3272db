//! Abstract persistence contract consumed by the access manager.
//!
//! Concrete transport — an embedded database, an in-memory map, or a remote
//! service — is an implementation detail of the store. The manager performs
//! every authorization check itself, in front of these calls; a store never
//! sees an unauthorized admin-scoped operation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AccessError, Result};
use crate::role::Role;

/// Lifecycle state of a role-elevation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Profile fields mutable by the account owner only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub avatar_url: Option<String>,
}

/// Field-wise profile update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub avatar_url: Option<String>,
}

/// A stored account record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Unique and immutable after creation.
    pub username: String,
    pub email: String,
    /// Argon2id hash; never the plaintext password.
    pub password_hash: String,
    pub role: Role,
    /// True only for the seeded admin identity.
    pub protected: bool,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub protected: bool,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

/// A role-elevation request and its review metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevationRequest {
    pub id: i32,
    pub username: String,
    pub requested_role: Role,
    pub status: RequestStatus,
    /// Opaque reference into the document store.
    pub document_ref: i32,
    pub submitted_at: DateTime<Utc>,
    pub admin_note: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewElevationRequest {
    pub username: String,
    pub requested_role: Role,
    pub document_ref: i32,
    pub submitted_at: DateTime<Utc>,
}

/// Review outcome applied to a PENDING request.
#[derive(Debug, Clone)]
pub struct ReviewUpdate {
    pub status: RequestStatus,
    pub admin_note: Option<String>,
    pub reviewed_by: String,
    pub reviewed_at: DateTime<Utc>,
}

/// An uploaded identity-proof file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofDocument {
    pub id: i32,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub data: Vec<u8>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProofDocument {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub uploaded_at: DateTime<Utc>,
}

/// A persisted bearer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    pub username: String,
    /// Role snapshot taken at login.
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

/// Persistence contract for accounts, elevation requests, and proof
/// documents.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// Fails with [`AccessError::DuplicateUsername`] when the username is
    /// already taken.
    async fn insert_account(&self, account: NewAccount) -> Result<Account>;

    async fn list_accounts(&self) -> Result<Vec<Account>>;

    async fn update_account_role(&self, username: &str, role: Role) -> Result<()>;

    async fn update_account_profile(
        &self,
        username: &str,
        update: ProfileUpdate,
    ) -> Result<Account>;

    async fn update_account_password(&self, username: &str, password_hash: &str) -> Result<()>;

    /// Removes the account together with its requests and sessions.
    async fn delete_account_record(&self, username: &str) -> Result<()>;

    /// Fails with [`AccessError::DuplicatePending`] when the account
    /// already has a PENDING request.
    async fn insert_request(&self, request: NewElevationRequest) -> Result<ElevationRequest>;

    async fn find_request(&self, request_id: i32) -> Result<Option<ElevationRequest>>;

    async fn find_pending_request_for(&self, username: &str) -> Result<Option<ElevationRequest>>;

    /// Requests with the given status, oldest `submitted_at` first.
    async fn list_requests_by_status(&self, status: RequestStatus) -> Result<Vec<ElevationRequest>>;

    /// Fails with [`AccessError::NotFound`] when the request does not exist
    /// or is no longer PENDING.
    async fn update_request_status(&self, request_id: i32, review: ReviewUpdate) -> Result<()>;

    /// Applies an approval as one unit: the request becomes APPROVED and
    /// the owning account's role becomes the requested role.
    ///
    /// The default implementation issues the two writes separately and is
    /// not atomic: when the second write fails after the first succeeded it
    /// re-reads the persisted state and reports
    /// [`AccessError::PartialFailure`] so the caller knows to refresh.
    /// Backends with transactions override this with a single atomic
    /// commit.
    async fn commit_approval(
        &self,
        request_id: i32,
        review: ReviewUpdate,
    ) -> Result<ElevationRequest> {
        let request = self
            .find_request(request_id)
            .await?
            .ok_or(AccessError::NotFound)?;
        if request.status != RequestStatus::Pending {
            return Err(AccessError::NotFound);
        }

        self.update_account_role(&request.username, request.requested_role)
            .await?;

        if let Err(err) = self.update_request_status(request_id, review).await {
            // Reconcile: did the status write land despite the error?
            let persisted = self.find_request(request_id).await.ok().flatten();
            let still_pending = persisted
                .map(|r| r.status == RequestStatus::Pending)
                .unwrap_or(true);
            if still_pending {
                return Err(AccessError::PartialFailure(format!(
                    "role of '{}' was updated but request {} is still pending: {}",
                    request.username, request_id, err
                )));
            }
            return Err(err);
        }

        self.find_request(request_id)
            .await?
            .ok_or(AccessError::NotFound)
    }

    /// Persists the document and returns its opaque reference.
    async fn store_document(&self, document: NewProofDocument) -> Result<i32>;

    async fn fetch_document(&self, document_ref: i32) -> Result<Option<ProofDocument>>;
}

/// Holds bearer sessions for their lifetime.
#[async_trait]
pub trait SessionCarrier: Send + Sync {
    async fn insert_session(&self, session: StoredSession) -> Result<()>;

    async fn find_session(&self, token: &str) -> Result<Option<StoredSession>>;

    /// Idempotent; revoking an unknown token is not an error.
    async fn revoke_session(&self, token: &str) -> Result<()>;

    async fn revoke_sessions_for(&self, username: &str) -> Result<()>;

    /// Drops sessions that expired before `now`; returns how many.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;
}
