//! The Access Control & Request Lifecycle Manager.
//!
//! All account and request state is mutated through the operations on
//! [`AccessManager`]; the surrounding application never writes to the store
//! directly. Admin-scoped operations verify the caller's role before any
//! store access, so an unauthorized caller learns nothing about whether the
//! targeted resource exists. Every operation runs under a bounded timeout
//! and mutates nothing speculatively.

use std::future::Future;
use std::time::Duration;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{AccessError, Result};
use crate::role::{can_access, Role, Session};
use crate::store::{
    Account, Directory, ElevationRequest, NewAccount, NewElevationRequest, NewProofDocument,
    Profile, ProfileUpdate, ProofDocument, RequestStatus, ReviewUpdate, SessionCarrier,
    StoredSession,
};

/// MIME types accepted for identity-proof uploads.
const ALLOWED_DOCUMENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// Tunables of the manager.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    /// Upper bound for any single operation against the store.
    pub op_timeout: Duration,
    /// Lifetime of a bearer session issued at login.
    pub session_ttl: chrono::Duration,
    /// Upper bound on an identity-proof upload.
    pub max_document_bytes: usize,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_secs(10),
            session_ttl: chrono::Duration::hours(12),
            max_document_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Input to [`AccessManager::register`].
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    /// The role the caller wants. Never grants anything above USER
    /// directly; ANALYST opens a PENDING elevation request instead.
    pub requested_role: Role,
    /// Required when `requested_role` is above USER.
    pub document_ref: Option<i32>,
}

/// An identity-proof file as received from the caller.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct AccessManager<S> {
    store: S,
    policy: AccessPolicy,
}

impl<S> AccessManager<S> {
    pub fn new(store: S) -> Self {
        Self::with_policy(store, AccessPolicy::default())
    }

    pub fn with_policy(store: S, policy: AccessPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccessError::Store(format!("password hashing failed: {err}")))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn validate_password_strength(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AccessError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AccessError::Validation(
            "password must contain at least one uppercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AccessError::Validation(
            "password must contain at least one number".to_string(),
        ));
    }
    Ok(())
}

fn require_admin(session: &Session) -> Result<()> {
    if !can_access(Some(session), Some(Role::Admin)) {
        return Err(AccessError::Unauthorized);
    }
    Ok(())
}

impl<S> AccessManager<S>
where
    S: Directory + SessionCarrier,
{
    /// Bounds `fut` by the configured operation timeout.
    async fn timed<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        match tokio::time::timeout(self.policy.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AccessError::Timeout),
        }
    }

    /// Creates an account. The stored role is always USER; a request for
    /// ANALYST opens a PENDING elevation request backed by `document_ref`.
    #[instrument(skip(self, input), fields(username = %input.username, requested_role = %input.requested_role))]
    pub async fn register(&self, input: RegisterInput) -> Result<Account> {
        self.timed(async {
            let username = input.username.trim();
            if username.is_empty() {
                return Err(AccessError::Validation("username is required".to_string()));
            }
            if !input.email.contains('@') {
                return Err(AccessError::Validation(
                    "a valid email address is required".to_string(),
                ));
            }
            validate_password_strength(&input.password)?;

            // ADMIN is seeded only; everything else above USER goes through
            // the review workflow.
            if input.requested_role == Role::Admin {
                return Err(AccessError::Validation(
                    "registration is only allowed for USER or ANALYST roles".to_string(),
                ));
            }
            let document_ref = if input.requested_role.is_elevated() {
                let document_ref = input.document_ref.ok_or_else(|| {
                    AccessError::Validation(
                        "an identity-proof document is required for analyst registration"
                            .to_string(),
                    )
                })?;
                if self.store.fetch_document(document_ref).await?.is_none() {
                    return Err(AccessError::Validation(
                        "the referenced proof document does not exist".to_string(),
                    ));
                }
                Some(document_ref)
            } else {
                None
            };

            if self.store.find_account_by_username(username).await?.is_some() {
                return Err(AccessError::DuplicateUsername);
            }

            let now = Utc::now();
            let account = self
                .store
                .insert_account(NewAccount {
                    username: username.to_string(),
                    email: input.email.clone(),
                    password_hash: hash_password(&input.password)?,
                    role: Role::User,
                    protected: false,
                    profile: Profile::default(),
                    created_at: now,
                })
                .await?;

            if let Some(document_ref) = document_ref {
                self.store
                    .insert_request(NewElevationRequest {
                        username: account.username.clone(),
                        requested_role: input.requested_role,
                        document_ref,
                        submitted_at: now,
                    })
                    .await?;
                info!(username = %account.username, "elevation request opened at registration");
            }

            Ok(account)
        })
        .await
    }

    /// Verifies the credentials and issues a bearer session seeded with the
    /// account's current role. A pending elevation request never blocks
    /// login; it only withholds the elevated role.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Session> {
        self.timed(async {
            let account = self
                .store
                .find_account_by_username(username)
                .await?
                .ok_or(AccessError::InvalidCredentials)?;
            if !verify_password(password, &account.password_hash) {
                return Err(AccessError::InvalidCredentials);
            }

            let now = Utc::now();
            let purged = self.store.purge_expired_sessions(now).await?;
            if purged > 0 {
                debug!(purged, "dropped stale sessions");
            }

            let session = StoredSession {
                token: Uuid::new_v4().to_string(),
                username: account.username.clone(),
                role: account.role,
                created_at: now,
                expires_at: now + self.policy.session_ttl,
                revoked: false,
            };
            self.store.insert_session(session.clone()).await?;
            info!(username = %account.username, role = %account.role, "login succeeded");

            Ok(Session {
                token: session.token,
                username: session.username,
                role: session.role,
                expires_at: session.expires_at,
            })
        })
        .await
    }

    /// Maps a presented bearer token to a live session.
    pub async fn resolve_session(&self, token: &str) -> Result<Session> {
        self.timed(async {
            let stored = self
                .store
                .find_session(token)
                .await?
                .ok_or(AccessError::Unauthorized)?;
            if stored.revoked || stored.expires_at <= Utc::now() {
                return Err(AccessError::Unauthorized);
            }
            Ok(Session {
                token: stored.token,
                username: stored.username,
                role: stored.role,
                expires_at: stored.expires_at,
            })
        })
        .await
    }

    /// Revokes the bearer token. Unknown tokens are ignored.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.timed(self.store.revoke_session(token)).await
    }

    /// Validates and persists an identity-proof upload, returning its
    /// opaque reference.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, content_type = %upload.content_type))]
    pub async fn store_proof_document(&self, upload: DocumentUpload) -> Result<i32> {
        self.timed(async {
            if !ALLOWED_DOCUMENT_TYPES.contains(&upload.content_type.as_str()) {
                return Err(AccessError::Validation(format!(
                    "invalid file type: {}. Only JPEG, PNG, and PDF files are accepted",
                    upload.content_type
                )));
            }
            if upload.data.is_empty() {
                return Err(AccessError::Validation("file must not be empty".to_string()));
            }
            if upload.data.len() > self.policy.max_document_bytes {
                return Err(AccessError::Validation(format!(
                    "file too large: {} bytes exceeds the {} byte limit",
                    upload.data.len(),
                    self.policy.max_document_bytes
                )));
            }
            let file_name = if upload.file_name.trim().is_empty() {
                "document".to_string()
            } else {
                upload.file_name
            };
            self.store
                .store_document(NewProofDocument {
                    file_name,
                    content_type: upload.content_type,
                    data: upload.data,
                    uploaded_at: Utc::now(),
                })
                .await
        })
        .await
    }

    /// Opens a PENDING elevation request for the calling account.
    #[instrument(skip(self, session), fields(username = %session.username, requested_role = %requested_role))]
    pub async fn submit_elevation(
        &self,
        session: &Session,
        requested_role: Role,
        document_ref: i32,
    ) -> Result<ElevationRequest> {
        self.timed(async {
            if !requested_role.is_elevated() {
                return Err(AccessError::Validation(
                    "the requested role must be above USER".to_string(),
                ));
            }
            let account = self
                .store
                .find_account_by_username(&session.username)
                .await?
                .ok_or(AccessError::Unauthorized)?;
            if account.role == requested_role {
                return Err(AccessError::Validation(
                    "the account already holds the requested role".to_string(),
                ));
            }
            if self.store.fetch_document(document_ref).await?.is_none() {
                return Err(AccessError::Validation(
                    "the referenced proof document does not exist".to_string(),
                ));
            }
            if self
                .store
                .find_pending_request_for(&account.username)
                .await?
                .is_some()
            {
                return Err(AccessError::DuplicatePending);
            }
            let request = self
                .store
                .insert_request(NewElevationRequest {
                    username: account.username,
                    requested_role,
                    document_ref,
                    submitted_at: Utc::now(),
                })
                .await?;
            info!(request_id = request.id, "elevation request submitted");
            Ok(request)
        })
        .await
    }

    /// The caller's own PENDING request, if any.
    pub async fn my_pending_request(&self, session: &Session) -> Result<Option<ElevationRequest>> {
        self.timed(self.store.find_pending_request_for(&session.username))
            .await
    }

    /// All PENDING requests, oldest first. ADMIN only.
    pub async fn list_pending_requests(&self, session: &Session) -> Result<Vec<ElevationRequest>> {
        require_admin(session)?;
        self.timed(self.store.list_requests_by_status(RequestStatus::Pending))
            .await
    }

    /// Approves a PENDING request: the request turns APPROVED and the
    /// account's role becomes the requested role, as one atomic unit.
    /// ADMIN only.
    #[instrument(skip(self, session, note), fields(reviewer = %session.username))]
    pub async fn approve_request(
        &self,
        session: &Session,
        request_id: i32,
        note: Option<String>,
    ) -> Result<ElevationRequest> {
        require_admin(session)?;
        self.timed(async {
            let request = self
                .store
                .find_request(request_id)
                .await?
                .ok_or(AccessError::NotFound)?;
            if request.status != RequestStatus::Pending {
                return Err(AccessError::NotFound);
            }
            // The seed admin is the only ADMIN; an ADMIN request can be
            // submitted but never approved.
            if request.requested_role == Role::Admin {
                return Err(AccessError::ForbiddenOperation);
            }
            let approved = self
                .store
                .commit_approval(
                    request_id,
                    ReviewUpdate {
                        status: RequestStatus::Approved,
                        admin_note: note,
                        reviewed_by: session.username.clone(),
                        reviewed_at: Utc::now(),
                    },
                )
                .await?;
            info!(request_id, username = %approved.username, "request approved");
            Ok(approved)
        })
        .await
    }

    /// Rejects a PENDING request; the account's role is unchanged. ADMIN
    /// only.
    #[instrument(skip(self, session, note), fields(reviewer = %session.username))]
    pub async fn reject_request(
        &self,
        session: &Session,
        request_id: i32,
        note: Option<String>,
    ) -> Result<ElevationRequest> {
        require_admin(session)?;
        self.timed(async {
            self.store
                .update_request_status(
                    request_id,
                    ReviewUpdate {
                        status: RequestStatus::Rejected,
                        admin_note: note,
                        reviewed_by: session.username.clone(),
                        reviewed_at: Utc::now(),
                    },
                )
                .await?;
            let request = self
                .store
                .find_request(request_id)
                .await?
                .ok_or(AccessError::NotFound)?;
            info!(request_id, username = %request.username, "request rejected");
            Ok(request)
        })
        .await
    }

    /// Streams the identity-proof document behind a request. ADMIN only.
    pub async fn fetch_proof_document(
        &self,
        session: &Session,
        request_id: i32,
    ) -> Result<ProofDocument> {
        require_admin(session)?;
        self.timed(async {
            let request = self
                .store
                .find_request(request_id)
                .await?
                .ok_or(AccessError::NotFound)?;
            self.store
                .fetch_document(request.document_ref)
                .await?
                .ok_or(AccessError::NotFound)
        })
        .await
    }

    /// All accounts, for the admin dashboard. ADMIN only.
    pub async fn list_accounts(&self, session: &Session) -> Result<Vec<Account>> {
        require_admin(session)?;
        self.timed(self.store.list_accounts()).await
    }

    /// Sets the account back to USER and revokes its live sessions. ADMIN
    /// only; refused for the protected seed admin.
    #[instrument(skip(self, session), fields(caller = %session.username))]
    pub async fn revoke_role(&self, session: &Session, username: &str) -> Result<Account> {
        require_admin(session)?;
        self.timed(async {
            let account = self
                .store
                .find_account_by_username(username)
                .await?
                .ok_or(AccessError::NotFound)?;
            if account.protected {
                return Err(AccessError::ForbiddenOperation);
            }
            self.store.update_account_role(username, Role::User).await?;
            self.store.revoke_sessions_for(username).await?;
            warn!(username, "role revoked back to USER");
            // Re-read so the caller sees persisted truth
            self.store
                .find_account_by_username(username)
                .await?
                .ok_or(AccessError::NotFound)
        })
        .await
    }

    /// Removes the account together with its sessions and requests. ADMIN
    /// only; refused for the protected seed admin.
    #[instrument(skip(self, session), fields(caller = %session.username))]
    pub async fn delete_account(&self, session: &Session, username: &str) -> Result<()> {
        require_admin(session)?;
        self.timed(async {
            let account = self
                .store
                .find_account_by_username(username)
                .await?
                .ok_or(AccessError::NotFound)?;
            if account.protected {
                return Err(AccessError::ForbiddenOperation);
            }
            self.store.delete_account_record(username).await?;
            warn!(username, "account deleted");
            Ok(())
        })
        .await
    }

    /// The calling account's record, hash included for internal use;
    /// callers strip it before serialization.
    pub async fn get_account(&self, session: &Session) -> Result<Account> {
        self.timed(async {
            self.store
                .find_account_by_username(&session.username)
                .await?
                .ok_or(AccessError::NotFound)
        })
        .await
    }

    /// Applies a profile edit for the calling account.
    #[instrument(skip(self, session, update), fields(username = %session.username))]
    pub async fn update_profile(
        &self,
        session: &Session,
        update: ProfileUpdate,
    ) -> Result<Account> {
        self.timed(self.store.update_account_profile(&session.username, update))
            .await
    }

    /// Replaces the password after confirming the current one, then revokes
    /// every live session of the account.
    #[instrument(skip_all, fields(username = %session.username))]
    pub async fn change_password(
        &self,
        session: &Session,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        self.timed(async {
            let account = self
                .store
                .find_account_by_username(&session.username)
                .await?
                .ok_or(AccessError::NotFound)?;
            if !verify_password(current_password, &account.password_hash) {
                return Err(AccessError::InvalidCredentials);
            }
            validate_password_strength(new_password)?;
            self.store
                .update_account_password(&account.username, &hash_password(new_password)?)
                .await?;
            self.store.revoke_sessions_for(&account.username).await?;
            info!(username = %account.username, "password changed, sessions revoked");
            Ok(())
        })
        .await
    }

    /// Seeds the protected admin identity if it does not exist yet.
    /// Idempotent; returns true when the account was created.
    #[instrument(skip(self, password))]
    pub async fn ensure_seed_admin(&self, username: &str, password: &str) -> Result<bool> {
        self.timed(async {
            if self.store.find_account_by_username(username).await?.is_some() {
                debug!(username, "seed admin already exists, skipping");
                return Ok(false);
            }
            self.store
                .insert_account(NewAccount {
                    username: username.to_string(),
                    email: format!("{username}@ipintel.local"),
                    password_hash: hash_password(password)?,
                    role: Role::Admin,
                    protected: true,
                    profile: Profile::default(),
                    created_at: Utc::now(),
                })
                .await?;
            info!(username, "seed admin created");
            Ok(true)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::memory::MemoryStore;

    const ADMIN_PASSWORD: &str = "Admin123";

    fn manager() -> AccessManager<MemoryStore> {
        AccessManager::new(MemoryStore::new())
    }

    async fn seed_admin<S: Directory + SessionCarrier>(manager: &AccessManager<S>) -> Session {
        manager
            .ensure_seed_admin("admin", ADMIN_PASSWORD)
            .await
            .expect("seeding");
        manager
            .authenticate("admin", ADMIN_PASSWORD)
            .await
            .expect("admin login")
    }

    async fn upload_proof<S: Directory + SessionCarrier>(manager: &AccessManager<S>) -> i32 {
        manager
            .store_proof_document(DocumentUpload {
                file_name: "passport.png".to_string(),
                content_type: "image/png".to_string(),
                data: vec![7u8; 64],
            })
            .await
            .expect("document upload")
    }

    fn register_input(username: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "Password1".to_string(),
            requested_role: Role::User,
            document_ref: None,
        }
    }

    #[tokio::test]
    async fn no_account_starts_above_user_except_the_seed_admin() {
        let manager = manager();
        let admin = seed_admin(&manager).await;

        let account = manager
            .register(register_input("alice"))
            .await
            .expect("register");
        assert_eq!(account.role, Role::User);

        let document_ref = upload_proof(&manager).await;
        let analyst = manager
            .register(RegisterInput {
                requested_role: Role::Analyst,
                document_ref: Some(document_ref),
                ..register_input("bob")
            })
            .await
            .expect("analyst register");
        // The elevated role is withheld until an admin approves
        assert_eq!(analyst.role, Role::User);

        let accounts = manager.list_accounts(&admin).await.expect("list");
        for account in accounts {
            if account.username == "admin" {
                assert_eq!(account.role, Role::Admin);
                assert!(account.protected);
            } else {
                assert_eq!(account.role, Role::User);
            }
        }
    }

    #[tokio::test]
    async fn registration_never_grants_admin() {
        let manager = manager();
        let result = manager
            .register(RegisterInput {
                requested_role: Role::Admin,
                ..register_input("mallory")
            })
            .await;
        assert!(matches!(result, Err(AccessError::Validation(_))));
    }

    #[tokio::test]
    async fn analyst_registration_requires_a_proof_document() {
        let manager = manager();
        let missing = manager
            .register(RegisterInput {
                requested_role: Role::Analyst,
                document_ref: None,
                ..register_input("bob")
            })
            .await;
        assert!(matches!(missing, Err(AccessError::Validation(_))));

        let dangling = manager
            .register(RegisterInput {
                requested_role: Role::Analyst,
                document_ref: Some(999),
                ..register_input("bob")
            })
            .await;
        assert!(matches!(dangling, Err(AccessError::Validation(_))));
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let manager = manager();
        manager
            .register(register_input("alice"))
            .await
            .expect("first");
        let second = manager.register(register_input("alice")).await;
        assert!(matches!(second, Err(AccessError::DuplicateUsername)));
    }

    #[tokio::test]
    async fn second_pending_request_is_rejected() {
        let manager = manager();
        manager
            .register(register_input("alice"))
            .await
            .expect("register");
        let session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("login");

        let first_doc = upload_proof(&manager).await;
        manager
            .submit_elevation(&session, Role::Analyst, first_doc)
            .await
            .expect("first request");

        let second_doc = upload_proof(&manager).await;
        let second = manager
            .submit_elevation(&session, Role::Analyst, second_doc)
            .await;
        assert!(matches!(second, Err(AccessError::DuplicatePending)));
    }

    #[tokio::test]
    async fn approval_is_single_shot() {
        let manager = manager();
        let admin = seed_admin(&manager).await;
        manager
            .register(register_input("alice"))
            .await
            .expect("register");
        let session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("login");
        let document_ref = upload_proof(&manager).await;
        let request = manager
            .submit_elevation(&session, Role::Analyst, document_ref)
            .await
            .expect("request");

        let approved = manager
            .approve_request(&admin, request.id, None)
            .await
            .expect("approve");
        assert_eq!(approved.status, RequestStatus::Approved);

        let again = manager.approve_request(&admin, request.id, None).await;
        assert!(matches!(again, Err(AccessError::NotFound)));

        // No double elevation: still exactly ANALYST
        let account = manager
            .store()
            .find_account_by_username("alice")
            .await
            .expect("lookup")
            .expect("exists");
        assert_eq!(account.role, Role::Analyst);
    }

    #[tokio::test]
    async fn approval_updates_role_and_clears_pending_together() {
        let manager = manager();
        let admin = seed_admin(&manager).await;
        manager
            .register(register_input("alice"))
            .await
            .expect("register");
        let session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("login");
        let document_ref = upload_proof(&manager).await;
        let request = manager
            .submit_elevation(&session, Role::Analyst, document_ref)
            .await
            .expect("request");

        manager
            .approve_request(&admin, request.id, Some("verified".to_string()))
            .await
            .expect("approve");

        let account = manager
            .store()
            .find_account_by_username("alice")
            .await
            .expect("lookup")
            .expect("exists");
        let pending = manager.list_pending_requests(&admin).await.expect("list");
        assert_eq!(account.role, Role::Analyst);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn seed_admin_is_protected() {
        let manager = manager();
        let admin = seed_admin(&manager).await;

        let revoked = manager.revoke_role(&admin, "admin").await;
        assert!(matches!(revoked, Err(AccessError::ForbiddenOperation)));
        let deleted = manager.delete_account(&admin, "admin").await;
        assert!(matches!(deleted, Err(AccessError::ForbiddenOperation)));

        let account = manager
            .store()
            .find_account_by_username("admin")
            .await
            .expect("lookup")
            .expect("exists");
        assert_eq!(account.role, Role::Admin);
    }

    #[tokio::test]
    async fn full_elevation_scenario() {
        let manager = manager();
        let admin = seed_admin(&manager).await;

        manager
            .register(register_input("alice"))
            .await
            .expect("register");
        let session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("login");
        assert_eq!(session.role, Role::User);

        let document_ref = upload_proof(&manager).await;
        manager
            .submit_elevation(&session, Role::Analyst, document_ref)
            .await
            .expect("request");

        let pending = manager.list_pending_requests(&admin).await.expect("list");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].username, "alice");

        manager
            .approve_request(&admin, pending[0].id, None)
            .await
            .expect("approve");

        // The old session keeps its snapshot; the new login sees ANALYST
        let relogin = manager
            .authenticate("alice", "Password1")
            .await
            .expect("re-login");
        assert_eq!(relogin.role, Role::Analyst);
        assert!(manager
            .list_pending_requests(&admin)
            .await
            .expect("list")
            .is_empty());
    }

    #[tokio::test]
    async fn non_admin_cannot_approve() {
        let manager = manager();
        let admin = seed_admin(&manager).await;
        manager
            .register(register_input("alice"))
            .await
            .expect("register");
        let session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("login");
        let document_ref = upload_proof(&manager).await;
        let request = manager
            .submit_elevation(&session, Role::Analyst, document_ref)
            .await
            .expect("request");

        let denied = manager.approve_request(&session, request.id, None).await;
        assert!(matches!(denied, Err(AccessError::Unauthorized)));

        let pending = manager.list_pending_requests(&admin).await.expect("list");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn wrong_password_creates_no_session() {
        let manager = manager();
        manager
            .register(register_input("alice"))
            .await
            .expect("register");

        let denied = manager.authenticate("alice", "wrong-password").await;
        assert!(matches!(denied, Err(AccessError::InvalidCredentials)));
        let unknown = manager.authenticate("nobody", "Password1").await;
        assert!(matches!(unknown, Err(AccessError::InvalidCredentials)));

        // Purging with a far-future clock would drop every stored session;
        // none exists.
        let purged = manager
            .store()
            .purge_expired_sessions(Utc::now() + chrono::Duration::days(365))
            .await
            .expect("purge");
        assert_eq!(purged, 0);
    }

    #[tokio::test]
    async fn pending_request_does_not_block_login() {
        let manager = manager();
        let document_ref = upload_proof(&manager).await;
        manager
            .register(RegisterInput {
                requested_role: Role::Analyst,
                document_ref: Some(document_ref),
                ..register_input("bob")
            })
            .await
            .expect("register");

        let session = manager
            .authenticate("bob", "Password1")
            .await
            .expect("login is not blocked by the pending request");
        assert_eq!(session.role, Role::User);
        assert!(manager
            .my_pending_request(&session)
            .await
            .expect("own request")
            .is_some());
    }

    #[tokio::test]
    async fn rejection_leaves_role_unchanged() {
        let manager = manager();
        let admin = seed_admin(&manager).await;
        manager
            .register(register_input("alice"))
            .await
            .expect("register");
        let session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("login");
        let document_ref = upload_proof(&manager).await;
        let request = manager
            .submit_elevation(&session, Role::Analyst, document_ref)
            .await
            .expect("request");

        let rejected = manager
            .reject_request(&admin, request.id, Some("blurry scan".to_string()))
            .await
            .expect("reject");
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.admin_note.as_deref(), Some("blurry scan"));

        let account = manager
            .store()
            .find_account_by_username("alice")
            .await
            .expect("lookup")
            .expect("exists");
        assert_eq!(account.role, Role::User);
    }

    #[tokio::test]
    async fn revoke_role_resets_to_user_and_kills_sessions() {
        let manager = manager();
        let admin = seed_admin(&manager).await;
        manager
            .register(register_input("alice"))
            .await
            .expect("register");
        let session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("login");
        let document_ref = upload_proof(&manager).await;
        let request = manager
            .submit_elevation(&session, Role::Analyst, document_ref)
            .await
            .expect("request");
        manager
            .approve_request(&admin, request.id, None)
            .await
            .expect("approve");
        let analyst_session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("analyst login");

        let account = manager
            .revoke_role(&admin, "alice")
            .await
            .expect("revoke");
        assert_eq!(account.role, Role::User);

        let stale = manager.resolve_session(&analyst_session.token).await;
        assert!(matches!(stale, Err(AccessError::Unauthorized)));
    }

    #[tokio::test]
    async fn delete_account_removes_sessions_and_pending_requests() {
        let manager = manager();
        let admin = seed_admin(&manager).await;
        manager
            .register(register_input("alice"))
            .await
            .expect("register");
        let session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("login");
        let document_ref = upload_proof(&manager).await;
        manager
            .submit_elevation(&session, Role::Analyst, document_ref)
            .await
            .expect("request");

        manager
            .delete_account(&admin, "alice")
            .await
            .expect("delete");

        assert!(manager
            .store()
            .find_account_by_username("alice")
            .await
            .expect("lookup")
            .is_none());
        assert!(manager
            .list_pending_requests(&admin)
            .await
            .expect("list")
            .is_empty());
        let stale = manager.resolve_session(&session.token).await;
        assert!(matches!(stale, Err(AccessError::Unauthorized)));
    }

    #[tokio::test]
    async fn admin_fetches_the_proof_document() {
        let manager = manager();
        let admin = seed_admin(&manager).await;
        manager
            .register(register_input("alice"))
            .await
            .expect("register");
        let session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("login");
        let document_ref = upload_proof(&manager).await;
        let request = manager
            .submit_elevation(&session, Role::Analyst, document_ref)
            .await
            .expect("request");

        let denied = manager.fetch_proof_document(&session, request.id).await;
        assert!(matches!(denied, Err(AccessError::Unauthorized)));

        let document = manager
            .fetch_proof_document(&admin, request.id)
            .await
            .expect("document");
        assert_eq!(document.content_type, "image/png");
        assert_eq!(document.data, vec![7u8; 64]);
    }

    #[tokio::test]
    async fn upload_validation_rejects_bad_files() {
        let manager = manager();

        let wrong_type = manager
            .store_proof_document(DocumentUpload {
                file_name: "notes.txt".to_string(),
                content_type: "text/plain".to_string(),
                data: vec![1u8; 8],
            })
            .await;
        assert!(matches!(wrong_type, Err(AccessError::Validation(_))));

        let empty = manager
            .store_proof_document(DocumentUpload {
                file_name: "empty.png".to_string(),
                content_type: "image/png".to_string(),
                data: Vec::new(),
            })
            .await;
        assert!(matches!(empty, Err(AccessError::Validation(_))));

        let oversized = AccessManager::with_policy(
            MemoryStore::new(),
            AccessPolicy {
                max_document_bytes: 16,
                ..AccessPolicy::default()
            },
        )
        .store_proof_document(DocumentUpload {
            file_name: "huge.png".to_string(),
            content_type: "image/png".to_string(),
            data: vec![0u8; 32],
        })
        .await;
        assert!(matches!(oversized, Err(AccessError::Validation(_))));
    }

    #[tokio::test]
    async fn change_password_revokes_existing_sessions() {
        let manager = manager();
        manager
            .register(register_input("alice"))
            .await
            .expect("register");
        let session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("login");

        let wrong = manager
            .change_password(&session, "not-it", "Password2")
            .await;
        assert!(matches!(wrong, Err(AccessError::InvalidCredentials)));

        manager
            .change_password(&session, "Password1", "Password2")
            .await
            .expect("change");

        let stale = manager.resolve_session(&session.token).await;
        assert!(matches!(stale, Err(AccessError::Unauthorized)));
        let old = manager.authenticate("alice", "Password1").await;
        assert!(matches!(old, Err(AccessError::InvalidCredentials)));
        manager
            .authenticate("alice", "Password2")
            .await
            .expect("new password works");
    }

    /// Delegating wrapper with failure knobs. It deliberately does NOT
    /// override `commit_approval`, so the default two-write path runs.
    struct FaultyStore {
        inner: MemoryStore,
        latency: Option<Duration>,
        fail_review_update: bool,
    }

    impl FaultyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                latency: None,
                fail_review_update: false,
            }
        }

        async fn pause(&self) {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
        }
    }

    #[async_trait]
    impl Directory for FaultyStore {
        async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
            self.pause().await;
            self.inner.find_account_by_username(username).await
        }

        async fn insert_account(&self, account: NewAccount) -> Result<Account> {
            self.inner.insert_account(account).await
        }

        async fn list_accounts(&self) -> Result<Vec<Account>> {
            self.inner.list_accounts().await
        }

        async fn update_account_role(&self, username: &str, role: Role) -> Result<()> {
            self.inner.update_account_role(username, role).await
        }

        async fn update_account_profile(
            &self,
            username: &str,
            update: ProfileUpdate,
        ) -> Result<Account> {
            self.inner.update_account_profile(username, update).await
        }

        async fn update_account_password(
            &self,
            username: &str,
            password_hash: &str,
        ) -> Result<()> {
            self.inner
                .update_account_password(username, password_hash)
                .await
        }

        async fn delete_account_record(&self, username: &str) -> Result<()> {
            self.inner.delete_account_record(username).await
        }

        async fn insert_request(&self, request: NewElevationRequest) -> Result<ElevationRequest> {
            self.inner.insert_request(request).await
        }

        async fn find_request(&self, request_id: i32) -> Result<Option<ElevationRequest>> {
            self.inner.find_request(request_id).await
        }

        async fn find_pending_request_for(
            &self,
            username: &str,
        ) -> Result<Option<ElevationRequest>> {
            self.inner.find_pending_request_for(username).await
        }

        async fn list_requests_by_status(
            &self,
            status: RequestStatus,
        ) -> Result<Vec<ElevationRequest>> {
            self.inner.list_requests_by_status(status).await
        }

        async fn update_request_status(
            &self,
            request_id: i32,
            review: ReviewUpdate,
        ) -> Result<()> {
            if self.fail_review_update {
                return Err(AccessError::Store("simulated write failure".to_string()));
            }
            self.inner.update_request_status(request_id, review).await
        }

        async fn store_document(&self, document: NewProofDocument) -> Result<i32> {
            self.inner.store_document(document).await
        }

        async fn fetch_document(&self, document_ref: i32) -> Result<Option<ProofDocument>> {
            self.inner.fetch_document(document_ref).await
        }
    }

    #[async_trait]
    impl SessionCarrier for FaultyStore {
        async fn insert_session(&self, session: StoredSession) -> Result<()> {
            self.inner.insert_session(session).await
        }

        async fn find_session(&self, token: &str) -> Result<Option<StoredSession>> {
            self.inner.find_session(token).await
        }

        async fn revoke_session(&self, token: &str) -> Result<()> {
            self.inner.revoke_session(token).await
        }

        async fn revoke_sessions_for(&self, username: &str) -> Result<()> {
            self.inner.revoke_sessions_for(username).await
        }

        async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
            self.inner.purge_expired_sessions(now).await
        }
    }

    #[tokio::test]
    async fn slow_store_surfaces_timeout_without_mutation() {
        let store = FaultyStore {
            latency: Some(Duration::from_millis(100)),
            ..FaultyStore::new()
        };
        let manager = AccessManager::with_policy(
            store,
            AccessPolicy {
                op_timeout: Duration::from_millis(20),
                ..AccessPolicy::default()
            },
        );

        let result = manager.authenticate("alice", "Password1").await;
        assert!(matches!(result, Err(AccessError::Timeout)));

        // Nothing was written speculatively
        let purged = manager
            .store()
            .purge_expired_sessions(Utc::now() + chrono::Duration::days(365))
            .await
            .expect("purge");
        assert_eq!(purged, 0);
    }

    #[tokio::test]
    async fn failed_second_write_surfaces_partial_failure() {
        let store = FaultyStore {
            fail_review_update: true,
            ..FaultyStore::new()
        };
        let manager = AccessManager::new(store);
        let admin = seed_admin(&manager).await;

        manager
            .register(register_input("alice"))
            .await
            .expect("register");
        let session = manager
            .authenticate("alice", "Password1")
            .await
            .expect("login");
        let document_ref = upload_proof(&manager).await;
        let request = manager
            .submit_elevation(&session, Role::Analyst, document_ref)
            .await
            .expect("request");

        let result = manager.approve_request(&admin, request.id, None).await;
        assert!(matches!(result, Err(AccessError::PartialFailure(_))));

        // The reconciled view shows exactly the half-applied state the
        // error reported: role updated, request still pending.
        let account = manager
            .store()
            .find_account_by_username("alice")
            .await
            .expect("lookup")
            .expect("exists");
        assert_eq!(account.role, Role::Analyst);
        let pending = manager.list_pending_requests(&admin).await.expect("list");
        assert_eq!(pending.len(), 1);
    }
}
