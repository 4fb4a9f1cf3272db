//! In-memory store. Backs the unit tests and ephemeral deployments where
//! nothing has to survive a restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{AccessError, Result};
use crate::role::Role;
use crate::store::{
    Account, Directory, ElevationRequest, NewAccount, NewElevationRequest, NewProofDocument,
    ProfileUpdate, ProofDocument, RequestStatus, ReviewUpdate, SessionCarrier, StoredSession,
};

#[derive(Debug, Default)]
struct Inner {
    accounts: BTreeMap<String, Account>,
    requests: BTreeMap<i32, ElevationRequest>,
    documents: HashMap<i32, ProofDocument>,
    sessions: HashMap<String, StoredSession>,
    next_request_id: i32,
    next_document_id: i32,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_profile_update(account: &mut Account, update: ProfileUpdate) {
    if let Some(display_name) = update.display_name {
        account.profile.display_name = Some(display_name);
    }
    if let Some(phone) = update.phone {
        account.profile.phone = Some(phone);
    }
    if let Some(date_of_birth) = update.date_of_birth {
        account.profile.date_of_birth = Some(date_of_birth);
    }
    if let Some(gender) = update.gender {
        account.profile.gender = Some(gender);
    }
    if let Some(avatar_url) = update.avatar_url {
        account.profile.avatar_url = Some(avatar_url);
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.get(username).cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        let mut inner = self.inner.write().await;
        if inner.accounts.contains_key(&account.username) {
            return Err(AccessError::DuplicateUsername);
        }
        let record = Account {
            username: account.username.clone(),
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
            protected: account.protected,
            profile: account.profile,
            created_at: account.created_at,
        };
        inner.accounts.insert(account.username, record.clone());
        Ok(record)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.values().cloned().collect())
    }

    async fn update_account_role(&self, username: &str, role: Role) -> Result<()> {
        let mut inner = self.inner.write().await;
        let account = inner
            .accounts
            .get_mut(username)
            .ok_or(AccessError::NotFound)?;
        account.role = role;
        Ok(())
    }

    async fn update_account_profile(
        &self,
        username: &str,
        update: ProfileUpdate,
    ) -> Result<Account> {
        let mut inner = self.inner.write().await;
        let account = inner
            .accounts
            .get_mut(username)
            .ok_or(AccessError::NotFound)?;
        apply_profile_update(account, update);
        Ok(account.clone())
    }

    async fn update_account_password(&self, username: &str, password_hash: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let account = inner
            .accounts
            .get_mut(username)
            .ok_or(AccessError::NotFound)?;
        account.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn delete_account_record(&self, username: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.accounts.remove(username).is_none() {
            return Err(AccessError::NotFound);
        }
        inner.requests.retain(|_, r| r.username != username);
        inner.sessions.retain(|_, s| s.username != username);
        Ok(())
    }

    async fn insert_request(&self, request: NewElevationRequest) -> Result<ElevationRequest> {
        let mut inner = self.inner.write().await;
        let duplicate = inner
            .requests
            .values()
            .any(|r| r.username == request.username && r.status == RequestStatus::Pending);
        if duplicate {
            return Err(AccessError::DuplicatePending);
        }
        inner.next_request_id += 1;
        let record = ElevationRequest {
            id: inner.next_request_id,
            username: request.username,
            requested_role: request.requested_role,
            status: RequestStatus::Pending,
            document_ref: request.document_ref,
            submitted_at: request.submitted_at,
            admin_note: None,
            reviewed_by: None,
            reviewed_at: None,
        };
        inner.requests.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_request(&self, request_id: i32) -> Result<Option<ElevationRequest>> {
        let inner = self.inner.read().await;
        Ok(inner.requests.get(&request_id).cloned())
    }

    async fn find_pending_request_for(&self, username: &str) -> Result<Option<ElevationRequest>> {
        let inner = self.inner.read().await;
        Ok(inner
            .requests
            .values()
            .find(|r| r.username == username && r.status == RequestStatus::Pending)
            .cloned())
    }

    async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<ElevationRequest>> {
        let inner = self.inner.read().await;
        let mut requests: Vec<ElevationRequest> = inner
            .requests
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        Ok(requests)
    }

    async fn update_request_status(&self, request_id: i32, review: ReviewUpdate) -> Result<()> {
        let mut inner = self.inner.write().await;
        let request = inner
            .requests
            .get_mut(&request_id)
            .ok_or(AccessError::NotFound)?;
        if request.status != RequestStatus::Pending {
            return Err(AccessError::NotFound);
        }
        request.status = review.status;
        request.admin_note = review.admin_note;
        request.reviewed_by = Some(review.reviewed_by);
        request.reviewed_at = Some(review.reviewed_at);
        Ok(())
    }

    // Atomic override: the role change and the status change happen inside
    // one critical section, so no reader observes a half-applied approval.
    async fn commit_approval(
        &self,
        request_id: i32,
        review: ReviewUpdate,
    ) -> Result<ElevationRequest> {
        let mut inner = self.inner.write().await;
        let request = inner
            .requests
            .get(&request_id)
            .cloned()
            .ok_or(AccessError::NotFound)?;
        if request.status != RequestStatus::Pending {
            return Err(AccessError::NotFound);
        }
        let account = inner
            .accounts
            .get_mut(&request.username)
            .ok_or(AccessError::NotFound)?;
        account.role = request.requested_role;
        let request = inner
            .requests
            .get_mut(&request_id)
            .ok_or(AccessError::NotFound)?;
        request.status = review.status;
        request.admin_note = review.admin_note;
        request.reviewed_by = Some(review.reviewed_by);
        request.reviewed_at = Some(review.reviewed_at);
        Ok(request.clone())
    }

    async fn store_document(&self, document: NewProofDocument) -> Result<i32> {
        let mut inner = self.inner.write().await;
        inner.next_document_id += 1;
        let id = inner.next_document_id;
        let record = ProofDocument {
            id,
            file_name: document.file_name,
            content_type: document.content_type,
            size_bytes: document.data.len() as i64,
            data: document.data,
            uploaded_at: document.uploaded_at,
        };
        inner.documents.insert(id, record);
        Ok(id)
    }

    async fn fetch_document(&self, document_ref: i32) -> Result<Option<ProofDocument>> {
        let inner = self.inner.read().await;
        Ok(inner.documents.get(&document_ref).cloned())
    }
}

#[async_trait]
impl SessionCarrier for MemoryStore {
    async fn insert_session(&self, session: StoredSession) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<StoredSession>> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(token).cloned())
    }

    async fn revoke_session(&self, token: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(session) = inner.sessions.get_mut(token) {
            session.revoked = true;
        }
        Ok(())
    }

    async fn revoke_sessions_for(&self, username: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        for session in inner.sessions.values_mut() {
            if session.username == username {
                session.revoked = true;
            }
        }
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| s.expires_at > now && !s.revoked);
        Ok((before - inner.sessions.len()) as u64)
    }
}
