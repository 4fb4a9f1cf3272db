use access::{AccessError, Session};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;

use crate::error::ApiError;
use crate::schemas::AppState;

/// Extracts the authenticated session from the `Authorization: Bearer`
/// header. Resolved sessions are cached for a short TTL; the authoritative
/// check stays with the manager.
#[derive(Debug)]
pub struct CurrentSession(pub Session);

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_owned)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError(AccessError::Unauthorized))?;

        if let Some(session) = state.sessions.get(&token).await {
            if session.expires_at > Utc::now() {
                return Ok(CurrentSession(session));
            }
            state.sessions.invalidate(&token).await;
        }

        let session = state.manager.resolve_session(&token).await?;
        state.sessions.insert(token, session.clone()).await;
        Ok(CurrentSession(session))
    }
}
