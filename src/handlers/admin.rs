use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::handlers::auth::AccountResponse;
use crate::handlers::requests::RequestResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Optional note attached to an approval or rejection
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct ReviewBody {
    pub note: Option<String>,
}

/// All PENDING elevation requests, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/admin/requests/pending",
    tag = "admin",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Pending requests retrieved", body = ApiResponse<Vec<RequestResponse>>),
        (status = 401, description = "Caller is not an admin", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session), fields(caller = %session.username))]
pub async fn list_pending_requests(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<ApiResponse<Vec<RequestResponse>>>, ApiError> {
    let pending = state.manager.list_pending_requests(&session).await?;
    let response = ApiResponse {
        data: pending.into_iter().map(RequestResponse::from).collect(),
        message: "Pending requests retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Approve a pending request and elevate the account, atomically
#[utoipa::path(
    post,
    path = "/api/v1/admin/requests/{request_id}/approve",
    tag = "admin",
    security(("bearer_token" = [])),
    params(
        ("request_id" = i32, Path, description = "Request ID"),
    ),
    request_body = ReviewBody,
    responses(
        (status = 200, description = "Request approved", body = ApiResponse<RequestResponse>),
        (status = 401, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Request missing or already processed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session, body), fields(caller = %session.username))]
pub async fn approve_request(
    Path(request_id): Path<i32>,
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(body): Json<ReviewBody>,
) -> Result<Json<ApiResponse<RequestResponse>>, ApiError> {
    let approved = state
        .manager
        .approve_request(&session, request_id, body.note)
        .await?;

    info!(request_id, username = %approved.username, "request approved");
    let response = ApiResponse {
        data: RequestResponse::from(approved),
        message: "Request approved. The account holds the new role at next login".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Reject a pending request; the account's role is unchanged
#[utoipa::path(
    post,
    path = "/api/v1/admin/requests/{request_id}/reject",
    tag = "admin",
    security(("bearer_token" = [])),
    params(
        ("request_id" = i32, Path, description = "Request ID"),
    ),
    request_body = ReviewBody,
    responses(
        (status = 200, description = "Request rejected", body = ApiResponse<RequestResponse>),
        (status = 401, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Request missing or already processed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session, body), fields(caller = %session.username))]
pub async fn reject_request(
    Path(request_id): Path<i32>,
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(body): Json<ReviewBody>,
) -> Result<Json<ApiResponse<RequestResponse>>, ApiError> {
    let rejected = state
        .manager
        .reject_request(&session, request_id, body.note)
        .await?;

    info!(request_id, username = %rejected.username, "request rejected");
    let response = ApiResponse {
        data: RequestResponse::from(rejected),
        message: "Request rejected".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Stream the identity-proof document behind a request
#[utoipa::path(
    get,
    path = "/api/v1/admin/requests/{request_id}/document",
    tag = "admin",
    security(("bearer_token" = [])),
    params(
        ("request_id" = i32, Path, description = "Request ID"),
    ),
    responses(
        (status = 200, description = "Document bytes, served inline"),
        (status = 401, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Request or document missing", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session), fields(caller = %session.username))]
pub async fn view_request_document(
    Path(request_id): Path<i32>,
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, ApiError> {
    let document = state
        .manager
        .fetch_proof_document(&session, request_id)
        .await?;

    let headers = [
        (header::CONTENT_TYPE, document.content_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", document.file_name),
        ),
    ];
    Ok((StatusCode::OK, headers, document.data).into_response())
}

/// All accounts, for the admin dashboard
#[utoipa::path(
    get,
    path = "/api/v1/admin/accounts",
    tag = "admin",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Accounts retrieved", body = ApiResponse<Vec<AccountResponse>>),
        (status = 401, description = "Caller is not an admin", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session), fields(caller = %session.username))]
pub async fn list_accounts(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<ApiResponse<Vec<AccountResponse>>>, ApiError> {
    let accounts = state.manager.list_accounts(&session).await?;
    let response = ApiResponse {
        data: accounts.into_iter().map(AccountResponse::from).collect(),
        message: "Accounts retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Set an account back to USER and revoke its live sessions
#[utoipa::path(
    post,
    path = "/api/v1/admin/accounts/{username}/revoke-role",
    tag = "admin",
    security(("bearer_token" = [])),
    params(
        ("username" = String, Path, description = "Target username"),
    ),
    responses(
        (status = 200, description = "Role revoked", body = ApiResponse<AccountResponse>),
        (status = 401, description = "Caller is not an admin", body = ErrorResponse),
        (status = 403, description = "Target is the protected admin", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session), fields(caller = %session.username))]
pub async fn revoke_role(
    Path(username): Path<String>,
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let account = state.manager.revoke_role(&session, &username).await?;
    // The target's sessions were revoked; a cached view must not outlive that
    state.sessions.invalidate_all();

    warn!(%username, "role revoked");
    let response = ApiResponse {
        data: AccountResponse::from(account),
        message: "Role revoked; the account is back to USER".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Delete an account together with its sessions and requests
#[utoipa::path(
    delete,
    path = "/api/v1/admin/accounts/{username}",
    tag = "admin",
    security(("bearer_token" = [])),
    params(
        ("username" = String, Path, description = "Target username"),
    ),
    responses(
        (status = 200, description = "Account deleted", body = ApiResponse<String>),
        (status = 401, description = "Caller is not an admin", body = ErrorResponse),
        (status = 403, description = "Target is the protected admin", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session), fields(caller = %session.username))]
pub async fn delete_account(
    Path(username): Path<String>,
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.manager.delete_account(&session, &username).await?;
    state.sessions.invalidate_all();

    warn!(%username, "account deleted");
    let response = ApiResponse {
        data: format!("Account '{username}' deleted"),
        message: "Account deleted successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}
