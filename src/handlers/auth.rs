use access::{AccessError, Account, Profile, RegisterInput, Role, Session};
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for registering a new account
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Username (must be unique)
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    /// Requested role: "USER" or "ANALYST"
    pub role: String,
    /// Reference returned by the document upload endpoint; required when
    /// the requested role is ANALYST
    pub document_ref: Option<i32>,
}

/// Request body for logging in
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for changing the password
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Account response model; never carries the password hash
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub protected: bool,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            username: account.username,
            email: account.email,
            role: account.role,
            protected: account.protected,
            profile: account.profile,
            created_at: account.created_at,
        }
    }
}

fn validation_error(err: validator::ValidationErrors) -> ApiError {
    ApiError(AccessError::Validation(err.to_string()))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created successfully", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>), ApiError> {
    trace!("Entering register function");
    request.validate().map_err(validation_error)?;

    let requested_role = Role::parse(&request.role).ok_or_else(|| {
        ApiError(AccessError::Validation(
            "invalid role. Allowed values: USER, ANALYST".to_string(),
        ))
    })?;
    debug!(username = %request.username, %requested_role, "registering account");

    let account = state
        .manager
        .register(RegisterInput {
            username: request.username,
            email: request.email,
            password: request.password,
            requested_role,
            document_ref: request.document_ref,
        })
        .await?;

    info!(username = %account.username, "account registered");
    let response = ApiResponse {
        data: AccountResponse::from(account),
        message: "Account registered successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Authenticate and receive a bearer session
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded", body = ApiResponse<Session>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<Session>>, ApiError> {
    trace!("Entering login function");
    let session = state
        .manager
        .authenticate(&request.username, &request.password)
        .await?;

    info!(username = %session.username, role = %session.role, "session issued");
    let response = ApiResponse {
        data: session,
        message: "Login successful".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Revoke the presented bearer session
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Session revoked", body = ApiResponse<String>),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session))]
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.manager.logout(&session.token).await?;
    state.sessions.invalidate(&session.token).await;

    info!(username = %session.username, "logged out");
    let response = ApiResponse {
        data: session.username,
        message: "Logged out".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// The calling account's record
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Account retrieved", body = ApiResponse<AccountResponse>),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session))]
pub async fn me(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let account = state.manager.get_account(&session).await?;
    let response = ApiResponse {
        data: AccountResponse::from(account),
        message: "Account retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Change the calling account's password; revokes all of its sessions
#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "auth",
    security(("bearer_token" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<String>),
        (status = 400, description = "Weak password", body = ErrorResponse),
        (status = 401, description = "Current password incorrect", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session, request))]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state
        .manager
        .change_password(&session, &request.current_password, &request.new_password)
        .await?;
    // Every session of the account was revoked; drop the cached views too
    state.sessions.invalidate_all();

    info!(username = %session.username, "password changed");
    let response = ApiResponse {
        data: session.username,
        message: "Password changed, please log in again".to_string(),
        success: true,
    };
    Ok(Json(response))
}
