use access::ProfileUpdate;
use axum::{extract::State, response::Json};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::handlers::auth::AccountResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// The calling account's profile
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "profile",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Profile retrieved", body = ApiResponse<AccountResponse>),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session))]
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let account = state.manager.get_account(&session).await?;
    let response = ApiResponse {
        data: AccountResponse::from(account),
        message: "Profile retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Update the calling account's profile; only provided fields change
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    tag = "profile",
    security(("bearer_token" = [])),
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<AccountResponse>),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session, update))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let account = state.manager.update_profile(&session, update).await?;

    info!(username = %session.username, "profile updated");
    let response = ApiResponse {
        data: AccountResponse::from(account),
        message: "Profile updated successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}
