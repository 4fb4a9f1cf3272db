use access::{AccessError, ElevationRequest, RequestStatus, Role};
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for submitting a role-elevation request
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SubmitRequestBody {
    /// Target role, e.g. "ANALYST"
    pub requested_role: String,
    /// Reference returned by the document upload endpoint
    pub document_ref: i32,
}

/// Elevation request response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequestResponse {
    pub id: i32,
    pub username: String,
    pub requested_role: Role,
    pub status: RequestStatus,
    pub document_ref: i32,
    pub submitted_at: DateTime<Utc>,
    pub admin_note: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl From<ElevationRequest> for RequestResponse {
    fn from(request: ElevationRequest) -> Self {
        Self {
            id: request.id,
            username: request.username,
            requested_role: request.requested_role,
            status: request.status,
            document_ref: request.document_ref,
            submitted_at: request.submitted_at,
            admin_note: request.admin_note,
            reviewed_by: request.reviewed_by,
            reviewed_at: request.reviewed_at,
        }
    }
}

/// Submit a role-elevation request for the calling account
#[utoipa::path(
    post,
    path = "/api/v1/requests",
    tag = "requests",
    security(("bearer_token" = [])),
    request_body = SubmitRequestBody,
    responses(
        (status = 201, description = "Request submitted", body = ApiResponse<RequestResponse>),
        (status = 400, description = "Invalid role or missing document", body = ErrorResponse),
        (status = 409, description = "A request is already pending", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session, request), fields(username = %session.username))]
pub async fn submit_request(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(request): Json<SubmitRequestBody>,
) -> Result<(StatusCode, Json<ApiResponse<RequestResponse>>), ApiError> {
    let requested_role = Role::parse(&request.requested_role).ok_or_else(|| {
        ApiError(AccessError::Validation(
            "invalid role. Allowed values: ANALYST".to_string(),
        ))
    })?;

    let submitted = state
        .manager
        .submit_elevation(&session, requested_role, request.document_ref)
        .await?;

    info!(request_id = submitted.id, "elevation request submitted");
    let response = ApiResponse {
        data: RequestResponse::from(submitted),
        message: "Request submitted. You will be notified once reviewed".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// The calling account's own pending request, if any
#[utoipa::path(
    get,
    path = "/api/v1/requests/mine",
    tag = "requests",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Pending request retrieved; data is null when none is pending", body = ApiResponse<RequestResponse>),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
#[instrument(skip(state, session), fields(username = %session.username))]
pub async fn my_request(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<ApiResponse<Option<RequestResponse>>>, ApiError> {
    let pending = state.manager.my_pending_request(&session).await?;
    let response = ApiResponse {
        data: pending.map(RequestResponse::from),
        message: "Pending request retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}
