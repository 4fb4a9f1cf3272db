use access::{AccessError, DocumentUpload};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Opaque reference to a stored identity-proof document
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentRefResponse {
    pub document_ref: i32,
}

/// Upload an identity-proof document (JPEG, PNG or PDF, max 5 MiB).
///
/// Registration needs the returned reference before an account exists, so
/// this endpoint does not require a session; the stored bytes are
/// retrievable only by an admin.
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    tag = "documents",
    responses(
        (status = 201, description = "Document stored", body = ApiResponse<DocumentRefResponse>),
        (status = 400, description = "Missing, oversized or unsupported file", body = ErrorResponse)
    )
)]
#[instrument(skip(state, multipart))]
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<DocumentRefResponse>>), ApiError> {
    let mut upload: Option<DocumentUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        ApiError(AccessError::Validation(format!(
            "malformed multipart request: {err}"
        )))
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("document").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|err| {
                ApiError(AccessError::Validation(format!(
                    "failed to read file upload: {err}"
                )))
            })?
            .to_vec();
        debug!(%file_name, %content_type, bytes = data.len(), "received file part");
        upload = Some(DocumentUpload {
            file_name,
            content_type,
            data,
        });
    }

    let upload = upload.ok_or_else(|| {
        ApiError(AccessError::Validation(
            "a multipart 'file' part is required".to_string(),
        ))
    })?;

    let document_ref = state.manager.store_proof_document(upload).await?;

    info!(document_ref, "proof document stored");
    let response = ApiResponse {
        data: DocumentRefResponse { document_ref },
        message: "Document uploaded successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}
