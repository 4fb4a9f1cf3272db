use std::sync::Arc;

use access::{OrmStore, Session};
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

/// The manager wired to the SeaORM store; every handler mutates state
/// through it, never through the connection directly.
pub type Manager = access::AccessManager<OrmStore>;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Access control and request lifecycle operations
    pub manager: Arc<Manager>,
    /// Resolved bearer sessions, short-lived; invalidated on logout and on
    /// role mutations so a stale view never survives a change
    pub sessions: Cache<String, Session>,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,
        crate::handlers::auth::change_password,
        crate::handlers::profile::get_profile,
        crate::handlers::profile::update_profile,
        crate::handlers::documents::upload_document,
        crate::handlers::requests::submit_request,
        crate::handlers::requests::my_request,
        crate::handlers::admin::list_pending_requests,
        crate::handlers::admin::approve_request,
        crate::handlers::admin::reject_request,
        crate::handlers::admin::view_request_document,
        crate::handlers::admin::list_accounts,
        crate::handlers::admin::revoke_role,
        crate::handlers::admin::delete_account,
    ),
    components(
        schemas(
            ApiResponse<crate::handlers::auth::AccountResponse>,
            ApiResponse<Vec<crate::handlers::auth::AccountResponse>>,
            ApiResponse<crate::handlers::requests::RequestResponse>,
            ApiResponse<Vec<crate::handlers::requests::RequestResponse>>,
            ApiResponse<crate::handlers::documents::DocumentRefResponse>,
            ApiResponse<access::Session>,
            ApiResponse<String>,
            ErrorResponse,
            HealthResponse,
            access::Role,
            access::RequestStatus,
            access::Profile,
            access::ProfileUpdate,
            access::Session,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::ChangePasswordRequest,
            crate::handlers::auth::AccountResponse,
            crate::handlers::requests::SubmitRequestBody,
            crate::handlers::requests::RequestResponse,
            crate::handlers::admin::ReviewBody,
            crate::handlers::documents::DocumentRefResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and session endpoints"),
        (name = "profile", description = "Owner-only profile endpoints"),
        (name = "documents", description = "Identity-proof document upload"),
        (name = "requests", description = "Role-elevation request endpoints"),
        (name = "admin", description = "Admin review and account management endpoints"),
    ),
    info(
        title = "IP Intelligence Platform API",
        description = "Role-based access control and elevation-request review for the IP Intelligence platform",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;

/// Registers the bearer-token security scheme referenced by the handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}
