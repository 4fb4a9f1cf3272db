use crate::handlers::{
    admin::{
        approve_request, delete_account, list_accounts, list_pending_requests, reject_request,
        revoke_role, view_request_document,
    },
    auth::{change_password, login, logout, me, register},
    documents::upload_document,
    health::health_check,
    profile::{get_profile, update_profile},
    requests::{my_request, submit_request},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Proof uploads are capped at 5 MiB by the manager; leave headroom for the
// multipart framing.
const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Registration, login and session routes
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/auth/change-password", post(change_password))
        // Identity-proof upload
        .route("/api/v1/documents", post(upload_document))
        // Owner-only profile routes
        .route("/api/v1/profile", get(get_profile))
        .route("/api/v1/profile", put(update_profile))
        // Elevation request routes
        .route("/api/v1/requests", post(submit_request))
        .route("/api/v1/requests/mine", get(my_request))
        // Admin review routes
        .route("/api/v1/admin/requests/pending", get(list_pending_requests))
        .route(
            "/api/v1/admin/requests/:request_id/approve",
            post(approve_request),
        )
        .route(
            "/api/v1/admin/requests/:request_id/reject",
            post(reject_request),
        )
        .route(
            "/api/v1/admin/requests/:request_id/document",
            get(view_request_document),
        )
        // Admin account management routes
        .route("/api/v1/admin/accounts", get(list_accounts))
        .route(
            "/api/v1/admin/accounts/:username/revoke-role",
            post(revoke_role),
        )
        .route("/api/v1/admin/accounts/:username", delete(delete_account))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}
