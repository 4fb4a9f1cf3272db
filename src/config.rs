use std::sync::Arc;
use std::time::Duration;

use access::{AccessManager, OrmStore};
use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use moka::future::Cache;
use sea_orm::Database;

use crate::schemas::AppState;

/// Initialize application configuration and state
pub async fn initialize_app_state() -> Result<AppState> {
    // Load configuration
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://ipintel.db".to_string());
    initialize_app_state_with_url(&database_url).await
}

/// Initialize application state against a specific database URL
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    // Connect to database
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    // Bring a fresh database up to schema; a no-op otherwise
    Migrator::up(&db, None).await?;

    let manager = Arc::new(AccessManager::new(OrmStore::new(db.clone())));

    // Seed the protected admin identity
    let admin_username =
        std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let admin_password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
        tracing::warn!("ADMIN_PASSWORD is not set, seeding the default admin credentials");
        "Admin123".to_string()
    });
    let created = manager
        .ensure_seed_admin(&admin_username, &admin_password)
        .await?;
    if created {
        tracing::info!("Seed admin '{}' created", admin_username);
    }

    // Short-lived cache of resolved bearer sessions
    let sessions = Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(60))
        .build();

    Ok(AppState {
        db,
        manager,
        sessions,
    })
}

/// Get bind address from environment or use default
pub fn get_bind_address() -> String {
    std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}
