use crate::error::ApiError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Type alias for the PostgreSQL connection pool
pub type DbPool = PgPool;

/// Creates and configures a PostgreSQL connection pool
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
///
/// # Returns
/// * `Result<DbPool>` - Configured connection pool or error
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    tracing::debug!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Check if a vehicle with the given VIN is already registered
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `vin` - Vehicle identification number to check
///
/// # Returns
/// * `Result<bool, ApiError>` - True if a vehicle with this VIN exists
pub async fn check_duplicate_vin(pool: &PgPool, vin: &str) -> Result<bool, ApiError> {
    tracing::debug!("Checking for duplicate VIN: {}", vin);

    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vehicles WHERE vin = $1)")
            .bind(vin)
            .fetch_one(pool)
            .await?;

    let is_duplicate = exists.unwrap_or(false);
    if is_duplicate {
        tracing::debug!("Duplicate VIN found: {}", vin);
    }

    Ok(is_duplicate)
}
