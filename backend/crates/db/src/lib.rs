pub mod crm;
pub mod external;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tempora_common::error::{TemporaError, TemporaResult};

/// Create a Postgres connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> TemporaResult<PgPool> {
    tracing::info!("connecting to database");
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> TemporaResult<()> {
    tracing::info!("running database migrations");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| TemporaError::Database(format!("migration failed: {e}")))?;
    tracing::info!("migrations applied");
    Ok(())
}
