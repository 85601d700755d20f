use indexer_util::errors::{IndexerError, IndexerResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect a bounded pool and run pending migrations.
pub async fn connect_pool(database_url: &str) -> IndexerResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| IndexerError::InternalError(format!("failed to connect to database: {e}")))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| IndexerError::InternalError(format!("failed to run migrations: {e}")))?;

    Ok(pool)
}
