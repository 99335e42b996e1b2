//! Database bootstrap: pool construction with startup retry, schema setup.

use std::future::Future;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::InfraConfig;
use crate::document_store::StoreError;

/// Schema for the one-document-per-point table.
pub const SCHEMA: &str = include_str!("../migrations/0001_pickup_points.sql");

/// Run `op` up to `attempts` times, sleeping `delay` between failures.
///
/// Returns the last error once every attempt has failed.
pub async fn retry_with_fixed_delay<T, E, F, Fut>(
    attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt < attempts => {
                tracing::warn!(attempt, attempts, error = %err, ?delay, "attempt failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::error!(attempts, error = %err, "giving up");
                return Err(err);
            }
        }
    }
}

/// Connect to Postgres, retrying per `config`.
pub async fn connect_with_retry(config: &InfraConfig) -> Result<PgPool, StoreError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not set".to_string()))?;

    retry_with_fixed_delay(config.db_connect_attempts, config.db_connect_delay, |_| {
        PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(url)
    })
    .await
    .map_err(|e| StoreError::Unavailable(format!("could not connect to database: {e}")))
}

/// Create the `pickup_points` table if it does not exist.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("schema setup failed: {e}")))?;
    Ok(())
}
