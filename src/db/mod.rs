pub mod invites;
pub mod notifications;
pub mod spaces;
pub mod unbind;
pub mod users;

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::AppError;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}

/// Timestamps are stored as sortable `%Y-%m-%dT%H:%M:%S` strings, so string
/// comparison in SQL matches chronological order.
pub fn now_string() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// True when the error is a SQLite UNIQUE violation on the named constraint,
/// e.g. `"space_members.user_id"`.
pub fn is_unique_violation(e: &sqlx::Error, constraint: &str) -> bool {
    e.as_database_error()
        .map(|d| {
            let msg = d.message();
            msg.contains("UNIQUE constraint failed") && msg.contains(constraint)
        })
        .unwrap_or(false)
}

fn is_transient(e: &sqlx::Error) -> bool {
    if matches!(e, sqlx::Error::PoolTimedOut) {
        return true;
    }
    e.as_database_error()
        .map(|d| {
            let msg = d.message();
            msg.contains("database is locked") || msg.contains("database table is locked")
        })
        .unwrap_or(false)
}

/// Runs a storage operation, retrying a bounded number of times on transient
/// SQLite contention. Exhaustion surfaces as `ServiceUnavailable` so clients
/// never mistake contention for a domain error.
pub async fn with_write_retries<T, F, Fut>(mut op: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    const MAX_ATTEMPTS: u32 = 3;

    for attempt in 1..=MAX_ATTEMPTS {
        match op().await {
            Err(AppError::Database(e)) if is_transient(&e) => {
                tracing::warn!("transient storage error on attempt {attempt}: {e}");
                tokio::time::sleep(std::time::Duration::from_millis(25 * u64::from(attempt)))
                    .await;
            }
            other => return other,
        }
    }

    tracing::error!("storage retries exhausted after {MAX_ATTEMPTS} attempts");
    Err(AppError::ServiceUnavailable)
}
