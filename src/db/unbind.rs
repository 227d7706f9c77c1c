use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::models::unbind::{UnbindRequest, UnbindStatus};
use crate::notify;

fn row_to_request(row: sqlx::sqlite::SqliteRow) -> UnbindRequest {
    let status: String = row.get("status");
    UnbindRequest {
        id: row.get("id"),
        space_id: row.get("space_id"),
        requested_by: row.get("requested_by"),
        requested_at: row.get("requested_at"),
        expires_at: row.get("expires_at"),
        status: UnbindStatus::parse(&status).unwrap_or(UnbindStatus::Completed),
    }
}

const SELECT_REQUESTS: &str =
    "SELECT id, space_id, requested_by, requested_at, expires_at, status FROM unbind_requests";

pub async fn get_request(pool: &SqlitePool, id: &str) -> Result<UnbindRequest, AppError> {
    let row = sqlx::query(&format!("{SELECT_REQUESTS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("unknown_unbind_request".to_string()))?;

    Ok(row_to_request(row))
}

/// The pending request if one exists, otherwise the most recent one.
pub async fn get_status(
    pool: &SqlitePool,
    space_id: &str,
) -> Result<Option<UnbindRequest>, AppError> {
    let row = sqlx::query(&format!(
        "{SELECT_REQUESTS} WHERE space_id = ? \
         ORDER BY (status = 'pending') DESC, requested_at DESC, id DESC LIMIT 1"
    ))
    .bind(space_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_request))
}

pub async fn get_pending(
    pool: &SqlitePool,
    space_id: &str,
) -> Result<Option<UnbindRequest>, AppError> {
    let row = sqlx::query(&format!(
        "{SELECT_REQUESTS} WHERE space_id = ? AND status = 'pending'"
    ))
    .bind(space_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_request))
}

/// Opens the cooling-off window. Idempotent: when a pending request already
/// exists (including one created by a racing call, caught by the partial
/// unique index) the existing request is returned instead of a duplicate.
/// The flag reports whether this call inserted the row, so the caller only
/// notifies on an actual transition.
pub async fn create_request(
    pool: &SqlitePool,
    space_id: &str,
    requested_by: &str,
) -> Result<(UnbindRequest, bool), AppError> {
    let id = Uuid::new_v4().to_string();
    let requested_at = db::now_string();
    let expires_at = (chrono::Utc::now() + chrono::Duration::days(7))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string();

    let res = sqlx::query(
        "INSERT OR IGNORE INTO unbind_requests \
         (id, space_id, requested_by, requested_at, expires_at, status) \
         VALUES (?, ?, ?, ?, ?, 'pending')",
    )
    .bind(&id)
    .bind(space_id)
    .bind(requested_by)
    .bind(&requested_at)
    .bind(&expires_at)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        let existing = get_pending(pool, space_id)
            .await?
            .ok_or(AppError::NoPendingRequest)?;
        return Ok((existing, false));
    }

    Ok((get_request(pool, &id).await?, true))
}

/// Conditional update: loses cleanly to a concurrent finalization of the
/// same request, in which case the caller sees `NoPendingRequest`.
pub async fn cancel(pool: &SqlitePool, space_id: &str) -> Result<(), AppError> {
    let res = sqlx::query(
        "UPDATE unbind_requests SET status = 'cancelled' \
         WHERE space_id = ? AND status = 'pending'",
    )
    .bind(space_id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NoPendingRequest);
    }
    Ok(())
}

/// One sweep tick: completes every pending request whose window has closed
/// and deletes the associated space. Each space is an independent unit of
/// work; a failure rolls back the whole transition, so the request stays
/// pending and the next tick retries it. Idempotent, and safe against a
/// racing cancel: the conditional update decides the winner.
pub async fn finalize_expired(pool: &SqlitePool) -> Result<u64, AppError> {
    let now = db::now_string();
    let expired = sqlx::query(&format!(
        "{SELECT_REQUESTS} WHERE status = 'pending' AND expires_at <= ?"
    ))
    .bind(&now)
    .fetch_all(pool)
    .await?;

    let mut finalized = 0u64;
    for row in expired.into_iter().map(row_to_request) {
        match finalize_one(pool, &row).await {
            Ok(true) => finalized += 1,
            Ok(false) => {} // cancelled (or already completed) under us
            Err(e) => {
                tracing::error!(
                    "failed to finalize unbind request {} for space {}: {e:?}",
                    row.id,
                    row.space_id
                );
            }
        }
    }

    Ok(finalized)
}

/// The `pending → completed` claim and the space deletion commit in one
/// transaction: a crash or storage failure mid-way rolls both back, so a
/// completed request always implies the space is gone.
async fn finalize_one(pool: &SqlitePool, request: &UnbindRequest) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "UPDATE unbind_requests SET status = 'completed' \
         WHERE id = ? AND status = 'pending' AND expires_at <= ?",
    )
    .bind(&request.id)
    .bind(db::now_string())
    .execute(&mut *tx)
    .await?;

    if res.rows_affected() == 0 {
        return Ok(false);
    }

    let partners = match db::spaces::delete_space_in_tx(&mut tx, &request.space_id).await {
        Ok(partners) => partners,
        // A direct delete already removed the space; the transition stands.
        Err(AppError::NotFound(_)) => Vec::new(),
        Err(e) => return Err(e),
    };

    tx.commit().await?;

    notify::space_deleted(&request.space_id);
    notify::notify(
        pool,
        &partners,
        "unbind_completed",
        "Space unbound",
        "The cooling-off period ended and your space has been dissolved.",
    )
    .await;

    tracing::info!(
        "unbind request {} completed, space {} deleted",
        request.id,
        request.space_id
    );

    Ok(true)
}
