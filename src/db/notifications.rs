use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::Notification;

fn row_to_notification(row: sqlx::sqlite::SqliteRow) -> Notification {
    let read: i64 = row.get("read");
    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: row.get("type"),
        title: row.get("title"),
        message: row.get("message"),
        read: read != 0,
        created_at: row.get("created_at"),
    }
}

const SELECT_NOTIFICATIONS: &str =
    "SELECT id, user_id, type, title, message, read, created_at FROM notifications";

pub async fn create(
    pool: &SqlitePool,
    user_id: &str,
    kind: &str,
    title: &str,
    message: &str,
) -> Result<(), AppError> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO notifications (id, user_id, type, title, message) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(kind)
    .bind(title)
    .bind(message)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Notification>, AppError> {
    let rows = sqlx::query(&format!(
        "{SELECT_NOTIFICATIONS} WHERE user_id = ? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_to_notification).collect())
}

pub async fn mark_read(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Notification, AppError> {
    let res = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("unknown_notification".to_string()));
    }

    let row = sqlx::query(&format!("{SELECT_NOTIFICATIONS} WHERE id = ?"))
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(row_to_notification(row))
}
