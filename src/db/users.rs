use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::{CreateUser, PublicProfile, User};

fn row_to_user(row: sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        avatar: row.get("avatar"),
        created_at: row.get("created_at"),
    }
}

const SELECT_USERS: &str =
    "SELECT id, username, display_name, avatar, created_at FROM users";

pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<User, AppError> {
    let row = sqlx::query(&format!("{SELECT_USERS} WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("unknown_user".to_string()))?;

    Ok(row_to_user(row))
}

pub async fn get_public_profile(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<PublicProfile, AppError> {
    Ok(get_user(pool, user_id).await?.into())
}

pub async fn create_user(pool: &SqlitePool, input: &CreateUser) -> Result<User, AppError> {
    let id = Uuid::new_v4().to_string();
    let display_name = input.display_name.as_deref().unwrap_or(&input.username);

    sqlx::query("INSERT INTO users (id, username, display_name) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(&input.username)
        .bind(display_name)
        .execute(pool)
        .await?;

    get_user(pool, &id).await
}
