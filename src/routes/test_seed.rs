use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::middleware::auth::{create_token_hash, generate_token};
use crate::models::space::Space;
use crate::models::user::{CreateUser, User};
use crate::state::AppState;

/// Seeds a deterministic paired fixture for end-to-end test clients. Only
/// reachable with test mode enabled; otherwise it does not exist.
pub async fn seed(State(state): State<AppState>) -> impl IntoResponse {
    if !state.test_mode {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": {
                    "code": "not_found",
                    "message": "not found"
                }
            })),
        );
    }

    match do_seed(&state).await {
        Ok(data) => (StatusCode::OK, Json(json!({ "data": data }))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": {
                    "code": "seed_failed",
                    "message": format!("{e:?}")
                }
            })),
        ),
    }
}

async fn do_seed(state: &AppState) -> Result<serde_json::Value, AppError> {
    let pool = &state.db;

    // 1. Find or create both partners, then rotate their tokens
    let user = find_or_create_user(pool, "test_user", "Test User").await?;
    let partner = find_or_create_user(pool, "test_partner", "Test Partner").await?;

    let user_token = rotate_token(pool, &user.id).await?;
    let partner_token = rotate_token(pool, &partner.id).await?;

    // 2. Ensure they share a paired space
    let space = match db::spaces::get_space_for_user(pool, &user.id).await? {
        Some(space) => space,
        None => db::spaces::create_space(pool, &user.id, "2020-01-01").await?,
    };

    let space: Space = if space.partners.iter().any(|p| p.id == partner.id) {
        space
    } else {
        db::spaces::add_partner(pool, &space.id, &partner.id).await?
    };

    Ok(json!({
        "user": { "id": user.id, "username": user.username, "token": user_token },
        "partner": { "id": partner.id, "username": partner.username, "token": partner_token },
        "space": space,
    }))
}

async fn find_or_create_user(
    pool: &SqlitePool,
    username: &str,
    display_name: &str,
) -> Result<User, AppError> {
    let existing = sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    match existing {
        Some(id) => db::users::get_user(pool, &id).await,
        None => {
            db::users::create_user(
                pool,
                &CreateUser {
                    username: username.to_string(),
                    display_name: Some(display_name.to_string()),
                },
            )
            .await
        }
    }
}

async fn rotate_token(pool: &SqlitePool, user_id: &str) -> Result<String, AppError> {
    sqlx::query("DELETE FROM user_tokens WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    let token = generate_token();
    let token_hash = create_token_hash(&token);

    sqlx::query(
        "INSERT INTO user_tokens (token_hash, user_id, expires_at) VALUES (?, ?, '2099-12-31T23:59:59')",
    )
    .bind(&token_hash)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(token)
}
