use axum::extract::{Path, State};
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let notifications = db::notifications::list_for_user(&state.db, &auth.user_id).await?;
    Ok(Json(serde_json::json!({ "data": notifications })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let notification =
        db::notifications::mark_read(&state.db, &notification_id, &auth.user_id).await?;
    Ok(Json(serde_json::json!({ "data": notification })))
}
