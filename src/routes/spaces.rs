use axum::extract::{Path, State};
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::space::{CodeRequest, CreateSpace, PendingMatch, PetNames, UpdateSpace};
use crate::notify;
use crate::state::AppState;

async fn require_membership(
    state: &AppState,
    space_id: &str,
    user_id: &str,
) -> Result<(), AppError> {
    db::spaces::get_space_row(&state.db, space_id).await?;
    if !db::spaces::is_member(&state.db, space_id, user_id).await? {
        return Err(AppError::Forbidden(
            "you are not a member of this space".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_space(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateSpace>,
) -> Result<Json<serde_json::Value>, AppError> {
    if input.anniversary_date.trim().is_empty() {
        return Err(AppError::BadRequest(
            "anniversary_date is required".to_string(),
        ));
    }

    if db::spaces::space_id_for_user(&state.db, &auth.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::AlreadyInSpace);
    }

    let space = db::with_write_retries(|| {
        db::spaces::create_space(&state.db, &auth.user_id, &input.anniversary_date)
    })
    .await?;

    Ok(Json(serde_json::json!({ "data": space })))
}

pub async fn get_my_space(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let space = db::spaces::get_space_for_user(&state.db, &auth.user_id).await?;
    Ok(Json(serde_json::json!({ "data": space })))
}

/// Step one of the join: resolve the code and return a read-only snapshot
/// for the "Is this your partner?" screen. Performs no mutation, so it is
/// safe to retry and to abandon.
pub async fn redeem_code(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CodeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let space_id = db::invites::resolve(&state.db, &input.code).await?;
    let space = db::spaces::get_space(&state.db, &space_id).await?;

    if space.partners.iter().any(|p| p.id == auth.user_id) {
        return Err(AppError::SelfJoin);
    }
    if db::spaces::space_id_for_user(&state.db, &auth.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::AlreadyInSpace);
    }

    // A live code implies exactly one partner; if the roster is empty the
    // space is mid-deletion and the code is as good as dead.
    let partner = space.partners.first().ok_or(AppError::InvalidCode)?.clone();

    let pending = PendingMatch {
        code: input.code,
        space_id: space.id,
        anniversary_date: space.anniversary_date,
        partner,
        acting_user_id: auth.user_id,
    };

    Ok(Json(serde_json::json!({ "data": pending })))
}

/// Step two: the authoritative join. Re-resolves the code server-side and
/// never trusts the client's snapshot. Notifies both partners on success.
pub async fn confirm_join(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CodeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (space_id, live) = db::invites::lookup(&state.db, &input.code)
        .await?
        .ok_or(AppError::InvalidCode)?;

    if !live {
        // The code was already retired. Benign only when it was this very
        // user's join that retired it; anyone else sees a dead code.
        let current = db::spaces::space_id_for_user(&state.db, &auth.user_id).await?;
        if current.as_deref() == Some(space_id.as_str()) {
            let space = db::spaces::get_space(&state.db, &space_id).await?;
            return Ok(Json(serde_json::json!({ "data": space })));
        }
        return Err(AppError::InvalidCode);
    }

    let space = db::with_write_retries(|| {
        db::spaces::add_partner(&state.db, &space_id, &auth.user_id)
    })
    .await
    .map_err(|e| match e {
        // The space vanished between resolve and join: same outcome for the
        // client as a dead code.
        AppError::NotFound(_) => AppError::InvalidCode,
        other => other,
    })?;

    let partners: Vec<String> = space.partners.iter().map(|p| p.id.clone()).collect();
    notify::notify(
        &state.db,
        &partners,
        "paired",
        "You are paired",
        "Your space now has both partners.",
    )
    .await;

    Ok(Json(serde_json::json!({ "data": space })))
}

/// Pet names are scoped to the caller's membership row; no space id in the
/// path because a user has at most one space.
pub async fn get_pet_names(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let names = db::spaces::get_pet_names(&state.db, &auth.user_id).await?;
    Ok(Json(serde_json::json!({ "data": names })))
}

pub async fn update_pet_names(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<PetNames>,
) -> Result<Json<serde_json::Value>, AppError> {
    let names = db::spaces::update_pet_names(&state.db, &auth.user_id, &input).await?;
    Ok(Json(serde_json::json!({ "data": names })))
}

pub async fn update_anniversary_date(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    auth: AuthUser,
    Json(input): Json<UpdateSpace>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_membership(&state, &space_id, &auth.user_id).await?;

    let space = db::with_write_retries(|| {
        db::spaces::update_anniversary_date(&state.db, &space_id, &input.anniversary_date)
    })
    .await?;

    Ok(Json(serde_json::json!({ "data": space })))
}

/// Direct, immediate unbind with no cooling-off. The rarely-used
/// administrative path; the primary flow is the unbind request below.
pub async fn delete_space(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    require_membership(&state, &space_id, &auth.user_id).await?;

    let partners =
        db::with_write_retries(|| db::spaces::delete_space(&state.db, &space_id)).await?;

    notify::space_deleted(&space_id);
    notify::notify(
        &state.db,
        &partners,
        "space_deleted",
        "Space deleted",
        "Your space has been dissolved.",
    )
    .await;

    Ok(Json(serde_json::json!({ "data": null })))
}

pub async fn request_unbind(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    require_membership(&state, &space_id, &auth.user_id).await?;

    let partners = db::spaces::partner_ids(&state.db, &space_id).await?;
    if partners.len() < 2 {
        return Err(AppError::NotPaired);
    }

    // Idempotent: a second request while one is pending returns the
    // existing request and does not re-notify.
    if let Some(existing) = db::unbind::get_pending(&state.db, &space_id).await? {
        return Ok(Json(serde_json::json!({ "data": existing })));
    }

    let (request, created) = db::with_write_retries(|| {
        db::unbind::create_request(&state.db, &space_id, &auth.user_id)
    })
    .await?;

    // A racing duplicate gets the winner's request back and must not
    // re-notify.
    if created {
        notify::notify(
            &state.db,
            &partners,
            "unbind_requested",
            "Unbind requested",
            "An unbind request was created. You have 7 days to cancel it.",
        )
        .await;
    }

    Ok(Json(serde_json::json!({ "data": request })))
}

/// Either partner may cancel, not only the requester.
pub async fn cancel_unbind(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    require_membership(&state, &space_id, &auth.user_id).await?;

    db::with_write_retries(|| db::unbind::cancel(&state.db, &space_id)).await?;

    let partners = db::spaces::partner_ids(&state.db, &space_id).await?;
    notify::notify(
        &state.db,
        &partners,
        "unbind_cancelled",
        "Unbind cancelled",
        "The unbind request was cancelled. Your space stays intact.",
    )
    .await;

    Ok(Json(serde_json::json!({ "data": null })))
}

pub async fn get_unbind_status(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    require_membership(&state, &space_id, &auth.user_id).await?;

    let request = db::unbind::get_status(&state.db, &space_id).await?;
    Ok(Json(serde_json::json!({ "data": request })))
}
