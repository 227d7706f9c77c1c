use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::models::space::{PetNames, Space, SpaceRow};
use crate::models::user::PublicProfile;

fn row_to_space(row: sqlx::sqlite::SqliteRow) -> SpaceRow {
    SpaceRow {
        id: row.get("id"),
        anniversary_date: row.get("anniversary_date"),
        created_at: row.get("created_at"),
    }
}

const SELECT_SPACES: &str = "SELECT id, anniversary_date, created_at FROM spaces";

pub async fn get_space_row(pool: &SqlitePool, space_id: &str) -> Result<SpaceRow, AppError> {
    let row = sqlx::query(&format!("{SELECT_SPACES} WHERE id = ?"))
        .bind(space_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("unknown_space".to_string()))?;

    Ok(row_to_space(row))
}

/// Partner roster in join order, public fields only.
pub async fn partner_profiles(
    pool: &SqlitePool,
    space_id: &str,
) -> Result<Vec<PublicProfile>, AppError> {
    let rows = sqlx::query(
        "SELECT u.id, u.username, u.display_name, u.avatar \
         FROM users u \
         JOIN space_members sm ON u.id = sm.user_id \
         WHERE sm.space_id = ? \
         ORDER BY sm.joined_at ASC, u.id ASC",
    )
    .bind(space_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| PublicProfile {
            id: row.get("id"),
            username: row.get("username"),
            display_name: row.get("display_name"),
            avatar: row.get("avatar"),
        })
        .collect())
}

pub async fn partner_ids(pool: &SqlitePool, space_id: &str) -> Result<Vec<String>, AppError> {
    let rows = sqlx::query_as::<_, (String,)>(
        "SELECT user_id FROM space_members WHERE space_id = ? ORDER BY joined_at ASC, user_id ASC",
    )
    .bind(space_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn is_member(
    pool: &SqlitePool,
    space_id: &str,
    user_id: &str,
) -> Result<bool, AppError> {
    let row = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM space_members WHERE space_id = ? AND user_id = ?",
    )
    .bind(space_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

pub async fn space_id_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<String>, AppError> {
    let id = sqlx::query_scalar::<_, String>(
        "SELECT space_id FROM space_members WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

/// The full space view: row, roster and the live invite code (present only
/// while the space has a single partner).
pub async fn get_space(pool: &SqlitePool, space_id: &str) -> Result<Space, AppError> {
    let row = get_space_row(pool, space_id).await?;
    let partners = partner_profiles(pool, space_id).await?;
    let invite_code = db::invites::live_code_for_space(pool, space_id).await?;

    Ok(Space {
        id: row.id,
        anniversary_date: row.anniversary_date,
        invite_code,
        partners,
        created_at: row.created_at,
    })
}

pub async fn get_space_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<Space>, AppError> {
    match space_id_for_user(pool, user_id).await? {
        Some(space_id) => Ok(Some(get_space(pool, &space_id).await?)),
        None => Ok(None),
    }
}

/// Creates a space with its owner as the first partner and a freshly minted
/// invite code, all in one transaction.
pub async fn create_space(
    pool: &SqlitePool,
    owner_id: &str,
    anniversary_date: &str,
) -> Result<Space, AppError> {
    let id = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO spaces (id, anniversary_date) VALUES (?, ?)")
        .bind(&id)
        .bind(anniversary_date)
        .execute(&mut *tx)
        .await?;

    db::invites::mint(&mut *tx, &id).await?;

    // The unique index on space_members.user_id is the authority on "one
    // space per user"; a concurrent create or join by the same user makes
    // this insert a no-op and we roll back.
    let inserted =
        sqlx::query("INSERT OR IGNORE INTO space_members (space_id, user_id) VALUES (?, ?)")
            .bind(&id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
    if inserted.rows_affected() == 0 {
        return Err(AppError::AlreadyInSpace);
    }

    tx.commit().await?;

    get_space(pool, &id).await
}

/// Adds the second partner. Serialized per space by a guarded insert: of two
/// racing joins exactly one commits, the other observes zero rows and gets
/// `SpaceFull`. A retry by a user who already joined this space is benign
/// and returns the current space.
pub async fn add_partner(
    pool: &SqlitePool,
    space_id: &str,
    user_id: &str,
) -> Result<Space, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query(&format!("{SELECT_SPACES} WHERE id = ?"))
        .bind(space_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("unknown_space".to_string()))?;

    let existing = sqlx::query_scalar::<_, String>(
        "SELECT space_id FROM space_members WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(current) = existing {
        if current == space_id {
            // already the second partner of this space; idempotent no-op
            drop(tx);
            return get_space(pool, space_id).await;
        }
        return Err(AppError::AlreadyInSpace);
    }

    // The pre-check above can lose to a concurrent join into a different
    // space; the unique index on user_id is the authority and reports the
    // duplicate here.
    let res = sqlx::query(
        "INSERT INTO space_members (space_id, user_id) \
         SELECT ?1, ?2 \
         WHERE (SELECT COUNT(*) FROM space_members WHERE space_id = ?1) < 2",
    )
    .bind(space_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e, "space_members.user_id") {
            AppError::AlreadyInSpace
        } else {
            AppError::from(e)
        }
    })?;

    if res.rows_affected() == 0 {
        return Err(AppError::SpaceFull);
    }

    // The space is full now; retire its code in the same transaction so the
    // code stops resolving the instant the join commits.
    db::invites::invalidate(&mut *tx, space_id).await?;

    tx.commit().await?;

    get_space(pool, space_id).await
}

/// Pet names live on the caller's own membership row, so each partner keeps
/// an independent pair.
pub async fn get_pet_names(pool: &SqlitePool, user_id: &str) -> Result<PetNames, AppError> {
    let row = sqlx::query(
        "SELECT pet_name, partner_pet_name FROM space_members WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("unknown_space".to_string()))?;

    Ok(PetNames {
        pet_name: row.get("pet_name"),
        partner_pet_name: row.get("partner_pet_name"),
    })
}

pub async fn update_pet_names(
    pool: &SqlitePool,
    user_id: &str,
    names: &PetNames,
) -> Result<PetNames, AppError> {
    let res = sqlx::query(
        "UPDATE space_members SET pet_name = ?, partner_pet_name = ? WHERE user_id = ?",
    )
    .bind(&names.pet_name)
    .bind(&names.partner_pet_name)
    .bind(user_id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("unknown_space".to_string()));
    }

    get_pet_names(pool, user_id).await
}

pub async fn update_anniversary_date(
    pool: &SqlitePool,
    space_id: &str,
    date: &str,
) -> Result<Space, AppError> {
    let res = sqlx::query("UPDATE spaces SET anniversary_date = ? WHERE id = ?")
        .bind(date)
        .bind(space_id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("unknown_space".to_string()));
    }

    get_space(pool, space_id).await
}

/// Hard removal. Retires the invite code, empties the roster and supersedes
/// any pending unbind request in one transaction. Returns the former
/// partner ids so the caller can notify them after the commit.
pub async fn delete_space(pool: &SqlitePool, space_id: &str) -> Result<Vec<String>, AppError> {
    let mut tx = pool.begin().await?;
    let partners = delete_space_in_tx(&mut tx, space_id).await?;
    tx.commit().await?;
    Ok(partners)
}

/// Deletion body shared with the unbind finalizer, which must commit its
/// `pending → completed` claim and the deletion atomically. The caller owns
/// the transaction.
pub async fn delete_space_in_tx(
    tx: &mut SqliteConnection,
    space_id: &str,
) -> Result<Vec<String>, AppError> {
    let partners: Vec<String> = sqlx::query_as::<_, (String,)>(
        "SELECT user_id FROM space_members WHERE space_id = ? ORDER BY joined_at ASC, user_id ASC",
    )
    .bind(space_id)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(|r| r.0)
    .collect();

    let res = sqlx::query("DELETE FROM spaces WHERE id = ?")
        .bind(space_id)
        .execute(&mut *tx)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("unknown_space".to_string()));
    }

    sqlx::query("DELETE FROM space_members WHERE space_id = ?")
        .bind(space_id)
        .execute(&mut *tx)
        .await?;

    db::invites::invalidate(&mut *tx, space_id).await?;

    // A direct delete supersedes the cooling-off path; the sweep must not
    // find a pending request for a space that no longer exists.
    sqlx::query(
        "UPDATE unbind_requests SET status = 'completed' WHERE space_id = ? AND status = 'pending'",
    )
    .bind(space_id)
    .execute(&mut *tx)
    .await?;

    Ok(partners)
}
