use sqlx::{SqliteConnection, SqlitePool};

use crate::error::AppError;

const CODE_LEN: usize = 6;
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// With 36^6 possible codes a collision against the live set is negligible;
// the bounded loop below rejection-samples against the table anyway.
const MAX_MINT_ATTEMPTS: u32 = 32;

fn generate_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Mints a fresh code for a space inside the caller's transaction. The
/// primary key covers retired codes too, so a code is never handed out
/// twice even across deleted spaces.
pub async fn mint(conn: &mut SqliteConnection, space_id: &str) -> Result<String, AppError> {
    for _ in 0..MAX_MINT_ATTEMPTS {
        let code = generate_code();
        let res = sqlx::query("INSERT OR IGNORE INTO invite_codes (code, space_id) VALUES (?, ?)")
            .bind(&code)
            .bind(space_id)
            .execute(&mut *conn)
            .await?;
        if res.rows_affected() == 1 {
            return Ok(code);
        }
    }

    Err(AppError::Internal(
        "exhausted invite code mint attempts".to_string(),
    ))
}

/// Resolves a live code to its space id. Retired or never-minted codes both
/// come back as `InvalidCode`; the caller cannot tell them apart.
pub async fn resolve(pool: &SqlitePool, code: &str) -> Result<String, AppError> {
    sqlx::query_scalar::<_, String>(
        "SELECT space_id FROM invite_codes WHERE code = ? AND live = 1",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::InvalidCode)
}

/// Looks a code up regardless of liveness. Lets `confirm` treat a retry by
/// the user whose join already retired the code as benign instead of dead.
pub async fn lookup(
    pool: &SqlitePool,
    code: &str,
) -> Result<Option<(String, bool)>, AppError> {
    let row = sqlx::query_as::<_, (String, i64)>(
        "SELECT space_id, live FROM invite_codes WHERE code = ?",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(space_id, live)| (space_id, live != 0)))
}

/// Retires every live code pointing at a space. Called inside the same
/// transaction that fills the space or deletes it.
pub async fn invalidate(conn: &mut SqliteConnection, space_id: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE invite_codes SET live = 0 WHERE space_id = ? AND live = 1")
        .bind(space_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn live_code_for_space(
    pool: &SqlitePool,
    space_id: &str,
) -> Result<Option<String>, AppError> {
    let code = sqlx::query_scalar::<_, String>(
        "SELECT code FROM invite_codes WHERE space_id = ? AND live = 1 LIMIT 1",
    )
    .bind(space_id)
    .fetch_optional(pool)
    .await?;
    Ok(code)
}
