use sqlx::SqlitePool;
use std::time::Duration;

use crate::db;

/// Spawns the periodic unbind finalizer. The expiry lives in the data
/// (`expires_at`), not in a timer, so the transition survives restarts; the
/// sweep just converts whatever it finds already expired.
pub fn spawn(pool: SqlitePool, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            match db::unbind::finalize_expired(&pool).await {
                Ok(0) => {}
                Ok(n) => tracing::info!("finalized {n} expired unbind request(s)"),
                Err(e) => tracing::error!("unbind sweep error: {e:?}"),
            }
        }
    })
}
