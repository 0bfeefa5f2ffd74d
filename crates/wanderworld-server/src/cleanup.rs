use std::time::Duration;

use tracing::{info, warn};
use wanderworld_db::SqliteSessionStore;

/// Background task that prunes expired sessions.
///
/// Expired rows are already invisible to `load`; this only keeps the table
/// from growing without bound.
pub async fn run_cleanup_loop(store: SqliteSessionStore, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match store.delete_expired().await {
            Ok(count) => {
                if count > 0 {
                    info!("Cleanup: pruned {} expired sessions", count);
                }
            }
            Err(e) => {
                warn!("Cleanup error: {}", e);
            }
        }
    }
}
