use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use corkboard_db::Database;

/// Background task that deletes expired sessions.
///
/// Expired sessions already fail to resolve; this only keeps the table small.
pub async fn run_session_sweep(db: Arc<Database>, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        let db = db.clone();
        match tokio::task::spawn_blocking(move || db.purge_expired_sessions()).await {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Sweep: removed {} expired sessions", count);
                }
            }
            Ok(Err(e)) => warn!("Sweep error: {}", e),
            Err(e) => warn!("Sweep task failed: {}", e),
        }
    }
}
