//! Scheduled purge of expired revocation store entries.
//!
//! Expired entries are already ignored by every lookup; purging only keeps the
//! store from growing without bound.

use std::time::Duration;

use tracing::{error, info};

use crate::store::RevocationStore;

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup<S: RevocationStore>(store: &S) {
    match store.purge_expired().await {
        Ok(count) if count > 0 => info!("Purged {} expired store entries", count),
        Ok(_) => {}
        Err(e) => error!("Failed to purge expired store entries: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler<S: RevocationStore>(store: S) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&store).await;
        }
    })
}
