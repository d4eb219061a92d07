//! Periodic eviction of expired job directories.
//!
//! Spawns a loop that asks the [`ScratchManager`] to delete job directories
//! older than the configured TTL. Runs on a fixed interval using
//! `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use maaslin_core::scratch::{RetentionPolicy, ScratchManager};
use tokio_util::sync::CancellationToken;

/// Run the scratch retention loop until `cancel` is triggered.
///
/// Returns immediately when the policy has no TTL.
pub async fn run(scratch: Arc<ScratchManager>, interval: Duration, cancel: CancellationToken) {
    let RetentionPolicy::ExpireAfter(ttl) = scratch.policy() else {
        tracing::info!(policy = ?scratch.policy(), "Scratch retention sweep disabled");
        return;
    };

    tracing::info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = interval.as_secs(),
        root = %scratch.root().display(),
        "Scratch retention job started"
    );

    let mut interval = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Scratch retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = scratch.evict_expired(Utc::now()).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Scratch retention: removed expired job directories");
                } else {
                    tracing::debug!("Scratch retention: nothing to remove");
                }
            }
        }
    }
}
