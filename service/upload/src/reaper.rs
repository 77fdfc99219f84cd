use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain_upload::{repository::UploadRegistry, service::ChunkStore};
use typed_builder::TypedBuilder;

/// Background sweeper that drops idle uploads from the registry.
///
/// Finalized uploads go after `finished_ttl_secs` of inactivity. Unfinished ones go after
/// `abandoned_ttl_secs` together with their in-progress file.
#[derive(TypedBuilder)]
pub struct UploadReaperImpl {
    registry: Arc<dyn UploadRegistry>,
    chunk_store: Arc<dyn ChunkStore>,
    #[builder(default = 5 * 60)]
    interval_secs: u64,
    #[builder(default = 60 * 60)]
    finished_ttl_secs: i64,
    #[builder(default = 24 * 60 * 60)]
    abandoned_ttl_secs: i64,
}

impl UploadReaperImpl {
    pub async fn run(&self) {
        loop {
            tokio::time::sleep(Duration::from_secs(self.interval_secs)).await;
            let evicted = self.sweep(Utc::now().timestamp()).await;
            if evicted > 0 {
                tracing::info!(evicted, remaining = self.registry.len(), "Swept idle uploads.");
            }
        }
    }

    /// Evict every upload idle past its ttl at `now`, returns how many were evicted.
    pub async fn sweep(&self, now: i64) -> usize {
        let mut evicted = 0;
        for state in self.registry.uploads() {
            if state.is_busy() {
                continue;
            }
            let idle = state.idle_secs(now);
            let finalized = state.is_finalized();
            let ttl = if finalized {
                self.finished_ttl_secs
            } else {
                self.abandoned_ttl_secs
            };
            // Re-checked under the registry lock, a request arriving meanwhile keeps it alive.
            if idle <= ttl || !self.registry.remove_if_idle(&state, now, ttl) {
                continue;
            }
            evicted += 1;
            if finalized {
                continue;
            }
            if let Err(e) = self.chunk_store.discard(&state).await {
                tracing::warn!(upload_id = %state.upload_id, "Removing abandoned upload failed: {e}");
            } else {
                tracing::info!(upload_id = %state.upload_id, idle, "Abandoned upload removed.");
            }
        }
        evicted
    }
}
