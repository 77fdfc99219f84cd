use std::sync::Arc;

use crate::exception::UploadResult;
use crate::model::entity::UploadState;
use crate::model::vo::ChunkDescriptor;

/// Process wide map from upload id to its state.
pub trait UploadRegistry: Send + Sync {
    /// The state of `descriptor.upload_id`, created from the descriptor if absent.
    ///
    /// Creation is atomic: concurrent callers for one new id all get the same instance.
    fn get_or_create(&self, descriptor: &ChunkDescriptor) -> UploadResult<Arc<UploadState>>;

    fn get(&self, upload_id: &str) -> Option<Arc<UploadState>>;

    fn remove(&self, upload_id: &str) -> Option<Arc<UploadState>>;

    /// Removes the entry only if it still is `state` and has been idle for more than
    /// `ttl_secs` at `now`, returns whether it did.
    ///
    /// The idle check and the removal are atomic with respect to `get_or_create`, which
    /// refreshes the activity before handing the state out.
    fn remove_if_idle(&self, state: &Arc<UploadState>, now: i64, ttl_secs: i64) -> bool;

    /// Snapshot of all current states.
    fn uploads(&self) -> Vec<Arc<UploadState>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
