use async_trait::async_trait;

use crate::exception::UploadResult;
use crate::model::vo::{ChunkDescriptor, UploadSnapshot, WriteOutcome};
use crate::service::ByteSource;

/// # Resumable upload service
///
/// Facade the HTTP boundary talks to. Every descriptor is validated before any state
/// or storage is touched.
#[async_trait]
pub trait UploadService: Send + Sync {
    /// Whether the chunk is already stored, used by clients to skip chunks when resuming.
    async fn has_chunk(&self, descriptor: &ChunkDescriptor) -> UploadResult<bool>;

    /// Store one chunk and report whether the whole file is now finalized.
    async fn store_chunk(
        &self,
        descriptor: &ChunkDescriptor,
        source: ByteSource,
        declared_length: u64,
    ) -> UploadResult<WriteOutcome>;

    /// Progress of an upload.
    async fn info(&self, upload_id: &str) -> UploadResult<UploadSnapshot>;

    /// Forget an upload and remove its in-progress file. Finalized files are kept.
    async fn cancel(&self, upload_id: &str) -> UploadResult<()>;
}
