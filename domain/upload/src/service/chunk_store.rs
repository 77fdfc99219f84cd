use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::exception::UploadResult;
use crate::model::entity::UploadState;
use crate::model::vo::{ChunkDescriptor, WriteOutcome};

/// Bytes of one chunk as handed over by the transport.
pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;

/// # Chunk storage backend
///
/// Writes chunk bytes into an upload's backing file and promotes that file once the
/// upload is complete. Callers only depend on this capability, never on a concrete backend.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Whether `chunk_number` has been persisted for `state`.
    async fn has_chunk(&self, state: &UploadState, chunk_number: u64) -> bool;

    /// Write up to `declared_length` bytes of `source` at the chunk's offset and record it.
    ///
    /// A chunk that is already recorded, or an upload that is already finalized, is a
    /// no-op. On I/O failure nothing is recorded, so the client may send the chunk again.
    async fn write(
        &self,
        state: &UploadState,
        descriptor: &ChunkDescriptor,
        source: ByteSource,
        declared_length: u64,
    ) -> UploadResult<WriteOutcome>;

    /// Promote the backing file to its final name.
    async fn finalize(&self, state: &UploadState) -> UploadResult<()>;

    /// Remove the backing file of an unfinished upload.
    async fn discard(&self, state: &UploadState) -> UploadResult<()>;
}
