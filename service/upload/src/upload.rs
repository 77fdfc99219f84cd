use std::sync::Arc;

use async_trait::async_trait;
use domain_upload::{
    exception::{UploadException, UploadResult},
    model::vo::{ChunkDescriptor, ChunkStatus, UploadSnapshot, WriteOutcome},
    repository::UploadRegistry,
    service::{ByteSource, ChunkStore, UploadService},
};
use tracing::instrument;
use typed_builder::TypedBuilder;

#[derive(TypedBuilder)]
pub struct UploadServiceImpl {
    registry: Arc<dyn UploadRegistry>,
    chunk_store: Arc<dyn ChunkStore>,
}

#[async_trait]
impl UploadService for UploadServiceImpl {
    #[instrument(skip_all, fields(upload_id = %descriptor.upload_id, chunk = descriptor.chunk_number))]
    async fn has_chunk(&self, descriptor: &ChunkDescriptor) -> UploadResult<bool> {
        descriptor.validate()?;
        let state = self.registry.get_or_create(descriptor)?;
        state.ensure_matches(descriptor)?;
        Ok(self.chunk_store.has_chunk(&state, descriptor.chunk_number).await)
    }

    #[instrument(skip_all, fields(upload_id = %descriptor.upload_id, chunk = descriptor.chunk_number))]
    async fn store_chunk(
        &self,
        descriptor: &ChunkDescriptor,
        source: ByteSource,
        declared_length: u64,
    ) -> UploadResult<WriteOutcome> {
        descriptor.validate()?;
        let state = self.registry.get_or_create(descriptor)?;
        state.ensure_matches(descriptor)?;
        let outcome = self
            .chunk_store
            .write(&state, descriptor, source, declared_length)
            .await
            .inspect_err(|e| tracing::warn!("Storing chunk failed: {e}"))?;
        if outcome.status == ChunkStatus::AlreadyStored {
            tracing::debug!("Duplicate chunk ignored.");
        }
        Ok(outcome)
    }

    async fn info(&self, upload_id: &str) -> UploadResult<UploadSnapshot> {
        let state = self.registry.get(upload_id).ok_or_else(|| UploadException::UploadNotFound {
            upload_id: upload_id.to_owned(),
        })?;
        Ok(state.snapshot().await)
    }

    #[instrument(skip(self))]
    async fn cancel(&self, upload_id: &str) -> UploadResult<()> {
        let state = self.registry.remove(upload_id).ok_or_else(|| UploadException::UploadNotFound {
            upload_id: upload_id.to_owned(),
        })?;
        self.chunk_store.discard(&state).await?;
        tracing::info!("Upload cancelled.");
        Ok(())
    }
}
