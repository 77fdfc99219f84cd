use std::sync::Arc;

use domain_upload::{
    repository::UploadRegistry,
    service::{ChunkStore, UploadService},
};
use service_upload::{InMemoryUploadRegistry, LocalChunkStoreImpl, UploadReaperImpl, UploadServiceImpl};

use super::UploadServerConfig;

/// Wires the upload services from the configuration.
pub struct ServiceProvider {
    config: UploadServerConfig,
    registry: Arc<dyn UploadRegistry>,
    chunk_store: Arc<dyn ChunkStore>,
    upload_service: Arc<dyn UploadService>,
}

impl ServiceProvider {
    pub async fn build(config: UploadServerConfig) -> anyhow::Result<Self> {
        let upload_dir = config.storage.upload_dir();
        LocalChunkStoreImpl::prepare(&upload_dir).await?;
        let registry: Arc<dyn UploadRegistry> = Arc::new(
            InMemoryUploadRegistry::builder()
                .upload_dir(upload_dir)
                .in_progress_suffix(config.storage.in_progress_suffix.to_owned())
                .build(),
        );
        let chunk_store: Arc<dyn ChunkStore> = Arc::new(
            LocalChunkStoreImpl::builder()
                .buffer_size(config.storage.buffer_size)
                .sync_chunks(config.storage.sync_chunks)
                .completeness(config.storage.completeness)
                .build(),
        );
        let upload_service: Arc<dyn UploadService> = Arc::new(
            UploadServiceImpl::builder()
                .registry(registry.clone())
                .chunk_store(chunk_store.clone())
                .build(),
        );
        Ok(Self {
            config,
            registry,
            chunk_store,
            upload_service,
        })
    }

    pub fn config(&self) -> &UploadServerConfig {
        &self.config
    }

    pub fn upload_service(&self) -> Arc<dyn UploadService> {
        self.upload_service.clone()
    }

    /// The idle upload sweeper, if enabled.
    pub fn reaper(&self) -> Option<UploadReaperImpl> {
        let config = &self.config.reaper;
        config.enable.then(|| {
            UploadReaperImpl::builder()
                .registry(self.registry.clone())
                .chunk_store(self.chunk_store.clone())
                .interval_secs(config.interval_secs)
                .finished_ttl_secs(config.finished_ttl_secs)
                .abandoned_ttl_secs(config.abandoned_ttl_secs)
                .build()
        })
    }
}
