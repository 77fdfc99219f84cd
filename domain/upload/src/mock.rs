use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;

use crate::{
    exception::UploadResult,
    model::{
        entity::UploadState,
        vo::{ChunkDescriptor, UploadSnapshot, WriteOutcome},
    },
    repository::UploadRegistry,
    service::{ByteSource, ChunkStore, UploadService},
};

mock! {
    pub ChunkStore {}
    #[async_trait]
    impl ChunkStore for ChunkStore {
        async fn has_chunk(&self, state: &UploadState, chunk_number: u64) -> bool;
        async fn write(
            &self,
            state: &UploadState,
            descriptor: &ChunkDescriptor,
            source: ByteSource,
            declared_length: u64,
        ) -> UploadResult<WriteOutcome>;
        async fn finalize(&self, state: &UploadState) -> UploadResult<()>;
        async fn discard(&self, state: &UploadState) -> UploadResult<()>;
    }
}

mock! {
    pub UploadRegistry {}
    impl UploadRegistry for UploadRegistry {
        fn get_or_create(&self, descriptor: &ChunkDescriptor) -> UploadResult<Arc<UploadState>>;
        fn get(&self, upload_id: &str) -> Option<Arc<UploadState>>;
        fn remove(&self, upload_id: &str) -> Option<Arc<UploadState>>;
        fn remove_if_idle(&self, state: &Arc<UploadState>, now: i64, ttl_secs: i64) -> bool;
        fn uploads(&self) -> Vec<Arc<UploadState>>;
        fn len(&self) -> usize;
    }
}

mock! {
    pub UploadService {}
    #[async_trait]
    impl UploadService for UploadService {
        async fn has_chunk(&self, descriptor: &ChunkDescriptor) -> UploadResult<bool>;
        async fn store_chunk(
            &self,
            descriptor: &ChunkDescriptor,
            source: ByteSource,
            declared_length: u64,
        ) -> UploadResult<WriteOutcome>;
        async fn info(&self, upload_id: &str) -> UploadResult<UploadSnapshot>;
        async fn cancel(&self, upload_id: &str) -> UploadResult<()>;
    }
}
