use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use domain_upload::{
    exception::{UploadException, UploadResult},
    model::{entity::UploadState, vo::ChunkDescriptor},
    repository::UploadRegistry,
};
use typed_builder::TypedBuilder;

/// Upload registry living in process memory, sharded so different ids never contend.
#[derive(TypedBuilder)]
pub struct InMemoryUploadRegistry {
    #[builder(setter(into))]
    upload_dir: PathBuf,
    #[builder(default = ".part".into(), setter(into))]
    in_progress_suffix: String,
    #[builder(default, setter(skip))]
    uploads: DashMap<String, Arc<UploadState>>,
}

impl InMemoryUploadRegistry {
    fn create(&self, descriptor: &ChunkDescriptor) -> UploadResult<Arc<UploadState>> {
        let final_path = self.upload_dir.join(&descriptor.file_name);
        if final_path.parent() != Some(self.upload_dir.as_path()) {
            return Err(UploadException::UnsafeFileName {
                file_name: descriptor.file_name.to_owned(),
            });
        }
        let backing_path = self
            .upload_dir
            .join(format!("{}{}", descriptor.file_name, self.in_progress_suffix));
        tracing::debug!(
            upload_id = %descriptor.upload_id,
            backing_path = %backing_path.display(),
            "Registering upload."
        );
        Ok(Arc::new(UploadState::new(descriptor, backing_path, final_path)))
    }
}

impl UploadRegistry for InMemoryUploadRegistry {
    fn get_or_create(&self, descriptor: &ChunkDescriptor) -> UploadResult<Arc<UploadState>> {
        // The shard stays locked while the closure runs, so only one state per id is ever built.
        let entry = self
            .uploads
            .entry(descriptor.upload_id.to_owned())
            .or_try_insert_with(|| self.create(descriptor))?;
        entry.value().touch();
        Ok(entry.value().clone())
    }

    fn get(&self, upload_id: &str) -> Option<Arc<UploadState>> {
        self.uploads.get(upload_id).map(|e| e.value().clone())
    }

    fn remove(&self, upload_id: &str) -> Option<Arc<UploadState>> {
        self.uploads.remove(upload_id).map(|(_, state)| state)
    }

    fn remove_if_idle(&self, state: &Arc<UploadState>, now: i64, ttl_secs: i64) -> bool {
        self.uploads
            .remove_if(&state.upload_id, |_, current| {
                Arc::ptr_eq(current, state) && current.idle_secs(now) > ttl_secs
            })
            .is_some()
    }

    fn uploads(&self) -> Vec<Arc<UploadState>> {
        self.uploads.iter().map(|e| e.value().clone()).collect()
    }

    fn len(&self) -> usize {
        self.uploads.len()
    }
}
