use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};

use crate::exception::{UploadException, UploadResult};
use crate::model::vo::{ChunkDescriptor, CompletenessPolicy, UploadSnapshot};

/// Bookkeeping of one upload id.
///
/// Everything but the progress is fixed by the first chunk descriptor seen for the id.
#[derive(Debug)]
pub struct UploadState {
    pub upload_id: String,
    pub file_name: String,
    pub relative_path: String,
    pub file_size: u64,
    pub chunk_size: u64,
    /// In-progress file the chunks are written into.
    pub backing_path: PathBuf,
    /// Name the backing file is renamed to once complete.
    pub final_path: PathBuf,
    progress: Mutex<Progress>,
    /// Chunks a request is writing right now, not yet in `received`.
    in_flight: std::sync::Mutex<HashSet<u64>>,
    /// Only set while holding both the progress lock and the file gate exclusively.
    finalized: AtomicBool,
    /// Shared by in-flight chunk writes, exclusive while the backing file is renamed.
    file_gate: RwLock<()>,
    /// Unix timestamp of the last request that referenced this upload.
    last_activity: AtomicI64,
}

#[derive(Debug, Default)]
struct Progress {
    received: HashSet<u64>,
    /// Cached once the completeness scan passed.
    complete: bool,
}

impl Progress {
    fn check_complete(&mut self, expected: u64, policy: CompletenessPolicy) -> bool {
        if !self.complete {
            let last = policy.last_required(expected);
            self.complete = (1..=last).all(|n| self.received.contains(&n));
        }
        self.complete
    }
}

/// Exclusive right to write one chunk of an upload, released on drop.
///
/// Dropping it after [`UploadState::settle`] recorded the chunk is what makes the chunk
/// count as present for good. Dropping it earlier, on failure or cancellation, lets the
/// next copy of the chunk claim it again.
#[derive(Debug)]
pub struct ChunkClaim<'a> {
    state: &'a UploadState,
    chunk_number: u64,
}

impl Drop for ChunkClaim<'_> {
    fn drop(&mut self) {
        self.state.in_flight().remove(&self.chunk_number);
    }
}

impl UploadState {
    pub fn new(descriptor: &ChunkDescriptor, backing_path: PathBuf, final_path: PathBuf) -> Self {
        Self {
            upload_id: descriptor.upload_id.to_owned(),
            file_name: descriptor.file_name.to_owned(),
            relative_path: descriptor.relative_path.to_owned(),
            file_size: descriptor.file_size,
            chunk_size: descriptor.chunk_size,
            backing_path,
            final_path,
            progress: Mutex::default(),
            in_flight: Default::default(),
            finalized: AtomicBool::new(false),
            file_gate: RwLock::new(()),
            last_activity: AtomicI64::new(Utc::now().timestamp()),
        }
    }

    pub fn expected_chunks(&self) -> u64 {
        crate::model::vo::expected_chunk_count(self.file_size, self.chunk_size)
    }

    /// Error unless `descriptor` agrees with the parameters this upload was created with.
    pub fn ensure_matches(&self, descriptor: &ChunkDescriptor) -> UploadResult<()> {
        let mismatch = |field: &'static str, expected: String, provided: String| {
            Err(UploadException::MismatchedDescriptor {
                upload_id: self.upload_id.to_owned(),
                field,
                expected,
                provided,
            })
        };
        if descriptor.file_size != self.file_size {
            return mismatch(
                "total size",
                self.file_size.to_string(),
                descriptor.file_size.to_string(),
            );
        }
        if descriptor.chunk_size != self.chunk_size {
            return mismatch(
                "chunk size",
                self.chunk_size.to_string(),
                descriptor.chunk_size.to_string(),
            );
        }
        if descriptor.file_name != self.file_name {
            return mismatch(
                "file name",
                self.file_name.to_owned(),
                descriptor.file_name.to_owned(),
            );
        }
        Ok(())
    }

    pub fn touch(&self) {
        self.last_activity.store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    /// Seconds since the last request referenced this upload.
    pub fn idle_secs(&self, now: i64) -> i64 {
        now - self.last_activity.load(Ordering::Relaxed)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<u64>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `chunk_number` for writing, `None` when it is recorded, being written by
    /// another request, or the upload is finalized.
    pub async fn claim(&self, chunk_number: u64) -> Option<ChunkClaim<'_>> {
        let progress = self.progress.lock().await;
        if self.is_finalized() || progress.received.contains(&chunk_number) {
            return None;
        }
        if !self.in_flight().insert(chunk_number) {
            return None;
        }
        Some(ChunkClaim {
            state: self,
            chunk_number,
        })
    }

    pub async fn contains(&self, chunk_number: u64) -> bool {
        self.progress.lock().await.received.contains(&chunk_number)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Whether a request is writing to or settling this upload right now.
    pub fn is_busy(&self) -> bool {
        self.progress.try_lock().is_err()
            || self.file_gate.try_write().is_err()
            || !self.in_flight().is_empty()
    }

    /// Admission for writing bytes into the backing file, `None` once finalized.
    ///
    /// Finalization waits for every outstanding guard, so no write can land in a backing
    /// file that has already been renamed. Drop the guard before calling [`Self::settle`].
    pub async fn begin_write(&self) -> Option<RwLockReadGuard<'_, ()>> {
        let guard = self.file_gate.read().await;
        (!self.is_finalized()).then_some(guard)
    }

    pub async fn snapshot(&self) -> UploadSnapshot {
        let progress = self.progress.lock().await;
        let mut received_chunks: Vec<u64> = progress.received.iter().copied().collect();
        received_chunks.sort_unstable();
        UploadSnapshot {
            upload_id: self.upload_id.to_owned(),
            file_name: self.file_name.to_owned(),
            relative_path: self.relative_path.to_owned(),
            file_size: self.file_size,
            chunk_size: self.chunk_size,
            expected_chunks: self.expected_chunks(),
            received_chunks,
            finalized: self.is_finalized(),
        }
    }

    /// Records `chunk_number` (if any), runs the completeness check and, the first time it
    /// passes, `finalize`. All of it happens under the upload's lock, so of several
    /// concurrent completing chunks exactly one finalizes.
    ///
    /// Returns whether the upload is finalized afterwards. When `finalize` fails the
    /// chunk stays recorded and the upload unfinalized, the next call retries it.
    pub async fn settle<F, Fut>(
        &self,
        chunk_number: Option<u64>,
        policy: CompletenessPolicy,
        finalize: F,
    ) -> UploadResult<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = UploadResult<()>>,
    {
        let mut progress = self.progress.lock().await;
        if self.is_finalized() {
            return Ok(true);
        }
        if let Some(n) = chunk_number {
            progress.received.insert(n);
        }
        if !progress.check_complete(self.expected_chunks(), policy) {
            return Ok(false);
        }
        let _exclusive = self.file_gate.write().await;
        finalize().await?;
        self.finalized.store(true, Ordering::Release);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;

    fn state(file_size: u64, chunk_size: u64) -> UploadState {
        let descriptor = ChunkDescriptor {
            chunk_number: 1,
            chunk_size,
            file_size,
            upload_id: "id".to_string(),
            file_name: "f.bin".to_string(),
            relative_path: "f.bin".to_string(),
        };
        UploadState::new(&descriptor, "f.bin.part".into(), "f.bin".into())
    }

    async fn ok() -> UploadResult<()> {
        Ok(())
    }

    #[tokio::test]
    async fn finalizes_once_all_chunks_present() {
        let state = state(250_000, 100_000);
        let policy = CompletenessPolicy::AllChunks;
        assert!(!state.settle(Some(1), policy, ok).await.unwrap());
        assert!(!state.settle(Some(3), policy, ok).await.unwrap());
        assert!(state.settle(Some(2), policy, ok).await.unwrap());
        assert!(state.is_finalized());
        assert!(state.claim(1).await.is_none());
    }

    #[tokio::test]
    async fn claim_is_exclusive_until_released() {
        let state = state(250_000, 100_000);
        let claim = state.claim(1).await.unwrap();
        assert!(state.claim(1).await.is_none());
        assert!(state.claim(2).await.is_some());
        drop(claim);

        let claim = state.claim(1).await.unwrap();
        state.settle(Some(1), CompletenessPolicy::AllChunks, ok).await.unwrap();
        drop(claim);
        assert!(state.claim(1).await.is_none());
    }

    #[tokio::test]
    async fn trailing_implied_skips_last_slot() {
        let state = state(250_000, 100_000);
        let policy = CompletenessPolicy::TrailingImplied;
        assert!(!state.settle(Some(2), policy, ok).await.unwrap());
        assert!(state.settle(Some(1), policy, ok).await.unwrap());
    }

    #[tokio::test]
    async fn failed_finalize_is_retried() {
        let state = state(10, 10);
        let policy = CompletenessPolicy::AllChunks;
        let err = state
            .settle(Some(1), policy, || async {
                Err(UploadException::InternalError {
                    source: anyhow::anyhow!("rename refused"),
                })
            })
            .await;
        assert!(err.is_err());
        assert!(!state.is_finalized());
        assert!(state.contains(1).await);

        assert!(state.settle(None, policy, ok).await.unwrap());
        assert!(state.is_finalized());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_completion_finalizes_exactly_once() {
        let state = Arc::new(state(64, 1));
        let finalized = Arc::new(AtomicUsize::new(0));
        let handles = (1..=64u64)
            .map(|n| {
                let state = state.clone();
                let finalized = finalized.clone();
                tokio::spawn(async move {
                    state
                        .settle(Some(n), CompletenessPolicy::AllChunks, || async move {
                            finalized.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            Ok(())
                        })
                        .await
                        .unwrap()
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
        assert!(state.is_finalized());
    }

    #[tokio::test]
    async fn write_admission_closes_after_finalize() {
        let state = state(10, 10);
        assert!(state.begin_write().await.is_some());
        state.settle(Some(1), CompletenessPolicy::AllChunks, ok).await.unwrap();
        assert!(state.begin_write().await.is_none());
    }

    #[test]
    fn rejects_mismatched_descriptor() {
        let state = state(250_000, 100_000);
        let descriptor = ChunkDescriptor {
            chunk_number: 1,
            chunk_size: 50_000,
            file_size: 250_000,
            upload_id: "id".to_string(),
            file_name: "f.bin".to_string(),
            relative_path: "f.bin".to_string(),
        };
        assert!(matches!(
            state.ensure_matches(&descriptor),
            Err(UploadException::MismatchedDescriptor {
                field: "chunk size",
                ..
            })
        ));
    }
}
