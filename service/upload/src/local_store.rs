use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use domain_upload::{
    exception::{UploadException, UploadResult},
    model::{
        entity::UploadState,
        vo::{ChunkDescriptor, CompletenessPolicy, WriteOutcome},
    },
    service::{ByteSource, ChunkStore},
};
use tokio::io::AsyncReadExt;
use typed_builder::TypedBuilder;

/// Chunk store writing into one random access file per upload on the local filesystem.
#[derive(TypedBuilder, Clone)]
pub struct LocalChunkStoreImpl {
    #[builder(default = 16 * 1024)]
    buffer_size: usize,
    #[builder(default = true)]
    sync_chunks: bool,
    #[builder(default)]
    completeness: CompletenessPolicy,
}

impl LocalChunkStoreImpl {
    /// Make sure the upload directory exists.
    pub async fn prepare(upload_dir: &Path) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(upload_dir).await?;
        Ok(())
    }

    /// Copy at most `limit` bytes of `source` into `path` starting at `offset`.
    ///
    /// Each request uses its own handle and positioned writes, so writes to disjoint
    /// ranges of one file never disturb each other and nothing is ever truncated.
    async fn write_range(
        &self,
        path: PathBuf,
        offset: u64,
        mut source: ByteSource,
        limit: u64,
        chunk_size: u64,
    ) -> io::Result<u64> {
        let file = Arc::new(blocking(move || open_for_positioned_write(&path)).await?);
        let buffer_len = self.buffer_size.min(chunk_size.try_into().unwrap_or(usize::MAX)).max(1);
        let mut buffer = vec![0u8; buffer_len];
        let mut written = 0u64;
        while written < limit {
            let want = (limit - written).min(buffer.len() as u64) as usize;
            let read = source.read(&mut buffer[..want]).await?;
            if read == 0 {
                break;
            }
            let position = offset + written;
            let file = file.clone();
            buffer = blocking(move || {
                write_all_at(&file, &buffer[..read], position)?;
                Ok(buffer)
            })
            .await?;
            written += read as u64;
        }
        if self.sync_chunks {
            blocking(move || file.sync_data()).await?;
        }
        Ok(written)
    }
}

#[async_trait]
impl ChunkStore for LocalChunkStoreImpl {
    async fn has_chunk(&self, state: &UploadState, chunk_number: u64) -> bool {
        state.contains(chunk_number).await
    }

    async fn write(
        &self,
        state: &UploadState,
        descriptor: &ChunkDescriptor,
        source: ByteSource,
        declared_length: u64,
    ) -> UploadResult<WriteOutcome> {
        let chunk_number = descriptor.chunk_number;
        let Some(claim) = state.claim(chunk_number).await else {
            // A retried chunk still gets to retry a finalize that failed earlier.
            let finished = state
                .settle(None, self.completeness, || self.finalize(state))
                .await?;
            return Ok(WriteOutcome::already_stored(finished));
        };

        let limit = declared_length.min(descriptor.max_len());
        let written = {
            let Some(_admission) = state.begin_write().await else {
                return Ok(WriteOutcome::already_stored(true));
            };
            self.write_range(
                state.backing_path.to_owned(),
                descriptor.offset(),
                source,
                limit,
                descriptor.chunk_size,
            )
            .await
            .map_err(|source| UploadException::Storage {
                upload_id: state.upload_id.to_owned(),
                chunk_number,
                source,
            })?
        };
        if written < limit {
            tracing::warn!(
                upload_id = %state.upload_id,
                chunk_number,
                written,
                declared = limit,
                "Source ended before the declared length."
            );
        }
        tracing::debug!(upload_id = %state.upload_id, chunk_number, written, "Chunk written.");

        let finished = state
            .settle(Some(chunk_number), self.completeness, || self.finalize(state))
            .await?;
        drop(claim);
        state.touch();
        Ok(WriteOutcome::stored(finished))
    }

    async fn finalize(&self, state: &UploadState) -> UploadResult<()> {
        tokio::fs::rename(&state.backing_path, &state.final_path)
            .await
            .map_err(|source| UploadException::Finalize {
                from: state.backing_path.to_owned(),
                to: state.final_path.to_owned(),
                source,
            })?;
        tracing::info!(
            upload_id = %state.upload_id,
            path = %state.final_path.display(),
            size = state.file_size,
            "Upload finished."
        );
        Ok(())
    }

    async fn discard(&self, state: &UploadState) -> UploadResult<()> {
        if state.is_finalized() {
            return Ok(());
        }
        match tokio::fs::remove_file(&state.backing_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("remove {}", state.backing_path.display()))
                .into()),
        }
    }
}

async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::other)?
}

fn open_for_positioned_write(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create(true).truncate(false).open(path)
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
