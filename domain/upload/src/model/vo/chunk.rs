use std::path::{Component, Path};

use crate::exception::{UploadException, UploadResult};

/// One incoming chunk, as described by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// 1-based position of the chunk within the file.
    pub chunk_number: u64,
    /// Size of a full chunk. Every chunk but the last has this size.
    pub chunk_size: u64,
    /// Size of the complete file.
    pub file_size: u64,
    /// Client chosen id, stable across all chunks of one file.
    pub upload_id: String,
    /// Destination file name.
    pub file_name: String,
    /// Client side relative path, carried but not used for placement.
    pub relative_path: String,
}

impl ChunkDescriptor {
    /// Number of chunks the file is split into.
    pub fn expected_chunk_count(&self) -> u64 {
        expected_chunk_count(self.file_size, self.chunk_size)
    }

    /// Byte offset of this chunk within the file.
    pub fn offset(&self) -> u64 {
        (self.chunk_number - 1) * self.chunk_size
    }

    /// Most bytes this chunk may contribute without growing the file past `file_size`.
    pub fn max_len(&self) -> u64 {
        self.file_size.saturating_sub(self.offset())
    }

    pub fn validate(&self) -> UploadResult<()> {
        if self.chunk_number < 1 {
            return Err(UploadException::invalid("chunk number must start at 1"));
        }
        if self.chunk_size == 0 {
            return Err(UploadException::invalid("chunk size must be positive"));
        }
        if self.file_size == 0 {
            return Err(UploadException::invalid("total size must be positive"));
        }
        if self.upload_id.is_empty() {
            return Err(UploadException::invalid("identifier is empty"));
        }
        if self.file_name.is_empty() {
            return Err(UploadException::invalid("file name is empty"));
        }
        if self.relative_path.is_empty() {
            return Err(UploadException::invalid("relative path is empty"));
        }
        let expected = self.expected_chunk_count();
        if self.chunk_number > expected {
            return Err(UploadException::invalid(format!(
                "chunk number {} exceeds chunk count {expected}",
                self.chunk_number
            )));
        }
        if !is_safe_file_name(&self.file_name) {
            return Err(UploadException::UnsafeFileName {
                file_name: self.file_name.to_owned(),
            });
        }
        Ok(())
    }
}

/// `ceil(file_size / chunk_size)`, `chunk_size` must be positive.
pub fn expected_chunk_count(file_size: u64, chunk_size: u64) -> u64 {
    file_size.div_ceil(chunk_size)
}

/// A file name is safe when it is exactly one normal path component.
fn is_safe_file_name(file_name: &str) -> bool {
    if file_name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(file_name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
