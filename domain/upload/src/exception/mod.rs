use std::path::PathBuf;

pub type UploadResult<T> = Result<T, UploadException>;

#[derive(Debug, thiserror::Error)]
pub enum UploadException {
    #[error("Invalid chunk descriptor: {reason}.")]
    InvalidChunk { reason: String },

    #[error("File name: {file_name:?} is not a single safe path component.")]
    UnsafeFileName { file_name: String },

    #[error(
        "Chunk for upload: {upload_id} disagrees with the upload's {field}, expected: {expected}, got: {provided}."
    )]
    MismatchedDescriptor {
        upload_id: String,
        field: &'static str,
        expected: String,
        provided: String,
    },

    #[error("The upload with id: {upload_id} can't be found.")]
    UploadNotFound { upload_id: String },

    #[error("Writing chunk {chunk_number} of upload: {upload_id} failed: {source}")]
    Storage {
        upload_id: String,
        chunk_number: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Finalizing {from:?} to {to:?} failed: {source}")]
    Finalize {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload internal error: {source}")]
    InternalError {
        #[source]
        source: anyhow::Error,
    },
}

impl UploadException {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidChunk {
            reason: reason.into(),
        }
    }

    /// Whether the request was rejected before any state or storage was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidChunk { .. } | Self::UnsafeFileName { .. } | Self::MismatchedDescriptor { .. }
        )
    }

    /// Whether the client should send the same chunk again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

impl From<anyhow::Error> for UploadException {
    fn from(e: anyhow::Error) -> Self {
        UploadException::InternalError { source: e }
    }
}
