use actix_web::{http::header::ContentType, http::StatusCode, HttpResponse, ResponseError};
use domain_upload::exception::UploadException;

pub type ApiResult<T> = Result<T, ApiError>;

/// Maps upload failures onto the status codes a resumable.js client reacts to.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub UploadException);

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            UploadException::InvalidChunk { .. }
            | UploadException::UnsafeFileName { .. }
            | UploadException::MismatchedDescriptor { .. } => StatusCode::BAD_REQUEST,
            UploadException::UploadNotFound { .. } => StatusCode::NOT_FOUND,
            // resumable.js retries on anything outside its permanent error list.
            UploadException::Storage { .. } => StatusCode::SERVICE_UNAVAILABLE,
            UploadException::Finalize { .. } | UploadException::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        }
        HttpResponse::build(status)
            .content_type(ContentType::plaintext())
            .body(self.0.to_string())
    }
}
