use std::io::Cursor;

use actix_easy_multipart::MultipartForm;
use actix_web::{
    guard::{self, GuardContext},
    http::header::{self, ContentType},
    web, HttpRequest, HttpResponse,
};
use domain_upload::{
    exception::UploadException,
    model::vo::{UploadSnapshot, WriteOutcome},
    service::{ByteSource, UploadService},
};

use super::dtos::{ResumableChunkForm, ResumableParams};
use super::error::ApiResult;

pub const UPLOADED: &str = "Uploaded.";
pub const ALL_FINISHED: &str = "All finished.";

/// Registers the resumable.js endpoints under `route`.
pub fn routes(cfg: &mut web::ServiceConfig, route: &str) {
    cfg.service(
        web::resource(route)
            .route(web::get().to(test_chunk))
            .route(web::post().guard(guard::fn_guard(is_multipart)).to(upload_chunk_form))
            .route(web::post().to(upload_chunk)),
    )
    .service(
        web::resource(format!("{route}/{{upload_id}}"))
            .route(web::get().to(upload_info))
            .route(web::delete().to(cancel_upload)),
    );
}

fn is_multipart(ctx: &GuardContext<'_>) -> bool {
    ctx.head()
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().to_ascii_lowercase().starts_with("multipart/"))
}

fn plain(body: &'static str) -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::plaintext()).body(body)
}

fn stored(outcome: WriteOutcome) -> HttpResponse {
    plain(if outcome.finished { ALL_FINISHED } else { UPLOADED })
}

/// `GET <route>?resumable...`, tells the client whether it may skip a chunk.
pub async fn test_chunk(
    service: web::Data<dyn UploadService>,
    params: web::Query<ResumableParams>,
) -> ApiResult<HttpResponse> {
    let descriptor = params.into_inner().into_descriptor()?;
    Ok(if service.has_chunk(&descriptor).await? {
        plain(UPLOADED)
    } else {
        HttpResponse::NoContent().finish()
    })
}

/// `POST <route>?resumable...` with the chunk as the raw body.
pub async fn upload_chunk(
    service: web::Data<dyn UploadService>,
    params: web::Query<ResumableParams>,
    request: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let descriptor = params.into_inner().into_descriptor()?;
    let declared_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(body.len() as u64);
    let source: ByteSource = Box::new(Cursor::new(body));
    let outcome = service.store_chunk(&descriptor, source, declared_length).await?;
    Ok(stored(outcome))
}

/// `POST <route>` as `multipart/form-data`, parameters as text fields next to `file`.
pub async fn upload_chunk_form(
    service: web::Data<dyn UploadService>,
    form: MultipartForm<ResumableChunkForm>,
) -> ApiResult<HttpResponse> {
    let (params, file) = form.0.into_parts();
    let descriptor = params.into_descriptor()?;
    let spooled = file
        .file
        .reopen()
        .map_err(|e| UploadException::from(anyhow::Error::new(e).context("reopen spooled chunk")))?;
    let source: ByteSource = Box::new(tokio::fs::File::from_std(spooled));
    let outcome = service.store_chunk(&descriptor, source, file.size as u64).await?;
    Ok(stored(outcome))
}

/// `GET <route>/{upload_id}`
pub async fn upload_info(
    service: web::Data<dyn UploadService>,
    upload_id: web::Path<String>,
) -> ApiResult<web::Json<UploadSnapshot>> {
    Ok(web::Json(service.info(&upload_id).await?))
}

/// `DELETE <route>/{upload_id}`
pub async fn cancel_upload(
    service: web::Data<dyn UploadService>,
    upload_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    service.cancel(&upload_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
