use std::path::Path;
use std::sync::Arc;

use actix_easy_multipart::MultipartFormConfig;
use actix_web::{
    http::{header, StatusCode},
    test, web, App,
};
use domain_upload::{
    exception::UploadException,
    mock::MockUploadService,
    service::UploadService,
};
use resumable_upload_server::api::upload::{routes, ALL_FINISHED, UPLOADED};
use service_upload::{InMemoryUploadRegistry, LocalChunkStoreImpl, UploadServiceImpl};

const BOUNDARY: &str = "----resumable-test-boundary";

fn local_service(dir: &Path) -> Arc<dyn UploadService> {
    let registry = InMemoryUploadRegistry::builder().upload_dir(dir).build();
    Arc::new(
        UploadServiceImpl::builder()
            .registry(Arc::new(registry))
            .chunk_store(Arc::new(LocalChunkStoreImpl::builder().build()))
            .build(),
    )
}

macro_rules! app {
    ($service:expr) => {
        test::init_service(
            App::new()
                .app_data(MultipartFormConfig::default().total_limit(1024 * 1024))
                .app_data(web::PayloadConfig::new(1024 * 1024))
                .app_data(web::Data::from($service))
                .configure(|cfg| routes(cfg, "/upload")),
        )
        .await
    };
}

fn query(chunk_number: u64, chunk_size: u64, total_size: u64, file_name: &str) -> String {
    format!(
        "/upload?resumableChunkNumber={chunk_number}&resumableChunkSize={chunk_size}\
         &resumableTotalSize={total_size}&resumableIdentifier={total_size}-{file_name}\
         &resumableFilename={file_name}&resumableRelativePath={file_name}"
    )
}

fn multipart_body(fields: &[(&str, String)], file: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"blob\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[actix_web::test]
async fn test_then_upload_three_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(local_service(dir.path()));
    let data: Vec<u8> = (0..250u32).map(|i| i as u8).collect();

    let req = test::TestRequest::get().uri(&query(1, 100, 250, "mov.mp4")).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    for (n, expected) in [(1u64, UPLOADED), (2, UPLOADED), (3, ALL_FINISHED)] {
        let start = (n as usize - 1) * 100;
        let end = (start + 100).min(data.len());
        let req = test::TestRequest::post()
            .uri(&query(n, 100, 250, "mov.mp4"))
            .set_payload(data[start..end].to_vec())
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, expected.as_bytes());
    }

    let req = test::TestRequest::get().uri(&query(2, 100, 250, "mov.mp4")).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(test::read_body(res).await, UPLOADED.as_bytes());
    assert_eq!(std::fs::read(dir.path().join("mov.mp4")).unwrap(), data);
}

#[actix_web::test]
async fn test_with_changed_chunk_size_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(local_service(dir.path()));

    let req = test::TestRequest::post()
        .uri(&query(1, 100, 300, "resized.bin"))
        .set_payload(vec![7u8; 100])
        .to_request();
    assert_eq!(test::call_and_read_body(&app, req).await, UPLOADED.as_bytes());

    let req = test::TestRequest::get().uri(&query(1, 50, 300, "resized.bin")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    let req = test::TestRequest::get().uri(&query(1, 100, 300, "resized.bin")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn duplicate_post_answers_uploaded() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(local_service(dir.path()));

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&query(1, 10, 30, "dup.bin"))
            .set_payload(vec![1u8; 10])
            .to_request();
        assert_eq!(test::call_and_read_body(&app, req).await, UPLOADED.as_bytes());
    }
}

#[actix_web::test]
async fn multipart_chunk_is_stored() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(local_service(dir.path()));
    let fields = [
        ("resumableChunkNumber", "1".to_string()),
        ("resumableChunkSize", "8".to_string()),
        ("resumableTotalSize", "8".to_string()),
        ("resumableIdentifier", "8-form.txt".to_string()),
        ("resumableFilename", "form.txt".to_string()),
        ("resumableRelativePath", "docs/form.txt".to_string()),
    ];
    let req = test::TestRequest::post()
        .uri("/upload")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(&fields, b"contents"))
        .to_request();
    assert_eq!(test::call_and_read_body(&app, req).await, ALL_FINISHED.as_bytes());
    assert_eq!(std::fs::read(dir.path().join("form.txt")).unwrap(), b"contents");
}

#[actix_web::test]
async fn invalid_parameters_are_bad_requests() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(local_service(dir.path()));

    let zero_chunk = query(1, 0, 250, "mov.mp4");
    let req = test::TestRequest::get().uri(&zero_chunk).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/upload?resumableChunkNumber=1")
        .set_payload(vec![0u8; 4])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let traversal = query(1, 10, 10, "..");
    let req = test::TestRequest::post().uri(&traversal).set_payload(vec![0u8; 10]).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[actix_web::test]
async fn info_and_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(local_service(dir.path()));

    let req = test::TestRequest::post()
        .uri(&query(2, 10, 30, "part.bin"))
        .set_payload(vec![2u8; 10])
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/upload/30-part.bin").to_request();
    let info: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(info["uploadId"], "30-part.bin");
    assert_eq!(info["expectedChunks"], 3);
    assert_eq!(info["receivedChunks"], serde_json::json!([2]));
    assert_eq!(info["finalized"], false);

    let req = test::TestRequest::delete().uri("/upload/30-part.bin").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    assert!(!dir.path().join("part.bin.part").exists());

    let req = test::TestRequest::delete().uri("/upload/30-part.bin").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    let req = test::TestRequest::get().uri("/upload/30-part.bin").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn storage_failure_asks_for_retry() {
    let mut service = MockUploadService::new();
    service.expect_store_chunk().times(1).returning(|d, _, _| {
        Err(UploadException::Storage {
            upload_id: d.upload_id.to_owned(),
            chunk_number: d.chunk_number,
            source: std::io::Error::other("disk full"),
        })
    });
    let service: Arc<dyn UploadService> = Arc::new(service);
    let app = app!(service);

    let req = test::TestRequest::post()
        .uri(&query(1, 10, 10, "full.bin"))
        .set_payload(vec![0u8; 10])
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}
