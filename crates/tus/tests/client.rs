//! Protocol tests against a mock tus server

use std::io::Cursor;
use std::time::Duration;

use bytes::Bytes;
use wiremock::matchers::{body_bytes, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tf_core::{Alias, Error, FixedBackoff, TusTransport, UploadMetadata, Uploader};
use tf_tus::{TusClient, checksum_header, detect_capabilities};

fn client_for(server: &MockServer) -> TusClient {
    TusClient::new(&Alias::new("test", format!("{}/files", server.uri()))).unwrap()
}

fn upload_id(server: &MockServer) -> String {
    format!("{}/files/abc", server.uri())
}

#[tokio::test]
async fn create_sends_length_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(header("Tus-Resumable", "1.0.0"))
        .and(header("Upload-Length", "10"))
        .and(header("Upload-Metadata", "Path ZG9jcy9hLnR4dA=="))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "/files/abc"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let id = client
        .create_upload(10, &UploadMetadata::for_path("docs/a.txt"))
        .await
        .unwrap();
    assert_eq!(id, upload_id(&server));
}

#[tokio::test]
async fn create_without_location_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_upload(10, &UploadMetadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)));
}

#[tokio::test]
async fn create_too_large_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(413))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_upload(10, &UploadMetadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Rejected { status: 413, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn head_reads_upload_offset() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/files/abc"))
        .and(header("Tus-Resumable", "1.0.0"))
        .respond_with(ResponseTemplate::new(200).insert_header("Upload-Offset", "7"))
        .expect(1)
        .mount(&server)
        .await;

    let offset = client_for(&server)
        .upload_offset(&upload_id(&server))
        .await
        .unwrap();
    assert_eq!(offset, 7);
}

#[tokio::test]
async fn head_not_found_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .upload_offset(&upload_id(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn patch_sends_offset_and_checksum() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/files/abc"))
        .and(header("Content-Type", "application/offset+octet-stream"))
        .and(header("Upload-Offset", "0"))
        .and(header("Upload-Checksum", checksum_header(b"abcd").as_str()))
        .and(body_bytes(b"abcd".to_vec()))
        .respond_with(ResponseTemplate::new(204).insert_header("Upload-Offset", "4"))
        .expect(1)
        .mount(&server)
        .await;

    let offset = client_for(&server)
        .patch(&upload_id(&server), 0, Bytes::from_static(b"abcd"))
        .await
        .unwrap();
    assert_eq!(offset, 4);
}

#[tokio::test]
async fn patch_without_checksum_omits_header() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204).insert_header("Upload-Offset", "4"))
        .mount(&server)
        .await;

    let client = client_for(&server).with_checksum(false);
    client
        .patch(&upload_id(&server), 0, Bytes::from_static(b"abcd"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("Upload-Checksum").is_none());
}

#[tokio::test]
async fn patch_checksum_mismatch_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(460))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .patch(&upload_id(&server), 0, Bytes::from_static(b"abcd"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unauthorized_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .patch(&upload_id(&server), 0, Bytes::from_static(b"abcd"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(ref m) if m.contains("bad token")));
}

#[tokio::test]
async fn alias_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).insert_header("Upload-Offset", "0"))
        .expect(1)
        .mount(&server)
        .await;

    let mut alias = Alias::new("test", format!("{}/files", server.uri()));
    alias
        .headers
        .insert("Authorization".into(), "Bearer secret".into());
    let client = TusClient::new(&alias).unwrap();
    client.upload_offset(&upload_id(&server)).await.unwrap();
}

#[tokio::test]
async fn connection_refused_is_network_error() {
    let client = TusClient::new(&Alias::new("test", "http://127.0.0.1:1/files")).unwrap();
    let err = client
        .create_upload(1, &UploadMetadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)));
}

#[tokio::test]
async fn options_reports_capabilities() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .and(path("/files"))
        .respond_with(
            ResponseTemplate::new(204)
                .insert_header("Tus-Version", "1.0.0,0.2.2")
                .insert_header("Tus-Extension", "creation,checksum,termination")
                .insert_header("Tus-Max-Size", "1073741824")
                .insert_header("Tus-Checksum-Algorithm", "md5,sha1,sha256"),
        )
        .mount(&server)
        .await;

    let caps = detect_capabilities(&client_for(&server)).await.unwrap();
    assert_eq!(caps.versions, vec!["1.0.0", "0.2.2"]);
    assert!(caps.supports_extension("creation"));
    assert!(caps.supports_checksum("sha256"));
    assert_eq!(caps.max_size, Some(1_073_741_824));
}

#[tokio::test]
async fn download_uses_download_base() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/docs/a.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&server)
        .await;

    let download = client_for(&server)
        .open_download("docs/a.txt")
        .await
        .unwrap();
    assert_eq!(download.content_length(), Some(5));

    let mut out = Vec::new();
    let copied = download.copy_to(&mut out).await.unwrap();
    assert_eq!(copied, 5);
    assert_eq!(out, b"hello");
}

#[tokio::test]
async fn download_missing_path_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .open_download("missing")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

async fn mount_create(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "/files/abc"))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/files/abc"))
        .respond_with(ResponseTemplate::new(200).insert_header("Upload-Offset", "0"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn uploader_transfers_through_tus_client() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("PATCH"))
        .and(path("/files/abc"))
        .and(body_bytes(b"hello".to_vec()))
        .respond_with(ResponseTemplate::new(204).insert_header("Upload-Offset", "5"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut source = Cursor::new(b"hello".to_vec());
    let report = Uploader::new(&client)
        .transfer("docs/hello.txt", &mut source, 5, UploadMetadata::new())
        .await
        .unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(report.upload_id, upload_id(&server));

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests
            .iter()
            .all(|r| r.headers.get("Tus-Resumable").is_some())
    );
}

#[tokio::test]
async fn uploader_retries_checksum_mismatch() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(460))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(header_exists("Upload-Checksum"))
        .respond_with(ResponseTemplate::new(204).insert_header("Upload-Offset", "5"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut source = Cursor::new(b"hello".to_vec());
    let report = Uploader::new(&client)
        .backoff(FixedBackoff::new(Duration::ZERO))
        .transfer("docs/hello.txt", &mut source, 5, UploadMetadata::new())
        .await
        .unwrap();

    assert_eq!(report.attempts, 2);
}

#[tokio::test]
async fn uploader_stops_on_server_error() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut source = Cursor::new(b"hello".to_vec());
    let err = Uploader::new(&client)
        .backoff(FixedBackoff::new(Duration::ZERO))
        .transfer("docs/hello.txt", &mut source, 5, UploadMetadata::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Rejected { status: 500, .. }));
}
