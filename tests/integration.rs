use bytes::Bytes;
use futures_util::stream;
use http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full, StreamBody};
use portdrop::{Config, MultipartDecoder, ResponseBody, Service, SizeLimit};
use std::convert::Infallible;
use std::path::Path;

const BODY: &str = "--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\nContent-Type: text/plain\r\n\r\n0123456789\r\n--XYZ--\r\n";

fn char_stream(data: &str) -> impl futures_util::Stream<Item = portdrop::Result<Bytes>> {
    let chunks: Vec<_> = data
        .chars()
        .map(|ch| ch.to_string())
        .map(|part| portdrop::Result::Ok(Bytes::copy_from_slice(part.as_bytes())))
        .collect();
    stream::iter(chunks)
}

fn dir_entries(dir: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir).unwrap().map(|entry| entry.unwrap().path()).collect()
}

fn upload_request(boundary: &str, body: Vec<u8>) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn download_request(code: u16) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::GET)
        .uri(format!("/download/{}", code))
        .body(Full::new(Bytes::new()))
        .unwrap()
}

async fn body_bytes(response: http::Response<ResponseBody>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn upload_code(response: http::Response<ResponseBody>) -> u16 {
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    json["port"].as_u64().unwrap() as u16
}

#[tokio::test]
async fn test_decode_byte_by_byte() {
    let dir = tempfile::tempdir().unwrap();

    let result = MultipartDecoder::new("XYZ")
        .decode(char_stream(BODY), dir.path())
        .await
        .unwrap();

    assert_eq!(result.file_name(), "a.txt");
    assert_eq!(result.content_type(), Some(&mime::TEXT_PLAIN));
    assert_eq!(result.size(), 10);
    assert_eq!(result.content_path().file_name().unwrap(), "a.txt");
    assert_eq!(std::fs::read(result.content_path()).unwrap(), b"0123456789");
}

#[tokio::test]
async fn test_decode_content_with_crlf() {
    let dir = tempfile::tempdir().unwrap();
    let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";

    let result = MultipartDecoder::new("X-BOUNDARY")
        .decode(char_stream(data), dir.path())
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(result.content_path()).unwrap(),
        b"Hello world\nHello\r\nWorld\rAgain"
    );
}

#[tokio::test]
async fn test_decode_headers_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let data = format!(
        "--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\nX-Padding: {}",
        "p".repeat(4096)
    );

    let err = MultipartDecoder::with_limits("XYZ", SizeLimit::new().headers(1024))
        .decode(char_stream(&data), dir.path())
        .await
        .unwrap_err();

    assert_eq!(err, portdrop::Error::HeadersSizeExceeded { limit: 1024 });
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_decode_truncated_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let data = "--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\n0123456789\r\n--XY";

    let err = MultipartDecoder::new("XYZ")
        .decode(char_stream(data), dir.path())
        .await
        .unwrap_err();

    assert_eq!(err, portdrop::Error::IncompleteStream);
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_decode_content_too_large() {
    let dir = tempfile::tempdir().unwrap();

    let err = MultipartDecoder::with_limits("XYZ", SizeLimit::new().content(4))
        .decode(char_stream(BODY), dir.path())
        .await
        .unwrap_err();

    assert_eq!(err, portdrop::Error::ContentSizeExceeded { limit: 4 });
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_decode_content_at_limit() {
    let dir = tempfile::tempdir().unwrap();

    let result = MultipartDecoder::with_limits("XYZ", SizeLimit::new().content(10))
        .decode(char_stream(BODY), dir.path())
        .await
        .unwrap();
    assert_eq!(result.size(), 10);

    let err = MultipartDecoder::with_limits("XYZ", SizeLimit::new().content(9))
        .decode(char_stream(BODY), dir.path())
        .await
        .unwrap_err();
    assert_eq!(err, portdrop::Error::ContentSizeExceeded { limit: 9 });
}

#[tokio::test]
async fn test_upload_then_download() {
    let dir = tempfile::tempdir().unwrap();
    let service = Service::new(Config::default().upload_dir(dir.path()));

    let response = service.handle(upload_request("XYZ", BODY.as_bytes().to_vec())).await;
    let code = upload_code(response).await;
    assert!((49152..=65535).contains(&code));

    let response = service.handle(download_request(code)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/octet-stream");
    assert_eq!(response.headers()[CONTENT_LENGTH], "10");
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"a.txt\""
    );
    assert_eq!(body_bytes(response).await, "0123456789");

    let response = service.handle(download_request(code)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_upload_streamed_in_small_frames() {
    let dir = tempfile::tempdir().unwrap();
    let service = Service::new(Config::default().upload_dir(dir.path()));

    let frames: Vec<_> = BODY
        .as_bytes()
        .chunks(3)
        .map(|chunk| Ok::<_, Infallible>(http_body::Frame::data(Bytes::copy_from_slice(chunk))))
        .collect();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
        .body(StreamBody::new(stream::iter(frames)))
        .unwrap();

    let code = upload_code(service.handle(req).await).await;

    let response = service.handle(download_request(code)).await;
    assert_eq!(body_bytes(response).await, "0123456789");
}

#[tokio::test]
async fn test_upload_sniffed_extension() {
    let dir = tempfile::tempdir().unwrap();
    let service = Service::new(Config::default().upload_dir(dir.path()));

    let png: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01";
    let mut body = b"--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"picture.bin\"\r\n\r\n".to_vec();
    body.extend_from_slice(png);
    body.extend_from_slice(b"\r\n--XYZ--\r\n");

    let code = upload_code(service.handle(upload_request("XYZ", body)).await).await;

    let response = service.handle(download_request(code)).await;
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"picture.png\""
    );
    assert_eq!(body_bytes(response).await, png);
}

#[tokio::test]
async fn test_concurrent_uploads_get_distinct_codes() {
    let dir = tempfile::tempdir().unwrap();
    let service = Service::new(Config::default().upload_dir(dir.path()));

    let uploads = (0..8).map(|_| {
        let service = service.clone();
        tokio::spawn(async move {
            let response = service.handle(upload_request("XYZ", BODY.as_bytes().to_vec())).await;
            upload_code(response).await
        })
    });

    let mut codes = Vec::new();
    for upload in uploads.collect::<Vec<_>>() {
        codes.push(upload.await.unwrap());
    }
    codes.sort_unstable();
    codes.dedup();

    assert_eq!(codes.len(), 8);
    assert_eq!(service.registry().len().unwrap(), 8);
}

#[tokio::test]
async fn test_rejected_uploads_register_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let service = Service::new(Config::default().upload_dir(dir.path()));

    let req = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(CONTENT_TYPE, "text/plain")
        .body(Full::new(Bytes::from_static(b"0123456789")))
        .unwrap();
    assert_eq!(service.handle(req).await.status(), StatusCode::BAD_REQUEST);

    let missing_name = b"--XYZ\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\n0123456789\r\n--XYZ--\r\n".to_vec();
    let response = service.handle(upload_request("XYZ", missing_name)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");

    assert!(service.registry().is_empty().unwrap());
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_download_routes() {
    let dir = tempfile::tempdir().unwrap();
    let service = Service::new(Config::default().upload_dir(dir.path()));

    let response = service.handle(download_request(50000)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    for path in ["/download/70000", "/download/abc"] {
        let req = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(service.handle(req).await.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    let req = Request::builder()
        .method(Method::DELETE)
        .uri("/download/50000")
        .body(Full::new(Bytes::new()))
        .unwrap();
    assert_eq!(service.handle(req).await.status(), StatusCode::METHOD_NOT_ALLOWED);

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/download/50000")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = service.handle(req).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
