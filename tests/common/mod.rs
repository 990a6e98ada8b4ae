//! Shared helpers for HTTP tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use pdftoolkit_server::{router, testing, AppState, Config};

pub const BOUNDARY: &str = "pdftoolkit-test-boundary";

/// General key configured by [`TestApp::new`] and sent by the request helpers
pub const TEST_API_KEY: &str = "test-api-key";

/// Admin key configured by [`TestApp::new`]
pub const TEST_ADMIN_KEY: &str = "test-admin-key";

/// A router over fresh temp directories
pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Keys set to [`TEST_API_KEY`] and [`TEST_ADMIN_KEY`], then `customize`
    pub async fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        Self::with_raw_config(|config| {
            config.security.api_key = Some(TEST_API_KEY.into());
            config.security.admin_api_key = Some(TEST_ADMIN_KEY.into());
            customize(config);
        })
        .await
    }

    /// `Config::default()` with only the directories redirected
    pub async fn with_raw_config(customize: impl FnOnce(&mut Config)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.uploads_dir = dir.path().join("uploads");
        config.storage.output_dir = dir.path().join("output");
        customize(&mut config);

        let state = AppState::new(config);
        state.store().ensure_dirs().await.unwrap();
        let router = router(state.clone());

        Self { dir, state, router }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Generated PDF with the given `(width, height)` pages
pub fn pdf_with_pages(sizes: &[(f32, f32)]) -> Vec<u8> {
    testing::pdf_with_pages(sizes).unwrap()
}

/// Multipart body with one file field
pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Upload request carrying [`TEST_API_KEY`]
pub fn upload_request(filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    upload_request_with_key(filename, content_type, data, Some(TEST_API_KEY))
}

pub fn upload_request_with_key(
    filename: &str,
    content_type: &str,
    data: &[u8],
    key: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::post("/upload").header(
        "content-type",
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder
        .body(Body::from(multipart_body("file", filename, content_type, data)))
        .unwrap()
}

/// JSON request carrying [`TEST_API_KEY`]
pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", TEST_API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Request with an optional `X-API-Key` and no body
pub fn keyed(method: &str, uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
