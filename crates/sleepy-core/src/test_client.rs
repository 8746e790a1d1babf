//! TestClient for integration testing without network binding
//!
//! Requests go through [`Api::handle_http`], so the body limit, every filter
//! level, routing, validation, sanitization and completion logging all run
//! exactly as they would behind the server.
//!
//! # Example
//!
//! ```rust,ignore
//! use sleepy::prelude::*;
//!
//! #[tokio::test]
//! async fn create_requires_a_name() {
//!     let client = TestClient::new(api());
//!
//!     client
//!         .post_json("/users", &serde_json::json!({"id": "123"}))
//!         .await
//!         .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
//!         .assert_error_code(1002);
//! }
//! ```

use crate::api::Api;
use crate::response::{Response, JSON_CONTENT_TYPE};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Sends simulated requests through a registered [`Api`]
#[derive(Clone)]
pub struct TestClient {
    api: Arc<Api>,
}

impl TestClient {
    pub fn new(api: Api) -> Self {
        Self { api: Arc::new(api) }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(TestRequest::get(path)).await
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        self.request(TestRequest::post(path).json(body)).await
    }

    pub async fn options(&self, path: &str) -> TestResponse {
        self.request(TestRequest::options(path)).await
    }

    /// Send a fully described request
    pub async fn request(&self, req: TestRequest) -> TestResponse {
        let mut builder = http::Request::builder().method(req.method).uri(&req.path);
        if let Some(headers) = builder.headers_mut() {
            *headers = req.headers;
        }

        let response = match builder.body(Full::new(req.body.unwrap_or_default())) {
            Ok(http_req) => self.api.handle_http(http_req).await,
            Err(err) => panic!("invalid test request for {}: {}", req.path, err),
        };
        TestResponse::from_response(response).await
    }
}

/// A request under construction
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl TestRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn options(path: &str) -> Self {
        Self::new(Method::OPTIONS, path)
    }

    /// Add a header; invalid names or values are ignored
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(val)) = (
            key.parse::<header::HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, val);
        }
        self
    }

    /// Set a JSON body and its content type
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        if let Ok(bytes) = serde_json::to_vec(body) {
            self.body = Some(Bytes::from(bytes));
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(JSON_CONTENT_TYPE),
            );
        }
        self
    }

    /// Set a raw body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A collected response with assertion helpers
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    async fn from_response(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map(|b| b.to_bytes())
            .unwrap_or_default();

        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status<S: Into<StatusCode>>(&self, expected: S) -> &Self {
        let expected = expected.into();
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the header is missing or different.
    pub fn assert_header(&self, key: &str, expected: &str) -> &Self {
        let actual = self
            .headers
            .get(key)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert_eq!(
            actual, expected,
            "Expected header '{}' to be '{}', got '{}'",
            key, expected, actual
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the body is not JSON or differs from `expected`.
    pub fn assert_json<T: DeserializeOwned + PartialEq + std::fmt::Debug>(&self, expected: &T) -> &Self {
        match self.json::<T>() {
            Ok(actual) => assert_eq!(&actual, expected, "JSON body mismatch"),
            Err(err) => panic!("Failed to parse response body as JSON: {}. Body: {}", err, self.text()),
        }
        self
    }

    /// Check the `code` of a wire error body.
    ///
    /// # Panics
    ///
    /// Panics if the body is not an error payload with that code.
    pub fn assert_error_code(&self, expected: u32) -> &Self {
        let code = self
            .json::<serde_json::Value>()
            .ok()
            .and_then(|body| body.get("code").and_then(serde_json::Value::as_u64));
        assert_eq!(
            code,
            Some(u64::from(expected)),
            "Expected error code {}, body: {}",
            expected,
            self.text()
        );
        self
    }
}
