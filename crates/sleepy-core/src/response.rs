//! Response types for Sleepy
//!
//! Handlers never build responses themselves: the call executor encodes the
//! handler's result, and every [`ApiError`] is written through
//! [`IntoResponse`] using the wire error format
//! `{"message": "...", "code": 1002}`.

use crate::error::ApiError;
use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;

/// HTTP Response type
pub type Response = http::Response<Full<Bytes>>;

/// Content type of every encoded body
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Trait for types that can be converted into an HTTP response
pub trait IntoResponse {
    /// Convert self into a Response
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        empty(self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::to_vec(&self.to_body()).unwrap_or_else(|_| {
            br#"{"message":"Failed to serialize error","code":1000}"#.to_vec()
        });
        json(self.status(), body)
    }
}

/// A response with a JSON body
pub fn json(status: StatusCode, body: impl Into<Bytes>) -> Response {
    let mut response = http::Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    response
}

/// A response with no body
pub fn empty(status: StatusCode) -> Response {
    let mut response = http::Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
