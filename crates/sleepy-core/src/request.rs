//! Request types for Sleepy

use bytes::Bytes;
use http::{request::Parts, HeaderMap, Method, Uri, Version};
use std::collections::HashMap;

/// HTTP Request wrapper
///
/// Holds the request head, the fully-read body, the decoded query string and
/// the path parameters captured by the router.
pub struct Request {
    parts: Parts,
    body: Bytes,
    query: Vec<(String, String)>,
    path_params: HashMap<String, String>,
}

impl Request {
    /// Create a new request from parts and a buffered body
    pub fn new(parts: Parts, body: Bytes) -> Self {
        let query = parts
            .uri
            .query()
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .unwrap_or_default();

        Self {
            parts,
            body,
            query,
            path_params: HashMap::new(),
        }
    }

    /// Create a request from an `http::Request` with a buffered body
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body)
    }

    pub(crate) fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Get the URI
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Get the HTTP version
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Get the headers
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Get a header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get the request path
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Get the raw query string
    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// First value of a query variable
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All decoded query pairs, in order
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Get path parameters
    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    /// Get a specific path parameter
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// The buffered request body
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("version", &self.parts.version)
            .finish()
    }
}
