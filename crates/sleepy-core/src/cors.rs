//! Cross-origin preflight handling
//!
//! When enabled, the API answers every `OPTIONS` request itself, after the
//! API-level filters ran and before routing reaches any resource.

use crate::request::Request;
use crate::response::{self, Response};
use http::{header, HeaderValue, Method, StatusCode};
use serde::Deserialize;

const DEFAULT_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// CORS preflight policy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    /// Value of `Access-Control-Allow-Origin`; `*` allows any origin
    pub allow_origin: String,
    /// Value of `Access-Control-Max-Age`, when set
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_origin: "*".to_string(),
            max_age_secs: None,
        }
    }
}

impl CorsConfig {
    /// Enabled, allowing any origin
    pub fn permissive() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allow_origin = origin.into();
        self
    }

    pub fn max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = Some(secs);
        self
    }

    /// Whether `req` is a preflight this policy answers
    pub fn is_preflight(&self, req: &Request) -> bool {
        self.enabled && *req.method() == Method::OPTIONS
    }

    /// Build the `200 OK` preflight answer advertising `allowed` methods
    pub fn preflight_response(&self, req: &Request, allowed: &[Method]) -> Response {
        let mut response = response::empty(StatusCode::OK);
        let headers = response.headers_mut();

        if let Ok(origin) = HeaderValue::from_str(&self.allow_origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }

        let methods = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(methods) = HeaderValue::from_str(&methods) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
        }

        let requested = req
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ALLOW_HEADERS));
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested);

        if let Some(max_age) = self.max_age_secs {
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age));
        }

        response
    }
}
