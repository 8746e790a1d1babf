//! Error types for Sleepy
//!
//! Two families live here:
//!
//! - [`ApiError`]: a per-request failure. It carries an HTTP status, a
//!   client-safe message, a numeric code and an optional internal diagnostic
//!   that is only ever written to the completion log.
//! - [`RegistrationError`]: a misconfiguration detected while resources are
//!   being registered. These stop the process before it serves traffic.

use http::StatusCode;
use serde::Serialize;
use std::fmt;

/// Result type alias for Sleepy operations
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Numeric error codes written to the wire
pub mod codes {
    pub const INTERNAL: u32 = 1000;
    pub const PARSE_REQUEST: u32 = 1001;
    pub const FIELD_MISSING: u32 = 1002;
    pub const MOD_RO_FIELD: u32 = 1003;
    pub const UNAUTHORIZED: u32 = 1004;
    pub const FORBIDDEN: u32 = 1005;
    pub const NOT_FOUND: u32 = 1006;
    pub const METHOD_NOT_ALLOWED: u32 = 1007;
    pub const PAYLOAD_TOO_LARGE: u32 = 1008;
}

/// The closed taxonomy of request failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required input was absent
    FieldMissing,
    /// The client set a server-owned field
    ReadOnlyViolation,
    /// The body could not be decoded
    MalformedRequest,
    /// Handler or encoder defect
    InternalFault,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    /// Application-defined failure with its own status and code
    Custom,
}

impl ErrorKind {
    /// Default status for this kind
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::FieldMissing | ErrorKind::ReadOnlyViolation => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorKind::MalformedRequest => StatusCode::BAD_REQUEST,
            ErrorKind::InternalFault => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::Custom => StatusCode::BAD_REQUEST,
        }
    }

    /// Default wire code for this kind
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::FieldMissing => codes::FIELD_MISSING,
            ErrorKind::ReadOnlyViolation => codes::MOD_RO_FIELD,
            ErrorKind::MalformedRequest => codes::PARSE_REQUEST,
            ErrorKind::InternalFault => codes::INTERNAL,
            ErrorKind::Unauthorized => codes::UNAUTHORIZED,
            ErrorKind::Forbidden => codes::FORBIDDEN,
            ErrorKind::NotFound => codes::NOT_FOUND,
            ErrorKind::MethodNotAllowed => codes::METHOD_NOT_ALLOWED,
            ErrorKind::PayloadTooLarge => codes::PAYLOAD_TOO_LARGE,
            ErrorKind::Custom => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::FieldMissing => "field_missing",
            ErrorKind::ReadOnlyViolation => "read_only_violation",
            ErrorKind::MalformedRequest => "malformed_request",
            ErrorKind::InternalFault => "internal_fault",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MethodNotAllowed => "method_not_allowed",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard API error type
///
/// Immutable once built; any pipeline stage may produce one and doing so
/// terminates the request.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    kind: ErrorKind,
    status: StatusCode,
    code: u32,
    message: String,
    internal: Option<String>,
}

impl ApiError {
    /// Create an error of a built-in kind with its default status and code
    pub fn of(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: kind.status(),
            code: kind.code(),
            message: message.into(),
            internal: None,
        }
    }

    /// Create an application-defined error
    pub fn new(status: StatusCode, code: u32, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Custom,
            status,
            code,
            message: message.into(),
            internal: None,
        }
    }

    /// A required field or query variable was absent
    pub fn field_missing(message: impl Into<String>) -> Self {
        Self::of(ErrorKind::FieldMissing, message)
    }

    /// The client attempted to set a read-only field
    pub fn read_only_violation(message: impl Into<String>) -> Self {
        Self::of(ErrorKind::ReadOnlyViolation, message)
    }

    /// The request body could not be decoded
    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::of(ErrorKind::MalformedRequest, message)
    }

    /// A programming defect in a handler or encoder.
    ///
    /// The client only ever sees a generic message; `details` goes to the log.
    pub fn internal(details: impl Into<String>) -> Self {
        Self::of(ErrorKind::InternalFault, "Server error.").with_internal(details)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::of(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::of(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::of(ErrorKind::NotFound, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::of(ErrorKind::MethodNotAllowed, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::of(ErrorKind::PayloadTooLarge, message)
    }

    /// Attach an internal diagnostic (logged, never sent to the client)
    pub fn with_internal(mut self, details: impl Into<String>) -> Self {
        self.internal = Some(details.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    /// Client-safe message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Internal diagnostic, if any
    pub fn internal_details(&self) -> Option<&str> {
        self.internal.as_deref()
    }

    /// Wire representation of this error
    pub fn to_body(&self) -> ErrorBody<'_> {
        ErrorBody {
            error: None,
            message: &self.message,
            code: self.code,
        }
    }
}

/// JSON representation of an error response.
///
/// `error` is the internal diagnostic slot of the wire format; responses
/// built by the pipeline always leave it out.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    pub message: &'a str,
    pub code: u32,
}

// Conversion from common error types
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::malformed_request("Could not parse the request.").with_internal(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal(format!("I/O error: {}", err))
    }
}

/// A misconfiguration detected while building or registering resources
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("call {path}: {method} calls do not have a request body, so reads() cannot be used")]
    BodyOnBodylessMethod { path: String, method: String },

    #[error("model `{type_name}` is not a structured record")]
    NotARecord { type_name: &'static str },

    #[error("field `{field}` of `{model}` carries unknown annotation `{token}`")]
    UnknownAnnotation {
        model: &'static str,
        field: &'static str,
        token: String,
    },

    #[error("call {path} has no handler; use to()")]
    MissingHandler { path: String },

    #[error("call {path} has no method; use method()")]
    MissingMethod { path: String },

    #[error("call {path} documents path parameter `{name}` which is not part of the path")]
    UnknownPathParam { path: String, name: String },

    #[error("call {path} declares query variable `{name}` more than once")]
    DuplicateQueryVar { path: String, name: String },

    #[error("route {method} {path} conflicts with an existing route: {details}")]
    DuplicateRoute {
        path: String,
        method: String,
        details: String,
    },
}
