//! # Sleepy Core
//!
//! The engine behind Sleepy: declarative calls, a filter pipeline at three
//! levels, schema-driven validation and sanitization, routing, and the hyper
//! server.
//!
//! This crate is not meant to be used directly. Use `sleepy` instead.

mod api;
mod call;
mod call_data;
pub mod config;
pub mod cors;
mod docs;
mod error;
mod filter;
mod handler;
mod logger;
mod request;
mod resource;
mod response;
mod router;
pub mod schema;
mod server;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use api::{Api, ApiService};
pub use call::{forbids_body, CallBuilder, CallSpec, InputVar};
pub use call_data::{CallData, Principal};
pub use config::{ApiConfig, ConfigError, Environment, DEFAULT_BODY_LIMIT};
pub use cors::CorsConfig;
pub use docs::{ApiDoc, CallDoc, FieldDoc, ModelDoc, ParamDoc};
pub use error::{codes, ApiError, ErrorBody, ErrorKind, RegistrationError, Result};
pub use filter::{Filter, FilterChain};
pub use handler::{Handler, HandlerFuture, Payload, Reply};
pub use logger::{init_tracing, Completion, CompletionLogger, TracingLogger};
pub use request::Request;
pub use resource::Resource;
pub use response::{IntoResponse, Response, JSON_CONTENT_TYPE};
pub use schema::{Direction, FieldDescriptor, FieldSchema, Model, Record, Reflect};
pub use server::ServeError;
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestRequest, TestResponse};
