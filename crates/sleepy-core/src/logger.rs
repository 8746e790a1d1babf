//! Completion logging
//!
//! Every request produces exactly one [`Completion`], handed to the
//! [`CompletionLogger`] owned by the [`Api`](crate::Api). The default
//! [`TracingLogger`] turns it into a single `tracing` event.

use crate::config::Environment;
use crate::error::ApiError;
use http::{Method, StatusCode};
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The outcome of one request
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub status: StatusCode,
    pub elapsed: Duration,
    pub request_id: &'a str,
    /// `None` on success
    pub error: Option<&'a ApiError>,
}

impl Completion<'_> {
    /// Severity of this outcome: info on success, warn below 500, error otherwise
    pub fn level(&self) -> Level {
        match self.error {
            None => Level::INFO,
            Some(err) if err.status().as_u16() >= 500 => Level::ERROR,
            Some(_) => Level::WARN,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Receives one record per finished request
pub trait CompletionLogger: Send + Sync + 'static {
    fn record(&self, completion: &Completion<'_>);
}

impl<F> CompletionLogger for F
where
    F: Fn(&Completion<'_>) + Send + Sync + 'static,
{
    fn record(&self, completion: &Completion<'_>) {
        self(completion)
    }
}

/// Default logger writing `tracing` events
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    internal_on_warn: bool,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt in to attaching the internal diagnostic to warnings while in
    /// development. By default only error-level events carry it.
    pub fn for_environment(environment: &Environment) -> Self {
        Self {
            internal_on_warn: environment.is_development(),
        }
    }
}

impl CompletionLogger for TracingLogger {
    fn record(&self, c: &Completion<'_>) {
        let duration_ms = c.elapsed.as_millis() as u64;

        match (c.level(), c.error) {
            (Level::ERROR, Some(err)) => error!(
                request_id = %c.request_id,
                method = %c.method,
                path = %c.path,
                status = c.status.as_u16(),
                duration_ms,
                message = %err.message(),
                internal = err.internal_details().unwrap_or(""),
                "Request failed"
            ),
            (_, Some(err)) if self.internal_on_warn => warn!(
                request_id = %c.request_id,
                method = %c.method,
                path = %c.path,
                status = c.status.as_u16(),
                duration_ms,
                message = %err.message(),
                internal = err.internal_details().unwrap_or(""),
                "Request rejected"
            ),
            (_, Some(err)) => warn!(
                request_id = %c.request_id,
                method = %c.method,
                path = %c.path,
                status = c.status.as_u16(),
                duration_ms,
                message = %err.message(),
                "Request rejected"
            ),
            (_, None) => info!(
                request_id = %c.request_id,
                method = %c.method,
                path = %c.path,
                status = c.status.as_u16(),
                duration_ms,
                "Request completed"
            ),
        }
    }
}

/// Install a `tracing-subscriber` fmt backend.
///
/// Honours `RUST_LOG`, falling back to `info,sleepy=debug`. Calling it more
/// than once is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sleepy=debug,sleepy_core=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
