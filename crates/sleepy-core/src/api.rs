//! The API pipeline
//!
//! An [`Api`] owns every registered resource, the API-level filters, the
//! router and the completion logger. It is assembled once at startup and
//! then served read-only, usually behind an `Arc`.
//!
//! Per request: body limit, API filters, CORS preflight, routing, resource
//! filters, then the call's own lifecycle. Whatever happens, exactly one
//! [`Completion`] is recorded.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut api = Api::with_config(ApiConfig::from_env()?);
//! api.filter(request_logger);
//! api.register(users)?;
//! api.serve("0.0.0.0:3000").await?;
//! ```

use crate::call_data::CallData;
use crate::config::ApiConfig;
use crate::docs::{ApiDoc, CallDoc};
use crate::error::{ApiError, RegistrationError};
use crate::filter::{Filter, FilterChain};
use crate::logger::{Completion, CompletionLogger, TracingLogger};
use crate::request::Request;
use crate::resource::{Resource, ResourceDispatcher};
use crate::response::{IntoResponse, Response};
use crate::router::{normalize_prefix, RouteMatch, Router};
use bytes::Bytes;
use http::{header, HeaderValue, Method};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tracing::info;

/// Where a matched route leads
#[derive(Debug, Clone, Copy)]
struct CallRef {
    resource: usize,
    call: usize,
}

/// A failed request, plus the methods to advertise for a 405
struct Rejection {
    error: ApiError,
    allow: Option<Vec<Method>>,
}

impl From<ApiError> for Rejection {
    fn from(error: ApiError) -> Self {
        Self { error, allow: None }
    }
}

/// The top-level entry point
pub struct Api {
    config: ApiConfig,
    filters: FilterChain,
    resources: Vec<ResourceDispatcher>,
    router: Router<CallRef>,
    logger: Box<dyn CompletionLogger>,
}

impl Api {
    /// An empty API with the default configuration
    pub fn new() -> Self {
        Self::with_config(ApiConfig::default())
    }

    pub fn with_config(config: ApiConfig) -> Self {
        Self {
            config,
            filters: FilterChain::new(),
            resources: Vec::new(),
            router: Router::new(),
            logger: Box::new(TracingLogger::new()),
        }
    }

    /// Replace the completion logger
    pub fn with_logger<L: CompletionLogger>(mut self, logger: L) -> Self {
        self.logger = Box::new(logger);
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Append an API-level filter; it runs for every request, preflights included
    pub fn filter<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(&Request, &mut CallData) -> Result<(), ApiError> + Send + Sync + 'static,
    {
        self.filters.push(filter);
        self
    }

    /// Append an API-level filter type
    pub fn filter_with<F: Filter>(&mut self, filter: F) -> &mut Self {
        self.filters.push_filter(filter);
        self
    }

    /// Validate a resource and mount its calls.
    ///
    /// Either every call of the resource is mounted or none is. A
    /// registration error means the process is misconfigured and should
    /// stop before serving.
    pub fn register(&mut self, resource: Resource) -> Result<&mut Self, RegistrationError> {
        let dispatcher = resource.build(&self.config.base_path)?;
        let index = self.resources.len();

        let mut router = self.router.clone();
        for (call, spec) in dispatcher.calls().iter().enumerate() {
            router.insert(
                spec.path(),
                spec.method().clone(),
                CallRef {
                    resource: index,
                    call,
                },
            )?;
        }
        self.router = router;

        info!(
            resource = %dispatcher.name(),
            base_path = %normalize_prefix(&self.config.base_path),
            calls = dispatcher.calls().len(),
            "Registered resource"
        );
        self.resources.push(dispatcher);
        Ok(self)
    }

    /// Number of registered (path, method) pairs
    pub fn route_count(&self) -> usize {
        self.router.len()
    }

    /// Documentation for every registered call
    pub fn docs(&self) -> ApiDoc {
        ApiDoc {
            calls: self
                .resources
                .iter()
                .flat_map(ResourceDispatcher::calls)
                .map(CallDoc::from)
                .collect(),
        }
    }

    /// Run one request through the whole pipeline
    pub async fn handle(&self, req: Request) -> Response {
        self.process(req, CallData::new()).await
    }

    async fn process(&self, req: Request, data: CallData) -> Response {
        let started = data.started();
        let method = req.method().clone();
        let path = req.path().to_string();
        let request_id = data.request_id().to_string();

        let result = self.run(req, data).await;
        self.complete(&method, &path, &request_id, started, result)
    }

    /// Collect an HTTP body within the body limit, then [`handle`](Self::handle) it
    pub async fn handle_http<B>(&self, req: http::Request<B>) -> Response
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let data = CallData::new();
        let (parts, body) = req.into_parts();

        match Limited::new(body, self.config.body_limit).collect().await {
            Ok(collected) => self.process(Request::new(parts, collected.to_bytes()), data).await,
            Err(err) => {
                let error = if err.downcast_ref::<LengthLimitError>().is_some() {
                    self.too_large()
                } else {
                    ApiError::malformed_request("Could not read the request body.")
                        .with_internal(err.to_string())
                };
                self.complete(
                    &parts.method,
                    parts.uri.path(),
                    data.request_id(),
                    data.started(),
                    Err(error.into()),
                )
            }
        }
    }

    async fn run(&self, mut req: Request, mut data: CallData) -> Result<Response, Rejection> {
        self.check_body_limit(&req)?;
        self.filters.run(&req, &mut data)?;

        if self.config.cors.is_preflight(&req) {
            let allowed = self
                .router
                .allowed_methods(req.path())
                .unwrap_or_else(|| self.registered_methods());
            return Ok(self.config.cors.preflight_response(&req, &allowed));
        }

        let method = req.method().clone();
        let path = req.path().to_string();
        let target = match self.router.match_route(&path, &method) {
            RouteMatch::Found { target, params } => {
                req.set_path_params(params);
                *target
            }
            RouteMatch::NotFound => {
                return Err(ApiError::not_found(format!(
                    "No route found for {} {}",
                    method, path
                ))
                .into())
            }
            RouteMatch::MethodNotAllowed { allowed } => {
                return Err(Rejection {
                    error: ApiError::method_not_allowed(format!(
                        "Method {} not allowed for {}",
                        method, path
                    )),
                    allow: Some(allowed),
                })
            }
        };

        let resource = self.resources.get(target.resource).ok_or_else(|| {
            ApiError::internal(format!("no resource #{} for {}", target.resource, path))
        })?;
        resource
            .dispatch(target.call, req, data)
            .await
            .map_err(Rejection::from)
    }

    fn check_body_limit(&self, req: &Request) -> Result<(), ApiError> {
        let declared = req
            .header(header::CONTENT_LENGTH.as_str())
            .and_then(|v| v.parse::<usize>().ok());

        if declared.is_some_and(|len| len > self.config.body_limit)
            || req.body().len() > self.config.body_limit
        {
            return Err(self.too_large());
        }
        Ok(())
    }

    fn too_large(&self) -> ApiError {
        ApiError::payload_too_large(format!(
            "Request body exceeds the limit of {} bytes.",
            self.config.body_limit
        ))
    }

    /// Every method registered on any path, in first-seen order
    fn registered_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = Vec::new();
        for call in self.resources.iter().flat_map(ResourceDispatcher::calls) {
            if !methods.contains(call.method()) {
                methods.push(call.method().clone());
            }
        }
        methods
    }

    /// Write the response and record the single completion entry
    fn complete(
        &self,
        method: &Method,
        path: &str,
        request_id: &str,
        started: Instant,
        result: Result<Response, Rejection>,
    ) -> Response {
        match result {
            Ok(response) => {
                self.logger.record(&Completion {
                    method,
                    path,
                    status: response.status(),
                    elapsed: started.elapsed(),
                    request_id,
                    error: None,
                });
                response
            }
            Err(Rejection { error, allow }) => {
                self.logger.record(&Completion {
                    method,
                    path,
                    status: error.status(),
                    elapsed: started.elapsed(),
                    request_id,
                    error: Some(&error),
                });

                let mut response = error.into_response();
                if let Some(allowed) = allow {
                    let joined = allowed
                        .iter()
                        .map(Method::as_str)
                        .collect::<Vec<_>>()
                        .join(", ");
                    if let Ok(value) = HeaderValue::from_str(&joined) {
                        response.headers_mut().insert(header::ALLOW, value);
                    }
                }
                response
            }
        }
    }

    /// Share the API as a `tower_service::Service`
    pub fn into_service(self) -> ApiService {
        ApiService {
            api: Arc::new(self),
        }
    }
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("config", &self.config)
            .field("filters", &self.filters)
            .field("resources", &self.resources.len())
            .field("routes", &self.router.len())
            .finish()
    }
}

/// An [`Api`] behind an `Arc`, usable wherever a tower service is expected
#[derive(Clone)]
pub struct ApiService {
    api: Arc<Api>,
}

impl ApiService {
    pub fn api(&self) -> &Api {
        &self.api
    }
}

impl From<Arc<Api>> for ApiService {
    fn from(api: Arc<Api>) -> Self {
        Self { api }
    }
}

impl<B> tower_service::Service<http::Request<B>> for ApiService
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let api = self.api.clone();
        Box::pin(async move { Ok(api.handle_http(req).await) })
    }
}
