//! Calls: one registered endpoint and its request lifecycle
//!
//! A [`CallBuilder`] is obtained from [`Resource::route`](crate::Resource::route)
//! and configured fluently. When the resource is registered each builder is
//! validated and frozen into a [`CallSpec`], which is then shared read-only by
//! every request it serves.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut users = Resource::new("/users");
//!
//! users
//!     .route("/{uid}")
//!     .method(Method::GET)
//!     .to(get_user)
//!     .operation_name("getUser")
//!     .path_param("uid", "ID of the user to search for.")
//!     .returns::<User>();
//!
//! users
//!     .route("")
//!     .method(Method::POST)
//!     .to(create_user)
//!     .filter(has_auth)
//!     .operation_name("createUser")
//!     .reads::<User>()
//!     .returns::<User>();
//! ```

use crate::call_data::CallData;
use crate::error::{ApiError, RegistrationError};
use crate::filter::{Filter, FilterChain};
use crate::handler::Handler;
use crate::request::Request;
use crate::response::{self, Response};
use crate::router::path_param_names;
use crate::schema::{Direction, FieldSchema, Model};
use http::{Method, StatusCode};
use tracing::debug;

/// Documentation for a path or query variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputVar {
    pub name: String,
    pub description: String,
    pub required: bool,
}

type BodyDecoder = fn(&[u8], &FieldSchema, &mut CallData) -> Result<(), ApiError>;

struct InputModel {
    schema: FieldSchema,
    decode: BodyDecoder,
}

/// Decode a fresh `T`, validate it and hand it to the rest of the pipeline
fn decode_into<T: Model>(
    bytes: &[u8],
    schema: &FieldSchema,
    data: &mut CallData,
) -> Result<(), ApiError> {
    let payload: T = serde_json::from_slice(bytes).map_err(|e| decode_error(&e, schema))?;
    schema.validate(&payload)?;
    data.set_body(payload);
    Ok(())
}

/// Map a decode failure to the client-facing error.
///
/// A model without `#[serde(default)]` makes serde reject absent fields
/// before validation runs; those are still reported as missing fields.
fn decode_error(err: &serde_json::Error, schema: &FieldSchema) -> ApiError {
    let message = err.to_string();
    let missing = (err.classify() == serde_json::error::Category::Data)
        .then(|| message.strip_prefix("missing field `"))
        .flatten()
        .and_then(|rest| rest.split_once('`'))
        .map(|(name, _)| name);

    match missing {
        Some(name) => {
            let suffix = format!(".{}", name);
            let path = schema
                .required()
                .iter()
                .map(|p| p.name())
                .find(|p| *p == name || p.ends_with(&suffix))
                .unwrap_or(name);
            ApiError::field_missing(format!("Required field: {} is missing.", path))
                .with_internal(message.clone())
        }
        None => ApiError::malformed_request("Could not parse the request.").with_internal(message),
    }
}

/// Methods that never carry a request body
pub fn forbids_body(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// Fluent builder for one call
pub struct CallBuilder {
    suffix: String,
    method: Option<Method>,
    operation_name: String,
    handler: Option<Box<dyn Handler>>,
    filters: FilterChain,
    input: Option<InputModel>,
    output: Option<FieldSchema>,
    path_vars: Vec<InputVar>,
    query_vars: Vec<InputVar>,
    issues: Vec<RegistrationError>,
}

impl CallBuilder {
    pub(crate) fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
            method: None,
            operation_name: suffix.to_string(),
            handler: None,
            filters: FilterChain::new(),
            input: None,
            output: None,
            path_vars: Vec::new(),
            query_vars: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Set the HTTP method
    pub fn method(&mut self, method: Method) -> &mut Self {
        self.method = Some(method);
        self
    }

    /// Set the handler
    pub fn to<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Append a call-level filter
    pub fn filter<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(&Request, &mut CallData) -> Result<(), ApiError> + Send + Sync + 'static,
    {
        self.filters.push(filter);
        self
    }

    /// Append a call-level filter type
    pub fn filter_with<F: Filter>(&mut self, filter: F) -> &mut Self {
        self.filters.push_filter(filter);
        self
    }

    /// Declare the request body model
    pub fn reads<T: Model>(&mut self) -> &mut Self {
        match FieldSchema::introspect::<T>(Direction::In) {
            Ok(schema) => {
                self.input = Some(InputModel {
                    schema,
                    decode: decode_into::<T>,
                })
            }
            Err(err) => self.issues.push(err),
        }
        self
    }

    /// Declare the response body model
    pub fn returns<T: Model>(&mut self) -> &mut Self {
        match FieldSchema::introspect::<T>(Direction::Out) {
            Ok(schema) => self.output = Some(schema),
            Err(err) => self.issues.push(err),
        }
        self
    }

    /// Document a path parameter
    pub fn path_param(&mut self, name: &str, description: &str) -> &mut Self {
        self.path_vars.push(InputVar {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        });
        self
    }

    /// Declare a query variable; required ones are enforced per request
    pub fn query_var(&mut self, name: &str, description: &str, required: bool) -> &mut Self {
        self.query_vars.push(InputVar {
            name: name.to_string(),
            description: description.to_string(),
            required,
        });
        self
    }

    /// Human-readable operation name, used in logs and docs
    pub fn operation_name(&mut self, name: &str) -> &mut Self {
        self.operation_name = name.to_string();
        self
    }

    pub(crate) fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Validate the builder and freeze it under its full path
    pub(crate) fn build(self, full_path: String) -> Result<CallSpec, RegistrationError> {
        if let Some(issue) = self.issues.into_iter().next() {
            return Err(issue);
        }

        let method = self.method.ok_or_else(|| RegistrationError::MissingMethod {
            path: full_path.clone(),
        })?;

        if self.input.is_some() && forbids_body(&method) {
            return Err(RegistrationError::BodyOnBodylessMethod {
                path: full_path,
                method: method.to_string(),
            });
        }

        let handler = self.handler.ok_or_else(|| RegistrationError::MissingHandler {
            path: full_path.clone(),
        })?;

        let params = path_param_names(&full_path);
        if let Some(var) = self.path_vars.iter().find(|v| !params.contains(&v.name.as_str())) {
            return Err(RegistrationError::UnknownPathParam {
                path: full_path,
                name: var.name.clone(),
            });
        }

        for (i, var) in self.query_vars.iter().enumerate() {
            if self.query_vars[..i].iter().any(|v| v.name == var.name) {
                return Err(RegistrationError::DuplicateQueryVar {
                    path: full_path,
                    name: var.name.clone(),
                });
            }
        }

        debug!(
            method = %method,
            path = %full_path,
            operation = %self.operation_name,
            "Built call"
        );

        Ok(CallSpec {
            path: full_path,
            method,
            operation_name: self.operation_name,
            handler,
            filters: self.filters,
            input: self.input,
            output: self.output,
            path_vars: self.path_vars,
            query_vars: self.query_vars,
        })
    }
}

/// One registered endpoint, immutable once built
pub struct CallSpec {
    path: String,
    method: Method,
    operation_name: String,
    handler: Box<dyn Handler>,
    filters: FilterChain,
    input: Option<InputModel>,
    output: Option<FieldSchema>,
    path_vars: Vec<InputVar>,
    query_vars: Vec<InputVar>,
}

impl CallSpec {
    /// Full path pattern, e.g. `/v2/users/{uid}`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn input_schema(&self) -> Option<&FieldSchema> {
        self.input.as_ref().map(|i| &i.schema)
    }

    pub fn output_schema(&self) -> Option<&FieldSchema> {
        self.output.as_ref()
    }

    pub fn path_vars(&self) -> &[InputVar] {
        &self.path_vars
    }

    pub fn query_vars(&self) -> &[InputVar] {
        &self.query_vars
    }

    /// Run the call's request lifecycle.
    ///
    /// Query check, body decode and validation, call filters, handler,
    /// output sanitization and encoding. The first error ends the request.
    pub(crate) async fn execute(&self, req: Request, mut data: CallData) -> Result<Response, ApiError> {
        if let Some(var) = self
            .query_vars
            .iter()
            .find(|v| v.required && req.query(&v.name).is_none())
        {
            return Err(ApiError::field_missing(format!(
                "Required query variable: {} is missing.",
                var.name
            )));
        }

        if let Some(input) = &self.input {
            if !forbids_body(req.method()) {
                (input.decode)(&req.body()[..], &input.schema, &mut data)?;
            }
        }

        self.filters.run(&req, &mut data)?;

        let reply = self.handler.call(req, data).await?;
        let mut payload = reply.into_payload().ok_or_else(|| {
            ApiError::internal(format!(
                "Call handler for {} did not return a response or an error.",
                self.operation_name
            ))
        })?;

        if let Some(output) = &self.output {
            if payload.payload_type_id() != output.type_id() {
                return Err(ApiError::internal(format!(
                    "Call handler for {} returned `{}` but the call returns `{}`.",
                    self.operation_name,
                    payload.payload_type_name(),
                    output.model_name()
                )));
            }
            output.sanitize(payload.as_reflect_mut())?;
        }

        let body = payload.encode().map_err(|e| {
            ApiError::internal(format!(
                "Response from call handler for {} could not be encoded: {}",
                self.operation_name, e
            ))
        })?;

        Ok(response::json(StatusCode::OK, body))
    }
}

impl std::fmt::Debug for CallSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSpec")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("operation_name", &self.operation_name)
            .finish()
    }
}
