//! Resources: groups of calls under one path prefix
//!
//! A [`Resource`] is assembled at startup and handed to
//! [`Api::register`](crate::Api::register), which validates every call and
//! freezes the resource into a dispatcher. The dispatcher runs the
//! resource-level filters and forwards to the matched call.

use crate::call::{CallBuilder, CallSpec};
use crate::call_data::CallData;
use crate::error::{ApiError, RegistrationError};
use crate::filter::{Filter, FilterChain};
use crate::request::Request;
use crate::response::Response;
use crate::router::join_path;

/// A named group of calls sharing a path prefix and resource filters
pub struct Resource {
    prefix: String,
    name: String,
    calls: Vec<CallBuilder>,
    filters: FilterChain,
}

impl Resource {
    /// Create a resource mounted at `prefix`, e.g. `/users`
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            name: prefix.trim_matches('/').to_string(),
            calls: Vec::new(),
            filters: FilterChain::new(),
        }
    }

    /// Add a call at `suffix` below the resource prefix
    pub fn route(&mut self, suffix: &str) -> &mut CallBuilder {
        self.calls.push(CallBuilder::new(suffix));
        let last = self.calls.len() - 1;
        &mut self.calls[last]
    }

    /// Append a resource-level filter; it runs before every call's filters
    pub fn filter<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(&Request, &mut CallData) -> Result<(), ApiError> + Send + Sync + 'static,
    {
        self.filters.push(filter);
        self
    }

    /// Append a resource-level filter type
    pub fn filter_with<F: Filter>(&mut self, filter: F) -> &mut Self {
        self.filters.push_filter(filter);
        self
    }

    /// Name used in logs; defaults to the prefix without slashes
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Build every call under `base_path`
    pub(crate) fn build(self, base_path: &str) -> Result<ResourceDispatcher, RegistrationError> {
        let calls = self
            .calls
            .into_iter()
            .map(|builder| {
                let full_path = join_path(base_path, &self.prefix, builder.suffix());
                builder.build(full_path)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResourceDispatcher {
            name: self.name,
            filters: self.filters,
            calls,
        })
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("prefix", &self.prefix)
            .field("name", &self.name)
            .field("calls", &self.calls.len())
            .field("filters", &self.filters)
            .finish()
    }
}

/// A registered resource, read-only at serve time
#[derive(Debug)]
pub(crate) struct ResourceDispatcher {
    name: String,
    filters: FilterChain,
    calls: Vec<CallSpec>,
}

impl ResourceDispatcher {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn calls(&self) -> &[CallSpec] {
        &self.calls
    }

    /// Run resource filters, then the call at `index`
    pub(crate) async fn dispatch(
        &self,
        index: usize,
        req: Request,
        mut data: CallData,
    ) -> Result<Response, ApiError> {
        self.filters.run(&req, &mut data)?;

        let call = self.calls.get(index).ok_or_else(|| {
            ApiError::internal(format!("resource `{}` has no call #{}", self.name, index))
        })?;
        call.execute(req, data).await
    }
}
