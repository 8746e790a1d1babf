//! Filters: middleware steps that may augment [`CallData`] or abort a request
//!
//! The same [`FilterChain`] runs at all three levels (API, resource, call).
//! Filters run in registration order and the first error stops the chain;
//! nothing after it, including the handler, runs.
//!
//! # Example
//!
//! ```rust,ignore
//! fn has_auth(req: &Request, data: &mut CallData) -> Result<(), ApiError> {
//!     let token = req
//!         .header("authorization")
//!         .ok_or_else(|| ApiError::unauthorized("Please login."))?;
//!     data.set_principal(token);
//!     Ok(())
//! }
//! ```

use crate::call_data::CallData;
use crate::error::ApiError;
use crate::request::Request;

/// A middleware step.
///
/// Filters never write the response: their only effects are mutating
/// [`CallData`] and returning an error.
pub trait Filter: Send + Sync + 'static {
    fn apply(&self, req: &Request, data: &mut CallData) -> Result<(), ApiError>;
}

impl<F> Filter for F
where
    F: Fn(&Request, &mut CallData) -> Result<(), ApiError> + Send + Sync + 'static,
{
    fn apply(&self, req: &Request, data: &mut CallData) -> Result<(), ApiError> {
        self(req, data)
    }
}

/// An ordered list of filters
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Append a closure filter; it runs after every filter already in the chain
    pub fn push<F>(&mut self, filter: F)
    where
        F: Fn(&Request, &mut CallData) -> Result<(), ApiError> + Send + Sync + 'static,
    {
        self.filters.push(Box::new(filter));
    }

    /// Append a filter type
    pub fn push_filter<F: Filter>(&mut self, filter: F) {
        self.filters.push(Box::new(filter));
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Run every filter in order, stopping at the first error
    pub fn run(&self, req: &Request, data: &mut CallData) -> Result<(), ApiError> {
        self.filters
            .iter()
            .try_for_each(|filter| filter.apply(req, data))
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("len", &self.filters.len())
            .finish()
    }
}
