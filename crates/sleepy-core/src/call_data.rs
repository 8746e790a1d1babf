//! Per-request state passed through filters and into the handler
//!
//! A fresh [`CallData`] is created for every request and dropped when the
//! request completes. Stages run one at a time, so it is owned and mutated
//! without any locking.

use http::Extensions;
use std::any::Any;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Identity established by an authentication filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub String);

/// Typed, request-scoped state
pub struct CallData {
    request_id: String,
    started: Instant,
    body: Option<Box<dyn Any + Send + Sync>>,
    extensions: Extensions,
}

impl CallData {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            started: Instant::now(),
            body: None,
            extensions: Extensions::new(),
        }
    }

    /// Unique id of this request
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// When the request entered the pipeline
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Time since the request entered the pipeline
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn set_body<T: Send + Sync + 'static>(&mut self, body: T) {
        self.body = Some(Box::new(body));
    }

    /// The decoded and validated request body
    pub fn body<T: 'static>(&self) -> Option<&T> {
        self.body.as_ref()?.downcast_ref::<T>()
    }

    /// Take ownership of the decoded request body.
    ///
    /// Leaves the body in place when `T` is not its type.
    pub fn take_body<T: 'static>(&mut self) -> Option<T> {
        if !self.body.as_ref()?.is::<T>() {
            return None;
        }
        self.body.take()?.downcast::<T>().ok().map(|b| *b)
    }

    /// Record the authenticated identity
    pub fn set_principal(&mut self, principal: impl Into<String>) {
        self.extensions.insert(Principal(principal.into()));
    }

    /// The authenticated identity, if a filter established one
    pub fn principal(&self) -> Option<&Principal> {
        self.extensions.get::<Principal>()
    }

    /// Store an arbitrary typed value, returning the previous one
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions.get_mut::<T>()
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions.remove::<T>()
    }
}

impl Default for CallData {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallData")
            .field("request_id", &self.request_id)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Tenant(u32);

    #[test]
    fn typed_values_round_trip() {
        let mut data = CallData::new();
        assert!(data.insert(Tenant(7)).is_none());
        assert_eq!(data.get::<Tenant>(), Some(&Tenant(7)));
        assert_eq!(data.remove::<Tenant>(), Some(Tenant(7)));
        assert!(data.get::<Tenant>().is_none());
    }

    #[test]
    fn body_is_typed() {
        let mut data = CallData::new();
        data.set_body(String::from("payload"));

        assert!(data.body::<u32>().is_none());
        assert!(data.take_body::<u32>().is_none());
        assert_eq!(data.body::<String>().map(String::as_str), Some("payload"));
        assert_eq!(data.take_body::<String>(), Some("payload".to_string()));
        assert!(data.body::<String>().is_none());
    }

    #[test]
    fn principal_accessors() {
        let mut data = CallData::new();
        assert!(data.principal().is_none());
        data.set_principal("token-123");
        assert_eq!(data.principal(), Some(&Principal("token-123".into())));
    }

    #[test]
    fn each_request_gets_its_own_id() {
        assert_ne!(CallData::new().request_id(), CallData::new().request_id());
    }
}
