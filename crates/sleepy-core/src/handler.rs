//! Handler trait and result erasure

use crate::call_data::CallData;
use crate::error::ApiError;
use crate::request::Request;
use crate::schema::Reflect;
use serde::Serialize;
use std::any::TypeId;
use std::future::Future;
use std::pin::Pin;

/// A handler result that can be sanitized and encoded
pub trait Payload: Reflect + Send + Sync + 'static {
    /// Encode to the wire format
    fn encode(&self) -> Result<Vec<u8>, serde_json::Error>;

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect;

    fn payload_type_id(&self) -> TypeId;

    fn payload_type_name(&self) -> &'static str;
}

impl<T> Payload for T
where
    T: Reflect + Serialize + Send + Sync + 'static,
{
    fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        self
    }

    fn payload_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn payload_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// What a handler produced on success.
///
/// Any [`Payload`] converts into a `Reply`. [`Reply::empty`] exists for
/// handlers that finish without a result; the executor treats it as a
/// handler defect.
pub struct Reply(Option<Box<dyn Payload>>);

impl Reply {
    pub fn empty() -> Self {
        Reply(None)
    }

    pub fn from_option<T: Payload>(value: Option<T>) -> Self {
        Reply(value.map(|v| Box::new(v) as Box<dyn Payload>))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub(crate) fn into_payload(self) -> Option<Box<dyn Payload>> {
        self.0
    }
}

impl<T: Payload> From<T> for Reply {
    fn from(value: T) -> Self {
        Reply(Some(Box::new(value)))
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(payload) => write!(f, "Reply({})", payload.payload_type_name()),
            None => f.write_str("Reply(empty)"),
        }
    }
}

/// Boxed future returned by handlers
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, ApiError>> + Send>>;

/// The end function that serves a call
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request, data: CallData) -> HandlerFuture;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request, CallData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
    R: Into<Reply>,
{
    fn call(&self, req: Request, data: CallData) -> HandlerFuture {
        let fut = self(req, data);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn request() -> Request {
        Request::from_http(http::Request::new(Bytes::new()))
    }

    async fn greet(_req: Request, _data: CallData) -> Result<String, ApiError> {
        Ok("getUser!".to_string())
    }

    async fn nothing(_req: Request, _data: CallData) -> Result<Reply, ApiError> {
        Ok(Reply::empty())
    }

    #[tokio::test]
    async fn async_fns_are_handlers() {
        let reply = greet.call(request(), CallData::new()).await.unwrap();
        let payload = reply.into_payload().unwrap();
        assert_eq!(payload.payload_type_id(), TypeId::of::<String>());
        assert_eq!(payload.encode().unwrap(), br#""getUser!""#.to_vec());
    }

    #[tokio::test]
    async fn empty_reply_has_no_payload() {
        let reply = nothing.call(request(), CallData::new()).await.unwrap();
        assert!(reply.is_empty());
    }

    #[test]
    fn reply_from_option() {
        assert!(Reply::from_option::<u32>(None).is_empty());
        assert!(!Reply::from_option(Some(3u32)).is_empty());
    }
}
