//! Body converters and their ordered factory chain.
//!
//! Converter factories are consulted in registration order; the first
//! factory returning a converter wins and later factories are never asked.
//! [`BuiltinConverters`] is registered after every user factory, so user
//! factories can override each built-in decision.

use std::any::Any;
use std::sync::Arc;

use caliper_core::{Annotations, Error, RequestBody, ResponseBody, Result, TypeTag};

use crate::Caliper;

/// A decoded response body traveling through the adaptation core with its
/// concrete type erased. Typed facades downcast exactly once at the API
/// surface.
pub type Payload = Box<dyn Any + Send>;

/// Converts a typed argument into a transport request body.
pub trait RequestConverter: Send + Sync {
    /// Convert `value`, which carries the type this converter was resolved
    /// for.
    fn convert(&self, value: Payload) -> Result<RequestBody>;
}

/// Converts a transport response body into a typed value.
pub trait ResponseConverter: Send + Sync {
    /// Convert `body` into the type this converter was resolved for.
    fn convert(&self, body: ResponseBody) -> Result<Payload>;
}

/// Creates converters for the types a factory recognizes.
///
/// Both methods default to "not applicable". A factory may delegate to the
/// rest of the chain through `client` (see
/// [`Caliper::next_response_body_converter`]).
pub trait ConverterFactory: Send + Sync {
    /// Factory name used in resolution-failure messages.
    fn name(&self) -> &'static str;

    /// Converter turning `target`-typed arguments into request bodies, or
    /// `None` when this factory does not handle `target`.
    fn request_converter(
        &self,
        target: TypeTag,
        param_annotations: &Annotations,
        method_annotations: &Annotations,
        client: &Caliper,
    ) -> Option<Arc<dyn RequestConverter>> {
        let _ = (target, param_annotations, method_annotations, client);
        None
    }

    /// Converter decoding response bodies into `target`, or `None`.
    fn response_converter(
        &self,
        target: TypeTag,
        annotations: &Annotations,
        client: &Caliper,
    ) -> Option<Arc<dyn ResponseConverter>> {
        let _ = (target, annotations, client);
        None
    }
}

/// The built-in converter factory, tried after every user factory.
///
/// Handles the transport's own body types: [`RequestBody`] arguments pass
/// through untouched, `()` discards the response body, and [`ResponseBody`]
/// returns are buffered by default or passed through still-connected when
/// the streaming marker is present. Streaming is selected by annotation
/// presence alone, never by type.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinConverters;

impl ConverterFactory for BuiltinConverters {
    fn name(&self) -> &'static str {
        "caliper::BuiltinConverters"
    }

    fn request_converter(
        &self,
        target: TypeTag,
        _param_annotations: &Annotations,
        _method_annotations: &Annotations,
        _client: &Caliper,
    ) -> Option<Arc<dyn RequestConverter>> {
        if target.is::<RequestBody>() {
            return Some(Arc::new(PassthroughRequestConverter));
        }
        None
    }

    fn response_converter(
        &self,
        target: TypeTag,
        annotations: &Annotations,
        _client: &Caliper,
    ) -> Option<Arc<dyn ResponseConverter>> {
        if target.is::<ResponseBody>() {
            let converter: Arc<dyn ResponseConverter> = if annotations.streaming() {
                Arc::new(StreamingResponseConverter)
            } else {
                Arc::new(BufferingResponseConverter)
            };
            return Some(converter);
        }
        if target.is::<()>() {
            return Some(Arc::new(UnitResponseConverter));
        }
        None
    }
}

/// Hands a [`RequestBody`] argument through untouched.
struct PassthroughRequestConverter;

impl RequestConverter for PassthroughRequestConverter {
    fn convert(&self, value: Payload) -> Result<RequestBody> {
        value.downcast::<RequestBody>().map(|body| *body).map_err(|_| {
            Error::unexpected_type("request body passthrough received a non-RequestBody argument")
        })
    }
}

/// Discards the body for operations declared to return `()`.
struct UnitResponseConverter;

impl ResponseConverter for UnitResponseConverter {
    fn convert(&self, body: ResponseBody) -> Result<Payload> {
        drop(body);
        Ok(Box::new(()))
    }
}

/// Buffers the entire body into memory before the connection is released.
struct BufferingResponseConverter;

impl ResponseConverter for BufferingResponseConverter {
    fn convert(&self, body: ResponseBody) -> Result<Payload> {
        Ok(Box::new(body.buffer()?))
    }
}

/// Passes the live, still-connected body through untouched.
struct StreamingResponseConverter;

impl ResponseConverter for StreamingResponseConverter {
    fn convert(&self, body: ResponseBody) -> Result<Payload> {
        Ok(Box::new(body))
    }
}

/// Downcast a delivered payload to the declared body type.
///
/// A missing payload (a response without content) downcasts successfully
/// only to `()`.
pub(crate) fn downcast_body<T: 'static>(body: Option<Payload>) -> Result<T> {
    let payload = match body {
        Some(payload) => payload,
        None => Box::new(()),
    };
    payload.downcast::<T>().map(|value| *value).map_err(|_| {
        Error::unexpected_type(format!(
            "converter produced a value of an unexpected type (expected {})",
            std::any::type_name::<T>()
        ))
    })
}
