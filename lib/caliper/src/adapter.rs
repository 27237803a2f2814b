//! Call adapters and their ordered factory chain.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use caliper_core::{
    Annotations, Error, Request, Response, Result, ReturnType, TypeParam, TypeTag,
};

use crate::Caliper;
use crate::call::{Call, Callback};
use crate::converter::Payload;
use crate::executor::CallbackExecutor;

/// The adapted return value with its concrete shape erased.
///
/// The built-in factories produce a `Box<dyn Call>` for the direct shape
/// and a [`crate::CallFuture`]/[`crate::ResponseFuture`] for the future
/// shapes; user factories may produce anything.
pub type AdaptedCall = Box<dyn Any + Send>;

/// Transforms a generic cancellable call into the declared return shape.
pub trait CallAdapter: Send + Sync {
    /// The body type the response converter must produce for this adapter.
    /// Typically not the same as the return type handed to the factory.
    fn response_type(&self) -> TypeTag;

    /// Wrap `call` into the adapted shape.
    fn adapt(&self, call: Box<dyn Call>) -> AdaptedCall;
}

/// Creates call adapters for the return shapes a factory recognizes.
pub trait CallAdapterFactory: Send + Sync {
    /// Factory name used in resolution-failure messages.
    fn name(&self) -> &'static str;

    /// An adapter for `return_type`; `Ok(None)` when the shape is not
    /// handled by this factory, `Err` when the shape is recognized but
    /// malformed. Malformed parameterization is a configuration error
    /// detected here, eagerly, never at invocation time.
    fn get(
        &self,
        return_type: &ReturnType,
        annotations: &Annotations,
        client: &Caliper,
    ) -> Result<Option<Arc<dyn CallAdapter>>>;
}

/// Built-in adapter factory for the direct [`Call`] return shape.
///
/// Adapts by identity, or wraps the call so completion callbacks are
/// marshaled onto the configured callback executor. The wrapper is skipped
/// when the operation carries the skip-callback-executor marker or when no
/// executor is configured.
pub struct DefaultCallAdapterFactory {
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
}

impl DefaultCallAdapterFactory {
    /// Create the factory with an optional callback executor.
    #[must_use]
    pub fn new(callback_executor: Option<Arc<dyn CallbackExecutor>>) -> Self {
        Self { callback_executor }
    }
}

impl CallAdapterFactory for DefaultCallAdapterFactory {
    fn name(&self) -> &'static str {
        "caliper::DefaultCallAdapterFactory"
    }

    fn get(
        &self,
        return_type: &ReturnType,
        annotations: &Annotations,
        _client: &Caliper,
    ) -> Result<Option<Arc<dyn CallAdapter>>> {
        let ReturnType::Call(param) = return_type else {
            return Ok(None);
        };
        let response_type = match param {
            TypeParam::Body(tag) => *tag,
            TypeParam::Untyped => {
                return Err(Error::invalid_return_type(
                    "Call must be parameterized with a concrete body type",
                ));
            }
            TypeParam::Response(_) => {
                return Err(Error::invalid_return_type(
                    "Call cannot wrap a Response; use the future-response shape instead",
                ));
            }
        };
        let executor = if annotations.skips_callback_executor() {
            None
        } else {
            self.callback_executor.clone()
        };
        Ok(Some(Arc::new(DirectCallAdapter {
            response_type,
            executor,
        })))
    }
}

struct DirectCallAdapter {
    response_type: TypeTag,
    executor: Option<Arc<dyn CallbackExecutor>>,
}

impl CallAdapter for DirectCallAdapter {
    fn response_type(&self) -> TypeTag {
        self.response_type
    }

    fn adapt(&self, call: Box<dyn Call>) -> AdaptedCall {
        let adapted: Box<dyn Call> = match &self.executor {
            Some(executor) => Box::new(ExecutorCallbackCall {
                executor: Arc::clone(executor),
                delegate: Arc::from(call),
            }),
            None => call,
        };
        Box::new(adapted)
    }
}

/// Wraps a call so completion callbacks run on the configured executor
/// instead of the transport thread.
///
/// Cancellation passes straight through to the delegate. A success whose
/// marshaled delivery finds the delegate already canceled is translated to
/// [`Error::Canceled`].
struct ExecutorCallbackCall {
    executor: Arc<dyn CallbackExecutor>,
    delegate: Arc<dyn Call>,
}

impl Call for ExecutorCallbackCall {
    fn request(&self) -> &Request {
        self.delegate.request()
    }

    fn execute(&self) -> Result<Response<Payload>> {
        // Blocking execution has no callback to marshal.
        self.delegate.execute()
    }

    fn enqueue(&self, callback: Callback) {
        let executor = Arc::clone(&self.executor);
        let delegate = Arc::clone(&self.delegate);
        self.delegate.enqueue(Box::new(move |result| {
            executor.execute(Box::new(move || {
                let result = match result {
                    Ok(_) if delegate.is_canceled() => Err(Error::Canceled),
                    other => other,
                };
                callback(result);
            }));
        }));
    }

    fn is_executed(&self) -> bool {
        self.delegate.is_executed()
    }

    fn cancel(&self) {
        self.delegate.cancel();
    }

    fn is_canceled(&self) -> bool {
        self.delegate.is_canceled()
    }

    fn clone_call(&self) -> Box<dyn Call> {
        Box::new(Self {
            executor: Arc::clone(&self.executor),
            delegate: Arc::from(self.delegate.clone_call()),
        })
    }

    fn timeout(&self) -> Option<Duration> {
        self.delegate.timeout()
    }
}
