//! Future-shaped call adaptation over a single-assignment channel.
//!
//! [`FutureCallAdapterFactory`] enqueues the underlying call immediately
//! and hands back a future backed by a oneshot channel. Cancellation is
//! bidirectional: canceling the future with interruption cancels the
//! network call, completing the call after the future was canceled is a
//! silent no-op, and an outcome delivered before cancellation stays
//! delivered.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use caliper_core::{Annotations, Error, Response, Result, ReturnType, TypeParam, TypeTag};
use tokio::sync::oneshot;

use crate::Caliper;
use crate::adapter::{AdaptedCall, CallAdapter, CallAdapterFactory};
use crate::call::{Call, typed_response};
use crate::converter::{Payload, downcast_body};

/// Shared bridge between an enqueued call and a future-shaped consumer.
struct BridgeFuture<V> {
    rx: oneshot::Receiver<Result<V>>,
    call: Arc<dyn Call>,
    canceled: bool,
}

impl<V> BridgeFuture<V> {
    fn new(call: Arc<dyn Call>, rx: oneshot::Receiver<Result<V>>) -> Self {
        Self {
            rx,
            call,
            canceled: false,
        }
    }

    fn cancel(&mut self, interrupt: bool) {
        if interrupt {
            self.call.cancel();
        }
        // Closing the channel rejects later completions but keeps an
        // outcome that was already delivered.
        self.rx.close();
        self.canceled = true;
    }
}

impl<V> Future for BridgeFuture<V> {
    type Output = Result<V>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(if this.canceled {
                Error::Canceled
            } else {
                Error::transport("transport dropped the call without completing it")
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Single-assignment future resolving to the decoded response body.
///
/// Produced by the built-in future adapter for the body-future shape; the
/// underlying call is already in flight.
pub struct CallFuture {
    inner: BridgeFuture<Option<Payload>>,
}

impl CallFuture {
    /// Cancel the future. With `interrupt`, the underlying network call is
    /// canceled as well; without it, only delivery is abandoned. An outcome
    /// that was already delivered is left untouched.
    pub fn cancel(&mut self, interrupt: bool) {
        self.inner.cancel(interrupt);
    }

    /// `true` once [`CallFuture::cancel`] was called.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        self.inner.canceled
    }

    /// The underlying call handle.
    #[must_use]
    pub fn call(&self) -> &dyn Call {
        self.inner.call.as_ref()
    }

    /// Typed facade downcasting the body to `T`.
    #[must_use]
    pub fn typed<T>(self) -> TypedCallFuture<T> {
        TypedCallFuture {
            inner: self,
            _marker: PhantomData,
        }
    }
}

impl Future for CallFuture {
    type Output = Result<Option<Payload>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().inner).poll(cx)
    }
}

/// Single-assignment future resolving to the full [`Response`].
pub struct ResponseFuture {
    inner: BridgeFuture<Response<Payload>>,
}

impl ResponseFuture {
    /// Cancel the future; see [`CallFuture::cancel`].
    pub fn cancel(&mut self, interrupt: bool) {
        self.inner.cancel(interrupt);
    }

    /// `true` once [`ResponseFuture::cancel`] was called.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        self.inner.canceled
    }

    /// The underlying call handle.
    #[must_use]
    pub fn call(&self) -> &dyn Call {
        self.inner.call.as_ref()
    }

    /// Typed facade downcasting response bodies to `T`.
    #[must_use]
    pub fn typed<T>(self) -> TypedResponseFuture<T> {
        TypedResponseFuture {
            inner: self,
            _marker: PhantomData,
        }
    }
}

impl Future for ResponseFuture {
    type Output = Result<Response<Payload>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().inner).poll(cx)
    }
}

/// Typed wrapper over [`CallFuture`] resolving to `T`.
pub struct TypedCallFuture<T> {
    inner: CallFuture,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedCallFuture<T> {
    /// Cancel the future; see [`CallFuture::cancel`].
    pub fn cancel(&mut self, interrupt: bool) {
        self.inner.cancel(interrupt);
    }

    /// `true` once cancel was called.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        self.inner.is_canceled()
    }
}

impl<T: 'static> Future for TypedCallFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().inner).poll(cx) {
            Poll::Ready(outcome) => Poll::Ready(outcome.and_then(downcast_body::<T>)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Typed wrapper over [`ResponseFuture`] resolving to [`Response<T>`].
pub struct TypedResponseFuture<T> {
    inner: ResponseFuture,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedResponseFuture<T> {
    /// Cancel the future; see [`CallFuture::cancel`].
    pub fn cancel(&mut self, interrupt: bool) {
        self.inner.cancel(interrupt);
    }

    /// `true` once cancel was called.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        self.inner.is_canceled()
    }
}

impl<T: 'static> Future for TypedResponseFuture<T> {
    type Output = Result<Response<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().inner).poll(cx) {
            Poll::Ready(outcome) => Poll::Ready(outcome.and_then(typed_response::<T>)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Built-in factory for the future-shaped return types.
///
/// `Future<T>` resolves with the decoded body and rejects non-2xx
/// responses with [`Error::Http`]; `Future<Response<T>>` resolves with the
/// full response and leaves status inspection to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct FutureCallAdapterFactory;

impl CallAdapterFactory for FutureCallAdapterFactory {
    fn name(&self) -> &'static str {
        "caliper::FutureCallAdapterFactory"
    }

    fn get(
        &self,
        return_type: &ReturnType,
        _annotations: &Annotations,
        _client: &Caliper,
    ) -> Result<Option<Arc<dyn CallAdapter>>> {
        let ReturnType::Future(param) = return_type else {
            return Ok(None);
        };
        match param {
            TypeParam::Untyped => Err(Error::invalid_return_type(
                "Future must be parameterized with a concrete body or Response type",
            )),
            TypeParam::Body(tag) => Ok(Some(Arc::new(BodyFutureAdapter {
                response_type: *tag,
            }))),
            TypeParam::Response(inner) => match inner.as_ref() {
                TypeParam::Body(tag) => Ok(Some(Arc::new(ResponseFutureAdapter {
                    response_type: *tag,
                }))),
                TypeParam::Untyped | TypeParam::Response(_) => Err(Error::invalid_return_type(
                    "Response must be parameterized with a concrete body type",
                )),
            },
        }
    }
}

struct BodyFutureAdapter {
    response_type: TypeTag,
}

impl CallAdapter for BodyFutureAdapter {
    fn response_type(&self) -> TypeTag {
        self.response_type
    }

    fn adapt(&self, call: Box<dyn Call>) -> AdaptedCall {
        let call: Arc<dyn Call> = Arc::from(call);
        let (tx, rx) = oneshot::channel();
        call.enqueue(Box::new(move |result| {
            let outcome = result.and_then(|response| {
                if response.is_successful() {
                    Ok(response.into_body())
                } else {
                    Err(http_error(response))
                }
            });
            let _ = tx.send(outcome);
        }));
        Box::new(CallFuture {
            inner: BridgeFuture::new(call, rx),
        })
    }
}

struct ResponseFutureAdapter {
    response_type: TypeTag,
}

impl CallAdapter for ResponseFutureAdapter {
    fn response_type(&self) -> TypeTag {
        self.response_type
    }

    fn adapt(&self, call: Box<dyn Call>) -> AdaptedCall {
        let call: Arc<dyn Call> = Arc::from(call);
        let (tx, rx) = oneshot::channel();
        call.enqueue(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        Box::new(ResponseFuture {
            inner: BridgeFuture::new(call, rx),
        })
    }
}

/// Turn an unsuccessful response into the typed HTTP failure.
fn http_error(response: Response<Payload>) -> Error {
    let status = response.status().as_u16();
    let message = response.message().to_owned();
    let body = response
        .into_error_body()
        .and_then(|body| body.bytes().ok());
    Error::http(status, message, body)
}
