//! The cancellable call bridging one transport operation to typed consumers.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, mpsc};
use std::time::Duration;

use caliper_core::{
    Error, RawCall, RawResponse, Request, Response, ResponseBody, Result, StatusCode, Transport,
};
use tracing::debug;

use crate::converter::{Payload, ResponseConverter, downcast_body};

/// Completion callback for [`Call::enqueue`].
///
/// Invoked exactly once with the parsed response or the failure. A non-2xx
/// response arrives as a successful `Response` carrying an error body, not
/// as an `Err`.
pub type Callback = Box<dyn FnOnce(Result<Response<Payload>>) + Send>;

/// A single-use, cancellable invocation of one HTTP operation.
///
/// A call has exactly one terminal outcome, delivered exactly once through
/// whichever of [`Call::execute`] or [`Call::enqueue`] was used. Using both,
/// or either twice, is an invalid-state error. Cancellation is idempotent
/// and wins over a completion it observably precedes; a completion already
/// in flight when the call is canceled is translated into
/// [`Error::Canceled`] rather than delivered as a stale success.
pub trait Call: Send + Sync {
    /// The request this call sends.
    fn request(&self) -> &Request;

    /// Synchronously send the request and block until its outcome.
    ///
    /// # Errors
    ///
    /// Fails when the call was already executed, on transport failure, on
    /// body-conversion failure, or with [`Error::Canceled`].
    fn execute(&self) -> Result<Response<Payload>>;

    /// Asynchronously send the request; `callback` observes the outcome.
    fn enqueue(&self, callback: Callback);

    /// `true` once the call was executed or enqueued.
    fn is_executed(&self) -> bool;

    /// Cancel the call. An in-flight operation is interrupted on a
    /// best-effort basis; an unexecuted call will never run.
    fn cancel(&self);

    /// `true` once [`Call::cancel`] was called.
    fn is_canceled(&self) -> bool;

    /// A new, identical call that can be executed even if this one already
    /// was.
    fn clone_call(&self) -> Box<dyn Call>;

    /// The timeout spanning the entire operation, when the transport
    /// enforces one.
    fn timeout(&self) -> Option<Duration>;
}

/// [`Call`] implementation over the transport seam.
///
/// Creates the raw transport call lazily, guards single execution with an
/// atomic flag, and turns raw responses into [`Response`] values: error
/// bodies are buffered eagerly, 204/205 complete without content, and
/// everything else goes through the resolved response converter.
pub(crate) struct BridgedCall {
    transport: Arc<dyn Transport>,
    request: Request,
    converter: Arc<dyn ResponseConverter>,
    executed: AtomicBool,
    canceled: Arc<AtomicBool>,
    raw: OnceLock<Box<dyn RawCall>>,
}

impl BridgedCall {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        request: Request,
        converter: Arc<dyn ResponseConverter>,
    ) -> Self {
        Self {
            transport,
            request,
            converter,
            executed: AtomicBool::new(false),
            canceled: Arc::new(AtomicBool::new(false)),
            raw: OnceLock::new(),
        }
    }

    fn raw(&self) -> &dyn RawCall {
        self.raw
            .get_or_init(|| self.transport.new_call(&self.request))
            .as_ref()
    }

    fn mark_executed(&self) -> Result<()> {
        if self.executed.swap(true, Ordering::SeqCst) {
            return Err(Error::invalid_state("call already executed"));
        }
        Ok(())
    }

    /// Create the raw call and hand it the completion path.
    fn start(&self, deliver: impl FnOnce(Result<Response<Payload>>) + Send + 'static) {
        let raw = self.raw();
        if self.canceled.load(Ordering::SeqCst) {
            raw.cancel();
        }
        debug!(method = %self.request.method(), url = %self.request.url(), "dispatching call");
        let converter = Arc::clone(&self.converter);
        let canceled = Arc::clone(&self.canceled);
        raw.enqueue(Box::new(move |outcome| {
            deliver(complete(&*converter, &canceled, outcome));
        }));
    }
}

impl Call for BridgedCall {
    fn request(&self) -> &Request {
        &self.request
    }

    fn execute(&self) -> Result<Response<Payload>> {
        self.mark_executed()?;
        let (tx, rx) = mpsc::sync_channel(1);
        self.start(move |result| {
            let _ = tx.send(result);
        });
        rx.recv().unwrap_or_else(|_| {
            Err(Error::transport(
                "transport dropped the call without completing it",
            ))
        })
    }

    fn enqueue(&self, callback: Callback) {
        if let Err(err) = self.mark_executed() {
            callback(Err(err));
            return;
        }
        self.start(callback);
    }

    fn is_executed(&self) -> bool {
        self.executed.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        if let Some(raw) = self.raw.get() {
            raw.cancel();
        }
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
            || self.raw.get().is_some_and(|raw| raw.is_canceled())
    }

    fn clone_call(&self) -> Box<dyn Call> {
        Box::new(Self::new(
            Arc::clone(&self.transport),
            self.request.clone(),
            Arc::clone(&self.converter),
        ))
    }

    fn timeout(&self) -> Option<Duration> {
        self.raw().timeout()
    }
}

/// Map one raw outcome to the call's terminal outcome.
fn complete(
    converter: &dyn ResponseConverter,
    canceled: &AtomicBool,
    outcome: Result<RawResponse>,
) -> Result<Response<Payload>> {
    match outcome {
        Ok(_) if canceled.load(Ordering::SeqCst) => {
            // Cancellation raced the completion; never deliver a stale success.
            Err(Error::Canceled)
        }
        Ok(raw) => parse_response(converter, raw),
        Err(err) => Err(err),
    }
}

/// Parse a raw transport response into the adapted response shape.
fn parse_response(
    converter: &dyn ResponseConverter,
    raw: RawResponse,
) -> Result<Response<Payload>> {
    let (status, message, headers, body) = raw.into_parts();
    // The stateful body is replaced by a placeholder so the response
    // metadata can be passed along freely.
    let placeholder = ResponseBody::no_content(body.content_type().cloned(), body.content_length());
    let stripped = RawResponse::from_parts(status, message, headers, placeholder);

    if !status.is_success() {
        // Buffer the entire error body to avoid future I/O.
        let buffered = body.buffer()?;
        return Response::error(buffered, stripped);
    }
    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
        drop(body);
        return Response::success(None, stripped);
    }
    let value = converter.convert(body)?;
    Response::success(Some(value), stripped)
}

/// Downcast an erased response to the declared body type.
pub(crate) fn typed_response<T: 'static>(response: Response<Payload>) -> Result<Response<T>> {
    response.try_map_body(|payload| downcast_body::<T>(Some(payload)))
}

/// Typed facade over an erased [`Call`].
pub struct TypedCall<T> {
    inner: Box<dyn Call>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> TypedCall<T> {
    /// Wrap an erased call whose converter produces `T`.
    #[must_use]
    pub fn new(inner: Box<dyn Call>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// The request this call sends.
    #[must_use]
    pub fn request(&self) -> &Request {
        self.inner.request()
    }

    /// Synchronously send the request and block until its outcome.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Call::execute`], plus an unexpected-type
    /// error when the resolved converter does not produce `T`.
    pub fn execute(&self) -> Result<Response<T>> {
        self.inner.execute().and_then(typed_response)
    }

    /// Asynchronously send the request; `callback` observes the outcome.
    pub fn enqueue<F>(&self, callback: F)
    where
        F: FnOnce(Result<Response<T>>) + Send + 'static,
    {
        self.inner
            .enqueue(Box::new(move |result| callback(result.and_then(typed_response))));
    }

    /// `true` once the call was executed or enqueued.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.inner.is_executed()
    }

    /// Cancel the call.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// `true` once [`TypedCall::cancel`] was called.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.inner.is_canceled()
    }

    /// A new, identical call that can be executed even if this one was.
    #[must_use]
    pub fn clone_call(&self) -> Self {
        Self::new(self.inner.clone_call())
    }

    /// The transport timeout, when one is enforced.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout()
    }

    /// Unwrap back into the erased call.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn Call> {
        self.inner
    }
}

impl<T> std::fmt::Debug for TypedCall<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCall")
            .field("request", self.inner.request())
            .field("executed", &self.inner.is_executed())
            .field("canceled", &self.inner.is_canceled())
            .finish()
    }
}
