//! In-memory transports and fixtures for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use caliper::{
    CallDescriptor, Caliper, Error, HeaderMap, Method, RawCall, RawCallback, RawResponse, Request,
    ResponseBody, Result, StatusCode, Transport,
};

/// Transport that completes every call inline, on the enqueueing thread.
#[derive(Clone)]
pub struct InlineTransport {
    inner: Arc<InlineInner>,
}

struct InlineInner {
    respond: Box<dyn Fn(&Request) -> Result<RawResponse> + Send + Sync>,
    calls: AtomicUsize,
}

impl InlineTransport {
    pub fn new(respond: impl Fn(&Request) -> Result<RawResponse> + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(InlineInner {
                respond: Box::new(respond),
                calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn with_status(status: u16, body: &'static str) -> Self {
        Self::new(move |_| Ok(raw_response(status, body)))
    }

    pub fn failing(message: &'static str) -> Self {
        Self::new(move |_| Err(Error::transport(message)))
    }

    /// Number of raw calls the transport was asked to create.
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

impl Transport for InlineTransport {
    fn new_call(&self, request: &Request) -> Box<dyn RawCall> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        Box::new(InlineCall {
            outcome: Mutex::new(Some((self.inner.respond)(request))),
            canceled: AtomicBool::new(false),
        })
    }
}

struct InlineCall {
    outcome: Mutex<Option<Result<RawResponse>>>,
    canceled: AtomicBool,
}

impl RawCall for InlineCall {
    fn enqueue(&self, on_complete: RawCallback) {
        let outcome = self.outcome.lock().expect("poisoned").take();
        match outcome {
            Some(outcome) => on_complete(outcome),
            None => on_complete(Err(Error::invalid_state("raw call already enqueued"))),
        }
    }

    fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(30))
    }
}

/// Transport whose calls complete only when the test fires them.
#[derive(Clone, Default)]
pub struct ManualTransport {
    inner: Arc<ManualInner>,
}

#[derive(Default)]
struct ManualInner {
    pending: Mutex<Vec<RawCallback>>,
    canceled: AtomicBool,
}

impl ManualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of enqueued calls waiting for completion.
    pub fn pending(&self) -> usize {
        self.inner.pending.lock().expect("poisoned").len()
    }

    /// Fire the oldest pending completion callback with `outcome`.
    pub fn complete_next(&self, outcome: Result<RawResponse>) {
        let callback = self.inner.pending.lock().expect("poisoned").remove(0);
        callback(outcome);
    }

    /// `true` once any of this transport's calls was canceled.
    pub fn was_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::SeqCst)
    }
}

impl Transport for ManualTransport {
    fn new_call(&self, _request: &Request) -> Box<dyn RawCall> {
        Box::new(ManualCall {
            inner: Arc::clone(&self.inner),
            canceled: AtomicBool::new(false),
        })
    }
}

struct ManualCall {
    inner: Arc<ManualInner>,
    canceled: AtomicBool,
}

impl RawCall for ManualCall {
    fn enqueue(&self, on_complete: RawCallback) {
        self.inner.pending.lock().expect("poisoned").push(on_complete);
    }

    fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        self.inner.canceled.store(true, Ordering::SeqCst);
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Executor that counts how many jobs it marshaled, running them inline.
#[derive(Clone, Default)]
pub struct CountingExecutor {
    jobs: Arc<AtomicUsize>,
}

impl CountingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> usize {
        self.jobs.load(Ordering::SeqCst)
    }
}

impl caliper::CallbackExecutor for CountingExecutor {
    fn execute(&self, job: caliper::Job) {
        self.jobs.fetch_add(1, Ordering::SeqCst);
        job();
    }
}

pub fn raw_response(status: u16, body: &str) -> RawResponse {
    RawResponse::new(
        StatusCode::from_u16(status).expect("status"),
        HeaderMap::new(),
        ResponseBody::buffered(None, Bytes::copy_from_slice(body.as_bytes())),
    )
}

pub fn descriptor(method: Method, template: &str) -> CallDescriptor {
    CallDescriptor::builder(method, template).build()
}

pub fn client(transport: impl Transport + 'static) -> Caliper {
    Caliper::builder()
        .transport(transport)
        .base_url("https://api.test/")
        .build()
        .expect("client")
}

pub fn get_request(client: &Caliper, template: &str) -> Request {
    client
        .assembler(&descriptor(Method::Get, template))
        .build()
        .expect("request")
}
