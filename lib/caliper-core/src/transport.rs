//! The transport seam: opaque cancellable calls.
//!
//! The adaptation core never talks to the network itself. It hands a
//! finalized [`Request`] to a [`Transport`], receives an opaque cancellable
//! [`RawCall`], and observes exactly one completion through the callback
//! given to [`RawCall::enqueue`].

use std::time::Duration;

use crate::{RawResponse, Request, Result};

/// Completion callback handed to [`RawCall::enqueue`].
///
/// Invoked exactly once, from whatever thread the transport completes on,
/// with the raw response or the transport failure.
pub type RawCallback = Box<dyn FnOnce(Result<RawResponse>) + Send>;

/// One cancellable network operation owned by the transport.
///
/// Implementations must deliver at most one completion, keep
/// [`RawCall::cancel`] idempotent, and report a failure (rather than a
/// stale success) for a call completed after cancellation whenever they
/// can observe the race.
pub trait RawCall: Send + Sync {
    /// Start the operation; `on_complete` observes its single outcome.
    fn enqueue(&self, on_complete: RawCallback);

    /// Request cancellation of the operation.
    fn cancel(&self);

    /// `true` once the call was canceled, by the caller or the transport.
    fn is_canceled(&self) -> bool;

    /// The timeout spanning the entire operation, when the transport
    /// enforces one.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// Factory for transport calls.
///
/// Every invocation yields an independent operation; re-executing a logical
/// call means asking the transport for a fresh [`RawCall`].
pub trait Transport: Send + Sync {
    /// Create a new call that will send `request` when enqueued.
    fn new_call(&self, request: &Request) -> Box<dyn RawCall>;
}
