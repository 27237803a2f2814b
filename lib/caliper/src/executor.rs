//! Callback executors: where completion callbacks run.

use tokio::runtime::Handle;

/// A deferred completion callback.
pub type Job = Box<dyn FnOnce() + Send>;

/// Executes completion callbacks on a thread of its choosing.
///
/// The transport completes calls on its own threads; an executor lets
/// consumers receive callbacks somewhere friendlier (an event loop, a
/// runtime). Implementations must run every job they accept.
pub trait CallbackExecutor: Send + Sync {
    /// Run `job`, possibly on another thread.
    fn execute(&self, job: Job);
}

/// Marshals callbacks onto a Tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioCallbackExecutor {
    handle: Handle,
}

impl TokioCallbackExecutor {
    /// Executor for the current Tokio runtime, if one is running.
    #[must_use]
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(|handle| Self { handle })
    }

    /// Executor for an explicit runtime handle.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl CallbackExecutor for TokioCallbackExecutor {
    fn execute(&self, job: Job) {
        let _join = self.handle.spawn(async move { job() });
    }
}

/// Runs callbacks inline on the completing thread.
///
/// Equivalent to having no executor; useful in tests and for consumers that
/// want transport-thread delivery explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl CallbackExecutor for InlineExecutor {
    fn execute(&self, job: Job) {
        job();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn inline_executor_runs_jobs_immediately() {
        let counter = std::sync::Arc::new(AtomicUsize::new(0));
        let seen = std::sync::Arc::clone(&counter);
        InlineExecutor.execute(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn try_current_requires_a_runtime() {
        assert!(TokioCallbackExecutor::try_current().is_none());
    }

    #[tokio::test]
    async fn try_current_inside_a_runtime() {
        let executor = TokioCallbackExecutor::try_current().expect("runtime");
        let (tx, rx) = tokio::sync::oneshot::channel();
        executor.execute(Box::new(move || {
            let _ = tx.send(());
        }));
        rx.await.expect("job ran");
    }
}
