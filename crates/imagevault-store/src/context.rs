//! Per-call cancellation and deadline.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::backend::BackendResult;
use crate::{Error, Result};

/// Cancellation signal and optional deadline applied to each native store
/// call made on behalf of one request.
///
/// Cancellation aborts the in-flight call and surfaces as an
/// infrastructure error; it never leaves partial results behind for the
/// caller to observe.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancellation: CancellationToken,
    timeout: Option<Duration>,
}

impl CallContext {
    /// Creates a context with no deadline that is never cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context cancelled together with `parent`.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            cancellation: parent.child_token(),
            timeout: None,
        }
    }

    /// Sets the deadline for each store call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the cancellation token.
    #[inline]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns the per-call deadline, if any.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns whether the context has been cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Drives one backend call under this context.
    ///
    /// The outer error reports cancellation or deadline expiry; the inner
    /// result is the backend's own outcome, left for the caller to classify.
    pub(crate) async fn run<T, F>(&self, operation: &'static str, call: F) -> Result<BackendResult<T>>
    where
        F: Future<Output = BackendResult<T>>,
    {
        if self.is_cancelled() {
            return Err(Error::cancelled(operation));
        }

        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| Error::timed_out(operation, limit)),
                None => Ok(call.await),
            }
        };

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(Error::cancelled(operation)),
            result = bounded => result,
        }
    }
}
