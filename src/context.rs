//! Per-call deadline and cancellation.
//!
//! A [`CallContext`] bounds a single request. The transport future is raced
//! against the deadline and the cancellation signal; whichever fires first
//! drops the transport call. Dropping the request future has the same effect.

use std::future::{Future, pending};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

use crate::transport::TransportError;

/// Deadline and cancellation signal carried by a single call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every [`CallContext`] derived from the one that created it.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl CallContext {
    /// A context with no deadline that is never cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Bound the call to `timeout` from now.
    ///
    /// A timeout too large to represent as an instant leaves the context
    /// unbounded.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self;
        };
        self.with_deadline(deadline)
    }

    /// Bound the call to `deadline`. An earlier existing deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    /// Attach a cancellation signal, replacing any existing one.
    #[must_use]
    pub fn with_cancel(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, CancelHandle(tx))
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the cancellation signal has already fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Drive `fut` until it completes, the deadline passes or the call is
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::DeadlineExceeded`] or
    /// [`TransportError::Cancelled`] when `fut` loses the race. `fut` is
    /// dropped in that case.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! uses % internally"
    )]
    pub(crate) async fn run<F: Future>(&self, fut: F) -> Result<F::Output, TransportError> {
        let deadline = self.deadline;
        let mut cancel = self.cancel.clone();
        let expired = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => pending::<()>().await,
            }
        };
        let cancelled = async move {
            if let Some(rx) = cancel.as_mut() {
                // A dropped handle can no longer cancel.
                let closed = rx.wait_for(|c| *c).await.is_err();
                if !closed {
                    return;
                }
            }
            pending::<()>().await;
        };
        tokio::select! {
            biased;
            () = cancelled => Err(TransportError::Cancelled),
            () = expired => Err(TransportError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}
