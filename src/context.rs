//! Caller-supplied cancellation scopes.
//!
//! A [`CallContext`] bundles a cancellation token with an optional deadline.
//! Operations check it at entry, at every retry attempt and while sleeping
//! between attempts, so cancellation is honored promptly and an
//! already-cancelled scope performs zero network activity.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a scope stopped being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// The token was cancelled explicitly.
    Cancelled,
    /// The scope's deadline expired.
    DeadlineExceeded,
}

impl std::fmt::Display for CancelCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Cancellation scope passed into every operation.
///
/// Cloning shares the underlying token: cancelling one clone cancels all.
#[derive(Debug, Clone)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

impl CallContext {
    /// A scope with no deadline and a fresh token.
    #[must_use]
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A scope that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// A scope driven by an existing token, with no deadline.
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Shrink the deadline to `deadline` if it is earlier than the current
    /// one. Never extends an existing deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Derive a scope bounded by `budget` from now. The caller's own
    /// deadline still applies if it is earlier.
    #[must_use]
    pub fn bounded(&self, budget: Duration) -> Self {
        self.clone().with_deadline(Instant::now() + budget)
    }

    /// Cancel the scope.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The scope's deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking validity check.
    pub fn check(&self) -> Result<(), CancelCause> {
        if self.token.is_cancelled() {
            return Err(CancelCause::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(CancelCause::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Run a future, racing it against cancellation and the deadline.
    ///
    /// The future is dropped as soon as the race resolves, so per-attempt
    /// resources are released on every exit path.
    pub async fn run_until<F: Future>(&self, fut: F) -> Result<F::Output, CancelCause> {
        tokio::select! {
            out = fut => Ok(out),
            _ = self.token.cancelled() => Err(CancelCause::Cancelled),
            _ = deadline_elapsed(self.deadline) => Err(CancelCause::DeadlineExceeded),
        }
    }

    /// Sleep for `duration`, returning early if the scope is cancelled or
    /// its deadline expires.
    pub async fn sleep(&self, duration: Duration) -> Result<(), CancelCause> {
        self.run_until(tokio::time::sleep(duration)).await
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}
