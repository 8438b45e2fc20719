//! Timeout budget arithmetic.
//!
//! Two budgets apply to every operation. The per-attempt deadline bounds a
//! single transport call and is derived fresh for every attempt from a
//! three-level priority. The total-operation budget bounds the whole retry
//! loop, so an unbounded number of slow attempts can never accumulate past
//! a precomputed wall-clock limit.

use crate::backoff::BackoffPolicy;
use crate::context::CallContext;
use crate::request::CallOptions;
use std::time::Duration;
use tracing::{debug, warn};

/// Explicit overrides outside this window are honored but logged.
const SHORT_TIMEOUT_WARNING: Duration = Duration::from_secs(1);
const LONG_TIMEOUT_WARNING: Duration = Duration::from_secs(300);

/// How a single attempt is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptDeadline {
    /// Run the attempt under its own timer of this duration.
    Bounded(Duration),
    /// The caller's scope already carries a deadline; no extra timer.
    Inherited,
}

/// Derive the deadline for one attempt.
///
/// Priority: explicit per-call override, then a deadline already present on
/// the caller's scope, then the client default. Computed fresh for every
/// attempt so a caller-level deadline is still respected after retries
/// consume time.
pub(crate) fn attempt_deadline(
    options: &CallOptions,
    ctx: &CallContext,
    default: Duration,
) -> AttemptDeadline {
    if let Some(timeout) = options.timeout {
        if timeout < SHORT_TIMEOUT_WARNING {
            warn!(?timeout, "request timeout is very short, operation may not complete");
        } else if timeout > LONG_TIMEOUT_WARNING {
            warn!(?timeout, "request timeout is very long, error detection may be delayed");
        }
        debug!(?timeout, source = "request", "applying per-attempt timeout");
        return AttemptDeadline::Bounded(timeout);
    }

    if ctx.deadline().is_some() {
        debug!(source = "context", "using existing scope deadline for attempt");
        return AttemptDeadline::Inherited;
    }

    debug!(timeout = ?default, source = "client", "applying default per-attempt timeout");
    AttemptDeadline::Bounded(default)
}

/// Upper bound on the wall-clock time of one logical operation: the
/// per-operation timeout plus the actual exponential backoff sequence for
/// every possible attempt, not a pessimistic all-maximum assumption.
///
/// Uses the deterministic per-attempt upper bound so the budget holds for
/// any jitter outcome.
pub(crate) fn total_budget(
    operation_timeout: Duration,
    max_retries: u32,
    backoff: &BackoffPolicy,
) -> Duration {
    let mut total = operation_timeout;
    for attempt in 0..=max_retries {
        total += backoff.delay_upper_bound(attempt);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let options = CallOptions::default().with_timeout(Duration::from_secs(5));
        let ctx = CallContext::with_timeout(Duration::from_secs(2));
        let deadline = attempt_deadline(&options, &ctx, Duration::from_secs(15));
        assert_eq!(deadline, AttemptDeadline::Bounded(Duration::from_secs(5)));
    }

    #[test]
    fn test_scope_deadline_wins_over_default() {
        let options = CallOptions::default();
        let ctx = CallContext::with_timeout(Duration::from_secs(2));
        let deadline = attempt_deadline(&options, &ctx, Duration::from_secs(15));
        assert_eq!(deadline, AttemptDeadline::Inherited);
    }

    #[test]
    fn test_default_applies_last() {
        let options = CallOptions::default();
        let ctx = CallContext::background();
        let deadline = attempt_deadline(&options, &ctx, Duration::from_secs(15));
        assert_eq!(deadline, AttemptDeadline::Bounded(Duration::from_secs(15)));
    }

    #[test]
    fn test_extreme_overrides_honored() {
        // Warned about, never rejected.
        let ctx = CallContext::background();
        let short = CallOptions::default().with_timeout(Duration::from_millis(100));
        assert_eq!(
            attempt_deadline(&short, &ctx, Duration::from_secs(15)),
            AttemptDeadline::Bounded(Duration::from_millis(100))
        );
        let long = CallOptions::default().with_timeout(Duration::from_secs(600));
        assert_eq!(
            attempt_deadline(&long, &ctx, Duration::from_secs(15)),
            AttemptDeadline::Bounded(Duration::from_secs(600))
        );
    }

    #[test]
    fn test_total_budget_sums_actual_sequence() {
        let backoff = BackoffPolicy {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            factor: 2.0,
        };
        // 15s + 1.1 * (1s + 2s + 4s + 8s) = 31.5s, allowing for float
        // rounding in the per-term nanosecond conversion.
        let budget = total_budget(Duration::from_secs(15), 3, &backoff);
        let expected = Duration::from_secs_f64(31.5);
        let diff = if budget > expected {
            budget - expected
        } else {
            expected - budget
        };
        assert!(diff < Duration::from_micros(1), "budget {budget:?}");
    }

    #[test]
    fn test_total_budget_far_below_worst_case() {
        let backoff = BackoffPolicy::default();
        let budget = total_budget(Duration::from_secs(15), 3, &backoff);
        // The all-maximum assumption would be 15s + 4 * 60s.
        assert!(budget < Duration::from_secs(255));
    }
}
