//! Exponential backoff with jitter.

use rand::rngs::OsRng;
use rand::RngCore;
use std::time::Duration;
use tracing::warn;

/// Fraction of the capped base delay added as random jitter.
const JITTER_FRACTION: f64 = 0.1;

/// Exponential backoff policy.
///
/// `delay(attempt)` grows as `min_delay * factor^attempt`, capped at
/// `max_delay`, plus a uniformly random jitter in `[0, 10%]` of the capped
/// base. Jitter disperses retries across many clients so they do not hammer
/// a recovering server in lockstep.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay for attempt 0.
    pub min_delay: Duration,
    /// Upper bound on the base delay.
    pub max_delay: Duration,
    /// Growth factor per attempt. Must be >= 1.0; validated at
    /// configuration time.
    pub factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            factor: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Base delay for an attempt, capped at `max_delay`. Overflow to
    /// infinity for large attempts also caps at `max_delay`.
    fn capped_base_secs(&self, attempt: u32) -> f64 {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let base = self.min_delay.as_secs_f64() * self.factor.powi(exponent);
        let max = self.max_delay.as_secs_f64();
        if !base.is_finite() || base > max {
            max
        } else {
            base
        }
    }

    /// Delay before retrying `attempt` (0-indexed), jitter included.
    ///
    /// Never blocks; entropy comes from the OS randomness source with a
    /// clock-derived fallback.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.capped_base_secs(attempt);
        let jitter_max = base * JITTER_FRACTION;
        let jitter = if jitter_max > 0.0 {
            jitter_max * jitter_fraction(attempt)
        } else {
            0.0
        };
        Duration::from_secs_f64(base + jitter)
    }

    /// Deterministic upper bound on [`BackoffPolicy::delay`] for an
    /// attempt: the capped base plus the full jitter fraction. Used by the
    /// timeout budget calculator.
    #[must_use]
    pub fn delay_upper_bound(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.capped_base_secs(attempt) * (1.0 + JITTER_FRACTION))
    }
}

/// Uniform value in `[0, 1)` from the OS randomness source.
///
/// Falls back to a clock-derived value if the source fails: not
/// cryptographically strong, but still disperses synchronized retries.
fn jitter_fraction(attempt: u32) -> f64 {
    let mut bytes = [0u8; 8];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => {
            let v = u64::from_be_bytes(bytes);
            (v >> 11) as f64 / (1u64 << 53) as f64
        }
        Err(err) => {
            warn!(attempt, error = %err, "OS randomness unavailable, using clock-derived jitter");
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.subsec_nanos())
                .unwrap_or(0);
            f64::from(nanos) / f64::from(u32::MAX)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(min_ms: u64, max_ms: u64, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            min_delay: Duration::from_millis(min_ms),
            max_delay: Duration::from_millis(max_ms),
            factor,
        }
    }

    #[test]
    fn test_delay_within_bounds() {
        let p = policy(10, 1000, 2.0);
        for attempt in 0..6 {
            let base = Duration::from_millis(10 * (1 << attempt));
            let d = p.delay(attempt);
            assert!(d >= base, "attempt {attempt}: {d:?} < {base:?}");
            assert!(
                d <= base.mul_f64(1.0 + JITTER_FRACTION),
                "attempt {attempt}: {d:?} above jitter bound"
            );
        }
    }

    #[test]
    fn test_delay_caps_at_max() {
        let p = policy(10, 100, 2.0);
        let d = p.delay(10);
        assert!(d >= Duration::from_millis(100));
        assert!(d <= Duration::from_millis(110));
    }

    #[test]
    fn test_huge_attempt_clamps_to_max() {
        let p = policy(1000, 60_000, 10.0);
        // factor^attempt overflows f64 to infinity well before this
        let d = p.delay(u32::MAX);
        assert!(d >= Duration::from_secs(60));
        assert!(d <= Duration::from_secs(66));
    }

    #[test]
    fn test_factor_one_is_flat() {
        let p = policy(50, 1000, 1.0);
        for attempt in 0..10 {
            let d = p.delay(attempt);
            assert!(d >= Duration::from_millis(50));
            assert!(d <= Duration::from_millis(55));
        }
    }

    #[test]
    fn test_upper_bound_dominates_delay() {
        let p = policy(10, 1000, 2.0);
        for attempt in 0..12 {
            assert!(p.delay(attempt) <= p.delay_upper_bound(attempt));
        }
    }

    #[test]
    fn test_default_policy() {
        let p = BackoffPolicy::default();
        assert_eq!(p.min_delay, Duration::from_secs(1));
        assert_eq!(p.max_delay, Duration::from_secs(60));
        assert_eq!(p.factor, 2.0);
    }
}
