//! # Backoff policy for spacing strategy-chain sweeps.
//!
//! [`BackoffPolicy`] controls how the delay between consecutive sweeps of a
//! resource's strategy chain grows while retry budget remains. It is
//! parameterized by:
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::max`] the maximum delay cap;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor.
//!
//! The delay for sweep `n` (0-indexed) is `first × factor^n`, clamped to
//! `max`, then jitter is applied. The base is derived purely from the sweep
//! number; jitter output never feeds back into subsequent calculations, so
//! delays cannot drift downward over time.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use bootvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(250),
//!     max: Duration::from_secs(5),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.delay_for(0), Duration::from_millis(250));
//! assert_eq!(backoff.delay_for(1), Duration::from_millis(500));
//! // 250ms × 2^9 = 128s → capped at 5s
//! assert_eq!(backoff.delay_for(9), Duration::from_secs(5));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delay policy between strategy-chain sweeps.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Initial delay before the second sweep.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied to the clamped base delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with `first = 250ms`, `max = 5s`, `factor = 2.0`,
    /// no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(250),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given sweep number (0-indexed).
    ///
    /// The base is `first × factor^sweep` clamped to [`BackoffPolicy::max`];
    /// non-finite or negative intermediate values clamp to `max` as well.
    pub fn delay_for(&self, sweep: u32) -> Duration {
        let max_ms = self.max.as_millis() as f64;
        let exp = sweep.min(i32::MAX as u32) as i32;
        let raw_ms = self.first.as_millis() as f64 * self.factor.powi(exp);

        let base = if raw_ms.is_finite() && (0.0..=max_ms).contains(&raw_ms) {
            Duration::from_millis(raw_ms as u64)
        } else {
            self.max
        };

        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(first_ms: u64, max_ms: u64, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn sweep_zero_returns_first() {
        assert_eq!(plain(100, 30_000, 2.0).delay_for(0), Duration::from_millis(100));
    }

    #[test]
    fn exponential_growth_without_jitter() {
        let policy = plain(100, 30_000, 2.0);
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn constant_factor_holds_delay() {
        let policy = plain(500, 30_000, 1.0);
        for sweep in 0..8 {
            assert_eq!(policy.delay_for(sweep), Duration::from_millis(500));
        }
    }

    #[test]
    fn clamps_to_max() {
        assert_eq!(plain(100, 1_000, 2.0).delay_for(10), Duration::from_secs(1));
    }

    #[test]
    fn first_exceeding_max_is_clamped() {
        assert_eq!(plain(10_000, 5_000, 2.0).delay_for(0), Duration::from_secs(5));
    }

    #[test]
    fn huge_sweep_numbers_saturate_to_max() {
        assert_eq!(plain(100, 60_000, 2.0).delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn full_jitter_never_exceeds_base() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(1_000),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::Full,
        };
        for sweep in 0..50 {
            assert!(policy.delay_for(sweep) <= Duration::from_millis(1_000));
        }
    }

    #[test]
    fn equal_jitter_stays_in_upper_half() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(1_000),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::Equal,
        };
        for sweep in 0..50 {
            let d = policy.delay_for(sweep);
            assert!(d >= Duration::from_millis(500));
            assert!(d <= Duration::from_millis(1_000));
        }
    }
}
