//! # Retry policy: the bounded budget behind the circuit breaker.
//!
//! [`RetryPolicy`] bundles the total failed-attempt budget for a resource
//! with the backoff spacing between strategy-chain sweeps. The governor
//! charges one unit of budget for every failed, timed-out, or rejected
//! strategy attempt; when the counter reaches [`RetryPolicy::max_attempts`]
//! the unit is permanently degraded for the epoch and no further acquisition
//! is scheduled.
//!
//! ## Choosing a budget
//! ```text
//! max_attempts = 1             → first failure trips the breaker
//! max_attempts = chain length  → exactly one full sweep, no second round
//! max_attempts > chain length  → additional sweeps, spaced by backoff
//! ```

use crate::policies::BackoffPolicy;

/// Bounded retry budget plus sweep spacing for one resource.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total failed strategy attempts allowed before the unit is marked
    /// permanently degraded. Must be at least 1.
    pub max_attempts: u32,
    /// Delay policy between consecutive chain sweeps.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    /// Returns a budget of 3 attempts with the default backoff.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given budget and default backoff.
    pub fn with_budget(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: BackoffPolicy::default(),
        }
    }

    /// Returns a new policy with the given backoff.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// True when `charged` failed attempts exhaust this budget.
    #[inline]
    pub fn is_exhausted(&self, charged: u32) -> bool {
        charged >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_of_one_trips_on_first_failure() {
        let policy = RetryPolicy::with_budget(1);
        assert!(!policy.is_exhausted(0));
        assert!(policy.is_exhausted(1));
    }

    #[test]
    fn zero_budget_is_clamped_to_one() {
        assert_eq!(RetryPolicy::with_budget(0).max_attempts, 1);
    }

    #[test]
    fn default_budget_allows_three_failures() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
    }
}
