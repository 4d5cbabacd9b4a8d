//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that multiple
//! resources whose chains failed at the same instant do not sweep again in
//! lockstep.
//!
//! - [`JitterPolicy::None`] — no randomization, predictable delays
//! - [`JitterPolicy::Full`] — random delay in `[0, base]`
//! - [`JitterPolicy::Equal`] — `base/2 + random[0, base/2]`

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of retry delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact backoff delay.
    ///
    /// Use when only one resource retries (no herd risk) or when predictable
    /// timing is required (tests).
    #[default]
    None,

    /// Full jitter: random delay in `[0, base]`.
    ///
    /// Most aggressive spreading; can shrink the delay to zero.
    Full,

    /// Equal jitter: `base/2 + random[0, base/2]`.
    ///
    /// Preserves at least half of the base delay while still spreading load.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given base delay.
    pub fn apply(&self, base: Duration) -> Duration {
        let ms = base.as_millis() as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        match self {
            JitterPolicy::None => base,
            JitterPolicy::Full => {
                let mut rng = rand::rng();
                Duration::from_millis(rng.random_range(0..=ms))
            }
            JitterPolicy::Equal => {
                let half = ms / 2;
                let mut rng = rand::rng();
                let spread = if half == 0 {
                    0
                } else {
                    rng.random_range(0..=half)
                };
                Duration::from_millis(half + spread)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_identity() {
        let d = Duration::from_millis(400);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn zero_base_stays_zero() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn full_jitter_bounded_by_base() {
        let base = Duration::from_millis(200);
        for _ in 0..100 {
            assert!(JitterPolicy::Full.apply(base) <= base);
        }
    }

    #[test]
    fn equal_jitter_bounded_by_half_and_base() {
        let base = Duration::from_millis(200);
        for _ in 0..100 {
            let d = JitterPolicy::Equal.apply(base);
            assert!(d >= Duration::from_millis(100));
            assert!(d <= base);
        }
    }
}
