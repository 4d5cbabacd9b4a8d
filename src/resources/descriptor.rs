//! # Resource descriptor: how one resource is acquired.
//!
//! [`ResourceDescriptor`] bundles everything the resolver needs for one
//! resource key:
//! - the ordered strategy chain (rank order = list order);
//! - the verification predicate candidates must pass;
//! - the per-attempt timeout;
//! - the retry budget and sweep backoff;
//! - the degraded-stub factory used when everything fails.
//!
//! Timeout and budget are required configuration inputs; there is no
//! authoritative hardcoded value. Supply them explicitly with the `with_*`
//! methods or inherit the documented defaults from a
//! [`Config`](crate::Config) via [`ResourceDescriptor::with_defaults`].
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use bootvisor::{ResourceDescriptor, RetryPolicy, StrategyFn, StubResource};
//!
//! let descriptor = ResourceDescriptor::new(
//!     "library",
//!     vec![StrategyFn::arc("synthesize", || async {
//!         Ok(StubResource::arc("library"))
//!     })],
//! )
//! .with_timeout(Duration::from_millis(500))
//! .with_retry(RetryPolicy::with_budget(2))
//! .with_verify(|candidate| candidate.kind() == "library");
//!
//! assert_eq!(&**descriptor.key(), "library");
//! assert_eq!(descriptor.retry().max_attempts, 2);
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::policies::RetryPolicy;
use crate::resources::resource::{Acquired, ResourceRef, StubResource};
use crate::resources::strategy::StrategyRef;

/// Verification predicate applied to every candidate before acceptance.
pub type VerifyFn = Arc<dyn Fn(&ResourceRef) -> bool + Send + Sync>;

/// Factory for the minimal-capability substitute.
pub type StubFn = Arc<dyn Fn() -> ResourceRef + Send + Sync>;

/// Acquisition plan for one resource key.
///
/// Cheap to clone; strategies, verifier, and stub factory are shared.
#[derive(Clone)]
pub struct ResourceDescriptor {
    key: Arc<str>,
    strategies: Vec<StrategyRef>,
    verify: VerifyFn,
    stub: StubFn,
    attempt_timeout: Duration,
    retry: RetryPolicy,
}

impl ResourceDescriptor {
    /// Creates a descriptor with the given strategy chain and defaults:
    /// accept-all verification, a [`StubResource`] fallback keyed like the
    /// descriptor, a 2 s attempt timeout, and the default retry policy.
    pub fn new(key: impl Into<Arc<str>>, strategies: Vec<StrategyRef>) -> Self {
        let key = key.into();
        let stub_kind = key.clone();
        Self {
            key,
            strategies,
            verify: Arc::new(|_| true),
            stub: Arc::new(move || StubResource::arc(stub_kind.clone())),
            attempt_timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a descriptor inheriting attempt timeout and retry policy from
    /// the global configuration.
    pub fn with_defaults(
        key: impl Into<Arc<str>>,
        strategies: Vec<StrategyRef>,
        cfg: &Config,
    ) -> Self {
        Self::new(key, strategies)
            .with_timeout(cfg.attempt_timeout)
            .with_retry(cfg.retry)
    }

    /// Returns a new descriptor with one more strategy at the end of the
    /// chain (lowest rank).
    pub fn append_strategy(mut self, strategy: StrategyRef) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Returns a new descriptor with the given verification predicate.
    pub fn with_verify(
        mut self,
        verify: impl Fn(&ResourceRef) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.verify = Arc::new(verify);
        self
    }

    /// Returns a new descriptor with the given degraded-stub factory.
    pub fn with_stub(mut self, stub: impl Fn() -> ResourceRef + Send + Sync + 'static) -> Self {
        self.stub = Arc::new(stub);
        self
    }

    /// Returns a new descriptor with the given per-attempt timeout.
    pub fn with_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Returns a new descriptor with the given retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Convenience: returns a new descriptor with the given failed-attempt
    /// budget, keeping the current backoff.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts.max(1);
        self
    }

    /// The resource key.
    pub fn key(&self) -> &Arc<str> {
        &self.key
    }

    /// The ordered strategy chain.
    pub fn strategies(&self) -> &[StrategyRef] {
        &self.strategies
    }

    /// The per-attempt timeout.
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// The retry policy.
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Applies the verification predicate to a candidate.
    pub fn verify(&self, candidate: &ResourceRef) -> bool {
        (self.verify)(candidate)
    }

    /// Builds the degraded substitute for this resource.
    pub fn make_stub(&self) -> Acquired {
        Acquired::degraded((self.stub)())
    }
}

impl std::fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("key", &self.key)
            .field("strategies", &self.strategies.len())
            .field("attempt_timeout", &self.attempt_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}
