//! # Strategy abstraction and function-backed strategy implementation.
//!
//! A [`Strategy`] is one concrete method of attempting to obtain a resource.
//! Strategies are ranked by their position in the descriptor's ordered list:
//! cheapest / most-likely-already-satisfied first (probe for an existing
//! instance), then extraction from the host environment, then a remote
//! fallback fetch. The resolver tries them in order until one candidate
//! passes verification.
//!
//! [`StrategyFn`] wraps a closure `F: Fn() -> Fut`, producing a fresh future
//! per attempt, so repeated sweeps never observe stale state from an earlier
//! attempt.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StrategyError;
use crate::resources::resource::ResourceRef;

/// # One acquisition method for a resource.
///
/// An attempt either yields a candidate (which the resolver still passes
/// through the descriptor's verifier) or a [`StrategyError`] that advances
/// the chain. Attempts are bounded externally by the descriptor's per-attempt
/// timeout; implementations may block indefinitely on a passive signal.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use bootvisor::{Strategy, StrategyError, ResourceRef, StubResource};
///
/// struct ProbeExisting;
///
/// #[async_trait]
/// impl Strategy for ProbeExisting {
///     fn name(&self) -> &str {
///         "probe-existing"
///     }
///
///     async fn attempt(&self) -> Result<ResourceRef, StrategyError> {
///         // inspect the host environment...
///         Err(StrategyError::failed("nothing present yet"))
///     }
/// }
/// ```
#[async_trait]
pub trait Strategy: Send + Sync + 'static {
    /// Returns a stable, human-readable strategy name used as the `source`
    /// tag on successful acquisitions.
    fn name(&self) -> &str;

    /// Executes one acquisition attempt.
    async fn attempt(&self) -> Result<ResourceRef, StrategyError>;
}

/// Shared handle to a strategy.
pub type StrategyRef = Arc<dyn Strategy>;

/// Function-backed strategy implementation.
///
/// Wraps a closure that *creates* a new future per attempt.
///
/// ## Example
/// ```rust
/// use bootvisor::{StrategyFn, StrategyRef, StubResource};
///
/// let probe: StrategyRef = StrategyFn::arc("synthesize", || async {
///     Ok(StubResource::arc("library"))
/// });
/// assert_eq!(probe.name(), "synthesize");
/// ```
pub struct StrategyFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> StrategyFn<F> {
    /// Creates a new function-backed strategy.
    ///
    /// Prefer [`StrategyFn::arc`] when you immediately need a
    /// [`StrategyRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the strategy and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Strategy for StrategyFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ResourceRef, StrategyError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self) -> Result<ResourceRef, StrategyError> {
        (self.f)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::resource::StubResource;

    #[tokio::test]
    async fn strategy_fn_builds_fresh_future_per_attempt() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();
        let strategy: StrategyRef = StrategyFn::arc("counting", move || {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(StubResource::arc("x"))
            }
        });

        let _ = strategy.attempt().await;
        let _ = strategy.attempt().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
