//! # Strategy chain resolver.
//!
//! Executes a [`ResourceDescriptor`]'s strategy chain until one candidate is
//! verified or the retry budget is exhausted, then falls back to the
//! descriptor's degraded stub. Callers never receive an error or a null:
//! only a genuine instance or a flagged substitute.
//!
//! ## Flow
//! For each sweep over the chain:
//! ```text
//! strategy[0] ── attempt (bounded by attempt_timeout) ── verify ── Satisfied
//!     │ error / timeout / rejected
//!     ▼  charge governor; budget left?
//! strategy[1] ── ...
//!     │ chain dry, budget left
//!     ▼
//! RetryScheduled ── sleep(backoff(sweep)) ── next sweep
//! ```
//! Budget exhausted at any point short-circuits to the degraded stub and the
//! unit is permanently degraded for the epoch.
//!
//! ## Rules
//! - Attempts run **sequentially** in rank order; never in parallel.
//! - A resolution runs to success, verification failure, or timeout; nothing
//!   cancels it mid-flight.
//! - Every failed attempt publishes one event and charges one unit of
//!   budget.
//! - An already-degraded resource returns its stub without any attempt
//!   being scheduled.

use std::sync::Arc;

use tokio::time;
use tracing::{error, warn};

use crate::core::Governor;
use crate::error::{OrchestratorError, StrategyError};
use crate::events::{Bus, Event, EventKind};
use crate::resources::descriptor::ResourceDescriptor;
use crate::resources::resource::{Acquired, ResourceRef};
use crate::resources::strategy::StrategyRef;

/// Outcome of one sweep over a descriptor's chain.
enum SweepEnd {
    /// A candidate was verified; resolution is complete.
    Satisfied(Acquired),
    /// The budget ran out mid-chain.
    Exhausted,
    /// Every strategy failed this sweep but budget remains.
    Dry,
}

/// Runs strategy chains and constructs degraded fallbacks.
pub struct Resolver {
    bus: Bus,
    governor: Arc<Governor>,
}

impl Resolver {
    /// Creates a resolver publishing to the given bus and charging the given
    /// governor.
    pub fn new(bus: Bus, governor: Arc<Governor>) -> Self {
        Self { bus, governor }
    }

    /// Resolves one resource, returning either a verified instance tagged
    /// with its originating strategy or the descriptor's degraded stub.
    pub async fn resolve(&self, desc: &ResourceDescriptor) -> Acquired {
        let key = desc.key().clone();

        if self.governor.is_degraded(&key) {
            return desc.make_stub();
        }
        if desc.strategies().is_empty() {
            warn!(resource = %key, "strategy chain is empty");
            return self.degrade(desc, "empty_chain");
        }

        let mut sweep: u32 = 0;
        loop {
            match self.sweep_chain(desc).await {
                SweepEnd::Satisfied(acquired) => {
                    self.bus.publish(
                        Event::new(EventKind::ResourceReady)
                            .with_resource(key.clone())
                            .with_strategy(acquired.source().to_string()),
                    );
                    return acquired;
                }
                SweepEnd::Exhausted => {
                    return self.degrade(
                        desc,
                        OrchestratorError::BudgetExhausted {
                            unit: format!("resource:{key}"),
                            attempts: self.governor.resource_attempts(&key),
                        }
                        .as_label(),
                    );
                }
                SweepEnd::Dry => {
                    let exhausted = OrchestratorError::StrategiesExhausted {
                        key: key.to_string(),
                    };
                    warn!(resource = %key, sweep, "{}", exhausted.as_message());

                    let delay = desc.retry().backoff.delay_for(sweep);
                    self.bus.publish(
                        Event::new(EventKind::RetryScheduled)
                            .with_resource(key.clone())
                            .with_delay(delay)
                            .with_attempt(self.governor.resource_attempts(&key)),
                    );
                    time::sleep(delay).await;
                    sweep = sweep.saturating_add(1);
                }
            }
        }
    }

    /// Tries every strategy once, in rank order.
    async fn sweep_chain(&self, desc: &ResourceDescriptor) -> SweepEnd {
        for strategy in desc.strategies() {
            match self.attempt_one(desc, strategy).await {
                Ok(candidate) => {
                    return SweepEnd::Satisfied(Acquired::genuine(
                        candidate,
                        strategy.name().to_string(),
                    ));
                }
                Err(err) => {
                    let charged = self.governor.charge_resource(desc.key());
                    self.publish_failure(desc, strategy, &err, charged);
                    if desc.retry().is_exhausted(charged) {
                        return SweepEnd::Exhausted;
                    }
                }
            }
        }
        SweepEnd::Dry
    }

    /// Executes one attempt: bounded by the descriptor's timeout, then passed
    /// through its verifier.
    async fn attempt_one(
        &self,
        desc: &ResourceDescriptor,
        strategy: &StrategyRef,
    ) -> Result<ResourceRef, StrategyError> {
        let budget = desc.attempt_timeout();
        let candidate = match time::timeout(budget, strategy.attempt()).await {
            Ok(result) => result?,
            Err(_elapsed) => return Err(StrategyError::Timeout { timeout: budget }),
        };
        if desc.verify(&candidate) {
            Ok(candidate)
        } else {
            Err(StrategyError::Rejected)
        }
    }

    fn publish_failure(
        &self,
        desc: &ResourceDescriptor,
        strategy: &StrategyRef,
        err: &StrategyError,
        charged: u32,
    ) {
        let kind = match err {
            StrategyError::Timeout { .. } => EventKind::StrategyTimedOut,
            StrategyError::Rejected => EventKind::StrategyRejected,
            StrategyError::Failed { .. } => EventKind::StrategyFailed,
        };
        let mut event = Event::new(kind)
            .with_resource(desc.key().clone())
            .with_strategy(strategy.name().to_string())
            .with_attempt(charged)
            .with_reason(err.as_message());
        if let StrategyError::Timeout { timeout } = err {
            event = event.with_timeout(*timeout);
        }
        self.bus.publish(event);
    }

    /// Marks the unit permanently degraded and substitutes the stub.
    fn degrade(&self, desc: &ResourceDescriptor, reason: &'static str) -> Acquired {
        let key = desc.key();
        let attempts = self.governor.resource_attempts(key);
        error!(
            resource = %key,
            attempts,
            reason,
            "retry budget exhausted; substituting degraded stub"
        );
        self.governor.degrade_resource(key);
        self.bus.publish(
            Event::new(EventKind::ResourceDegraded)
                .with_resource(key.clone())
                .with_reason(reason)
                .with_attempt(attempts),
        );
        desc.make_stub()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
    use crate::resources::resource::StubResource;
    use crate::resources::strategy::StrategyFn;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn resolver() -> (Resolver, Arc<Governor>) {
        let governor = Arc::new(Governor::new());
        (Resolver::new(Bus::new(64), governor.clone()), governor)
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: BackoffPolicy {
                first: Duration::from_millis(10),
                max: Duration::from_millis(10),
                factor: 1.0,
                jitter: JitterPolicy::None,
            },
        }
    }

    #[tokio::test]
    async fn second_strategy_wins_after_first_fails() {
        let (resolver, _) = resolver();
        let desc = ResourceDescriptor::new(
            "library",
            vec![
                StrategyFn::arc("probe-existing", || async {
                    Err(StrategyError::failed("nothing present"))
                }),
                StrategyFn::arc("bundle-extract", || async {
                    Ok(StubResource::arc("library"))
                }),
            ],
        )
        .with_retry(fast_retry(3));

        let acquired = resolver.resolve(&desc).await;
        assert_eq!(acquired.source(), "bundle-extract");
        assert!(!acquired.is_degraded());
    }

    #[tokio::test]
    async fn rejected_candidates_advance_the_chain() {
        let (resolver, governor) = resolver();
        let desc = ResourceDescriptor::new(
            "surface",
            vec![
                StrategyFn::arc("wrong-kind", || async { Ok(StubResource::arc("other")) }),
                StrategyFn::arc("right-kind", || async { Ok(StubResource::arc("surface")) }),
            ],
        )
        .with_verify(|candidate| candidate.kind() == "surface")
        .with_retry(fast_retry(3));

        let acquired = resolver.resolve(&desc).await;
        assert_eq!(acquired.source(), "right-kind");
        assert_eq!(governor.resource_attempts("surface"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_bounded_by_the_descriptor_timeout() {
        let (resolver, _) = resolver();
        let desc = ResourceDescriptor::new(
            "widget",
            vec![
                StrategyFn::arc("hangs-forever", || async {
                    std::future::pending::<Result<ResourceRef, StrategyError>>().await
                }),
                StrategyFn::arc("instant", || async { Ok(StubResource::arc("widget")) }),
            ],
        )
        .with_timeout(Duration::from_millis(50))
        .with_retry(fast_retry(3));

        let acquired = resolver.resolve(&desc).await;
        assert_eq!(acquired.source(), "instant");
    }

    #[tokio::test]
    async fn budget_of_one_degrades_on_first_failure() {
        let (resolver, governor) = resolver();
        let second_tried = Arc::new(AtomicU32::new(0));
        let counter = second_tried.clone();
        let desc = ResourceDescriptor::new(
            "library",
            vec![
                StrategyFn::arc("always-fails", || async {
                    Err(StrategyError::failed("boom"))
                }),
                StrategyFn::arc("never-reached", move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(StubResource::arc("library"))
                    }
                }),
            ],
        )
        .with_max_attempts(1);

        let acquired = resolver.resolve(&desc).await;
        assert!(acquired.is_degraded());
        assert_eq!(acquired.source(), crate::resources::resource::DEGRADED_SOURCE);
        assert_eq!(second_tried.load(Ordering::SeqCst), 0);
        assert!(governor.is_degraded("library"));
    }

    #[tokio::test]
    async fn degraded_resources_skip_all_attempts() {
        let (resolver, governor) = resolver();
        governor.degrade_resource("library");

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let desc = ResourceDescriptor::new(
            "library",
            vec![StrategyFn::arc("would-succeed", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(StubResource::arc("library"))
                }
            })],
        );

        let acquired = resolver.resolve(&desc).await;
        assert!(acquired.is_degraded());
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn chain_sweeps_again_while_budget_remains() {
        let (resolver, governor) = resolver();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let desc = ResourceDescriptor::new(
            "surface",
            vec![StrategyFn::arc("third-time-lucky", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(StrategyError::failed("not yet"))
                    } else {
                        Ok(StubResource::arc("surface"))
                    }
                }
            })],
        )
        .with_retry(fast_retry(5));

        let acquired = resolver.resolve(&desc).await;
        assert!(!acquired.is_degraded());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(governor.resource_attempts("surface"), 2);
    }

    #[tokio::test]
    async fn empty_chains_degrade_immediately() {
        let (resolver, governor) = resolver();
        let desc = ResourceDescriptor::new("widget", Vec::new());
        let acquired = resolver.resolve(&desc).await;
        assert!(acquired.is_degraded());
        assert!(governor.is_degraded("widget"));
    }
}
