//! # Demo: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for acquisition metrics.
//! - Wire the subscriber in via [`Orchestrator::builder`].
//!
//! ## Flow
//! ```text
//! Orchestrator::run()
//!   ├─► Bus.publish(PhaseStarted / StrategyFailed / RetryScheduled / ...)
//!   └─► fan-out listener
//!         └─► SubscriberSet.emit() ──► ConsoleSubscriber.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bootvisor::{
    BackoffPolicy, Config, Event, EventKind, JitterPolicy, Orchestrator, PhaseSpec,
    ResourceDescriptor, ResourceRef, RetryPolicy, StrategyError, StrategyFn, StubResource,
    Subscribe,
};

/// A simple console subscriber that prints selected events.
/// In real life, you could export metrics, ship logs, or trigger alerts.
struct ConsoleSubscriber;

#[async_trait::async_trait]
impl Subscribe for ConsoleSubscriber {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::PhaseStarted => {
                println!(
                    "[sub] phase active: {}",
                    ev.phase.as_deref().unwrap_or("<unknown>")
                );
            }
            EventKind::PhaseAdvanced | EventKind::PhaseForced => {
                println!(
                    "[sub] phase settled: {} forced={}",
                    ev.phase.as_deref().unwrap_or("<unknown>"),
                    ev.forced
                );
            }
            EventKind::StrategyFailed | EventKind::StrategyTimedOut | EventKind::StrategyRejected => {
                println!(
                    "[sub] attempt failed: resource={} strategy={} attempt={}",
                    ev.resource.as_deref().unwrap_or("<unknown>"),
                    ev.strategy.as_deref().unwrap_or("<unknown>"),
                    ev.attempt.unwrap_or(0)
                );
            }
            EventKind::RetryScheduled => {
                println!(
                    "[sub] retry: resource={} delay_ms={}",
                    ev.resource.as_deref().unwrap_or("<unknown>"),
                    ev.delay_ms.unwrap_or(0)
                );
            }
            EventKind::ResourceReady => {
                println!(
                    "[sub] ready: resource={} source={}",
                    ev.resource.as_deref().unwrap_or("<unknown>"),
                    ev.strategy.as_deref().unwrap_or("<unknown>")
                );
            }
            EventKind::ResourceDegraded => {
                println!(
                    "[sub] degraded: resource={} reason={}",
                    ev.resource.as_deref().unwrap_or("<unknown>"),
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::RunCompleted => {
                println!("[sub] run completed, forced={}", ev.forced);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }

    fn queue_capacity(&self) -> usize {
        1024
    }
}

static FLAKY_CALLS: AtomicU32 = AtomicU32::new(0);

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut cfg = Config::default();
    cfg.phases = vec![
        PhaseSpec::new("library-ready")
            .gated_by("library")
            .with_deadline(Duration::from_secs(5)),
        PhaseSpec::new("widget-ready")
            .gated_by("widget")
            .with_deadline(Duration::from_secs(1)),
        PhaseSpec::new("complete"),
    ];

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleSubscriber)];
    let orchestrator = Orchestrator::builder(cfg).with_subscribers(subs).build();

    // Flaky acquisition: fails twice, succeeds on the third sweep.
    orchestrator.register(
        ResourceDescriptor::new(
            "library",
            vec![StrategyFn::arc("flaky-probe", || async {
                let attempt = FLAKY_CALLS.fetch_add(1, Ordering::Relaxed) + 1;
                if attempt <= 2 {
                    Err(StrategyError::failed(format!("boom #{attempt}")))
                } else {
                    Ok(StubResource::arc("library"))
                }
            })],
        )
        .with_timeout(Duration::from_millis(500))
        .with_retry(RetryPolicy::with_budget(6).with_backoff(BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(2),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        })),
    );

    // Hopeless acquisition: exhausts its budget and degrades.
    orchestrator.register(
        ResourceDescriptor::new(
            "widget",
            vec![StrategyFn::arc("never-works", || async {
                Err::<ResourceRef, _>(StrategyError::failed("unavailable"))
            })],
        )
        .with_timeout(Duration::from_millis(300))
        .with_max_attempts(2),
    );

    let snapshot = orchestrator.run().await;

    // let the fan-out worker drain before the process exits
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!(
        "\n[main] phase={} degraded={:?}",
        snapshot.phase, snapshot.degraded_resources
    );
}
