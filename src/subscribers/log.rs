//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [phase-started] phase=library-ready
//! [strategy-failed] resource=library strategy=cdn-fetch err="connection refused" attempt=1
//! [retry-scheduled] resource=library delay_ms=250 attempts=2
//! [resource-ready] resource=library source=bundle-extract
//! [resource-degraded] resource=widget reason=budget_exhausted attempts=3
//! [phase-forced] phase=widget-ready
//! [run-completed] forced=true
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::subscriber::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use — implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::PhaseStarted => {
                println!("[phase-started] phase={:?}", e.phase);
            }
            EventKind::PhaseAdvanced => {
                println!("[phase-advanced] phase={:?} source={:?}", e.phase, e.strategy);
            }
            EventKind::PhaseForced => {
                println!("[phase-forced] phase={:?} reason={:?}", e.phase, e.reason);
            }
            EventKind::PhaseFailed => {
                println!("[phase-failed] phase={:?} reason={:?}", e.phase, e.reason);
            }
            EventKind::PhaseAnnounced => {
                println!("[phase-announced] phase={:?} channel={:?}", e.phase, e.channel);
            }
            EventKind::RunCompleted => {
                println!("[run-completed] forced={}", e.forced);
            }
            EventKind::StrategyFailed => {
                println!(
                    "[strategy-failed] resource={:?} strategy={:?} err={:?} attempt={:?}",
                    e.resource, e.strategy, e.reason, e.attempt
                );
            }
            EventKind::StrategyTimedOut => {
                println!(
                    "[strategy-timeout] resource={:?} strategy={:?} timeout_ms={:?}",
                    e.resource, e.strategy, e.timeout_ms
                );
            }
            EventKind::StrategyRejected => {
                println!(
                    "[strategy-rejected] resource={:?} strategy={:?}",
                    e.resource, e.strategy
                );
            }
            EventKind::RetryScheduled => {
                println!(
                    "[retry-scheduled] resource={:?} delay_ms={:?} attempts={:?}",
                    e.resource, e.delay_ms, e.attempt
                );
            }
            EventKind::ResourceReady => {
                println!(
                    "[resource-ready] resource={:?} source={:?}",
                    e.resource, e.strategy
                );
            }
            EventKind::ResourceDegraded => {
                println!(
                    "[resource-degraded] resource={:?} reason={:?} attempts={:?}",
                    e.resource, e.reason, e.attempt
                );
            }
            EventKind::ResourceOffered => {
                println!(
                    "[resource-offered] resource={:?} reason={:?}",
                    e.resource, e.reason
                );
            }
            EventKind::ResourceReset => {
                println!("[resource-reset] resource={:?}", e.resource);
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={:?} info={:?}",
                    e.channel, e.reason
                );
            }
            EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-overflow] subscriber={:?} reason={:?}",
                    e.channel, e.reason
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
