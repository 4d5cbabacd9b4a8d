//! # bootvisor
//!
//! **Bootvisor** is a phased readiness orchestrator for asynchronously
//! delivered resources.
//!
//! It guarantees that a set of opaque runtime dependencies — a third-party
//! library namespace, a rendering surface, a dependent application widget —
//! become available, in the correct order, exactly once, despite being
//! delivered by a non-deterministic loading pipeline (bundler chunk
//! execution, deferred insertion, remote fallback fetch) with no single
//! authoritative "loaded" signal.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//!  │ResourceDescriptor│  │ResourceDescriptor│  │ResourceDescriptor│
//!  │ ("library")      │  │ ("surface")      │  │ ("widget")       │
//!  └────────┬─────────┘  └────────┬─────────┘  └────────┬─────────┘
//!           ▼ register()          ▼                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator (one epoch)                                         │
//! │  - Registry (singleton entries, promise memoization)              │
//! │  - Resolver (strategy chains, degraded fallbacks)                 │
//! │  - Governor (bounded retries, sticky degradation)                 │
//! │  - PhaseMachine (ordered milestones, forced advance)              │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────────┬─────────────────────────┬───────────┘
//!        ▼                      ▼                         ▼
//!   acquire(key)        run(): phase driver        on_phase/on_complete
//!        │                      │                    (exactly once)
//!        │   ┌──────────────────┴──────────────────┐
//!        │   │ per phase: race gate vs deadline    │
//!        │   │   resolved  → advance (Done)        │
//!        │   │   deadline  → force_advance (Forced)│
//!        │   └─────────────────────────────────────┘
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                          fan-out listener ──► SubscriberSet
//!                                                │
//!                                      sub1.on_event() … subN.on_event()
//! ```
//!
//! ### Resolution lifecycle
//! ```text
//! acquire(key) ──► Registry ── Ready?    → cached instance
//!                     │        Creating? → join in-flight future
//!                     ▼        Empty     → spawn resolve()
//!                 Resolver
//!
//! loop (sweep over the chain) {
//!   ├─► strategy[i].attempt()  (bounded by attempt_timeout)
//!   │       ├─ Ok + verify()  ─► tag with strategy name ─► Ready
//!   │       └─ Err / timeout / rejected:
//!   │            ├─ charge governor (one unit of budget)
//!   │            └─ budget exhausted ─► PERMANENTLY_DEGRADED ─► stub
//!   └─► chain dry, budget left ─► publish RetryScheduled, sleep(backoff)
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------------|---------------------------------------------|
//! | **Acquisition**   | Ordered strategy chains, verification, degraded fallbacks.         | [`ResourceDescriptor`], [`Strategy`]        |
//! | **Singletons**    | One instance per key; concurrent callers join one creation.        | [`Orchestrator::acquire`]                   |
//! | **Milestones**    | Fixed phase sequence with deadlines and forced advance.            | [`PhaseSpec`], [`PhaseStatus`]              |
//! | **Circuit breaker**| Bounded retries; exhausted units degrade for the epoch.           | [`RetryPolicy`], [`Snapshot`]               |
//! | **Notification**  | Exactly-once transition callbacks plus legacy channel broadcasts.  | [`Orchestrator::on_phase`], [`Subscribe`]   |
//! | **Errors**        | Non-fatal taxonomy surfaced through events and the snapshot.       | [`StrategyError`], [`OrchestratorError`]    |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference
//!   only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bootvisor::{
//!     Config, Orchestrator, PhaseSpec, Resource, ResourceDescriptor, ResourceRef, StrategyFn,
//! };
//!
//! struct RenderLibrary;
//!
//! impl Resource for RenderLibrary {
//!     fn kind(&self) -> &str {
//!         "library"
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut cfg = Config::default();
//!     cfg.phases = vec![
//!         PhaseSpec::new("library-ready")
//!             .gated_by("library")
//!             .with_deadline(Duration::from_secs(1))
//!             .announce_on("libraryReady"),
//!         PhaseSpec::new("complete"),
//!     ];
//!
//!     let orchestrator = Orchestrator::new(cfg);
//!     orchestrator.register(ResourceDescriptor::new(
//!         "library",
//!         vec![StrategyFn::arc("probe-existing", || async {
//!             Ok(Arc::new(RenderLibrary) as ResourceRef)
//!         })],
//!     ));
//!
//!     orchestrator.on_complete(|payload| {
//!         assert!(!payload.forced);
//!     });
//!
//!     let snapshot = orchestrator.run().await;
//!     assert!(orchestrator.is_ready("library"));
//!     assert_eq!(&*snapshot.phase, "complete");
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod policies;
mod resources;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{
    Orchestrator, OrchestratorBuilder, PhasePayload, PhaseRecord, PhaseSpec, PhaseStatus, Snapshot,
};
pub use error::{OrchestratorError, StrategyError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use resources::{
    Acquired, ReadySignal, Resource, ResourceDescriptor, ResourceRef, SignalStrategy, Strategy,
    StrategyFn, StrategyRef, StubFn, StubResource, VerifyFn, DEGRADED_SOURCE,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
