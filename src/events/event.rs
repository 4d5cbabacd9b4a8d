//! # Runtime events emitted by the orchestrator, resolver, and governor.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Phase events**: readiness milestones (started, advanced, forced, failed)
//! - **Resource events**: acquisition flow (strategy failures, retries, ready,
//!   degraded, offered, reset)
//! - **Terminal events**: the run reaching its final milestone
//! - **Subscriber events**: fan-out plumbing (overflow, panic)
//!
//! The [`Event`] struct carries optional metadata such as the phase name,
//! resource key, originating strategy, compatibility channel, attempt count,
//! and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use bootvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StrategyFailed)
//!     .with_resource("library")
//!     .with_strategy("cdn-fetch")
//!     .with_reason("connection refused")
//!     .with_attempt(2);
//!
//! assert_eq!(ev.kind, EventKind::StrategyFailed);
//! assert_eq!(ev.resource.as_deref(), Some("library"));
//! assert_eq!(ev.strategy.as_deref(), Some("cdn-fetch"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Phase events ===
    /// A phase became the active milestone and its gate is being evaluated.
    ///
    /// Sets: `phase`, optionally `resource` (the gating key).
    PhaseStarted,

    /// A phase settled as Done: its gate was satisfied in order.
    ///
    /// Sets: `phase`, optionally `resource` / `strategy` (what satisfied it).
    PhaseAdvanced,

    /// A phase deadline elapsed and the machine promoted it with reduced
    /// guarantees.
    ///
    /// Sets: `phase`, `forced = true`, `reason`.
    PhaseForced,

    /// A phase could not be evaluated at all (no descriptor for its gate).
    ///
    /// Sets: `phase`, `reason`.
    PhaseFailed,

    /// Compatibility broadcast of a settled transition under a legacy channel
    /// name. Emitted once per configured channel **in addition to** the
    /// canonical `PhaseAdvanced`/`PhaseForced` event; bookkeeping counts the
    /// transition once.
    ///
    /// Sets: `phase`, `channel`, `forced` as recorded.
    PhaseAnnounced,

    /// The terminal phase settled; downstream-collaborator initialization has
    /// been triggered (exactly once per epoch).
    ///
    /// Sets: `forced` if any phase in the sequence was promoted.
    RunCompleted,

    // === Resource events ===
    /// One strategy attempt failed with an error.
    ///
    /// Sets: `resource`, `strategy`, `reason`, `attempt`.
    StrategyFailed,

    /// One strategy attempt exceeded its per-attempt budget.
    ///
    /// Sets: `resource`, `strategy`, `timeout_ms`, `attempt`.
    StrategyTimedOut,

    /// A candidate was produced but rejected by the descriptor's verifier.
    ///
    /// Sets: `resource`, `strategy`, `attempt`.
    StrategyRejected,

    /// The whole chain failed this round and another sweep is scheduled.
    ///
    /// Sets: `resource`, `delay_ms`, `attempt` (failed attempts so far).
    RetryScheduled,

    /// A resource resolved and was cached; identity is now immutable for the
    /// epoch.
    ///
    /// Sets: `resource`, `strategy` (originating strategy or `degraded-stub`).
    ResourceReady,

    /// All genuine acquisition paths were exhausted; a minimal-capability
    /// stub was substituted and the unit is permanently degraded.
    ///
    /// Sets: `resource`, `reason`, `attempt`.
    ResourceDegraded,

    /// An externally created instance was handed to the orchestrator through
    /// the passive delivery path.
    ///
    /// Sets: `resource`, `reason` ("accepted" / why it was ignored).
    ResourceOffered,

    /// An entry was torn down via explicit recovery.
    ///
    /// Sets: `resource`.
    ResourceReset,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `channel` (subscriber name), `reason` (panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `channel` (subscriber name), `reason` ("full" / "closed").
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Phase name, if applicable.
    pub phase: Option<Arc<str>>,
    /// Resource key, if applicable.
    pub resource: Option<Arc<str>>,
    /// Strategy name, if applicable.
    pub strategy: Option<Arc<str>>,
    /// Compatibility channel or subscriber name, if applicable.
    pub channel: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Attempt count charged so far (starting from 1).
    pub attempt: Option<u32>,
    /// Attempt timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Delay before the next chain sweep in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Reduced-guarantee marker carried by forced transitions.
    pub forced: bool,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            phase: None,
            resource: None,
            strategy: None,
            channel: None,
            reason: None,
            attempt: None,
            timeout_ms: None,
            delay_ms: None,
            forced: false,
        }
    }

    /// Attaches a phase name.
    #[inline]
    pub fn with_phase(mut self, phase: impl Into<Arc<str>>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Attaches a resource key.
    #[inline]
    pub fn with_resource(mut self, resource: impl Into<Arc<str>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attaches a strategy name.
    #[inline]
    pub fn with_strategy(mut self, strategy: impl Into<Arc<str>>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Attaches a compatibility channel or subscriber name.
    #[inline]
    pub fn with_channel(mut self, channel: impl Into<Arc<str>>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches an attempt timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Marks the event as carrying the reduced-guarantee flag.
    #[inline]
    pub fn with_forced(mut self, forced: bool) -> Self {
        self.forced = forced;
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_channel(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_channel(subscriber)
            .with_reason(info)
    }

    /// True for fan-out plumbing events that must not recurse through the
    /// overflow reporting path.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_strictly_increasing() {
        let a = Event::new(EventKind::PhaseStarted);
        let b = Event::new(EventKind::PhaseStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_set_fields() {
        let ev = Event::new(EventKind::RetryScheduled)
            .with_resource("surface")
            .with_delay(Duration::from_millis(250))
            .with_attempt(1);
        assert_eq!(ev.resource.as_deref(), Some("surface"));
        assert_eq!(ev.delay_ms, Some(250));
        assert_eq!(ev.attempt, Some(1));
        assert!(!ev.forced);
    }

    #[test]
    fn oversized_durations_saturate() {
        let ev = Event::new(EventKind::StrategyTimedOut)
            .with_timeout(Duration::from_secs(u64::MAX / 1000));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
