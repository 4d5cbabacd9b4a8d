//! # Phase state machine: ordered global readiness milestones.
//!
//! The machine advances a fixed, ordered sequence of phases. Each phase may
//! gate on one resource key; settling a phase publishes the canonical
//! transition event, re-announces it under every configured legacy channel,
//! fires one-shot phase subscriptions, and — on the terminal phase —
//! triggers downstream-collaborator initialization exactly once.
//!
//! ## State diagram
//! ```text
//! Pending(phase₀) ──resolver success──► Done(phase₀) ──┐
//!                 └─deadline elapsed──► Forced(phase₀) ┼─► Active(phase₁) → …
//!                 └─no descriptor────► Failed(phase₀) ─┘
//!                                          …
//!                               Done/Forced(last) ──► complete callbacks
//!                                                     (exactly once, never retried)
//! ```
//!
//! ## Rules
//! - `advance`/`force_advance` are no-ops unless the named phase is the
//!   immediate successor of the last settled phase; earlier, duplicate, and
//!   out-of-order calls change nothing.
//! - Phase indices are monotonically non-decreasing; no phase regresses once
//!   Done or Forced.
//! - Phase subscriptions fire exactly once each, synchronously inside the
//!   settling call, before the driver evaluates the next phase — no matter
//!   how many compatibility channels re-announce the transition.
//! - A subscription registered after its phase settled fires immediately
//!   with the recorded payload.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tokio::sync::watch;

use crate::core::registry::Registry;
use crate::events::{Bus, Event, EventKind};
use crate::resources::Acquired;

/// Status of one phase record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseStatus {
    /// Not yet reached.
    Pending,
    /// The current milestone; its gate is being evaluated.
    Active,
    /// Settled in order with its gate satisfied.
    Done,
    /// Promoted on deadline with reduced guarantees.
    Forced,
    /// Could not be evaluated (no descriptor for its gate); skipped.
    Failed,
}

impl PhaseStatus {
    /// True once the phase can no longer change.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            PhaseStatus::Done | PhaseStatus::Forced | PhaseStatus::Failed
        )
    }

    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::Active => "active",
            PhaseStatus::Done => "done",
            PhaseStatus::Forced => "forced",
            PhaseStatus::Failed => "failed",
        }
    }
}

/// Configuration of one phase in the sequence.
#[derive(Clone, Debug)]
pub struct PhaseSpec {
    name: Arc<str>,
    resource: Option<Arc<str>>,
    deadline: Duration,
    channels: Vec<Arc<str>>,
}

impl PhaseSpec {
    /// Creates an ungated phase with a 1 s deadline and no extra channels.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            resource: None,
            deadline: Duration::from_secs(1),
            channels: Vec::new(),
        }
    }

    /// Gates the phase on a resource key: it settles when that resource
    /// resolves (genuinely or as a degraded stub).
    pub fn gated_by(mut self, key: impl Into<Arc<str>>) -> Self {
        self.resource = Some(key.into());
        self
    }

    /// Sets the deadline after which the phase is force-advanced.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Adds a legacy-compatible channel name the transition is re-announced
    /// on, for pre-existing collaborators that listen under historical names.
    pub fn announce_on(mut self, channel: impl Into<Arc<str>>) -> Self {
        self.channels.push(channel.into());
        self
    }

    /// The phase name.
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// The gating resource key, if any.
    pub fn resource(&self) -> Option<&Arc<str>> {
        self.resource.as_ref()
    }

    /// The force-advance deadline.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Legacy announcement channels.
    pub fn channels(&self) -> &[Arc<str>] {
        &self.channels
    }
}

/// Payload delivered with a settled transition.
#[derive(Clone, Debug)]
pub struct PhasePayload {
    /// The settled phase.
    pub phase: Arc<str>,
    /// Reduced-guarantee marker: the gate was not verified satisfied.
    pub forced: bool,
    /// The gate was satisfied by a degraded stand-in.
    pub degraded: bool,
    /// Strategy that satisfied the gate, if any.
    pub source: Option<Arc<str>>,
    /// Details for forced/failed transitions.
    pub reason: Option<Arc<str>>,
    /// Settlement timestamp.
    pub at: SystemTime,
}

impl PhasePayload {
    /// Payload for an ungated phase.
    pub fn cleared(phase: impl Into<Arc<str>>) -> Self {
        Self {
            phase: phase.into(),
            forced: false,
            degraded: false,
            source: None,
            reason: None,
            at: SystemTime::now(),
        }
    }

    /// Payload for a phase whose gate resolved.
    pub fn satisfied(phase: impl Into<Arc<str>>, acquired: &Acquired) -> Self {
        Self {
            phase: phase.into(),
            forced: false,
            degraded: acquired.is_degraded(),
            source: Some(Arc::from(acquired.source())),
            reason: None,
            at: SystemTime::now(),
        }
    }

    fn promoted(phase: Arc<str>, reason: &'static str) -> Self {
        Self {
            phase,
            forced: true,
            degraded: true,
            source: None,
            reason: Some(Arc::from(reason)),
            at: SystemTime::now(),
        }
    }
}

/// Read-only view of one phase record for diagnostics and tests.
#[derive(Clone, Debug)]
pub struct PhaseRecord {
    /// Phase name.
    pub name: Arc<str>,
    /// Current status.
    pub status: PhaseStatus,
    /// When the phase became active.
    pub started_at: Option<SystemTime>,
    /// When the phase settled.
    pub settled_at: Option<SystemTime>,
    /// Activation attempts (phases activate once per epoch).
    pub attempts: u32,
    /// Reduced-guarantee marker of the settled payload.
    pub forced: bool,
}

struct Record {
    status: PhaseStatus,
    started_at: Option<SystemTime>,
    settled_at: Option<SystemTime>,
    attempts: u32,
    payload: Option<PhasePayload>,
}

impl Record {
    fn fresh() -> Self {
        Self {
            status: PhaseStatus::Pending,
            started_at: None,
            settled_at: None,
            attempts: 0,
            payload: None,
        }
    }
}

type PhaseCallback = Box<dyn FnOnce(&PhasePayload) + Send + 'static>;

struct Subscription {
    phase: usize,
    cb: PhaseCallback,
}

/// Ordered milestone tracker with one-shot notification semantics.
pub struct PhaseMachine {
    specs: Vec<PhaseSpec>,
    records: Mutex<Vec<Record>>,
    settled_tx: watch::Sender<usize>,
    // Keep one receiver alive so the channel never closes; otherwise
    // `settled_tx.send` is a silent no-op and `settled_count` never advances.
    _settled_keepalive: watch::Receiver<usize>,
    subs: Mutex<Vec<Subscription>>,
    complete_cbs: Mutex<Vec<PhaseCallback>>,
    complete_payload: Mutex<Option<PhasePayload>>,
    complete_fired: AtomicBool,
    bus: Bus,
    registry: Arc<Registry>,
}

impl PhaseMachine {
    /// Creates a machine over the given sequence.
    pub fn new(specs: Vec<PhaseSpec>, bus: Bus, registry: Arc<Registry>) -> Self {
        let records = specs.iter().map(|_| Record::fresh()).collect();
        let (settled_tx, settled_keepalive) = watch::channel(0);
        Self {
            specs,
            records: Mutex::new(records),
            settled_tx,
            _settled_keepalive: settled_keepalive,
            subs: Mutex::new(Vec::new()),
            complete_cbs: Mutex::new(Vec::new()),
            complete_payload: Mutex::new(None),
            complete_fired: AtomicBool::new(false),
            bus,
            registry,
        }
    }

    /// The configured sequence.
    pub fn specs(&self) -> &[PhaseSpec] {
        &self.specs
    }

    /// Number of settled phases.
    pub fn settled_count(&self) -> usize {
        *self.settled_tx.borrow()
    }

    /// Name of the phase currently being evaluated, or of the terminal phase
    /// once the sequence completed.
    pub fn current(&self) -> Arc<str> {
        let settled = self.settled_count();
        match self.specs.get(settled).or_else(|| self.specs.last()) {
            Some(spec) => spec.name.clone(),
            None => Arc::from("complete"),
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|spec| &*spec.name == name)
    }

    /// Marks the next pending phase active and publishes `PhaseStarted`.
    ///
    /// No-op unless `name` is the immediate successor of the last settled
    /// phase.
    pub fn mark_active(&self, name: &str) {
        let Some(idx) = self.index_of(name) else {
            return;
        };
        if idx != self.settled_count() {
            return;
        }
        {
            let mut records = self.records.lock().expect("phase records lock");
            let record = &mut records[idx];
            if record.status != PhaseStatus::Pending {
                return;
            }
            record.status = PhaseStatus::Active;
            record.started_at = Some(SystemTime::now());
            record.attempts = record.attempts.saturating_add(1);
        }
        let mut event = Event::new(EventKind::PhaseStarted).with_phase(self.specs[idx].name.clone());
        if let Some(key) = self.specs[idx].resource() {
            event = event.with_resource(key.clone());
        }
        self.bus.publish(event);
    }

    /// Settles the named phase as Done with the given payload.
    ///
    /// Earlier, duplicate, and out-of-order calls are no-ops. Returns whether
    /// the machine advanced.
    pub fn advance(&self, name: &str, payload: PhasePayload) -> bool {
        let Some(idx) = self.index_of(name) else {
            return false;
        };
        if idx != self.settled_count() {
            return false;
        }
        self.settle(idx, PhaseStatus::Done, payload);
        true
    }

    /// Promotes the named phase after its deadline elapsed.
    ///
    /// Performs one last registry check: if the gating resource settled in
    /// the meantime the phase advances normally; otherwise it is promoted to
    /// Forced with an explicit reduced-guarantee marker — forward progress
    /// over full correctness.
    pub fn force_advance(&self, name: &str) -> bool {
        let Some(idx) = self.index_of(name) else {
            return false;
        };
        if idx != self.settled_count() {
            return false;
        }
        let spec = &self.specs[idx];

        let last_check = spec
            .resource()
            .and_then(|key| self.registry.get(key));
        match last_check {
            Some(acquired) => {
                self.settle(idx, PhaseStatus::Done, PhasePayload::satisfied(spec.name.clone(), &acquired));
            }
            None => {
                self.settle(
                    idx,
                    PhaseStatus::Forced,
                    PhasePayload::promoted(spec.name.clone(), "deadline_elapsed"),
                );
            }
        }
        true
    }

    /// Records the named phase as Failed (unevaluable gate) and proceeds.
    pub fn fail(&self, name: &str, reason: &'static str) -> bool {
        let Some(idx) = self.index_of(name) else {
            return false;
        };
        if idx != self.settled_count() {
            return false;
        }
        let payload = PhasePayload::promoted(self.specs[idx].name.clone(), reason);
        self.settle(idx, PhaseStatus::Failed, payload);
        true
    }

    fn settle(&self, idx: usize, status: PhaseStatus, payload: PhasePayload) {
        {
            let mut records = self.records.lock().expect("phase records lock");
            let record = &mut records[idx];
            record.status = status;
            record.settled_at = Some(payload.at);
            record.payload = Some(payload.clone());
        }

        self.publish_transition(idx, status, &payload);

        // release all locks before user callbacks
        let fired: Vec<PhaseCallback> = {
            let mut subs = self.subs.lock().expect("phase subs lock");
            let mut fired = Vec::new();
            let mut rest = Vec::with_capacity(subs.len());
            for sub in subs.drain(..) {
                if sub.phase == idx {
                    fired.push(sub.cb);
                } else {
                    rest.push(sub);
                }
            }
            *subs = rest;
            fired
        };

        let _ = self.settled_tx.send(idx + 1);

        for cb in fired {
            cb(&payload);
        }

        if idx + 1 == self.specs.len() {
            self.fire_complete();
        }
    }

    fn publish_transition(&self, idx: usize, status: PhaseStatus, payload: &PhasePayload) {
        let spec = &self.specs[idx];
        let kind = match status {
            PhaseStatus::Done => EventKind::PhaseAdvanced,
            PhaseStatus::Forced => EventKind::PhaseForced,
            _ => EventKind::PhaseFailed,
        };

        // canonical event: internal bookkeeping counts this transition once
        let mut event = Event::new(kind)
            .with_phase(spec.name.clone())
            .with_forced(payload.forced);
        if let Some(source) = &payload.source {
            event = event.with_strategy(source.clone());
        }
        if let Some(reason) = &payload.reason {
            event = event.with_reason(reason.clone());
        }
        self.bus.publish(event);

        // compatibility broadcast: N legacy names, still one transition
        for channel in spec.channels() {
            self.bus.publish(
                Event::new(EventKind::PhaseAnnounced)
                    .with_phase(spec.name.clone())
                    .with_channel(channel.clone())
                    .with_forced(payload.forced),
            );
        }
    }

    fn fire_complete(&self) {
        if self.complete_fired.swap(true, AtomicOrdering::SeqCst) {
            return;
        }

        let payload = {
            let records = self.records.lock().expect("phase records lock");
            let forced = records.iter().any(|record| {
                matches!(record.status, PhaseStatus::Forced | PhaseStatus::Failed)
            });
            let degraded = records
                .iter()
                .filter_map(|record| record.payload.as_ref())
                .any(|payload| payload.degraded);
            let phase = self
                .specs
                .last()
                .map(|spec| spec.name.clone())
                .unwrap_or_else(|| Arc::from("complete"));
            PhasePayload {
                phase,
                forced,
                degraded,
                source: None,
                reason: None,
                at: SystemTime::now(),
            }
        };

        *self
            .complete_payload
            .lock()
            .expect("complete payload lock") = Some(payload.clone());

        self.bus
            .publish(Event::new(EventKind::RunCompleted).with_forced(payload.forced));

        let cbs: Vec<PhaseCallback> = {
            let mut cbs = self.complete_cbs.lock().expect("complete cbs lock");
            cbs.drain(..).collect()
        };
        for cb in cbs {
            cb(&payload);
        }
    }

    /// Fires completion for sequences that have nothing left to settle.
    ///
    /// Idempotent; the normal path fires completion from the terminal
    /// settle.
    pub(crate) fn ensure_complete(&self) {
        if self.settled_count() == self.specs.len() {
            self.fire_complete();
        }
    }

    /// Registers a one-shot callback for a phase transition.
    ///
    /// Fires exactly once: immediately (with the recorded payload) when the
    /// phase already settled, otherwise at settlement. Unknown phase names
    /// are ignored.
    pub fn on_phase(&self, name: &str, cb: impl FnOnce(&PhasePayload) + Send + 'static) {
        let Some(idx) = self.index_of(name) else {
            return;
        };
        let settled_payload = {
            let records = self.records.lock().expect("phase records lock");
            records[idx].payload.clone()
        };
        match settled_payload {
            Some(payload) => cb(&payload),
            None => self.subs.lock().expect("phase subs lock").push(Subscription {
                phase: idx,
                cb: Box::new(cb),
            }),
        }
    }

    /// Registers a one-shot callback for the terminal transition.
    pub fn on_complete(&self, cb: impl FnOnce(&PhasePayload) + Send + 'static) {
        let fired_payload = {
            let payload = self.complete_payload.lock().expect("complete payload lock");
            payload.clone()
        };
        match fired_payload {
            Some(payload) => cb(&payload),
            None => self
                .complete_cbs
                .lock()
                .expect("complete cbs lock")
                .push(Box::new(cb)),
        }
    }

    /// Waits until the named phase settles, resolving immediately when it
    /// already has. Unknown names resolve immediately with a no-guarantee
    /// payload so callers never hang on a typo.
    pub async fn wait_for(&self, name: &str) -> PhasePayload {
        let Some(idx) = self.index_of(name) else {
            return PhasePayload::promoted(Arc::from(name), "unknown_phase");
        };

        let mut rx = self.settled_tx.subscribe();
        if rx.wait_for(|settled| *settled > idx).await.is_err() {
            // sender dropped mid-epoch; fall through to whatever settled
        }

        let recorded = {
            let records = self.records.lock().expect("phase records lock");
            records[idx].payload.clone()
        };
        recorded.unwrap_or_else(|| {
            PhasePayload::promoted(self.specs[idx].name.clone(), "machine_dropped")
        })
    }

    /// Read-only copies of every phase record.
    pub fn phase_records(&self) -> Vec<PhaseRecord> {
        let records = self.records.lock().expect("phase records lock");
        self.specs
            .iter()
            .zip(records.iter())
            .map(|(spec, record)| PhaseRecord {
                name: spec.name.clone(),
                status: record.status,
                started_at: record.started_at,
                settled_at: record.settled_at,
                attempts: record.attempts,
                forced: record
                    .payload
                    .as_ref()
                    .map(|payload| payload.forced)
                    .unwrap_or(false),
            })
            .collect()
    }
}
