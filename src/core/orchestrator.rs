//! # Orchestrator: the facade tying registry, resolver, governor, and
//! machine together.
//!
//! The [`Orchestrator`] owns the event bus, the singleton registry, the
//! retry governor, and the phase machine for one epoch. External callers
//! register [`ResourceDescriptor`]s, then either drive the milestone
//! sequence with [`Orchestrator::run`] or acquire individual resources with
//! [`Orchestrator::acquire`].
//!
//! ## High-level architecture
//! ```text
//! Inputs:
//!   Config { phases, defaults }       ResourceDescriptor per key
//!        │                                  │ register()
//!        ▼                                  ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Orchestrator                                                  │
//! │   run():  for each phase — race acquire(gate) vs deadline     │
//! │             │ resolved          │ deadline elapsed            │
//! │             ▼                   ▼                             │
//! │        machine.advance()   governor charge + force_advance()  │
//! │                                                               │
//! │   acquire(key): registry.get_or_create ──► resolver.resolve   │
//! │                      (join in-flight)       (chain + stub)    │
//! └──────────────────────────┬────────────────────────────────────┘
//!                            ▼
//!                 Bus ──► fan-out listener ──► SubscriberSet
//! ```
//!
//! ## Rules
//! - Public APIs never return errors and never hand out nulls: failures
//!   surface as degraded instances, events, and the snapshot.
//! - All subscribers for phase *N* are notified (synchronously, inside the
//!   settling call) before the driver evaluates phase *N+1*.
//! - `register` appends a lowest-rank `external-delivery` strategy wired to
//!   the key's [`ReadySignal`], so instances handed in via
//!   [`Orchestrator::offer`] are picked up without busy-polling.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Config;
use crate::core::governor::Governor;
use crate::core::machine::{PhaseMachine, PhasePayload, PhaseRecord};
use crate::core::registry::Registry;
use crate::error::OrchestratorError;
use crate::events::{Bus, Event, EventKind};
use crate::resources::{
    Acquired, ReadySignal, Resolver, ResourceDescriptor, ResourceRef, SignalStrategy, StubResource,
};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Diagnostic snapshot for logging and test harnesses.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Name of the phase currently being evaluated (or the terminal phase
    /// once the sequence completed).
    pub phase: Arc<str>,
    /// Sorted keys of resources that exhausted their budget this epoch.
    pub degraded_resources: Vec<String>,
    /// Failed-attempt counters keyed by unit label
    /// (`resource:<key>` / `phase:<name>`).
    pub attempt_counts: BTreeMap<String, u32>,
}

/// Builder for constructing an [`Orchestrator`] with subscribers.
pub struct OrchestratorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the orchestrator and, when subscribers are present, spawns the
    /// fan-out listener (requires a running runtime in that case).
    pub fn build(self) -> Orchestrator {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let registry = Arc::new(Registry::new(bus.clone()));
        let governor = Arc::new(Governor::new());
        let resolver = Arc::new(Resolver::new(bus.clone(), governor.clone()));
        let machine = Arc::new(PhaseMachine::new(
            self.cfg.phases.clone(),
            bus.clone(),
            registry.clone(),
        ));
        let epoch_token = CancellationToken::new();

        let orchestrator = Orchestrator {
            cfg: self.cfg,
            bus: bus.clone(),
            registry,
            governor,
            resolver,
            machine,
            descriptors: Mutex::new(HashMap::new()),
            signals: Mutex::new(HashMap::new()),
            listener_started: AtomicBool::new(false),
            epoch_token,
        };

        if !self.subscribers.is_empty() {
            orchestrator.spawn_fanout_listener(SubscriberSet::new(self.subscribers, bus));
        }
        orchestrator
    }
}

/// One epoch of the readiness orchestrator.
///
/// Created once per process/page lifetime; entries and degradation markers
/// live until the orchestrator is dropped. The only teardown path for an
/// individual entry is [`Orchestrator::reset`].
pub struct Orchestrator {
    cfg: Config,
    bus: Bus,
    registry: Arc<Registry>,
    governor: Arc<Governor>,
    resolver: Arc<Resolver>,
    machine: Arc<PhaseMachine>,
    descriptors: Mutex<HashMap<String, ResourceDescriptor>>,
    signals: Mutex<HashMap<String, Arc<ReadySignal>>>,
    listener_started: AtomicBool,
    epoch_token: CancellationToken,
}

impl Orchestrator {
    /// Creates an orchestrator with no subscribers.
    pub fn new(cfg: Config) -> Self {
        Self::builder(cfg).build()
    }

    /// Returns a builder for attaching subscribers.
    pub fn builder(cfg: Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    /// The configuration this epoch was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The event bus; subscribe here for raw event streams.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Subscribes to the bus and forwards events to the subscriber set until
    /// the epoch ends.
    fn spawn_fanout_listener(&self, subs: SubscriberSet) {
        if self.listener_started.swap(true, AtomicOrdering::SeqCst) {
            return;
        }
        let mut rx = self.bus.subscribe();
        let token = self.epoch_token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => subs.emit(&ev),
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
            subs.shutdown().await;
        });
    }

    /// Installs the acquisition plan for one resource key.
    ///
    /// A lowest-rank `external-delivery` strategy wired to the key's
    /// [`ReadySignal`] is appended, so [`Orchestrator::offer`] can satisfy
    /// the chain passively. Registering the same key again replaces the plan
    /// for entries not yet created.
    pub fn register(&self, descriptor: ResourceDescriptor) {
        let key = descriptor.key().clone();
        let signal = self.delivery_signal(&key);
        let descriptor =
            descriptor.append_strategy(SignalStrategy::arc("external-delivery", signal));
        self.descriptors
            .lock()
            .expect("descriptor map lock")
            .insert(key.to_string(), descriptor);
    }

    /// The passive-delivery signal for a key (created on first use).
    pub fn delivery_signal(&self, key: &str) -> Arc<ReadySignal> {
        self.signals
            .lock()
            .expect("signal map lock")
            .entry(key.to_string())
            .or_insert_with(ReadySignal::new)
            .clone()
    }

    /// Hands the orchestrator an externally created instance for `key`.
    ///
    /// Accepted only while the entry is not yet settled and the unit is not
    /// degraded; a satisfied or exhausted unit ignores late deliveries (the
    /// instance reference never changes within the epoch, and degradation is
    /// sticky). Returns whether the delivery was accepted.
    pub fn offer(&self, key: &str, resource: ResourceRef) -> bool {
        let verdict = if self.governor.is_degraded(key) {
            "unit_degraded"
        } else if self.registry.is_ready(key) {
            "already_ready"
        } else if self.delivery_signal(key).offer(resource) {
            "accepted"
        } else {
            "slot_filled"
        };
        self.bus.publish(
            Event::new(EventKind::ResourceOffered)
                .with_resource(key.to_string())
                .with_reason(verdict),
        );
        verdict == "accepted"
    }

    /// Acquires one resource: cached instance, joined in-flight creation, or
    /// a fresh resolution through the strategy chain. Never fails; unknown
    /// keys yield an anonymous degraded stub.
    pub async fn acquire(&self, key: &str) -> Acquired {
        let descriptor = self
            .descriptors
            .lock()
            .expect("descriptor map lock")
            .get(key)
            .cloned();
        let Some(descriptor) = descriptor else {
            let err = OrchestratorError::UnknownResource {
                key: key.to_string(),
            };
            warn!(resource = key, "{}", err.as_message());
            self.bus.publish(
                Event::new(EventKind::ResourceDegraded)
                    .with_resource(key.to_string())
                    .with_reason(err.as_label()),
            );
            return Acquired::degraded(StubResource::arc(key.to_string()));
        };

        let resolver = self.resolver.clone();
        let resolve_plan = descriptor.clone();
        let governor = self.governor.clone();
        let bus = self.bus.clone();
        self.registry
            .get_or_create(
                key,
                move || async move { resolver.resolve(&resolve_plan).await },
                move || {
                    governor.degrade_resource(descriptor.key());
                    bus.publish(
                        Event::new(EventKind::ResourceDegraded)
                            .with_resource(descriptor.key().clone())
                            .with_reason("factory_panic"),
                    );
                    descriptor.make_stub()
                },
            )
            .await
    }

    /// Drives the milestone sequence to its terminal phase and returns the
    /// final diagnostic snapshot.
    ///
    /// Per phase: an ungated phase advances immediately; a gated phase races
    /// its resource acquisition against the phase deadline. A deadline
    /// elapsing charges the governor and force-advances — forward progress
    /// over full correctness. Idempotent: settled phases are skipped.
    pub async fn run(&self) -> Snapshot {
        let specs = self.machine.specs().to_vec();
        for spec in specs {
            let name = spec.name().clone();
            self.machine.mark_active(&name);

            match spec.resource() {
                None => {
                    self.machine
                        .advance(&name, PhasePayload::cleared(name.clone()));
                }
                Some(key) => {
                    let registered = self
                        .descriptors
                        .lock()
                        .expect("descriptor map lock")
                        .contains_key(&**key);
                    if !registered {
                        let err = OrchestratorError::UnknownResource {
                            key: key.to_string(),
                        };
                        warn!(phase = %name, "{}", err.as_message());
                        self.governor.charge_phase(&name);
                        self.governor.degrade_phase(&name);
                        self.machine.fail(&name, err.as_label());
                        continue;
                    }

                    let acquire = self.acquire(key);
                    tokio::pin!(acquire);
                    tokio::select! {
                        acquired = &mut acquire => {
                            self.machine
                                .advance(&name, PhasePayload::satisfied(name.clone(), &acquired));
                        }
                        _ = time::sleep(spec.deadline()) => {
                            let err = OrchestratorError::PhaseDeadline {
                                phase: name.to_string(),
                                deadline: spec.deadline(),
                            };
                            warn!(phase = %name, "{}", err.as_message());
                            self.governor.charge_phase(&name);
                            self.governor.degrade_phase(&name);
                            self.machine.force_advance(&name);
                        }
                    }
                }
            }
        }
        self.machine.ensure_complete();
        self.snapshot()
    }

    /// True when the resource settled (genuine or degraded).
    pub fn is_ready(&self, key: &str) -> bool {
        self.registry.is_ready(key)
    }

    /// The settled instance for `key`, if any. The reference is identical
    /// across calls for the rest of the epoch.
    pub fn get_resource(&self, key: &str) -> Option<ResourceRef> {
        self.registry.get(key).map(|acquired| acquired.resource().clone())
    }

    /// True when the resource exhausted its retry budget this epoch.
    pub fn is_degraded(&self, key: &str) -> bool {
        self.governor.is_degraded(key)
    }

    /// Registers a one-shot callback for a phase transition (at most once
    /// per registered callback; fires immediately when already settled).
    pub fn on_phase(&self, name: &str, cb: impl FnOnce(&PhasePayload) + Send + 'static) {
        self.machine.on_phase(name, cb);
    }

    /// Registers a one-shot callback for the terminal transition.
    pub fn on_complete(&self, cb: impl FnOnce(&PhasePayload) + Send + 'static) {
        self.machine.on_complete(cb);
    }

    /// Waits until the named phase settles (immediately when it already
    /// has).
    pub async fn wait_for(&self, name: &str) -> PhasePayload {
        self.machine.wait_for(name).await
    }

    /// Tears down one entry for confirmed-corrupt-resource recovery.
    ///
    /// Awaits any in-flight creation before clearing; the unit's degradation
    /// marker and attempt counters are left untouched.
    pub async fn reset(&self, key: &str) {
        self.registry.reset(key).await;
    }

    /// Current diagnostic snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.machine.current(),
            degraded_resources: self.governor.degraded_resources(),
            attempt_counts: self.governor.attempt_counts(),
        }
    }

    /// Read-only copies of every phase record.
    pub fn phase_records(&self) -> Vec<PhaseRecord> {
        self.machine.phase_records()
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.epoch_token.cancel();
    }
}
