//! # Passive change notification for externally created resources.
//!
//! Some resources are not acquired by any strategy: they appear when an
//! unrelated part of the host system finishes its own initialization. The
//! naive answer is a polling loop; [`ReadySignal`] replaces it with a
//! one-slot mailbox built on [`tokio::sync::Notify`].
//!
//! ## Flow
//! ```text
//! host code ── offer(instance) ──► ReadySignal ── wait() ──► SignalStrategy
//!                                    (one slot)                (in a chain)
//! ```
//!
//! ## Rules
//! - The slot is write-once: the first `offer` wins, later offers are
//!   rejected.
//! - `wait()` returns immediately when the slot is already filled, so a
//!   resolver sweep that starts after delivery observes it without waiting.
//! - Bounding `wait()` is the resolver's job (per-attempt timeout).

use std::borrow::Cow;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::StrategyError;
use crate::resources::resource::ResourceRef;
use crate::resources::strategy::Strategy;

/// One-slot, write-once mailbox for an externally delivered resource.
pub struct ReadySignal {
    slot: Mutex<Option<ResourceRef>>,
    notify: Notify,
}

impl ReadySignal {
    /// Creates an empty signal as a shared handle.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        })
    }

    /// Delivers an externally created instance.
    ///
    /// Returns `true` if the slot was empty and the instance was accepted;
    /// `false` if a previous delivery already filled it.
    pub fn offer(&self, resource: ResourceRef) -> bool {
        let accepted = {
            let mut slot = self.slot.lock().expect("signal slot lock");
            if slot.is_some() {
                false
            } else {
                *slot = Some(resource);
                true
            }
        };
        if accepted {
            self.notify.notify_waiters();
        }
        accepted
    }

    /// Returns the delivered instance, if any, without waiting.
    pub fn peek(&self) -> Option<ResourceRef> {
        self.slot.lock().expect("signal slot lock").clone()
    }

    /// Waits until an instance is delivered.
    pub async fn wait(&self) -> ResourceRef {
        loop {
            let notified = self.notify.notified();
            if let Some(resource) = self.peek() {
                return resource;
            }
            notified.await;
        }
    }
}

/// Strategy that waits for an external delivery instead of polling.
///
/// Typically ranked after cheap probes and before remote fallbacks. The
/// attempt blocks on [`ReadySignal::wait`] and relies on the descriptor's
/// per-attempt timeout to bound it.
pub struct SignalStrategy {
    name: Cow<'static, str>,
    signal: Arc<ReadySignal>,
}

impl SignalStrategy {
    /// Creates a strategy watching the given signal, as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, signal: Arc<ReadySignal>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            signal,
        })
    }
}

#[async_trait]
impl Strategy for SignalStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self) -> Result<ResourceRef, StrategyError> {
        Ok(self.signal.wait().await)
    }
}
