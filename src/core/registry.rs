//! # Resource registry: singleton-safe acquisition cache.
//!
//! The registry is the sole place responsible for race-safety: factories
//! need not be concurrency-aware themselves. It enforces at most one live
//! instance per key by memoizing the in-flight creation future.
//!
//! ## Architecture
//! ```text
//! get_or_create(key)
//!     ├─► Ready     → cached Acquired (factory not invoked)
//!     ├─► Creating  → clone of the in-flight shared future (join it)
//!     └─► Empty     → spawn factory task, memoize shared handle
//!                        │
//!                        ▼ settles
//!                    promote entry to Ready (identity frozen for the epoch)
//! ```
//!
//! ## Rules
//! - Empty→Creating happens at most once per key per entry lifecycle;
//!   concurrent requests join the same shared future.
//! - Creation is spawned onto the runtime: callers dropping their handles
//!   (e.g. a phase deadline elapsing) never cancel it mid-flight.
//! - A panicking factory is isolated; the caller-supplied fallback result is
//!   memoized instead.
//! - `reset` awaits any in-flight creation before clearing, so a resolving
//!   future is never orphaned.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::events::{Bus, Event, EventKind};
use crate::resources::Acquired;

type InFlight = Shared<BoxFuture<'static, Acquired>>;

enum EntryState {
    /// Creation started; all callers share this future.
    Creating(InFlight),
    /// Settled; the instance reference never changes for the epoch.
    Ready(Acquired),
}

/// Singleton cache of acquired resources.
pub struct Registry {
    entries: Mutex<HashMap<String, EntryState>>,
    bus: Bus,
}

impl Registry {
    /// Creates an empty registry publishing to the given bus.
    pub fn new(bus: Bus) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            bus,
        }
    }

    /// Returns the cached instance for `key`, joining or starting creation
    /// as needed.
    ///
    /// The factory is invoked exactly once per entry lifecycle no matter how
    /// many callers race here; every caller receives a clone pointing at the
    /// identical instance. `fallback` is consulted only if the factory task
    /// panics.
    pub async fn get_or_create<F, Fut, G>(&self, key: &str, create: F, fallback: G) -> Acquired
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Acquired> + Send + 'static,
        G: FnOnce() -> Acquired + Send + 'static,
    {
        let shared = {
            let mut entries = self.entries.lock().expect("registry lock");
            match entries.get(key) {
                Some(EntryState::Ready(cached)) => return cached.clone(),
                Some(EntryState::Creating(inflight)) => inflight.clone(),
                None => {
                    // Run to settlement even if every caller drops out.
                    let task = tokio::spawn(create());
                    let settled: BoxFuture<'static, Acquired> = Box::pin(async move {
                        match task.await {
                            Ok(acquired) => acquired,
                            Err(_panicked) => fallback(),
                        }
                    });
                    let shared = settled.shared();
                    entries.insert(key.to_string(), EntryState::Creating(shared.clone()));
                    shared
                }
            }
        };

        let acquired = shared.await;
        self.promote(key, &acquired);
        acquired
    }

    /// Freezes a settled creation into the Ready state (idempotent).
    fn promote(&self, key: &str, acquired: &Acquired) {
        let mut entries = self.entries.lock().expect("registry lock");
        if let Some(state) = entries.get_mut(key) {
            if matches!(state, EntryState::Creating(_)) {
                *state = EntryState::Ready(acquired.clone());
            }
        }
    }

    /// True when the entry settled (genuine or degraded).
    pub fn is_ready(&self, key: &str) -> bool {
        matches!(
            self.entries.lock().expect("registry lock").get(key),
            Some(EntryState::Ready(_))
        )
    }

    /// Returns the settled instance for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Acquired> {
        match self.entries.lock().expect("registry lock").get(key) {
            Some(EntryState::Ready(cached)) => Some(cached.clone()),
            _ => None,
        }
    }

    /// Sorted keys of all settled entries.
    pub fn ready_keys(&self) -> Vec<String> {
        let entries = self.entries.lock().expect("registry lock");
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, state)| matches!(state, EntryState::Ready(_)))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Invalidates an entry for confirmed-corrupt-resource recovery.
    ///
    /// Awaits any in-flight creation before clearing so the resolving future
    /// settles into a state someone observed. The next `get_or_create` for
    /// the key starts a fresh entry lifecycle.
    pub async fn reset(&self, key: &str) {
        let inflight = {
            let entries = self.entries.lock().expect("registry lock");
            match entries.get(key) {
                Some(EntryState::Creating(inflight)) => Some(inflight.clone()),
                _ => None,
            }
        };
        if let Some(inflight) = inflight {
            let _ = inflight.await;
        }

        let removed = self
            .entries
            .lock()
            .expect("registry lock")
            .remove(key)
            .is_some();
        if removed {
            self.bus
                .publish(Event::new(EventKind::ResourceReset).with_resource(key.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::StubResource;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn registry() -> Arc<Registry> {
        Arc::new(Registry::new(Bus::new(16)))
    }

    fn instant_fallback() -> Acquired {
        Acquired::degraded(StubResource::arc("fallback"))
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_factory_invocation() {
        let registry = registry();
        let invocations = Arc::new(AtomicU32::new(0));

        let mut joins = Vec::new();
        for _ in 0..3 {
            let registry = registry.clone();
            let invocations = invocations.clone();
            joins.push(tokio::spawn(async move {
                registry
                    .get_or_create(
                        "library",
                        move || async move {
                            invocations.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Acquired::genuine(StubResource::arc("library"), "probe")
                        },
                        instant_fallback,
                    )
                    .await
            }));
        }

        let mut results = Vec::new();
        for join in joins {
            results.push(join.await.expect("caller join"));
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert!(results[0].same_instance(&results[1]));
        assert!(results[1].same_instance(&results[2]));
    }

    #[tokio::test]
    async fn ready_entries_answer_synchronously() {
        let registry = registry();
        assert!(!registry.is_ready("library"));
        assert!(registry.get("library").is_none());

        let first = registry
            .get_or_create(
                "library",
                || async { Acquired::genuine(StubResource::arc("library"), "probe") },
                instant_fallback,
            )
            .await;

        assert!(registry.is_ready("library"));
        let cached = registry.get("library").expect("ready entry");
        assert!(cached.same_instance(&first));
        assert_eq!(registry.ready_keys(), vec!["library".to_string()]);
    }

    #[tokio::test]
    async fn second_call_does_not_reinvoke_factory() {
        let registry = registry();
        let invocations = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let invocations = invocations.clone();
            registry
                .get_or_create(
                    "surface",
                    move || async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        Acquired::genuine(StubResource::arc("surface"), "probe")
                    },
                    instant_fallback,
                )
                .await;
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_factory_memoizes_the_fallback() {
        let registry = registry();
        let acquired = registry
            .get_or_create(
                "widget",
                || async { panic!("factory blew up") },
                instant_fallback,
            )
            .await;
        assert!(acquired.is_degraded());

        // the fallback is frozen, not retried
        let cached = registry.get("widget").expect("ready entry");
        assert!(cached.same_instance(&acquired));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_awaits_inflight_creation_before_clearing() {
        let registry = registry();

        let creator = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .get_or_create(
                        "library",
                        || async {
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Acquired::genuine(StubResource::arc("library"), "slow")
                        },
                        instant_fallback,
                    )
                    .await
            })
        };
        tokio::task::yield_now().await;

        registry.reset("library").await;
        assert!(!registry.is_ready("library"));
        // the in-flight caller still observed a settled instance
        let acquired = creator.await.expect("creator join");
        assert_eq!(acquired.source(), "slow");

        // a fresh lifecycle may start after recovery
        let again = registry
            .get_or_create(
                "library",
                || async { Acquired::genuine(StubResource::arc("library"), "fresh") },
                instant_fallback,
            )
            .await;
        assert_eq!(again.source(), "fresh");
    }
}
