//! # Retry / circuit-breaker governor.
//!
//! Maintains attempt counters keyed by unit — a resource key or a phase
//! name — and the set of units that exhausted their budget. A resource unit
//! is charged for every failed, timed-out, or rejected strategy attempt; a
//! phase unit is charged for every forced advance.
//!
//! ## Rules
//! - Once a unit's counter reaches its configured budget it is marked
//!   permanently degraded for the epoch: no further acquisition attempts are
//!   scheduled for it.
//! - Degradation is **sticky**: a later external event that would have
//!   satisfied a now-exhausted strategy does not un-degrade the unit within
//!   the same epoch. Only constructing a new orchestrator (a new epoch)
//!   clears it.
//! - Counters and the degraded set feed the diagnostic snapshot; they are
//!   never consulted to throw.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Unit of retry accounting: one resource or one phase.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnitKey {
    /// A resource identified by its descriptor key.
    Resource(String),
    /// A phase identified by its name.
    Phase(String),
}

impl UnitKey {
    /// Stable label used in snapshots and logs
    /// (`resource:<key>` / `phase:<name>`).
    pub fn label(&self) -> String {
        match self {
            UnitKey::Resource(key) => format!("resource:{key}"),
            UnitKey::Phase(name) => format!("phase:{name}"),
        }
    }
}

/// Bounded-retry accounting and the sticky degraded set.
pub struct Governor {
    counters: Mutex<BTreeMap<UnitKey, u32>>,
    degraded: Mutex<BTreeSet<UnitKey>>,
}

impl Governor {
    /// Creates an empty governor for a fresh epoch.
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(BTreeMap::new()),
            degraded: Mutex::new(BTreeSet::new()),
        }
    }

    /// Charges one failed attempt against a resource and returns the new
    /// total.
    pub fn charge_resource(&self, key: &str) -> u32 {
        self.charge(UnitKey::Resource(key.to_string()))
    }

    /// Charges one forced advance against a phase and returns the new total.
    pub fn charge_phase(&self, name: &str) -> u32 {
        self.charge(UnitKey::Phase(name.to_string()))
    }

    fn charge(&self, unit: UnitKey) -> u32 {
        let mut counters = self.counters.lock().expect("governor counters lock");
        let count = counters.entry(unit).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Failed attempts charged against a resource so far.
    pub fn resource_attempts(&self, key: &str) -> u32 {
        self.counters
            .lock()
            .expect("governor counters lock")
            .get(&UnitKey::Resource(key.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Marks a resource permanently degraded for the epoch.
    pub fn degrade_resource(&self, key: &str) {
        self.degrade(UnitKey::Resource(key.to_string()));
    }

    /// Marks a phase permanently degraded for the epoch.
    pub fn degrade_phase(&self, name: &str) {
        self.degrade(UnitKey::Phase(name.to_string()));
    }

    fn degrade(&self, unit: UnitKey) {
        self.degraded
            .lock()
            .expect("governor degraded lock")
            .insert(unit);
    }

    /// True when the resource exhausted its budget earlier this epoch.
    pub fn is_degraded(&self, key: &str) -> bool {
        self.degraded
            .lock()
            .expect("governor degraded lock")
            .contains(&UnitKey::Resource(key.to_string()))
    }

    /// Sorted keys of all degraded resources (phases excluded).
    pub fn degraded_resources(&self) -> Vec<String> {
        self.degraded
            .lock()
            .expect("governor degraded lock")
            .iter()
            .filter_map(|unit| match unit {
                UnitKey::Resource(key) => Some(key.clone()),
                UnitKey::Phase(_) => None,
            })
            .collect()
    }

    /// Attempt counters for every charged unit, keyed by stable label.
    pub fn attempt_counts(&self) -> BTreeMap<String, u32> {
        self.counters
            .lock()
            .expect("governor counters lock")
            .iter()
            .map(|(unit, count)| (unit.label(), *count))
            .collect()
    }
}

impl Default for Governor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_accumulate_per_unit() {
        let governor = Governor::new();
        assert_eq!(governor.charge_resource("library"), 1);
        assert_eq!(governor.charge_resource("library"), 2);
        assert_eq!(governor.charge_resource("surface"), 1);
        assert_eq!(governor.charge_phase("widget-ready"), 1);

        let counts = governor.attempt_counts();
        assert_eq!(counts.get("resource:library"), Some(&2));
        assert_eq!(counts.get("resource:surface"), Some(&1));
        assert_eq!(counts.get("phase:widget-ready"), Some(&1));
    }

    #[test]
    fn degradation_is_sticky() {
        let governor = Governor::new();
        assert!(!governor.is_degraded("library"));
        governor.degrade_resource("library");
        assert!(governor.is_degraded("library"));
        // nothing in the API un-degrades a unit within the epoch
        governor.charge_resource("library");
        assert!(governor.is_degraded("library"));
    }

    #[test]
    fn degraded_resources_excludes_phases() {
        let governor = Governor::new();
        governor.degrade_resource("widget");
        governor.degrade_phase("widget-ready");
        assert_eq!(governor.degraded_resources(), vec!["widget".to_string()]);
    }
}
