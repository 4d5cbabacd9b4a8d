//! # Global runtime configuration.
//!
//! Provides [`Config`]: centralized settings for one orchestrator epoch.
//!
//! Config is used in two ways:
//! 1. **Orchestrator creation**: `Orchestrator::builder(config)`
//! 2. **Descriptor defaults**: `ResourceDescriptor::with_defaults(key,
//!    strategies, &config)`
//!
//! There is no authoritative timeout or retry constant; the values here are
//! documented defaults that descriptors inherit only when asked to. The
//! default phase table models a host bootstrap: environment, then the
//! rendering library, then the surface, then the widget, then the terminal
//! milestone — with deadlines that increase across phases so an early forced
//! advance does not cascade into later ones.

use std::time::Duration;

use crate::core::PhaseSpec;
use crate::policies::RetryPolicy;

/// Global configuration for one orchestrator epoch.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the Bus)
/// - `attempt_timeout`: default per-strategy budget, inherited by
///   descriptors built with `with_defaults`
/// - `retry`: default retry budget and sweep backoff, inherited the same way
/// - `phases`: the ordered milestone sequence the driver walks
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events will
    /// observe `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Default per-strategy attempt timeout for descriptors built via
    /// `with_defaults`.
    pub attempt_timeout: Duration,

    /// Default retry policy (budget + backoff) for descriptors built via
    /// `with_defaults`.
    pub retry: RetryPolicy,

    /// Ordered phase sequence driven by `Orchestrator::run`.
    pub phases: Vec<PhaseSpec>,
}

impl Config {
    /// The default milestone sequence.
    ///
    /// Deadlines increase across phases; each gated phase waits on the
    /// resource key named after what it guards. Hosts with pre-existing
    /// collaborators add their historical channel names per phase:
    ///
    /// ```rust
    /// use bootvisor::{Config, PhaseSpec};
    /// use std::time::Duration;
    ///
    /// let mut cfg = Config::default();
    /// cfg.phases = vec![
    ///     PhaseSpec::new("library-ready")
    ///         .gated_by("library")
    ///         .with_deadline(Duration::from_secs(2))
    ///         .announce_on("libraryReady")
    ///         .announce_on("libraryCleanReady"),
    ///     PhaseSpec::new("complete"),
    /// ];
    /// ```
    pub fn default_phases() -> Vec<PhaseSpec> {
        vec![
            PhaseSpec::new("environment-ready").with_deadline(Duration::from_secs(1)),
            PhaseSpec::new("library-ready")
                .gated_by("library")
                .with_deadline(Duration::from_secs(2)),
            PhaseSpec::new("surface-ready")
                .gated_by("surface")
                .with_deadline(Duration::from_secs(4)),
            PhaseSpec::new("widget-ready")
                .gated_by("widget")
                .with_deadline(Duration::from_secs(8)),
            PhaseSpec::new("complete"),
        ]
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `attempt_timeout = 2s`
    /// - `retry = RetryPolicy::default()` (3 attempts, exponential backoff)
    /// - `phases = Config::default_phases()`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            attempt_timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
            phases: Self::default_phases(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_phase_deadlines_increase() {
        let phases = Config::default_phases();
        let gated: Vec<Duration> = phases
            .iter()
            .filter(|spec| spec.resource().is_some())
            .map(|spec| spec.deadline())
            .collect();
        assert!(gated.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let mut cfg = Config::default();
        cfg.bus_capacity = 0;
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
