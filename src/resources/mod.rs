//! Resource acquisition: descriptors, strategies, and the chain resolver.
//!
//! Internal modules:
//! - [`resource`]: the opaque [`Resource`] trait, [`Acquired`] provenance
//!   wrapper, and the default degraded stub;
//! - [`strategy`]: the [`Strategy`] trait and closure adapter;
//! - [`signal`]: passive delivery of externally created instances;
//! - [`descriptor`]: per-resource acquisition plan;
//! - [`resolver`]: runs the chain and constructs degraded fallbacks.

mod descriptor;
mod resolver;
mod resource;
mod signal;
mod strategy;

pub use descriptor::{ResourceDescriptor, StubFn, VerifyFn};
pub use resource::{Acquired, Resource, ResourceRef, StubResource, DEGRADED_SOURCE};
pub use signal::{ReadySignal, SignalStrategy};
pub use strategy::{Strategy, StrategyFn, StrategyRef};

pub(crate) use resolver::Resolver;
