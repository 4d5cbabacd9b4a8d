//! # Event subscribers for the orchestrator runtime.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used to deliver runtime events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Resolver / Machine ── publish(Event) ──► Bus ──► fan-out listener
//!                                                        │
//!                                                   SubscriberSet
//!                                              ┌─────────┼─────────┐
//!                                              ▼         ▼         ▼
//!                                        LogWriter   Metrics   Custom ...
//! ```
//!
//! ## Subscriber types
//! - **Stream observers** ([`Subscribe`]) — see every event once each
//!   (logging, metrics, alerts).
//! - **One-shot transition callbacks** — registered on the orchestrator via
//!   `on_phase` / `on_complete`; fire exactly once per registration.

mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
