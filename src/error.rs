//! Error types used by the orchestrator runtime and acquisition strategies.
//!
//! This module defines two main error enums:
//!
//! - [`StrategyError`] — a single acquisition attempt went wrong (non-fatal;
//!   the resolver advances to the next strategy in the chain).
//! - [`OrchestratorError`] — the orchestration layer gave up on a unit
//!   (exhausted chain, exhausted retry budget, elapsed phase deadline).
//!
//! Nothing in this crate is fatal to the host process. Public query and
//! subscription APIs never return these errors; they surface through events,
//! tracing output, and the diagnostic snapshot. Both types provide
//! `as_label` / `as_message` helpers for logging and metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by a single strategy attempt.
///
/// Each variant advances the resolver to the next strategy in the chain;
/// none of them aborts resolution on its own.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StrategyError {
    /// The attempt exceeded its per-strategy budget.
    #[error("attempt timed out after {timeout:?}")]
    Timeout {
        /// The attempt timeout that was exceeded.
        timeout: Duration,
    },

    /// A candidate was obtained but rejected by the descriptor's verifier.
    ///
    /// Treated identically to a timeout: charge the governor, try the next
    /// strategy.
    #[error("candidate rejected by verification")]
    Rejected,

    /// The attempt itself failed (the underlying acquisition threw).
    #[error("attempt failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },
}

impl StrategyError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use bootvisor::StrategyError;
    /// use std::time::Duration;
    ///
    /// let err = StrategyError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "strategy_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StrategyError::Timeout { .. } => "strategy_timeout",
            StrategyError::Rejected => "strategy_rejected",
            StrategyError::Failed { .. } => "strategy_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StrategyError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            StrategyError::Rejected => "verification rejected candidate".to_string(),
            StrategyError::Failed { error } => format!("error: {error}"),
        }
    }

    /// Shorthand for building a [`StrategyError::Failed`] from any message.
    pub fn failed(error: impl Into<String>) -> Self {
        StrategyError::Failed {
            error: error.into(),
        }
    }
}

/// # Errors produced by the orchestration layer.
///
/// These mark the points where the runtime trades functional correctness for
/// liveness: a degraded stub is substituted, or a phase is promoted without
/// its gate being satisfied. They are carried in event `reason` fields and
/// logged (warn/error), never returned from public APIs.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Every strategy in a resource's chain failed, timed out, or was
    /// rejected; a degraded stub is substituted.
    #[error("all strategies exhausted for resource {key}")]
    StrategiesExhausted {
        /// The resource key whose chain ran dry.
        key: String,
    },

    /// A unit's attempt counter reached its configured budget; the unit is
    /// permanently degraded for the rest of the epoch.
    #[error("retry budget exhausted for {unit} after {attempts} attempts")]
    BudgetExhausted {
        /// Unit label (`resource:<key>` or `phase:<name>`).
        unit: String,
        /// Failed attempts charged when the breaker tripped.
        attempts: u32,
    },

    /// A phase deadline elapsed before its gating resource resolved.
    #[error("phase {phase} deadline {deadline:?} elapsed")]
    PhaseDeadline {
        /// The phase that was force-advanced.
        phase: String,
        /// The configured deadline.
        deadline: Duration,
    },

    /// A phase gates on a resource key with no registered descriptor.
    #[error("no descriptor registered for resource {key}")]
    UnknownResource {
        /// The unregistered key.
        key: String,
    },
}

impl OrchestratorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use bootvisor::OrchestratorError;
    ///
    /// let err = OrchestratorError::StrategiesExhausted { key: "library".into() };
    /// assert_eq!(err.as_label(), "strategies_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            OrchestratorError::StrategiesExhausted { .. } => "strategies_exhausted",
            OrchestratorError::BudgetExhausted { .. } => "budget_exhausted",
            OrchestratorError::PhaseDeadline { .. } => "phase_deadline",
            OrchestratorError::UnknownResource { .. } => "unknown_resource",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            OrchestratorError::StrategiesExhausted { key } => {
                format!("strategy chain exhausted for {key}")
            }
            OrchestratorError::BudgetExhausted { unit, attempts } => {
                format!("budget exhausted for {unit} after {attempts} attempts")
            }
            OrchestratorError::PhaseDeadline { phase, deadline } => {
                format!("deadline {deadline:?} elapsed for phase {phase}")
            }
            OrchestratorError::UnknownResource { key } => {
                format!("no descriptor for {key}")
            }
        }
    }
}
