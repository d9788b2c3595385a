//! Error types for policy authorization.
//!
//! Strongly-typed errors using `thiserror`. Signal failures are deliberately
//! absent from rule evaluation: a degraded provider produces an unavailable
//! snapshot, and each rule applies its documented availability default.

use thiserror::Error;

/// A policy document failed schema or invariant validation.
///
/// Carries the field path that triggered the rejection so the document
/// author can locate the problem (e.g. `conditions.timeWindow.endHour`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A temporal-state read or write failed.
///
/// An authorization decision must never be granted on uncertain state, so
/// the engine converts this into a fail-closed denial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("temporal state store failure: {0}")]
pub struct StateStoreError(pub String);

/// Alert delivery to a downstream sink failed.
///
/// Delivery is at-least-once and fire-and-forget; this error is logged by
/// the monitor and never propagated into an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("alert delivery failed: {0}")]
pub struct SinkError(pub String);

/// Errors surfaced by the crate's entry points.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Document rejected before compilation; never reaches evaluation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Temporal-state failure on the confirmed-execution path.
    #[error(transparent)]
    StateStore(#[from] StateStoreError),

    /// A signal provider failed or timed out. Internal to the signal layer:
    /// callers of `evaluate` never see this, the affected snapshot is
    /// flagged unavailable instead.
    #[error("signal provider {name} unavailable: {reason}")]
    SignalUnavailable { name: String, reason: String },
}

/// Result type alias for policy operations.
pub type Result<T> = core::result::Result<T, PolicyError>;
