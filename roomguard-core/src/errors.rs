//! Error Types for the Fusion & Alerting Engine
//!
//! ## Design Philosophy
//!
//! The scoring and evaluation paths run on a continuous sensor stream, so they
//! do not have error types at all: a poisoned message degrades the output
//! (fewer factors, no alert) instead of failing. Errors exist only at the
//! edges where a collaborator can genuinely be unavailable:
//!
//! - **Store**: the time-series window cannot be read or written
//! - **Sink**: an incident or alert could not be handed off
//! - **Configuration**: a threshold or weight makes no sense
//!
//! These are the "resource exhaustion" class of failures and are allowed to
//! surface to the owning process.
//!
//! ## Absorbed Conditions
//!
//! Malformed payloads never become errors. The normalizer resolves them into a
//! best-effort [`Reading`](crate::reading::Reading) and logs at debug level.

use thiserror::Error;

/// Result type for core operations that touch collaborators
pub type CoreResult<T> = Result<T, CoreError>;

/// Failures reported by a [`ReadingStore`](crate::store::ReadingStore)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// Backing storage cannot be reached
    #[error("reading store unavailable: {0}")]
    Unavailable(String),

    /// Query parameters cannot be satisfied
    #[error("invalid window query: {0}")]
    InvalidQuery(String),
}

/// Top-level error for the core crate
#[derive(Debug, Error)]
pub enum CoreError {
    /// Store failure while persisting or fetching readings
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Sink refused or failed to record an incident/alert
    #[error("sink error: {0}")]
    Sink(String),

    /// Configuration value out of its meaningful range
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig {
        /// Offending configuration field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

impl CoreError {
    /// Shorthand for configuration validation failures
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts() {
        let err: CoreError = StoreError::Unavailable("disk".into()).into();
        assert_eq!(err.to_string(), "reading store unavailable: disk");
    }

    #[test]
    fn config_error_message() {
        let err = CoreError::invalid_config("detection_threshold", "must be within [0, 10]");
        assert_eq!(
            err.to_string(),
            "invalid configuration: detection_threshold must be within [0, 10]"
        );
    }
}
