// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds produced by the logic core.
//!
//! None of these ever escape the core as a `Result::Err` at the
//! `Orchestrator` boundary (per the policy in spec.md §7): they are
//! collected onto a [`crate::result::ServiceResult`] and handed back to the
//! caller. `ServiceError` exists so call sites have one typed value to push
//! onto that collection instead of ad-hoc strings.

use thiserror::Error;

/// Which outbound failover a click-scoped error produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickFailureScope {
    /// A specific, addressable failure — the device gets a `FAILOVER`.
    Click,
    /// An unexpected internal condition — the device gets `GENERAL_FAILOVER`.
    General,
}

/// Errors collected on a [`crate::result::ServiceResult`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("state length mismatch for {device}: expected {expected}, got {got}")]
    StateLengthMismatch { device: String, expected: usize, got: usize },

    #[error("click validation failed ({scope:?}): {reason}")]
    ClickValidation { reason: String, scope: ClickFailureScope },

    #[error("unexpected error: {0}")]
    Unexpected(String),

    #[error("configuration not loaded, ignoring message")]
    ConfigNotLoaded,
}

impl ServiceError {
    /// Whether this error should also be surfaced as an outbound alert.
    ///
    /// `ConfigNotLoaded` is reported purely as a warning (spec.md §7); the
    /// others either already carry their own outbound command (click
    /// validation) or are adapter-visible diagnostics only.
    pub fn is_warning_only(&self) -> bool {
        matches!(self, Self::ConfigNotLoaded | Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_loaded_is_warning_only() {
        assert!(ServiceError::ConfigNotLoaded.is_warning_only());
    }

    #[test]
    fn state_length_mismatch_is_not_warning_only() {
        let err =
            ServiceError::StateLengthMismatch { device: "d".into(), expected: 1, got: 2 };
        assert!(!err.is_warning_only());
    }
}
