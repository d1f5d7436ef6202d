//! Error types for the NebulaGraph cluster operator
//!
//! Provides structured error types for the component layer: quantity
//! parsing, volume claim generation, and component resolution.

use thiserror::Error;

/// Unified error type for the operator
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("capacity parse error: {value:?} is not a valid quantity")]
    CapacityParse { value: String },

    #[error("cannot parse storage request for {component} {kind} volume: {source}")]
    VolumeClaimInvalid {
        component: String,
        kind: String,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // Component Resolution Errors
    // =========================================================================
    #[error("unsupported component type: {name}")]
    UnsupportedComponent { name: String },

    // =========================================================================
    // Serialization Errors
    // =========================================================================
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Don't requeue, wait for spec changes
    NoRequeue,
}

impl Error {
    /// Determine what action the reconciler should take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Invalid spec content - retrying cannot help until the spec changes
            Error::CapacityParse { .. }
            | Error::VolumeClaimInvalid { .. }
            | Error::UnsupportedComponent { .. } => ErrorAction::NoRequeue,

            // Everything else - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }
}

/// Result type alias for the operator
pub type Result<T> = std::result::Result<T, Error>;
