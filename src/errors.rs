//! Accessbridge error types.

use crate::contract::action::Action;
use thiserror::Error;

/// Errors reported by a remote account/payment service.
///
/// The bridge only distinguishes presence from absence of an error when
/// choosing which callback to invoke, but the variant travels with the
/// failure so callers can tell a rejected password from a dead network.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// HTTP transport error communicating with the service.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Service-specific error code, when the body carried one.
        code: Option<i64>,
        /// Human-readable message from the service.
        message: String,
    },

    /// Failed to parse a service response.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The operation needs an authenticated session and there is none.
    #[error("No active session")]
    NoSession,

    /// The service does not provide this operation.
    #[error("{operation} is not implemented by this service")]
    NotImplemented {
        /// Name of the missing operation.
        operation: &'static str,
    },

    /// Session persistence failed.
    #[error("Session store error: {0}")]
    SessionStore(String),
}

impl RemoteError {
    /// Shorthand for [`RemoteError::NotImplemented`].
    pub fn not_implemented(operation: &'static str) -> Self {
        Self::NotImplemented { operation }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "REMOTE_TRANSPORT",
            Self::Rejected { .. } => "REMOTE_REJECTED",
            Self::Protocol(_) => "REMOTE_PROTOCOL",
            Self::NoSession => "NO_SESSION",
            Self::NotImplemented { .. } => "NOT_IMPLEMENTED",
            Self::SessionStore(_) => "SESSION_STORE",
        }
    }
}

/// Errors surfaced by the bridge.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The remote operation backing an action reported an error.
    #[error("{action} failed: {source}")]
    RemoteOperationFailed {
        /// Action that was being performed.
        action: Action,
        /// The underlying remote error.
        #[source]
        source: RemoteError,
    },

    /// A purchase action was requested with no purchase records.
    #[error("{action} requires at least one purchase record")]
    MissingPurchase {
        /// Action that was being performed.
        action: Action,
    },

    /// The request was dropped before an outcome was delivered.
    #[error("{action} finished without delivering an outcome")]
    OutcomeDropped {
        /// Action that was being performed.
        action: Action,
    },

    /// No async runtime was available to drive requests.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl BridgeError {
    /// Stable machine-readable code for this error.
    ///
    /// Remote failures report the code of the underlying [`RemoteError`].
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG",
            Self::RemoteOperationFailed { source, .. } => source.code(),
            Self::MissingPurchase { .. } => "MISSING_PURCHASE",
            Self::OutcomeDropped { .. } => "OUTCOME_DROPPED",
            Self::Runtime(_) => "RUNTIME",
        }
    }
}
