// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the UA Scope client core.
//!
//! # Error Categories
//!
//! ```text
//! ClientError
//! ├── Connection    - Session open/handshake and connectivity issues
//! ├── Operation     - Attribute read and monitored item failures
//! ├── Subscription  - Subscription lifecycle, transfer, and recreate errors
//! └── Configuration - Invalid settings
//! ```
//!
//! Errors from the session client never cross the connection manager
//! boundary: `connect`/`reconnect` convert them into a `false` return plus a
//! `ConnectionError` event, and add/remove operations convert them into
//! `None`/`false` returns with a logged message.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

/// Convenience result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

// =============================================================================
// ClientError - Main Error Type
// =============================================================================

/// The main error type for client core operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection-related errors.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// Attribute read and monitored item operation errors.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Subscription lifecycle errors.
    #[error("{0}")]
    Subscription(#[from] SubscriptionError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
}

impl ClientError {
    /// Creates a connection error.
    #[inline]
    pub fn connection(error: ConnectionError) -> Self {
        Self::Connection(error)
    }

    /// Creates an operation error.
    #[inline]
    pub fn operation(error: OperationError) -> Self {
        Self::Operation(error)
    }

    /// Creates a subscription error.
    #[inline]
    pub fn subscription(error: SubscriptionError) -> Self {
        Self::Subscription(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates a not-connected error.
    pub fn not_connected() -> Self {
        Self::Connection(ConnectionError::NotConnected)
    }

    /// Returns `true` if this error is retryable.
    ///
    /// Retryable errors are transient issues that may succeed on a
    /// subsequent attempt (typically after a reconnect).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_retryable(),
            Self::Operation(_) => true,
            Self::Subscription(e) => e.is_retryable(),
            Self::Configuration(_) => false,
        }
    }

    /// Returns the error category for logging and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Operation(_) => "operation",
            Self::Subscription(_) => "subscription",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Connection(e) => e.severity(),
            Self::Operation(_) => ErrorSeverity::Warning,
            Self::Subscription(e) => e.severity(),
            Self::Configuration(_) => ErrorSeverity::Critical,
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Errors related to session connectivity.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The endpoint refused the connection.
    #[error("Connection refused by endpoint '{endpoint}'")]
    Refused {
        /// The endpoint that refused the connection.
        endpoint: String,
    },

    /// The session handshake failed after the transport connected.
    #[error("Session handshake with '{endpoint}' failed: {reason}")]
    HandshakeFailed {
        /// The endpoint being connected to.
        endpoint: String,
        /// Why the handshake failed.
        reason: String,
    },

    /// No session is currently established.
    #[error("Not connected to any endpoint")]
    NotConnected,

    /// The session was dropped unexpectedly.
    #[error("Session dropped: {reason}")]
    Dropped {
        /// Why the session was lost.
        reason: String,
    },

    /// The operation timed out.
    #[error("Connection attempt timed out after {duration:?}")]
    Timeout {
        /// How long the attempt ran before timing out.
        duration: Duration,
    },
}

impl ConnectionError {
    /// Creates a connection refused error.
    pub fn refused(endpoint: impl Into<String>) -> Self {
        Self::Refused {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a handshake failure error.
    pub fn handshake_failed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HandshakeFailed {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates a session dropped error.
    pub fn dropped(reason: impl Into<String>) -> Self {
        Self::Dropped {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotConnected)
    }

    /// Returns the severity of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotConnected => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }
}

// =============================================================================
// OperationError
// =============================================================================

/// Errors from per-node operations issued through the session client.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Reading node attributes from the address space failed.
    #[error("Failed to read attributes of node '{node_id}': {reason}")]
    AttributeReadFailed {
        /// The node whose attributes could not be read.
        node_id: String,
        /// Why the read failed.
        reason: String,
    },

    /// Creating a monitored item failed.
    #[error("Failed to create monitored item for node '{node_id}': {reason}")]
    MonitorCreateFailed {
        /// The node that could not be monitored.
        node_id: String,
        /// Why the creation failed.
        reason: String,
    },

    /// Deleting a monitored item failed.
    #[error("Failed to delete monitored item {item_id}: {reason}")]
    MonitorDeleteFailed {
        /// The protocol item id that could not be deleted.
        item_id: u32,
        /// Why the deletion failed.
        reason: String,
    },
}

impl OperationError {
    /// Creates an attribute read failure.
    pub fn attribute_read_failed(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AttributeReadFailed {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a monitored item creation failure.
    pub fn monitor_create_failed(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MonitorCreateFailed {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a monitored item deletion failure.
    pub fn monitor_delete_failed(item_id: u32, reason: impl Into<String>) -> Self {
        Self::MonitorDeleteFailed {
            item_id,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// SubscriptionError
// =============================================================================

/// Errors from subscription lifecycle operations.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Creating the subscription on the server failed.
    #[error("Subscription creation failed: {reason}")]
    CreationFailed {
        /// Why the subscription could not be created.
        reason: String,
    },

    /// The subscription manager has not been initialized yet.
    #[error("Subscription not initialized; call initialize() first")]
    NotInitialized,

    /// The server rejected a subscription transfer onto the new session.
    #[error("Subscription transfer rejected: {reason}")]
    TransferRejected {
        /// Why the transfer was rejected.
        reason: String,
    },

    /// Rebuilding the subscription after a reconnect failed.
    #[error("Subscription recreate failed: {reason}")]
    RecreateFailed {
        /// Why the rebuild failed.
        reason: String,
    },

    /// No variable is tracked under the given client handle.
    #[error("Unknown client handle {handle}")]
    UnknownHandle {
        /// The handle that was looked up.
        handle: u32,
    },
}

impl SubscriptionError {
    /// Creates a subscription creation failure.
    pub fn creation_failed(reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            reason: reason.into(),
        }
    }

    /// Creates a transfer rejection error.
    pub fn transfer_rejected(reason: impl Into<String>) -> Self {
        Self::TransferRejected {
            reason: reason.into(),
        }
    }

    /// Creates a recreate failure.
    pub fn recreate_failed(reason: impl Into<String>) -> Self {
        Self::RecreateFailed {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::UnknownHandle { .. })
    }

    /// Returns the severity of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // Transfer rejection is recoverable: recreate follows.
            Self::TransferRejected { .. } => ErrorSeverity::Info,
            Self::UnknownHandle { .. } => ErrorSeverity::Warning,
            // Recreate failure drops the monitored set.
            Self::RecreateFailed { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Errors from invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required field is missing.
    #[error("Missing required configuration field '{field}'")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// The endpoint URL is invalid.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The offending endpoint string.
        endpoint: String,
        /// Why it is invalid.
        reason: String,
    },

    /// A node id string could not be parsed.
    #[error("Invalid node id '{input}': {reason}")]
    InvalidNodeId {
        /// The offending input.
        input: String,
        /// Why it could not be parsed.
        reason: String,
    },

    /// An interval setting is out of range.
    #[error("Invalid interval {value:?}: {reason}")]
    InvalidInterval {
        /// The offending value.
        value: Duration,
        /// Why it is invalid.
        reason: String,
    },
}

impl ConfigurationError {
    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid node id error.
    pub fn invalid_node_id(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid interval error.
    pub fn invalid_interval(value: Duration, reason: impl Into<String>) -> Self {
        Self::InvalidInterval {
            value,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Severity level of an error, used to pick the log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Expected and recoverable; normal control flow.
    Info,

    /// Degraded but operational.
    Warning,

    /// Operation failed; caller should handle.
    Error,

    /// Data loss or unusable configuration.
    Critical,
}

impl ErrorSeverity {
    /// Returns the matching tracing level.
    pub fn to_tracing_level(&self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = ClientError::connection(ConnectionError::refused("opc.tcp://plc:4840"));
        assert_eq!(err.category(), "connection");

        let err = ClientError::subscription(SubscriptionError::NotInitialized);
        assert_eq!(err.category(), "subscription");

        let err = ClientError::configuration(ConfigurationError::missing_field("endpoint"));
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn test_retryability() {
        assert!(ClientError::connection(ConnectionError::dropped("keepalive expired")).is_retryable());
        assert!(!ClientError::not_connected().is_retryable());
        assert!(!ClientError::configuration(ConfigurationError::missing_field("endpoint"))
            .is_retryable());
        assert!(
            !ClientError::subscription(SubscriptionError::UnknownHandle { handle: 7 })
                .is_retryable()
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
    }

    #[test]
    fn test_recreate_failure_is_critical() {
        let err = ClientError::subscription(SubscriptionError::recreate_failed("rebuild rejected"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::operation(OperationError::monitor_create_failed(
            "ns=2;i=1001",
            "BadNodeIdUnknown",
        ));
        let text = err.to_string();
        assert!(text.contains("ns=2;i=1001"));
        assert!(text.contains("BadNodeIdUnknown"));
    }
}
