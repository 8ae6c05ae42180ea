// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error hierarchy for the source subsystem.
//!
//! Errors fall into four groups:
//!
//! - Configuration errors are detected at load time and exclude the offending
//!   source from startup.
//! - Registration errors signal two drivers claiming the same protocol type.
//! - Runtime I/O errors are recoverable and drive a source into backoff.
//! - Supervisor errors cover misuse of the task owner.
//!
//! # Error Hierarchy
//!
//! ```text
//! PlcError (root)
//! ├── ConfigError      - Duration parsing, validation, unknown source types
//! ├── RegistryError    - Duplicate protocol registration
//! ├── SourceError      - Connect / poll / close failures
//! ├── StoreError       - Variable store rejections
//! └── SupervisorError  - Task spawning and shutdown
//! ```
//!
//! # Examples
//!
//! ```
//! use softplc_core::error::{PlcError, SourceError};
//! use std::time::Duration;
//!
//! let error = SourceError::timeout(Duration::from_secs(3));
//! assert!(error.is_retryable());
//!
//! let plc_error: PlcError = error.into();
//! assert_eq!(plc_error.error_type(), "source");
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;

// =============================================================================
// PlcError - Root Error Type
// =============================================================================

/// The root error type of the source subsystem.
#[derive(Debug, Error)]
pub enum PlcError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Registry error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Source runtime error.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Variable store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Supervisor error.
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),
}

impl PlcError {
    /// Returns `true` if retrying the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlcError::Source(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            PlcError::Config(_) => "config",
            PlcError::Registry(_) => "registry",
            PlcError::Source(_) => "source",
            PlcError::Store(_) => "store",
            PlcError::Supervisor(_) => "supervisor",
        }
    }
}

// =============================================================================
// ConfigError
// =============================================================================

/// Source configuration errors.
///
/// Every variant is fatal for the source it describes and for nothing else.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A duration string could not be parsed.
    #[error("Invalid duration format '{input}': {reason}")]
    InvalidDurationFormat {
        /// The offending text.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A field holds an out-of-range or malformed value.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Required field is missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// The missing field name.
        field: String,
    },

    /// No driver is registered for the requested protocol type.
    #[error(
        "Unknown source type '{source_type}' (source: {source_name}); registered types: [{}]",
        format_types(.registered)
    )]
    UnknownSourceType {
        /// The requested protocol type.
        source_type: String,
        /// The source that requested it.
        source_name: String,
        /// Protocol types known to the registry at lookup time.
        registered: BTreeSet<String>,
    },

    /// The raw configuration node could not be decoded.
    #[error("Failed to parse configuration of source '{source_name}': {message}")]
    Parse {
        /// The source being parsed.
        source_name: String,
        /// Decoder message.
        message: String,
    },

    /// A driver broke a contract the runtime relies on.
    #[error("Invariant violated: {message}")]
    InvariantViolation {
        /// Diagnostic message.
        message: String,
    },

    /// Wraps another configuration error with source identity.
    #[error("Source '{source_name}' ({protocol}): {error}")]
    Source {
        /// The source name.
        source_name: String,
        /// The protocol type.
        protocol: String,
        /// The underlying error.
        #[source]
        error: Box<ConfigError>,
    },
}

fn format_elapsed(duration: &Duration) -> String {
    humantime::format_duration(*duration).to_string()
}

fn format_types(types: &BTreeSet<String>) -> String {
    types.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl ConfigError {
    /// Creates an invalid duration error.
    pub fn invalid_duration(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDurationFormat {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    /// Creates a parse error.
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates an invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation { message: message.into() }
    }

    /// Attaches source identity to the error.
    ///
    /// Errors that already carry identity are returned unchanged.
    pub fn for_source(self, source_name: &str, protocol: &str) -> Self {
        match self {
            already @ (ConfigError::Source { .. } | ConfigError::UnknownSourceType { .. }) => {
                already
            }
            other => ConfigError::Source {
                source_name: source_name.to_string(),
                protocol: protocol.to_string(),
                error: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, skipping identity wrappers.
    pub fn root(&self) -> &ConfigError {
        match self {
            ConfigError::Source { error, .. } => error.root(),
            other => other,
        }
    }

    /// Returns the offending field, if the error names one.
    pub fn field(&self) -> Option<&str> {
        match self.root() {
            ConfigError::Validation { field, .. } | ConfigError::MissingField { field } => {
                Some(field)
            }
            _ => None,
        }
    }

    /// Returns the error type for logging.
    pub fn error_type(&self) -> &'static str {
        match self.root() {
            ConfigError::InvalidDurationFormat { .. } => "invalid_duration_format",
            ConfigError::Validation { .. } => "validation",
            ConfigError::MissingField { .. } => "missing_field",
            ConfigError::UnknownSourceType { .. } => "unknown_source_type",
            ConfigError::Parse { .. } => "parse",
            ConfigError::InvariantViolation { .. } => "invariant_violation",
            ConfigError::Source { .. } => "source",
        }
    }
}

// =============================================================================
// RegistryError
// =============================================================================

/// Driver registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two drivers claimed the same protocol type.
    #[error("Source type '{source_type}' already registered")]
    DuplicateRegistration {
        /// The contested protocol type.
        source_type: String,
    },
}

// =============================================================================
// SourceError
// =============================================================================

/// Runtime errors raised by a running source.
///
/// These never escape the source's own task: the supervisor records them and
/// moves the source into backoff.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Connection could not be established.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation did not complete in time.
    #[error("Operation timed out after {}", format_elapsed(.duration))]
    Timeout {
        /// The bound that elapsed.
        duration: Duration,
    },

    /// Operation attempted without a live connection.
    #[error("Source is not connected")]
    NotConnected,

    /// Device answered with a protocol-level rejection.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Error message.
        message: String,
    },

    /// Device answered with data that could not be interpreted.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },

    /// Transport I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Creates a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a connection failed error with a source.
    pub fn connection_failed_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol { message: message.into() }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }

    /// Returns `true` if this error is retryable.
    ///
    /// Every runtime error leads to backoff; the distinction only affects how
    /// loudly the failure is reported.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::Timeout { .. }
                | SourceError::ConnectionFailed { .. }
                | SourceError::NotConnected
                | SourceError::Io(_)
        )
    }

    /// Returns the error type for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            SourceError::ConnectionFailed { .. } => "connection_failed",
            SourceError::Timeout { .. } => "timeout",
            SourceError::NotConnected => "not_connected",
            SourceError::Protocol { .. } => "protocol",
            SourceError::InvalidResponse { .. } => "invalid_response",
            SourceError::Io(_) => "io",
        }
    }
}

// =============================================================================
// StoreError
// =============================================================================

/// Variable store errors.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store refused the snapshot.
    #[error("Snapshot from '{source_name}' rejected: {message}")]
    Rejected {
        /// The publishing source.
        source_name: String,
        /// Reason.
        message: String,
    },
}

impl StoreError {
    /// Creates a rejection error.
    pub fn rejected(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// SupervisorError
// =============================================================================

/// Supervisor errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    /// A task for this source name already exists.
    #[error("Source '{name}' is already supervised")]
    DuplicateSource {
        /// The source name.
        name: String,
    },

    /// Shutdown has started; no new tasks are accepted.
    #[error("Supervisor is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Result Aliases
// =============================================================================

/// A Result type with PlcError.
pub type PlcResult<T> = Result<T, PlcError>;

/// A Result type with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A Result type with SourceError.
pub type SourceResult<T> = Result<T, SourceError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_retryable() {
        assert!(SourceError::timeout(Duration::from_secs(5)).is_retryable());
        assert!(SourceError::connection_failed("refused").is_retryable());
        assert!(SourceError::NotConnected.is_retryable());
        assert!(!SourceError::protocol("illegal data address").is_retryable());
    }

    #[test]
    fn test_timeout_message_is_human_readable() {
        let error = SourceError::timeout(Duration::from_millis(1500));
        assert_eq!(error.to_string(), "Operation timed out after 1s 500ms");
    }

    #[test]
    fn test_unknown_source_type_lists_registered() {
        let registered: BTreeSet<String> =
            ["modbus-tcp", "opcua-client"].iter().map(|s| s.to_string()).collect();
        let error = ConfigError::UnknownSourceType {
            source_type: "profinet".into(),
            source_name: "press-1".into(),
            registered,
        };

        let message = error.to_string();
        assert!(message.contains("'profinet'"));
        assert!(message.contains("press-1"));
        assert!(message.contains("modbus-tcp, opcua-client"));
        assert_eq!(error.error_type(), "unknown_source_type");
    }

    #[test]
    fn test_for_source_wraps_once() {
        let error = ConfigError::validation("port", "must be in 1..=65535")
            .for_source("press-1", "modbus-tcp")
            .for_source("other", "other");

        match &error {
            ConfigError::Source { source_name, protocol, .. } => {
                assert_eq!(source_name, "press-1");
                assert_eq!(protocol, "modbus-tcp");
            }
            other => panic!("Expected Source wrapper, got {:?}", other),
        }
        assert_eq!(error.field(), Some("port"));
        assert_eq!(error.error_type(), "validation");
        assert!(error.to_string().contains("press-1"));
    }

    #[test]
    fn test_plc_error_conversion() {
        let error: PlcError = RegistryError::DuplicateRegistration {
            source_type: "modbus-tcp".into(),
        }
        .into();

        assert!(!error.is_retryable());
        assert_eq!(error.error_type(), "registry");
        assert!(error.to_string().contains("already registered"));
    }
}
