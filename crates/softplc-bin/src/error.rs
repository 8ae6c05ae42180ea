// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the softplc binary.

use thiserror::Error;

use softplc_config::ConfigFileError;
use softplc_core::PlcError;

/// Result type alias for softplc-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Exit code for configuration failures.
pub const EXIT_CONFIG: i32 = 2;

/// Exit code for runtime failures.
pub const EXIT_RUNTIME: i32 = 3;

/// Exit code for everything else.
pub const EXIT_OTHER: i32 = 1;

/// Errors that can occur in the softplc binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// The configuration file could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigFileError),

    /// Some source entries were rejected.
    #[error("{rejected} of {total} source(s) rejected")]
    SourcesRejected {
        /// Number of rejected entries.
        rejected: usize,
        /// Number of entries in the file.
        total: usize,
    },

    /// No source survived resolution and the configuration requires one.
    #[error("No valid sources to run (runtime.require_sources is set)")]
    NoSources,

    /// Initialization error.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Source subsystem error.
    #[error("Runtime error: {0}")]
    Plc(#[from] PlcError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        /// The context description.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates an initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Creates a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Adds context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::SourcesRejected { .. } | Self::NoSources => EXIT_CONFIG,
            Self::Runtime(_) | Self::Plc(_) => EXIT_RUNTIME,
            Self::Initialization(_) | Self::Io(_) => EXIT_OTHER,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error and its cause chain on stderr.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use softplc_core::SupervisorError;

    #[test]
    fn test_error_with_context() {
        let err = BinError::runtime("supervisor gone").with_context("while stopping");
        assert_eq!(err.to_string(), "while stopping: Runtime error: supervisor gone");
        assert_eq!(err.exit_code(), EXIT_RUNTIME);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BinError::from(ConfigFileError::not_found("x.yaml")).exit_code(), 2);
        assert_eq!(BinError::SourcesRejected { rejected: 1, total: 3 }.exit_code(), 2);
        assert_eq!(BinError::NoSources.exit_code(), 2);
        assert_eq!(BinError::runtime("boom").exit_code(), 3);
        assert_eq!(BinError::from(PlcError::from(SupervisorError::ShuttingDown)).exit_code(), 3);
        assert_eq!(BinError::init("subscriber").exit_code(), 1);
    }

    #[test]
    fn test_rejected_message() {
        let err = BinError::SourcesRejected { rejected: 1, total: 3 };
        assert_eq!(err.to_string(), "1 of 3 source(s) rejected");
    }
}
