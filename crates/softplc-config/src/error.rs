// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for runtime configuration loading.
//!
//! These errors concern the configuration *file*: reading it, detecting its
//! format, decoding it and checking its top-level sections. Errors inside a
//! single source entry are [`softplc_core::ConfigError`]s and are reported
//! per source by [`crate::resolve::resolve_sources`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the runtime configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Reading the file failed.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file does not exist.
    #[error("Configuration file not found: {path}")]
    NotFound {
        /// The file path.
        path: PathBuf,
    },

    /// The file could not be decoded.
    #[error("Failed to parse '{path}': {message}")]
    Parse {
        /// The file path, or `<string>` for in-memory content.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },

    /// The file extension names no supported format.
    #[error("Unsupported configuration format: '{format}' (expected yaml, yml, toml or json)")]
    UnsupportedFormat {
        /// The offending extension.
        format: String,
    },

    /// A top-level field holds an invalid value.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },
}

impl ConfigFileError {
    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a file-not-found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::NotFound { .. } => "not_found",
            Self::Parse { .. } => "parse",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::Validation { .. } => "validation",
        }
    }
}

/// Result type for configuration file operations.
pub type ConfigFileResult<T> = Result<T, ConfigFileError>;

// =============================================================================
// Tests
// =============================================================================
