// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # softplc-config
//!
//! Runtime configuration for softplc: the file schema, the loader and the
//! resolution of source entries into validated driver configurations.
//!
//! ## Features
//!
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Placeholders**: `${VAR}` and `${VAR:default}` in raw text
//! - **Environment Overrides**: `SOFTPLC_LOG_LEVEL`, `SOFTPLC_LOG_FORMAT`
//! - **Partial Failure**: one bad source entry never fails the others
//!
//! ## Quick Start
//!
//! ```no_run
//! use softplc_config::{load_config, resolve_sources};
//! use softplc_core::SourceRegistry;
//!
//! let registry = SourceRegistry::new();
//! softplc_modbus::register(&registry);
//!
//! let config = load_config("softplc.yaml").unwrap();
//! let resolution = resolve_sources(&registry, &config.sources);
//!
//! for rejected in &resolution.rejected {
//!     eprintln!("{}: {}", rejected.name, rejected.error);
//! }
//! ```
//!
//! ## Configuration Schema
//!
//! - `runtime` - Instance name, shutdown grace period
//! - `logging` - Log level and format
//! - `supervisor` - Reconnect backoff policy
//! - `sources` - Source entries, decoded by their drivers

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod resolve;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigFileError, ConfigFileResult};
pub use loader::{ConfigFormat, ConfigLoader, ConfigLoaderBuilder, load_config, load_config_str};
pub use resolve::{RejectedSource, RejectionSummary, SourceResolution, resolve_sources};
pub use schema::{
    BackoffKind, LogFormat, LogLevel, LoggingConfig, RuntimeConfig, RuntimeSettings, SourceEntry,
    SupervisorConfig,
};
