// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # softplc-core
//!
//! Core abstractions of the softplc acquisition runtime.
//!
//! A softplc process reads process variables from field devices ("sources")
//! over industrial protocols and publishes them to a variable store. This crate
//! holds everything that is independent of a particular protocol:
//!
//! - **Duration**: the textual duration type used in configuration files
//! - **Error**: the error hierarchy shared by all crates
//! - **Source**: the configuration and runtime contracts every driver implements
//! - **Registry**: protocol type to configuration factory lookup
//! - **Supervisor**: the per-source lifecycle state machine
//! - **Store**: the variable store boundary and an in-memory implementation
//! - **Events**: lifecycle events and their handlers
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use softplc_core::{
//!     EventDispatcher, MemoryStore, SourceRegistry, SourceSupervisor, SupervisorSettings,
//! };
//!
//! let registry = SourceRegistry::new();
//! softplc_modbus::register(&registry);
//!
//! let config = registry.parse_config("modbus-tcp", "press-1", &raw)?;
//!
//! let store = Arc::new(MemoryStore::default());
//! let events = Arc::new(EventDispatcher::with_tracing());
//! let supervisor = SourceSupervisor::new(store, events, SupervisorSettings::default());
//! supervisor.spawn(config)?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod duration;
pub mod error;
pub mod state;
pub mod types;

// =============================================================================
// Source & Lifecycle Modules
// =============================================================================

pub mod events;
pub mod registry;
pub mod retry;
pub mod source;
pub mod supervisor;

// =============================================================================
// Store Modules
// =============================================================================

pub mod store;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use duration::Duration;
pub use error::*;
pub use state::SourceState;
pub use types::{Value, VariableValue};

pub use events::{CollectorHandler, EventDispatcher, EventHandler, SourceEvent, TracingHandler};
pub use registry::{SourceFactory, SourceRegistry};
pub use retry::BackoffPolicy;
pub use source::{ResolvedTiming, Source, SourceConfig, SourceTiming, ValidatedConfig};
pub use store::{MemoryStore, Snapshot, StoredValue, VariableKey, VariableStore};
pub use supervisor::{ShutdownReport, SourceStatus, SourceSupervisor, SupervisorSettings};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
