// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # softplc Integration Tests
//!
//! Test utilities and integration suites for the softplc runtime.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `mocks`: Scripted sources with shared call counters
//!   - `device`: A simulated Modbus device behind the real Modbus source
//!   - `fixtures`: Sample configuration files and source entries
//!   - `recorder`: An event handler that timestamps every event
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p softplc-tests
//!
//! # Run one suite
//! cargo test -p softplc-tests --test integration_supervisor
//! cargo test -p softplc-tests --test integration_registry
//! cargo test -p softplc-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Registry Tests (`integration_registry.rs`)
//! - Registration uniqueness
//! - Unknown protocol types
//! - Built-in driver parsing
//!
//! ### Config Tests (`integration_config.rs`)
//! - File loading through resolution
//! - Partial rejection of invalid entries
//! - Running resolved sources end to end
//!
//! ### Supervisor Tests (`integration_supervisor.rs`)
//! - Lifecycle transitions and snapshot cadence
//! - Connection timeouts and retry timing
//! - Graceful shutdown
//! - Failure isolation between sources
//!
//! Supervisor tests run with `#[tokio::test(start_paused = true)]`, so every
//! interval is observed at its exact virtual instant.
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use softplc_tests::prelude::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_something() {
//!     let mock = MockSourceConfig::new("press-1", MockBehavior::Healthy);
//!     let probe = mock.probe();
//!     // ... spawn mock.validated() on a supervisor
//! }
//! ```

pub mod common;

/// Commonly used items for integration tests.
pub mod prelude {
    pub use crate::common::device::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::{SupervisorHarness, init_test_logging};
    pub use crate::common::mocks::*;
    pub use crate::common::recorder::*;

    pub use softplc_core::{
        BackoffPolicy, EventDispatcher, MemoryStore, SourceRegistry, SourceState,
        SourceSupervisor, SupervisorSettings, ValidatedConfig,
    };
}
