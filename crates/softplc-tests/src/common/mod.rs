// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! - `device`: An in-memory Modbus device for the real Modbus source
//! - `fixtures`: Sample configuration and source entries
//! - `mocks`: Scripted [`Source`](softplc_core::Source) implementations
//! - `recorder`: Event recording with virtual-clock timestamps

pub mod device;
pub mod fixtures;
pub mod mocks;
pub mod recorder;

pub use device::*;
pub use fixtures::*;
pub use mocks::*;
pub use recorder::*;

use std::sync::Arc;
use std::sync::Once;

use softplc_core::{EventDispatcher, MemoryStore, SourceSupervisor, SupervisorSettings};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize test logging. Call this at the start of each test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,softplc_core=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A supervisor wired to an in-memory store and a recording handler.
pub struct SupervisorHarness {
    /// The supervisor under test.
    pub supervisor: SourceSupervisor,
    /// The store receiving snapshots.
    pub store: Arc<MemoryStore>,
    /// Every event the supervisor dispatched.
    pub recorder: Arc<RecordingHandler>,
}

impl SupervisorHarness {
    /// Creates a harness with the default flat backoff.
    pub fn new() -> Self {
        Self::with_settings(SupervisorSettings::default())
    }

    /// Creates a harness with explicit supervisor settings.
    pub fn with_settings(settings: SupervisorSettings) -> Self {
        let store = Arc::new(MemoryStore::default());
        let recorder = Arc::new(RecordingHandler::new());
        let events = Arc::new(EventDispatcher::new());
        events.register(recorder.clone());

        Self {
            supervisor: SourceSupervisor::new(store.clone(), events, settings),
            store,
            recorder,
        }
    }
}

impl Default for SupervisorHarness {
    fn default() -> Self {
        Self::new()
    }
}
