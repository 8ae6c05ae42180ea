// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Runtime orchestration.
//!
//! Startup order:
//!
//! 1. Build the registry and register every compiled-in driver
//! 2. Load the configuration
//! 3. Resolve sources, logging each rejection
//! 4. Create the variable store, the event dispatcher and the snapshot monitor
//! 5. Start one supervised task per source
//! 6. Wait for a shutdown signal
//! 7. Stop every source within `runtime.shutdown_timeout`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use softplc_config::{RuntimeConfig, SourceResolution, load_config, resolve_sources};
use softplc_core::{
    EventDispatcher, MemoryStore, ShutdownReport, SourceRegistry, SourceSupervisor,
};

use crate::error::{BinError, BinResult};
use crate::shutdown::{ShutdownCoordinator, ShutdownToken};

/// Builds a registry holding every driver compiled into this binary.
pub fn build_registry() -> SourceRegistry {
    let registry = SourceRegistry::new();
    softplc_modbus::register(&registry);
    registry
}

/// Logs every rejected source at error level.
pub fn log_rejections(resolution: &SourceResolution) {
    for rejected in &resolution.rejected {
        error!(
            source = %rejected.name,
            protocol = %rejected.source_type,
            error_type = rejected.error.error_type(),
            error = %rejected.error,
            "Source rejected; it will not run"
        );
    }
}

/// Traces every snapshot the store publishes until `token` is cancelled.
///
/// Resolves to the number of snapshots observed.
pub fn spawn_snapshot_monitor(store: &MemoryStore, token: ShutdownToken) -> JoinHandle<u64> {
    let mut snapshots = store.subscribe();

    tokio::spawn(async move {
        let mut seen = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                received = snapshots.recv() => match received {
                    Ok(snapshot) => {
                        seen += 1;
                        trace!(
                            source = %snapshot.source,
                            sequence = snapshot.sequence,
                            values = snapshot.values.len(),
                            "Snapshot published"
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Snapshot monitor fell behind");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        seen
    })
}

// =============================================================================
// PlcRuntime
// =============================================================================

/// The runtime that owns the supervisor for one configuration.
pub struct PlcRuntime {
    config: RuntimeConfig,
    registry: Arc<SourceRegistry>,
    shutdown: ShutdownCoordinator,
}

impl PlcRuntime {
    /// Creates a runtime for `config` with the built-in drivers.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            registry: Arc::new(build_registry()),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns the shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Runs until shutdown is signaled and returns the shutdown report.
    ///
    /// # Errors
    ///
    /// Returns [`BinError::NoSources`] when no source is valid and
    /// `runtime.require_sources` is set.
    pub async fn run(self) -> BinResult<ShutdownReport> {
        let runtime = self.config.runtime.name.as_str();
        info!(runtime, version = softplc_core::VERSION, "Starting softplc");

        let resolution = resolve_sources(&self.registry, &self.config.sources);
        log_rejections(&resolution);

        if resolution.configs.is_empty() {
            if self.config.runtime.require_sources {
                return Err(BinError::NoSources);
            }
            warn!(runtime, "No valid sources; idling until shutdown");
        }

        let rejected = resolution.rejected.len();
        let store = Arc::new(MemoryStore::default());
        let events = Arc::new(EventDispatcher::with_tracing());
        let monitor = spawn_snapshot_monitor(&store, self.shutdown.token());
        let supervisor =
            SourceSupervisor::new(store, events, self.config.supervisor.to_settings());

        let failed = supervisor.spawn_all(resolution.configs);

        info!(
            runtime,
            sources = supervisor.len(),
            rejected = rejected + failed.len(),
            backoff = supervisor.settings().backoff.name(),
            "softplc is running"
        );

        let trigger = self.shutdown.wait_for_shutdown().await;
        let grace = self.config.runtime.shutdown_grace();
        info!(
            runtime,
            trigger = %trigger,
            grace = %humantime::format_duration(grace),
            "Stopping sources"
        );

        let report = supervisor.shutdown(grace).await;
        match monitor.await {
            Ok(seen) => debug!(runtime, snapshots = seen, "Snapshot monitor stopped"),
            Err(e) => warn!(runtime, error = %e, "Snapshot monitor failed"),
        }
        log_report(runtime, &report);

        Ok(report)
    }
}

fn log_report(runtime: &str, report: &ShutdownReport) {
    let elapsed = humantime::format_duration(report.elapsed);
    if report.is_clean() {
        info!(
            runtime,
            stopped = report.stopped.len(),
            elapsed = %elapsed,
            "softplc shutdown complete"
        );
    } else {
        warn!(
            runtime,
            stopped = report.stopped.len(),
            aborted = ?report.aborted,
            panicked = ?report.panicked,
            elapsed = %elapsed,
            "softplc shutdown complete with unclean stops"
        );
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`PlcRuntime`].
#[derive(Debug, Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<RuntimeConfig>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the runtime, loading the file if no configuration was given.
    pub fn build(self) -> BinResult<PlcRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::init("no configuration provided"))?;
                load_config(&path)?
            }
        };

        Ok(PlcRuntime::new(config))
    }
}

// =============================================================================
// Tests
// =============================================================================
