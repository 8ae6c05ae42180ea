// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Source supervisor.
//!
//! The supervisor owns one tokio task per configured source. Each task runs
//! the lifecycle state machine:
//!
//! ```text
//! Disconnected ─► Connecting ─► Connected ─► Polling
//!                   ▲   │                       │
//!                   │   ▼                       │
//!                  Backoff ◄────────────────────┘
//! ```
//!
//! - Connect, poll and close are each bounded by the source timeout.
//! - Polls run at the poll interval, strictly one at a time. A failed or
//!   timed-out poll closes the connection and publishes nothing.
//! - Backoff waits the delay given by the [`BackoffPolicy`] (flat by default),
//!   then reconnects. Retries never stop on their own.
//! - Shutdown is broadcast to every task. A task reacts at its next suspension
//!   point, cancels in-flight I/O, closes its connection and reports
//!   `Stopped`.
//!
//! Dropping the supervisor also stops its tasks, since their shutdown channel
//! closes.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use softplc_core::{EventDispatcher, MemoryStore, SourceSupervisor, SupervisorSettings};
//!
//! let store = Arc::new(MemoryStore::default());
//! let events = Arc::new(EventDispatcher::with_tracing());
//! let supervisor = SourceSupervisor::new(store, events, SupervisorSettings::default());
//!
//! supervisor.spawn(registry.parse_config("modbus-tcp", "press-1", &raw)?)?;
//! // ...
//! let report = supervisor.shutdown(Duration::from_secs(5)).await;
//! assert!(report.is_clean());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, timeout};
use tracing::Instrument;

use crate::error::{PlcError, PlcResult, SourceError, SupervisorError};
use crate::events::{EventDispatcher, SourceEvent};
use crate::retry::BackoffPolicy;
use crate::source::{ResolvedTiming, Source, ValidatedConfig};
use crate::state::SourceState;
use crate::store::{Snapshot, VariableStore};
use crate::types::VariableValue;

// =============================================================================
// Status
// =============================================================================

/// Read-only status of one supervised source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatus {
    /// Source name.
    pub name: String,
    /// Protocol type.
    pub protocol: String,
    /// Endpoint description.
    pub endpoint: String,
    /// Current lifecycle state.
    pub state: SourceState,
    /// When the current state was entered.
    pub since: DateTime<Utc>,
    /// Most recent error, kept until the next successful connect.
    pub last_error: Option<String>,
    /// Connection attempts made.
    pub connect_attempts: u64,
    /// Consecutive failures since the last successful connect.
    pub consecutive_failures: u32,
    /// Successful poll cycles.
    pub polls_ok: u64,
    /// Failed poll cycles.
    pub polls_failed: u64,
    /// Timestamp of the last published snapshot.
    pub last_poll: Option<DateTime<Utc>>,
}

impl SourceStatus {
    fn new(config: &ValidatedConfig) -> Self {
        Self {
            name: config.name().to_string(),
            protocol: config.protocol_type().to_string(),
            endpoint: config.endpoint(),
            state: SourceState::Disconnected,
            since: Utc::now(),
            last_error: None,
            connect_attempts: 0,
            consecutive_failures: 0,
            polls_ok: 0,
            polls_failed: 0,
            last_poll: None,
        }
    }
}

// =============================================================================
// Shutdown Report
// =============================================================================

/// Outcome of [`SourceSupervisor::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Sources whose task reached `Stopped` on its own.
    pub stopped: Vec<String>,
    /// Sources whose task outlived the grace period and was aborted.
    pub aborted: Vec<String>,
    /// Sources whose task panicked.
    pub panicked: Vec<String>,
    /// Time spent waiting for tasks.
    pub elapsed: Duration,
}

impl ShutdownReport {
    /// Returns `true` if every task stopped on its own.
    pub fn is_clean(&self) -> bool {
        self.aborted.is_empty() && self.panicked.is_empty()
    }

    /// Total number of tasks joined.
    pub fn total(&self) -> usize {
        self.stopped.len() + self.aborted.len() + self.panicked.len()
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Supervisor-wide settings applied to every source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SupervisorSettings {
    /// Delay policy between connection attempts.
    pub backoff: BackoffPolicy,
}

impl SupervisorSettings {
    /// Creates settings with the given backoff policy.
    pub fn with_backoff(backoff: BackoffPolicy) -> Self {
        Self { backoff }
    }
}

// =============================================================================
// SourceSupervisor
// =============================================================================

struct SupervisedTask {
    name: String,
    handle: JoinHandle<()>,
}

/// Owns and drives one task per source.
pub struct SourceSupervisor {
    store: Arc<dyn VariableStore>,
    events: Arc<EventDispatcher>,
    settings: SupervisorSettings,
    shutdown_tx: broadcast::Sender<()>,
    stopping: Arc<AtomicBool>,
    statuses: Arc<DashMap<String, SourceStatus>>,
    tasks: Mutex<Vec<SupervisedTask>>,
}

impl SourceSupervisor {
    /// Creates a supervisor publishing to `store` and reporting to `events`.
    pub fn new(
        store: Arc<dyn VariableStore>,
        events: Arc<EventDispatcher>,
        settings: SupervisorSettings,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            store,
            events,
            settings,
            shutdown_tx,
            stopping: Arc::new(AtomicBool::new(false)),
            statuses: Arc::new(DashMap::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Returns the supervisor settings.
    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Starts supervising one source.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`SupervisorError::ShuttingDown`] after shutdown has begun.
    /// - [`SupervisorError::DuplicateSource`] if the name is already in use.
    /// - A configuration error if the driver cannot build its source.
    pub fn spawn(&self, config: ValidatedConfig) -> PlcResult<()> {
        if self.stopping.load(Ordering::SeqCst) {
            return Err(SupervisorError::ShuttingDown.into());
        }

        let name = config.name().to_string();
        if self.statuses.contains_key(&name) {
            return Err(SupervisorError::DuplicateSource { name }.into());
        }

        let source = config.create_source()?;
        let status = SourceStatus::new(&config);
        self.statuses.insert(name.clone(), status);

        let task = SourceTask {
            name: name.clone(),
            protocol: config.protocol_type().to_string(),
            timing: config.timing(),
            source,
            store: Arc::clone(&self.store),
            events: Arc::clone(&self.events),
            backoff: self.settings.backoff,
            statuses: Arc::clone(&self.statuses),
            shutdown: self.shutdown_tx.subscribe(),
            stopping: Arc::clone(&self.stopping),
            state: SourceState::Disconnected,
            failures: 0,
            sequence: 0,
            last_timestamp: None,
            connection_open: false,
        };

        tracing::info!(
            source = %name,
            protocol = %config.protocol_type(),
            endpoint = %config.endpoint(),
            poll_interval = %humantime::format_duration(config.timing().poll_interval),
            "Starting source"
        );

        let span = tracing::info_span!("source", name = %name);
        let handle = tokio::spawn(task.run().instrument(span));
        self.tasks.lock().push(SupervisedTask { name, handle });
        Ok(())
    }

    /// Starts every config, returning the ones that could not be started.
    pub fn spawn_all(
        &self,
        configs: impl IntoIterator<Item = ValidatedConfig>,
    ) -> Vec<(String, PlcError)> {
        let mut failures = Vec::new();
        for config in configs {
            let name = config.name().to_string();
            if let Err(e) = self.spawn(config) {
                tracing::error!(source = %name, error = %e, "Failed to start source");
                failures.push((name, e));
            }
        }
        failures
    }

    /// Returns the supervised source names, sorted.
    pub fn source_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.statuses.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Returns the status of one source.
    pub fn status(&self, name: &str) -> Option<SourceStatus> {
        self.statuses.get(name).map(|s| s.value().clone())
    }

    /// Returns the status of every source, sorted by name.
    pub fn statuses(&self) -> Vec<SourceStatus> {
        let mut statuses: Vec<_> = self.statuses.iter().map(|s| s.value().clone()).collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Returns the number of supervised sources.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Returns `true` if no source is supervised.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Returns `true` while any task is still running.
    pub fn is_running(&self) -> bool {
        self.tasks.lock().iter().any(|t| !t.handle.is_finished())
    }

    /// Stops every source and waits for its task to end.
    ///
    /// Tasks get `grace` to close their connections and report `Stopped`.
    /// Tasks still running after that are aborted. Returns once every task
    /// has ended. Calling it again returns an empty report.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        let started = Instant::now();
        if !self.stopping.swap(true, Ordering::SeqCst) {
            tracing::info!(sources = self.statuses.len(), "Stopping sources");
        }
        // Receivers that already observed the flag ignore the message.
        let _ = self.shutdown_tx.send(());

        let tasks = std::mem::take(&mut *self.tasks.lock());
        let deadline = started + grace;
        let mut report = ShutdownReport::default();

        for SupervisedTask { name, mut handle } in tasks {
            let joined = match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    tracing::warn!(source = %name, "Source did not stop within grace period; aborted");
                    let _ = handle.await;
                    self.mark_stopped(&name, "aborted after shutdown grace period");
                    report.aborted.push(name);
                    continue;
                }
            };

            match joined {
                Ok(()) => report.stopped.push(name),
                Err(e) if e.is_panic() => {
                    tracing::error!(source = %name, "Source task panicked");
                    self.mark_stopped(&name, "task panicked");
                    report.panicked.push(name);
                }
                Err(_) => {
                    self.mark_stopped(&name, "task cancelled");
                    report.aborted.push(name);
                }
            }
        }

        report.elapsed = started.elapsed();
        tracing::info!(
            stopped = report.stopped.len(),
            aborted = report.aborted.len(),
            panicked = report.panicked.len(),
            elapsed = %humantime::format_duration(report.elapsed),
            "Sources stopped"
        );
        report
    }

    fn mark_stopped(&self, name: &str, reason: &str) {
        if let Some(mut status) = self.statuses.get_mut(name) {
            status.state = SourceState::Stopped;
            status.since = Utc::now();
            status.last_error = Some(reason.to_string());
        }
    }
}

impl fmt::Debug for SourceSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSupervisor")
            .field("sources", &self.source_names())
            .field("backoff", &self.settings.backoff.name())
            .field("stopping", &self.stopping.load(Ordering::SeqCst))
            .finish()
    }
}

// =============================================================================
// SourceTask
// =============================================================================

/// How a lifecycle phase ended.
enum Phase {
    /// Phase completed; continue the lifecycle.
    Done,
    /// Phase failed; enter backoff.
    Failed(SourceError),
    /// Shutdown was requested.
    Shutdown,
}

/// Resolves once shutdown has been requested or the supervisor is gone.
async fn stop_requested(shutdown: &mut broadcast::Receiver<()>, stopping: &AtomicBool) {
    if stopping.load(Ordering::SeqCst) {
        return;
    }
    // A message, a lagged channel and a closed channel all mean stop.
    let _ = shutdown.recv().await;
}

/// The state machine of one source, run on its own task.
struct SourceTask {
    name: String,
    protocol: String,
    timing: ResolvedTiming,
    source: Box<dyn Source>,
    store: Arc<dyn VariableStore>,
    events: Arc<EventDispatcher>,
    backoff: BackoffPolicy,
    statuses: Arc<DashMap<String, SourceStatus>>,
    shutdown: broadcast::Receiver<()>,
    stopping: Arc<AtomicBool>,
    state: SourceState,
    failures: u32,
    sequence: u64,
    last_timestamp: Option<DateTime<Utc>>,
    connection_open: bool,
}

impl SourceTask {
    async fn run(mut self) {
        loop {
            self.transition(SourceState::Connecting, None, None).await;

            match self.connect().await {
                Phase::Done => {}
                Phase::Failed(error) => {
                    self.release().await;
                    match self.wait_backoff(error).await {
                        Phase::Shutdown => break,
                        _ => continue,
                    }
                }
                Phase::Shutdown => break,
            }

            self.failures = 0;
            self.transition(SourceState::Connected, None, None).await;
            self.transition(SourceState::Polling, None, None).await;

            match self.poll_loop().await {
                Phase::Failed(error) => {
                    self.update_status(|s| s.polls_failed += 1);
                    self.release().await;
                    if let Phase::Shutdown = self.wait_backoff(error).await {
                        break;
                    }
                }
                Phase::Done | Phase::Shutdown => break,
            }
        }

        self.release().await;
        self.transition(SourceState::Stopped, None, None).await;
    }

    async fn connect(&mut self) -> Phase {
        self.connection_open = true;
        self.update_status(|s| s.connect_attempts += 1);

        let bound = self.timing.timeout;
        let result = tokio::select! {
            biased;
            _ = stop_requested(&mut self.shutdown, &self.stopping) => return Phase::Shutdown,
            result = timeout(bound, self.source.connect()) => result,
        };

        match result {
            Ok(Ok(())) => {
                self.update_status(|s| {
                    s.consecutive_failures = 0;
                    s.last_error = None;
                });
                Phase::Done
            }
            Ok(Err(error)) => Phase::Failed(error),
            Err(_) => Phase::Failed(SourceError::timeout(bound)),
        }
    }

    async fn poll_loop(&mut self) -> Phase {
        let mut ticker = tokio::time::interval(self.timing.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop_requested(&mut self.shutdown, &self.stopping) => return Phase::Shutdown,
                _ = ticker.tick() => {}
            }

            let bound = self.timing.timeout;
            let result = tokio::select! {
                biased;
                _ = stop_requested(&mut self.shutdown, &self.stopping) => return Phase::Shutdown,
                result = timeout(bound, self.source.poll()) => result,
            };

            match result {
                Ok(Ok(values)) => self.publish(values).await,
                Ok(Err(error)) => return Phase::Failed(error),
                Err(_) => return Phase::Failed(SourceError::timeout(bound)),
            }
        }
    }

    async fn wait_backoff(&mut self, error: SourceError) -> Phase {
        self.failures = self.failures.saturating_add(1);
        let failures = self.failures;
        let delay = self.backoff.delay(self.timing.retry_interval, failures);

        tracing::debug!(
            source = %self.name,
            error_type = error.error_type(),
            retryable = error.is_retryable(),
            failures,
            "Source operation failed"
        );
        self.update_status(|s| s.consecutive_failures = failures);
        self.transition(SourceState::Backoff, Some(error.to_string()), Some(delay))
            .await;

        tokio::select! {
            biased;
            _ = stop_requested(&mut self.shutdown, &self.stopping) => Phase::Shutdown,
            _ = tokio::time::sleep(delay) => Phase::Done,
        }
    }

    /// Closes the connection if one may be open, bounded by the timeout.
    async fn release(&mut self) {
        if !self.connection_open {
            return;
        }
        self.connection_open = false;

        match timeout(self.timing.timeout, self.source.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::warn!(source = %self.name, error = %error, "Error closing source");
            }
            Err(_) => {
                tracing::warn!(source = %self.name, "Timed out closing source");
            }
        }
    }

    async fn publish(&mut self, values: Vec<VariableValue>) {
        self.sequence += 1;
        let timestamp = self.next_timestamp();
        let count = values.len();
        let snapshot = Snapshot {
            source: self.name.clone(),
            protocol: self.protocol.clone(),
            sequence: self.sequence,
            timestamp,
            values,
        };

        if let Err(error) = self.store.publish(snapshot) {
            tracing::warn!(source = %self.name, error = %error, "Variable store rejected snapshot");
            return;
        }

        self.update_status(|s| {
            s.polls_ok += 1;
            s.last_poll = Some(timestamp);
        });

        let event = SourceEvent::SnapshotPublished {
            source: self.name.clone(),
            sequence: self.sequence,
            values: count,
            timestamp,
        };
        self.events.dispatch(&event).await;
    }

    /// Wall-clock timestamp, forced strictly increasing per source.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + chrono::Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    async fn transition(
        &mut self,
        to: SourceState,
        error: Option<String>,
        retry_in: Option<Duration>,
    ) {
        let from = self.state;
        debug_assert!(
            from.can_transition_to(to),
            "illegal source transition {} -> {}",
            from,
            to
        );
        self.state = to;

        let timestamp = Utc::now();
        self.update_status(|s| {
            s.state = to;
            s.since = timestamp;
            if error.is_some() {
                s.last_error = error.clone();
            }
        });

        let event = SourceEvent::StateChanged {
            source: self.name.clone(),
            protocol: self.protocol.clone(),
            from,
            to,
            timestamp,
            error,
            retry_in_ms: retry_in.map(|d| d.as_millis() as u64),
        };
        self.events.dispatch(&event).await;
    }

    fn update_status(&self, update: impl FnOnce(&mut SourceStatus)) {
        if let Some(mut status) = self.statuses.get_mut(&self.name) {
            update(&mut status);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
