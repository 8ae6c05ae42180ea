// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Source lifecycle events.
//!
//! Every state transition of a supervised source produces a [`SourceEvent`],
//! which the [`EventDispatcher`] hands to each registered [`EventHandler`].
//! Handlers decide what to do with it: [`TracingHandler`] writes structured
//! log records, [`CollectorHandler`] keeps events in memory for inspection.
//!
//! Handlers run inline on the source task, so they must not block.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use softplc_core::events::{EventDispatcher, TracingHandler};
//!
//! let dispatcher = EventDispatcher::new();
//! dispatcher.register(Arc::new(TracingHandler::new()));
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::state::SourceState;

// =============================================================================
// Event Types
// =============================================================================

/// Events emitted by supervised sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceEvent {
    /// A source moved between lifecycle states.
    StateChanged {
        /// Source name.
        source: String,
        /// Protocol type.
        protocol: String,
        /// Previous state.
        from: SourceState,
        /// New state.
        to: SourceState,
        /// When the transition happened.
        timestamp: DateTime<Utc>,
        /// The error that caused the transition, if any.
        error: Option<String>,
        /// Wait before the next attempt; set when entering backoff.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_in_ms: Option<u64>,
    },

    /// A poll cycle completed and its snapshot was published.
    SnapshotPublished {
        /// Source name.
        source: String,
        /// Snapshot sequence number.
        sequence: u64,
        /// Number of values in the snapshot.
        values: usize,
        /// Snapshot timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl SourceEvent {
    /// Returns the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            SourceEvent::StateChanged { .. } => "state_changed",
            SourceEvent::SnapshotPublished { .. } => "snapshot_published",
        }
    }

    /// Returns the source name.
    pub fn source(&self) -> &str {
        match self {
            SourceEvent::StateChanged { source, .. }
            | SourceEvent::SnapshotPublished { source, .. } => source,
        }
    }

    /// Returns the target state, for state changes.
    pub fn new_state(&self) -> Option<SourceState> {
        match self {
            SourceEvent::StateChanged { to, .. } => Some(*to),
            _ => None,
        }
    }

    /// Returns the event timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            SourceEvent::StateChanged { timestamp, .. }
            | SourceEvent::SnapshotPublished { timestamp, .. } => *timestamp,
        }
    }
}

// =============================================================================
// Event Handler Trait
// =============================================================================

/// Trait for handling source events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Returns the handler name for logging.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Handles a source event.
    async fn handle(&self, event: &SourceEvent);
}

// =============================================================================
// Built-in Handlers
// =============================================================================

/// A handler that logs events using tracing.
///
/// Entering backoff logs at `warn` with the error and retry schedule;
/// reaching `polling` or `stopped` logs at `info`; everything else at `debug`.
#[derive(Debug, Default)]
pub struct TracingHandler {
    log_snapshots: bool,
}

impl TracingHandler {
    /// Creates a new tracing handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also logs every published snapshot at `trace`.
    pub fn with_snapshots(mut self, enabled: bool) -> Self {
        self.log_snapshots = enabled;
        self
    }
}

#[async_trait]
impl EventHandler for TracingHandler {
    fn name(&self) -> &str {
        "tracing_handler"
    }

    async fn handle(&self, event: &SourceEvent) {
        match event {
            SourceEvent::StateChanged {
                source,
                protocol,
                from,
                to,
                error,
                retry_in_ms,
                ..
            } => {
                let from = from.as_str();
                let state = to.as_str();
                match to {
                    SourceState::Backoff => {
                        let retry_in = retry_in_ms
                            .map(|ms| {
                                humantime::format_duration(std::time::Duration::from_millis(ms))
                                    .to_string()
                            })
                            .unwrap_or_default();
                        tracing::warn!(
                            source = %source,
                            protocol = %protocol,
                            from,
                            state,
                            error = error.as_deref().unwrap_or(""),
                            retry_in = %retry_in,
                            "Source entered backoff"
                        );
                    }
                    SourceState::Polling | SourceState::Stopped => {
                        tracing::info!(source = %source, protocol = %protocol, from, state, "Source state changed");
                    }
                    _ => {
                        tracing::debug!(source = %source, protocol = %protocol, from, state, "Source state changed");
                    }
                }
            }
            SourceEvent::SnapshotPublished {
                source,
                sequence,
                values,
                ..
            } => {
                if self.log_snapshots {
                    tracing::trace!(source = %source, sequence, values, "Snapshot published");
                }
            }
        }
    }
}

/// A handler that keeps events in memory.
///
/// Keeps at most `max_events`, dropping the oldest first.
#[derive(Debug)]
pub struct CollectorHandler {
    events: RwLock<Vec<SourceEvent>>,
    max_events: usize,
}

impl CollectorHandler {
    /// Creates a new collector handler.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(Vec::with_capacity(max_events.min(1000))),
            max_events,
        }
    }

    /// Returns collected events.
    pub fn events(&self) -> Vec<SourceEvent> {
        self.events.read().clone()
    }

    /// Returns the sequence of states a source went through.
    pub fn states_of(&self, source: &str) -> Vec<SourceState> {
        self.events
            .read()
            .iter()
            .filter(|e| e.source() == source)
            .filter_map(SourceEvent::new_state)
            .collect()
    }

    /// Clears collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns the number of collected events.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events collected.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl Default for CollectorHandler {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl EventHandler for CollectorHandler {
    fn name(&self) -> &str {
        "collector_handler"
    }

    async fn handle(&self, event: &SourceEvent) {
        let mut events = self.events.write();

        if events.len() >= self.max_events {
            events.remove(0);
        }

        events.push(event.clone());
    }
}

// =============================================================================
// Event Dispatcher
// =============================================================================

/// Fans events out to registered handlers.
pub struct EventDispatcher {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Creates a dispatcher with a [`TracingHandler`] registered.
    pub fn with_tracing() -> Self {
        let dispatcher = Self::new();
        dispatcher.register(Arc::new(TracingHandler::new()));
        dispatcher
    }

    /// Registers an event handler.
    pub fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().push(handler);
    }

    /// Removes all handlers with a specific name.
    pub fn unregister(&self, name: &str) {
        self.handlers.write().retain(|h| h.name() != name);
    }

    /// Dispatches an event to all handlers, in registration order.
    pub async fn dispatch(&self, event: &SourceEvent) {
        let handlers = self.handlers.read().clone();

        for handler in handlers {
            handler.handle(event).await;
        }
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let names: Vec<_> = handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("EventDispatcher")
            .field("handlers", &names)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
