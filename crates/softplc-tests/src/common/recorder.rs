// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Event recording against the tokio clock.
//!
//! Under `start_paused = true` the recorded instants are exact virtual times,
//! so tests can assert on intervals without tolerances.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use softplc_core::{EventHandler, SourceEvent, SourceState};

/// One dispatched event and when it arrived.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    /// Tokio time at dispatch.
    pub at: Instant,
    /// The event.
    pub event: SourceEvent,
}

/// An [`EventHandler`] that keeps every event it sees.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingHandler {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events in dispatch order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Returns the events of one source.
    pub fn events_of(&self, source: &str) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|r| r.event.source() == source)
            .cloned()
            .collect()
    }

    /// Returns the states one source entered, in order.
    pub fn states_of(&self, source: &str) -> Vec<SourceState> {
        self.events_of(source)
            .iter()
            .filter_map(|r| r.event.new_state())
            .collect()
    }

    /// Returns when one source entered `state`, in order.
    pub fn entries_into(&self, source: &str, state: SourceState) -> Vec<Instant> {
        self.events_of(source)
            .iter()
            .filter(|r| r.event.new_state() == Some(state))
            .map(|r| r.at)
            .collect()
    }

    /// Returns when each snapshot of one source was published.
    pub fn snapshot_instants(&self, source: &str) -> Vec<Instant> {
        self.events_of(source)
            .iter()
            .filter(|r| matches!(r.event, SourceEvent::SnapshotPublished { .. }))
            .map(|r| r.at)
            .collect()
    }

    /// Returns the number of snapshots published by one source.
    pub fn snapshot_count(&self, source: &str) -> usize {
        self.snapshot_instants(source).len()
    }

    /// Removes every recorded event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    fn name(&self) -> &str {
        "recording_handler"
    }

    async fn handle(&self, event: &SourceEvent) {
        self.events.lock().push(RecordedEvent {
            at: Instant::now(),
            event: event.clone(),
        });
    }
}

/// Returns the gaps between consecutive instants.
pub fn gaps(instants: &[Instant]) -> Vec<Duration> {
    instants.windows(2).map(|w| w[1] - w[0]).collect()
}
