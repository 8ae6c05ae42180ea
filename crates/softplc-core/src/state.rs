// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Source lifecycle states.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 ▼                              │
//! Disconnected → Connecting → Connected → Polling
//!                 │    ▲                      │
//!                 ▼    │                      │
//!                Backoff ◄────────────────────┘
//!
//! any state ──(shutdown)──► Stopped
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// The lifecycle state of a supervised source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    /// No connection; initial state.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Handshake completed.
    Connected,
    /// Steady state: polling at the configured interval.
    Polling,
    /// Waiting before the next connection attempt.
    Backoff,
    /// Terminal state after shutdown.
    Stopped,
}

impl SourceState {
    /// Returns `true` if the lifecycle permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: SourceState) -> bool {
        use SourceState::*;

        match (self, next) {
            (Stopped, _) => false,
            (_, Stopped) => true,
            (Disconnected, Connecting)
            | (Connecting, Connected)
            | (Connecting, Backoff)
            | (Connected, Polling)
            | (Connected, Backoff)
            | (Polling, Backoff)
            | (Backoff, Connecting) => true,
            _ => false,
        }
    }

    /// Returns `true` for the terminal state.
    pub fn is_terminal(self) -> bool {
        self == SourceState::Stopped
    }

    /// Returns `true` while a live connection is held.
    pub fn is_connected(self) -> bool {
        matches!(self, SourceState::Connected | SourceState::Polling)
    }

    /// Returns the state name as used in logs and events.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceState::Disconnected => "disconnected",
            SourceState::Connecting => "connecting",
            SourceState::Connected => "connected",
            SourceState::Polling => "polling",
            SourceState::Backoff => "backoff",
            SourceState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
