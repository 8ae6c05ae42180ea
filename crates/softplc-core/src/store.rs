// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Variable store boundary.
//!
//! Sources publish one [`Snapshot`] per successful poll cycle. The store keeps
//! the latest value of every variable, keyed by source and variable name, and
//! accepts concurrent publishes from many source tasks.

use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::types::{Value, VariableValue};

// =============================================================================
// Snapshot
// =============================================================================

/// The complete result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Publishing source.
    pub source: String,
    /// Protocol type of the source.
    pub protocol: String,
    /// Per-source sequence number, starting at 1.
    pub sequence: u64,
    /// When the poll completed.
    pub timestamp: DateTime<Utc>,
    /// Values read in this cycle.
    pub values: Vec<VariableValue>,
}

/// Identifies one variable across all sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableKey {
    /// Owning source.
    pub source: String,
    /// Variable name within the source.
    pub variable: String,
}

impl VariableKey {
    /// Creates a new key.
    pub fn new(source: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            variable: variable.into(),
        }
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.variable)
    }
}

/// The latest stored value of a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredValue {
    /// The value.
    pub value: Value,
    /// Timestamp of the snapshot it came from.
    pub timestamp: DateTime<Utc>,
    /// Sequence number of the snapshot it came from.
    pub sequence: u64,
}

// =============================================================================
// VariableStore Trait
// =============================================================================

/// Destination of published snapshots.
///
/// Implementations must accept concurrent calls from many source tasks.
pub trait VariableStore: Send + Sync {
    /// Publishes one complete snapshot.
    fn publish(&self, snapshot: Snapshot) -> Result<(), StoreError>;

    /// Returns the latest value of one variable.
    fn get(&self, source: &str, variable: &str) -> Option<StoredValue>;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory variable store.
///
/// Also fans published snapshots out to subscribers over a broadcast channel.
/// Slow subscribers lag and lose snapshots; publishers are never blocked.
pub struct MemoryStore {
    values: DashMap<VariableKey, StoredValue>,
    counts: DashMap<String, u64>,
    sender: broadcast::Sender<Snapshot>,
}

impl MemoryStore {
    /// Creates a store whose subscriber channel buffers `capacity` snapshots.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            values: DashMap::new(),
            counts: DashMap::new(),
            sender,
        }
    }

    /// Subscribes to published snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.sender.subscribe()
    }

    /// Returns how many snapshots `source` has published.
    pub fn snapshot_count(&self, source: &str) -> u64 {
        self.counts.get(source).map(|c| *c).unwrap_or(0)
    }

    /// Returns the latest values of every variable of `source`, sorted by name.
    pub fn source_values(&self, source: &str) -> Vec<(String, StoredValue)> {
        let mut values: Vec<_> = self
            .values
            .iter()
            .filter(|entry| entry.key().source == source)
            .map(|entry| (entry.key().variable.clone(), entry.value().clone()))
            .collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        values
    }

    /// Returns the number of stored variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl VariableStore for MemoryStore {
    fn publish(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        if snapshot.source.is_empty() {
            return Err(StoreError::rejected("", "snapshot without source name"));
        }

        for VariableValue { name, value } in &snapshot.values {
            self.values.insert(
                VariableKey::new(snapshot.source.as_str(), name.as_str()),
                StoredValue {
                    value: value.clone(),
                    timestamp: snapshot.timestamp,
                    sequence: snapshot.sequence,
                },
            );
        }
        *self.counts.entry(snapshot.source.clone()).or_insert(0) += 1;

        // No receivers is fine.
        let _ = self.sender.send(snapshot);
        Ok(())
    }

    fn get(&self, source: &str, variable: &str) -> Option<StoredValue> {
        self.values
            .get(&VariableKey::new(source, variable))
            .map(|entry| entry.value().clone())
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("variables", &self.values.len())
            .field("sources", &self.counts.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
