// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Resolution of source entries into validated configurations.
//!
//! Every entry is resolved independently. An entry that names no driver,
//! fails driver validation, or reuses an earlier entry's name is rejected
//! with its error; the remaining entries are still resolved. The caller
//! decides what to do with the rejections.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use softplc_core::error::ConfigError;
use softplc_core::registry::SourceRegistry;
use softplc_core::source::ValidatedConfig;

use crate::schema::SourceEntry;

/// A source entry that could not be resolved.
#[derive(Debug)]
pub struct RejectedSource {
    /// Entry name, possibly empty.
    pub name: String,
    /// Entry type, possibly empty.
    pub source_type: String,
    /// Why the entry was rejected.
    pub error: ConfigError,
}

impl RejectedSource {
    /// Returns a serializable summary.
    pub fn summary(&self) -> RejectionSummary {
        RejectionSummary {
            name: self.name.clone(),
            source_type: self.source_type.clone(),
            error_type: self.error.error_type(),
            field: self.error.field().map(str::to_string),
            message: self.error.to_string(),
        }
    }
}

/// Serializable view of a [`RejectedSource`].
#[derive(Debug, Clone, Serialize)]
pub struct RejectionSummary {
    /// Entry name.
    pub name: String,
    /// Entry type.
    #[serde(rename = "type")]
    pub source_type: String,
    /// Error category.
    pub error_type: &'static str,
    /// Offending field, when known.
    pub field: Option<String>,
    /// Full error message.
    pub message: String,
}

/// Outcome of resolving a list of source entries.
#[derive(Debug, Default)]
pub struct SourceResolution {
    /// Accepted configurations, in entry order.
    pub configs: Vec<ValidatedConfig>,
    /// Rejected entries, in entry order.
    pub rejected: Vec<RejectedSource>,
}

impl SourceResolution {
    /// Returns `true` if every entry was accepted.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Returns the accepted source names.
    pub fn accepted_names(&self) -> Vec<&str> {
        self.configs.iter().map(ValidatedConfig::name).collect()
    }

    /// Returns the total number of entries seen.
    pub fn total(&self) -> usize {
        self.configs.len() + self.rejected.len()
    }
}

/// Resolves `entries` against `registry`.
///
/// Names are unique across the accepted set: the first entry with a given
/// name wins and later ones are rejected even if they are otherwise valid.
pub fn resolve_sources(registry: &SourceRegistry, entries: &[SourceEntry]) -> SourceResolution {
    let mut resolution = SourceResolution::default();
    let mut seen = HashSet::new();

    for entry in entries {
        match resolve_entry(registry, entry, &seen) {
            Ok(config) => {
                debug!(
                    source = %entry.name,
                    protocol = %entry.source_type,
                    endpoint = %config.endpoint(),
                    "Source resolved"
                );
                seen.insert(entry.name.clone());
                resolution.configs.push(config);
            }
            Err(error) => {
                debug!(
                    source = %entry.name,
                    protocol = %entry.source_type,
                    error = %error,
                    "Source rejected"
                );
                resolution.rejected.push(RejectedSource {
                    name: entry.name.clone(),
                    source_type: entry.source_type.clone(),
                    error,
                });
            }
        }
    }

    resolution
}

fn resolve_entry(
    registry: &SourceRegistry,
    entry: &SourceEntry,
    seen: &HashSet<String>,
) -> Result<ValidatedConfig, ConfigError> {
    if entry.name.trim().is_empty() {
        return Err(ConfigError::missing_field("name"));
    }
    if entry.source_type.trim().is_empty() {
        return Err(ConfigError::missing_field("type").for_source(&entry.name, "<none>"));
    }
    if seen.contains(&entry.name) {
        return Err(
            ConfigError::validation("name", "duplicate source name; an earlier entry uses it")
                .for_source(&entry.name, &entry.source_type),
        );
    }

    registry.parse_config(&entry.source_type, &entry.name, &entry.raw())
}

// =============================================================================
// Tests
// =============================================================================
