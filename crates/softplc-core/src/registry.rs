// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Driver registry.
//!
//! The registry maps a protocol type string (`"modbus-tcp"`, ...) to the factory
//! that parses that protocol's source configuration. It is an explicit object
//! built at process start: each driver crate exposes a `register` function that
//! the startup sequence calls before any configuration is parsed.
//!
//! # Locking
//!
//! The factory table sits behind a reader/writer lock. Registration takes the
//! write lock. Lookups take a read guard, clone the factory handle and drop the
//! guard before the factory runs, so a slow or panicking factory never holds
//! the lock.
//!
//! # Example
//!
//! ```
//! use softplc_core::registry::SourceRegistry;
//!
//! let registry = SourceRegistry::new();
//! assert!(registry.registered_types().is_empty());
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ConfigError, ConfigResult, RegistryError};
use crate::source::{SourceConfig, ValidatedConfig};

/// A factory that decodes one source entry into its protocol configuration.
///
/// Receives the caller-assigned source name and the raw configuration node.
pub type SourceFactory =
    Arc<dyn Fn(&str, &serde_json::Value) -> ConfigResult<Box<dyn SourceConfig>> + Send + Sync>;

/// A registry of source configuration factories keyed by protocol type.
pub struct SourceRegistry {
    factories: RwLock<HashMap<String, SourceFactory>>,
}

impl SourceRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a factory for `source_type`.
    ///
    /// # Panics
    ///
    /// Panics if `source_type` is already registered. Two drivers claiming the
    /// same protocol type is a build error and must surface at startup.
    pub fn register<F>(&self, source_type: &str, factory: F)
    where
        F: Fn(&str, &serde_json::Value) -> ConfigResult<Box<dyn SourceConfig>>
            + Send
            + Sync
            + 'static,
    {
        if let Err(e) = self.try_register(source_type, factory) {
            panic!("{}", e);
        }
    }

    /// Registers a factory for `source_type`, reporting duplicates as an error.
    pub fn try_register<F>(&self, source_type: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&str, &serde_json::Value) -> ConfigResult<Box<dyn SourceConfig>>
            + Send
            + Sync
            + 'static,
    {
        let mut factories = self.factories.write();
        if factories.contains_key(source_type) {
            return Err(RegistryError::DuplicateRegistration {
                source_type: source_type.to_string(),
            });
        }
        factories.insert(source_type.to_string(), Arc::new(factory));
        drop(factories);

        tracing::debug!(source_type, "Registered source factory");
        Ok(())
    }

    /// Parses and validates the configuration of one source.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownSourceType`] when no factory is registered for
    ///   `source_type`; the error lists every registered type.
    /// - Any parse or validation error from the driver, annotated with the
    ///   source name and protocol type.
    pub fn parse_config(
        &self,
        source_type: &str,
        name: &str,
        raw: &serde_json::Value,
    ) -> ConfigResult<ValidatedConfig> {
        let factory = self.factories.read().get(source_type).cloned();

        let Some(factory) = factory else {
            return Err(ConfigError::UnknownSourceType {
                source_type: source_type.to_string(),
                source_name: name.to_string(),
                registered: self.registered_types(),
            });
        };

        let config = factory(name, raw).map_err(|e| e.for_source(name, source_type))?;

        if config.protocol_type() != source_type || config.source_name() != name {
            return Err(ConfigError::invariant(format!(
                "factory for '{}' produced config '{}' of type '{}' for source '{}'",
                source_type,
                config.source_name(),
                config.protocol_type(),
                name
            )));
        }

        ValidatedConfig::new(config)
    }

    /// Returns a snapshot of the registered protocol types.
    pub fn registered_types(&self) -> BTreeSet<String> {
        self.factories.read().keys().cloned().collect()
    }

    /// Returns `true` if a factory is registered for `source_type`.
    pub fn contains(&self, source_type: &str) -> bool {
        self.factories.read().contains_key(source_type)
    }

    /// Returns the number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    /// Returns `true` if no factories are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("source_types", &self.registered_types())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
