// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Source configuration and runtime contracts.
//!
//! Every protocol driver provides two types:
//!
//! - a [`SourceConfig`], parsed from the raw configuration node of one source
//!   entry and validated before use, and
//! - a [`Source`], the running connection built from a validated config.
//!
//! The supervisor only accepts a [`ValidatedConfig`], which can only be obtained
//! by running [`SourceConfig::validate`]. A source therefore cannot be started
//! from an unvalidated or rejected configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use softplc_core::source::ValidatedConfig;
//!
//! let validated = ValidatedConfig::new(Box::new(config))?;
//! let mut source = validated.create_source()?;
//! source.connect().await?;
//! let values = source.poll().await?;
//! ```

use std::fmt;

use async_trait::async_trait;

use crate::duration::Duration;
use crate::error::{ConfigError, ConfigResult, SourceResult};
use crate::types::VariableValue;

// =============================================================================
// Timing
// =============================================================================

/// The three timing fields every source configuration carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTiming {
    /// Bound on connect, poll and close operations.
    pub timeout: Duration,
    /// Interval between poll cycles.
    pub poll_interval: Duration,
    /// Wait between a failure and the next connection attempt.
    pub retry_interval: Duration,
}

/// Validated timing converted to runtime durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTiming {
    /// Bound on connect, poll and close operations.
    pub timeout: std::time::Duration,
    /// Interval between poll cycles.
    pub poll_interval: std::time::Duration,
    /// Wait between a failure and the next connection attempt.
    pub retry_interval: std::time::Duration,
}

impl ResolvedTiming {
    fn resolve(timing: &SourceTiming) -> ConfigResult<Self> {
        let positive = |field: &str, value: Duration| {
            value.to_std().filter(|d| !d.is_zero()).ok_or_else(|| {
                ConfigError::invariant(format!(
                    "'{}' is {} after validation; drivers must reject or default non-positive intervals",
                    field, value
                ))
            })
        };

        Ok(Self {
            timeout: positive("timeout", timing.timeout)?,
            poll_interval: positive("pollInterval", timing.poll_interval)?,
            retry_interval: positive("retryInterval", timing.retry_interval)?,
        })
    }
}

// =============================================================================
// SourceConfig
// =============================================================================

/// Protocol-specific configuration of one source.
///
/// Implementations are produced by the factory registered for their protocol
/// type and receive the source name from the enclosing configuration.
pub trait SourceConfig: fmt::Debug + Send + Sync + 'static {
    /// Checks required fields, applies defaults and rejects out-of-range values.
    ///
    /// Must be idempotent: validating an already validated config succeeds and
    /// changes nothing.
    fn validate(&mut self) -> ConfigResult<()>;

    /// The protocol type this config was registered under.
    fn protocol_type(&self) -> &str;

    /// The caller-assigned source name.
    fn source_name(&self) -> &str;

    /// Timing fields, read after validation.
    fn timing(&self) -> SourceTiming;

    /// A short human-readable endpoint description for logs.
    fn endpoint(&self) -> String;

    /// Builds the runtime source.
    ///
    /// Only called through [`ValidatedConfig::create_source`].
    fn create_source(&self) -> ConfigResult<Box<dyn Source>>;
}

// =============================================================================
// ValidatedConfig
// =============================================================================

/// A source configuration that passed validation.
///
/// This is the only form in which configuration reaches the supervisor.
pub struct ValidatedConfig {
    inner: Box<dyn SourceConfig>,
    timing: ResolvedTiming,
}

impl ValidatedConfig {
    /// Validates `config` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns the validation error with the source name and protocol type
    /// attached, or [`ConfigError::InvariantViolation`] if validation left a
    /// non-positive timing value behind.
    pub fn new(mut config: Box<dyn SourceConfig>) -> ConfigResult<Self> {
        let name = config.source_name().to_string();
        let protocol = config.protocol_type().to_string();

        config
            .validate()
            .map_err(|e| e.for_source(&name, &protocol))?;

        let timing = ResolvedTiming::resolve(&config.timing())
            .map_err(|e| e.for_source(&name, &protocol))?;

        Ok(Self { inner: config, timing })
    }

    /// The source name.
    pub fn name(&self) -> &str {
        self.inner.source_name()
    }

    /// The protocol type.
    pub fn protocol_type(&self) -> &str {
        self.inner.protocol_type()
    }

    /// The validated timing.
    pub fn timing(&self) -> ResolvedTiming {
        self.timing
    }

    /// The endpoint description.
    pub fn endpoint(&self) -> String {
        self.inner.endpoint()
    }

    /// Borrows the underlying configuration.
    pub fn config(&self) -> &dyn SourceConfig {
        self.inner.as_ref()
    }

    /// Builds the runtime source.
    pub fn create_source(&self) -> ConfigResult<Box<dyn Source>> {
        self.inner
            .create_source()
            .map_err(|e| e.for_source(self.name(), self.protocol_type()))
    }
}

impl fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedConfig")
            .field("config", &self.inner)
            .field("timing", &self.timing)
            .finish()
    }
}

// =============================================================================
// Source
// =============================================================================

/// A running connection to one field device.
///
/// A source is owned by exactly one supervisor task. The supervisor bounds
/// every call with the configured timeout, so implementations do not need
/// their own timeouts, though they may add finer ones.
#[async_trait]
pub trait Source: Send {
    /// The source name.
    fn name(&self) -> &str;

    /// The protocol type.
    fn protocol_type(&self) -> &str;

    /// Opens the connection.
    async fn connect(&mut self) -> SourceResult<()>;

    /// Runs one poll cycle.
    ///
    /// Returns every configured value, or an error. Partial results are never
    /// returned.
    async fn poll(&mut self) -> SourceResult<Vec<VariableValue>>;

    /// Releases the connection. Must be safe to call when not connected.
    async fn close(&mut self) -> SourceResult<()>;

    /// Returns `true` while a connection is held.
    fn is_connected(&self) -> bool;
}

// =============================================================================
// Tests
// =============================================================================
