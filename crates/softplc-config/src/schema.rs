// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Runtime configuration schema.
//!
//! # Schema Structure
//!
//! ```text
//! RuntimeConfig
//! ├── runtime: RuntimeSettings
//! ├── logging: LoggingConfig
//! ├── supervisor: SupervisorConfig
//! └── sources: Vec<SourceEntry>
//! ```
//!
//! Source entries are kept as raw key/value maps. Their protocol-specific
//! settings are decoded by the driver registered for their `type`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use softplc_core::Duration;
use softplc_core::retry::BackoffPolicy;
use softplc_core::supervisor::SupervisorSettings;

use crate::error::{ConfigFileError, ConfigFileResult};

// =============================================================================
// Constants
// =============================================================================

/// Default runtime instance name.
pub const DEFAULT_RUNTIME_NAME: &str = "softplc";

/// Default grace period for stopping sources.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default exponential backoff growth factor.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default upper bound on an exponential backoff wait.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(60);

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration of a softplc instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Process-level settings.
    #[serde(default)]
    pub runtime: RuntimeSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Supervisor settings.
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Source entries, in file order.
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

impl RuntimeConfig {
    /// Validates the top-level sections.
    ///
    /// Source entries are not inspected here; each one is validated by its
    /// driver during resolution so that one bad entry cannot fail the file.
    pub fn validate(&self) -> ConfigFileResult<()> {
        self.runtime.validate()?;
        self.supervisor.validate()?;
        Ok(())
    }

    /// Returns a source entry by name.
    pub fn get_source(&self, name: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.name == name)
    }
}

// =============================================================================
// Runtime Settings
// =============================================================================

/// Process-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSettings {
    /// Instance name, used in logs.
    #[serde(default = "default_runtime_name")]
    pub name: String,

    /// Grace period given to sources on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: Duration,

    /// Refuse to start when no source survives resolution.
    #[serde(default)]
    pub require_sources: bool,
}

impl RuntimeSettings {
    /// Validates the runtime settings.
    pub fn validate(&self) -> ConfigFileResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigFileError::validation("runtime.name", "must not be empty"));
        }
        if !self.shutdown_timeout.is_positive() {
            return Err(ConfigFileError::validation(
                "runtime.shutdown_timeout",
                format!("must be positive, got {}", self.shutdown_timeout),
            ));
        }
        Ok(())
    }

    /// Returns the shutdown grace period.
    pub fn shutdown_grace(&self) -> std::time::Duration {
        self.shutdown_timeout
            .to_std()
            .or_else(|| DEFAULT_SHUTDOWN_TIMEOUT.to_std())
            .unwrap_or_default()
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            name: default_runtime_name(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            require_sources: false,
        }
    }
}

fn default_runtime_name() -> String {
    DEFAULT_RUNTIME_NAME.to_string()
}

fn default_shutdown_timeout() -> Duration {
    DEFAULT_SHUTDOWN_TIMEOUT
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    #[serde(alias = "warning")]
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigFileError::validation(
                "logging.level",
                format!("unknown level '{}'", other),
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    Text,
    /// JSON lines for production.
    #[default]
    Json,
    /// Single-line compact output.
    Compact,
}

impl LogFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(ConfigFileError::validation(
                "logging.format",
                format!("unknown format '{}'", other),
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Supervisor Configuration
// =============================================================================

/// Backoff strategy between connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Always wait the source's retry interval.
    #[default]
    Flat,
    /// Grow the wait with consecutive failures.
    Exponential,
}

/// Supervisor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Backoff strategy.
    #[serde(default)]
    pub backoff: BackoffKind,

    /// Growth factor for exponential backoff.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound on an exponential wait.
    #[serde(default = "default_backoff_max")]
    pub backoff_max: Duration,

    /// Random spread applied to exponential waits, in `[0.0, 1.0]`.
    #[serde(default)]
    pub backoff_jitter: f64,
}

impl SupervisorConfig {
    /// Validates the backoff parameters.
    pub fn validate(&self) -> ConfigFileResult<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigFileError::validation(
                "supervisor.backoff_multiplier",
                format!("must be a finite number >= 1.0, got {}", self.backoff_multiplier),
            ));
        }
        if !self.backoff_max.is_positive() {
            return Err(ConfigFileError::validation(
                "supervisor.backoff_max",
                format!("must be positive, got {}", self.backoff_max),
            ));
        }
        if !(0.0..=1.0).contains(&self.backoff_jitter) {
            return Err(ConfigFileError::validation(
                "supervisor.backoff_jitter",
                format!("must be within [0.0, 1.0], got {}", self.backoff_jitter),
            ));
        }
        Ok(())
    }

    /// Builds the backoff policy.
    pub fn backoff_policy(&self) -> BackoffPolicy {
        match self.backoff {
            BackoffKind::Flat => BackoffPolicy::Flat,
            BackoffKind::Exponential => BackoffPolicy::Exponential {
                multiplier: self.backoff_multiplier,
                max_delay: self
                    .backoff_max
                    .to_std()
                    .or_else(|| DEFAULT_BACKOFF_MAX.to_std())
                    .unwrap_or_default(),
                jitter: self.backoff_jitter,
            },
        }
    }

    /// Builds the supervisor settings.
    pub fn to_settings(&self) -> SupervisorSettings {
        SupervisorSettings::with_backoff(self.backoff_policy())
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffKind::Flat,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            backoff_max: DEFAULT_BACKOFF_MAX,
            backoff_jitter: 0.0,
        }
    }
}

fn default_backoff_multiplier() -> f64 {
    DEFAULT_BACKOFF_MULTIPLIER
}

fn default_backoff_max() -> Duration {
    DEFAULT_BACKOFF_MAX
}

// =============================================================================
// Source Entries
// =============================================================================

/// One entry of the `sources` list.
///
/// `name` and `type` are read here; every other key is kept verbatim for the
/// driver. Missing names or types are reported during resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Unique source name.
    #[serde(default)]
    pub name: String,

    /// Protocol type selecting the driver.
    #[serde(rename = "type", default)]
    pub source_type: String,

    /// Protocol-specific settings.
    #[serde(flatten)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl SourceEntry {
    /// Creates an entry without settings.
    pub fn new(name: impl Into<String>, source_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_type: source_type.into(),
            settings: serde_json::Map::new(),
        }
    }

    /// Adds a setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Returns the settings as the raw node handed to the driver.
    pub fn raw(&self) -> serde_json::Value {
        serde_json::Value::Object(self.settings.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.runtime.name, "softplc");
        assert_eq!(config.runtime.shutdown_grace(), std::time::Duration::from_secs(5));
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.supervisor.backoff_policy(), BackoffPolicy::Flat);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_source_entry_keeps_settings() {
        let entry: SourceEntry = serde_json::from_value(json!({
            "name": "press-1",
            "type": "modbus-tcp",
            "host": "10.0.0.5",
            "unitId": 3
        }))
        .unwrap();

        assert_eq!(entry.name, "press-1");
        assert_eq!(entry.source_type, "modbus-tcp");
        assert_eq!(entry.raw(), json!({ "host": "10.0.0.5", "unitId": 3 }));
    }

    #[test]
    fn test_source_entry_missing_name_is_deferred() {
        let entry: SourceEntry = serde_json::from_value(json!({ "type": "modbus-tcp" })).unwrap();
        assert!(entry.name.is_empty());
    }

    #[test]
    fn test_unknown_top_level_field_rejected() {
        let result: Result<RuntimeConfig, _> = serde_json::from_value(json!({ "devices": [] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_shutdown_timeout_must_be_positive() {
        let mut config = RuntimeConfig::default();
        config.runtime.shutdown_timeout = Duration::ZERO;

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::Validation { ref field, .. } if field == "runtime.shutdown_timeout"
        ));
    }

    #[test]
    fn test_backoff_validation() {
        let mut config = SupervisorConfig {
            backoff_multiplier: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.backoff_multiplier = 2.0;
        config.backoff_jitter = 1.5;
        assert!(config.validate().is_err());

        config.backoff_jitter = 0.1;
        config.backoff_max = Duration::from_secs(-1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exponential_policy() {
        let config = SupervisorConfig {
            backoff: BackoffKind::Exponential,
            backoff_multiplier: 3.0,
            backoff_max: Duration::from_secs(30),
            backoff_jitter: 0.0,
        };

        assert_eq!(
            config.to_settings().backoff,
            BackoffPolicy::exponential(3.0, std::time::Duration::from_secs(30))
        );
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!(LogFormat::Text.to_string(), "text");
    }
}
