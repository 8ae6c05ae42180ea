// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading for softplc.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and detect its format from the extension
//! 2. Resolve `${VAR}` / `${VAR:default}` placeholders in the raw text
//! 3. Decode YAML (through the `config` crate), TOML or JSON
//! 4. Apply environment overrides
//! 5. Validate the top-level sections
//!
//! Source entries are not decoded here. They stay raw until
//! [`crate::resolve::resolve_sources`] hands them to their drivers.
//!
//! # Environment Variable Override
//!
//! ```text
//! SOFTPLC_LOG_LEVEL=debug
//! SOFTPLC_LOG_FORMAT=text
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigFileError, ConfigFileResult};
use crate::schema::{LogFormat, LogLevel, RuntimeConfig};

/// Default prefix of override variables.
pub const DEFAULT_ENV_PREFIX: &str = "SOFTPLC";

/// Path reported for in-memory content.
const INLINE_PATH: &str = "<string>";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader.
///
/// # Examples
///
/// ```no_run
/// use softplc_config::loader::ConfigLoader;
///
/// let loader = ConfigLoader::new();
/// let config = loader.load("softplc.yaml").unwrap();
/// println!("{} sources", config.sources.len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve placeholders and apply overrides.
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a loader with default settings.
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
        }
    }

    /// Creates a builder.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment variable handling.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Returns the environment variable prefix.
    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// Loads and validates the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// - [`ConfigFileError::NotFound`] / [`ConfigFileError::Io`] when the
    ///   file cannot be read
    /// - [`ConfigFileError::UnsupportedFormat`] for unknown extensions
    /// - [`ConfigFileError::Parse`] when decoding fails
    /// - [`ConfigFileError::Validation`] for invalid top-level values
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigFileResult<RuntimeConfig> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let format = ConfigFormat::from_path(path)?;
        let content = read_file(path)?;
        let config = self.process(&content, format, path)?;

        info!(
            runtime = %config.runtime.name,
            sources = config.sources.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Loads and validates configuration from a string.
    pub fn load_from_str(
        &self,
        content: &str,
        format: ConfigFormat,
    ) -> ConfigFileResult<RuntimeConfig> {
        self.process(content, format, Path::new(INLINE_PATH))
    }

    fn process(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigFileResult<RuntimeConfig> {
        let lookup = |name: &str| env::var(name).ok();

        let mut config: RuntimeConfig = if self.resolve_env_vars {
            let resolved = resolve_placeholders(content, &lookup);
            parse_str(&resolved, format, path)?
        } else {
            parse_str(content, format, path)?
        };

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config, &lookup);
        }

        config.validate()?;
        debug!(
            format = format.extension(),
            sources = config.sources.len(),
            "Configuration validated"
        );
        Ok(config)
    }

    /// Applies `<PREFIX>_LOG_LEVEL` and `<PREFIX>_LOG_FORMAT`.
    ///
    /// Unparseable values are ignored with a warning.
    fn apply_env_overrides(
        &self,
        config: &mut RuntimeConfig,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) {
        let level_var = format!("{}_LOG_LEVEL", self.env_prefix);
        if let Some(value) = lookup(&level_var) {
            match value.parse::<LogLevel>() {
                Ok(level) => config.logging.level = level,
                Err(_) => warn!(variable = %level_var, value = %value, "Ignoring invalid log level"),
            }
        }

        let format_var = format!("{}_LOG_FORMAT", self.env_prefix);
        if let Some(value) = lookup(&format_var) {
            match value.parse::<LogFormat>() {
                Ok(format) => config.logging.format = format,
                Err(_) => warn!(variable = %format_var, value = %value, "Ignoring invalid log format"),
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for [`ConfigLoader`].
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
}

impl ConfigLoaderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the environment variable prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables environment variable handling.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Builds the loader.
    pub fn build(self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();
        if let Some(prefix) = self.env_prefix {
            loader.env_prefix = prefix;
        }
        if let Some(resolve_env_vars) = self.resolve_env_vars {
            loader.resolve_env_vars = resolve_env_vars;
        }
        loader
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigFileResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigFileError::unsupported_format(other)),
            None => Err(ConfigFileError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn read_file(path: &Path) -> ConfigFileResult<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigFileError::not_found(path),
        _ => ConfigFileError::io(path, e),
    })
}

fn parse_str<T: DeserializeOwned>(
    content: &str,
    format: ConfigFormat,
    path: &Path,
) -> ConfigFileResult<T> {
    let to_parse_error = |message: String| ConfigFileError::parse(PathBuf::from(path), message);

    match format {
        ConfigFormat::Yaml => yaml_parse(content).map_err(to_parse_error),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| to_parse_error(e.to_string())),
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| to_parse_error(e.to_string()))
        }
    }
}

/// YAML parsing through the `config` crate.
fn yaml_parse<T: DeserializeOwned>(content: &str) -> Result<T, String> {
    config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(|e| e.to_string())?
        .try_deserialize()
        .map_err(|e| e.to_string())
}

/// Resolves `${VAR}` and `${VAR:default}` placeholders.
///
/// Unset variables without a default are left in place and logged; an
/// unterminated placeholder is copied through unchanged.
fn resolve_placeholders(content: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' || chars.peek() != Some(&'{') {
            result.push(c);
            continue;
        }
        chars.next();

        let mut body = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            body.push(c);
        }

        if !closed {
            result.push_str("${");
            result.push_str(&body);
            continue;
        }

        let (name, default) = match body.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (body.as_str(), None),
        };

        match (lookup(name), default) {
            (Some(value), _) => result.push_str(&value),
            (None, Some(default)) => result.push_str(default),
            (None, None) => {
                warn!(variable = name, "Environment variable not set");
                result.push_str("${");
                result.push_str(name);
                result.push('}');
            }
        }
    }

    result
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
///
/// ```no_run
/// let config = softplc_config::load_config("softplc.yaml").unwrap();
/// ```
pub fn load_config(path: impl AsRef<Path>) -> ConfigFileResult<RuntimeConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigFileResult<RuntimeConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================
