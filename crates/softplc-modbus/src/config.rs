// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP source configuration.
//!
//! Decoded from the protocol-specific fields of a `type: modbus-tcp` source
//! entry:
//!
//! ```yaml
//! - name: press-1
//!   type: modbus-tcp
//!   host: 10.0.0.5
//!   port: 502
//!   unitId: 1
//!   timeout: 3s
//!   pollInterval: 500ms
//!   retryInterval: 5s
//!   byteOrder: big
//!   wordOrder: big
//!   registers:
//!     - { name: temperature, area: holding, address: 0, type: float32 }
//!     - { name: running, area: coil, address: 10, type: bool }
//! ```
//!
//! Every field except `host` is optional; [`ModbusTcpConfig::validate`]
//! applies the defaults and range checks.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use softplc_core::duration::Duration;
use softplc_core::error::{ConfigError, ConfigResult};
use softplc_core::source::{Source, SourceConfig, SourceTiming};

use crate::PROTOCOL_TYPE;
use crate::source::ModbusTcpSource;
use crate::transport::TcpTransport;
use crate::types::{DataType, Endianness, RegisterArea};

/// Default Modbus TCP port.
pub const DEFAULT_PORT: u32 = 502;

/// Default unit identifier.
pub const DEFAULT_UNIT_ID: u32 = 1;

/// Highest assignable unit identifier.
pub const MAX_UNIT_ID: u32 = 247;

/// Default bound on connect, poll and close.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default wait between a failure and the next connection attempt.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

// =============================================================================
// RegisterMapping
// =============================================================================

/// One process variable read from the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterMapping {
    /// Variable name, unique within the source.
    pub name: String,

    /// Data area the variable lives in.
    pub area: RegisterArea,

    /// Zero-based start address.
    pub address: u16,

    /// Interpretation of the raw registers.
    #[serde(rename = "type")]
    pub data_type: DataType,

    /// Multiplier applied to numeric values; the result is published as `float64`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

impl RegisterMapping {
    /// Creates a mapping without scaling.
    pub fn new(
        name: impl Into<String>,
        area: RegisterArea,
        address: u16,
        data_type: DataType,
    ) -> Self {
        Self {
            name: name.into(),
            area,
            address,
            data_type,
            scale: None,
        }
    }

    /// Sets the scale factor.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Number of registers (or bits) read for this mapping.
    #[inline]
    pub fn count(&self) -> u16 {
        self.data_type.register_count()
    }

    /// Checks the mapping in isolation.
    pub fn validate(&self) -> ConfigResult<()> {
        let field = |suffix: &str| format!("registers.{}.{}", self.name, suffix);

        if self.name.trim().is_empty() {
            return Err(ConfigError::missing_field("registers.name"));
        }

        // Bit areas hold bools only; word areas hold everything else.
        if self.area.is_bit() != (self.data_type == DataType::Bool) {
            return Err(ConfigError::validation(
                field("type"),
                format!(
                    "type '{}' cannot be read from area '{}'",
                    self.data_type, self.area
                ),
            ));
        }

        let end = u32::from(self.address) + u32::from(self.count()) - 1;
        if end > u32::from(u16::MAX) {
            return Err(ConfigError::validation(
                field("address"),
                format!(
                    "{} at address {} exceeds the 16-bit address space",
                    self.data_type, self.address
                ),
            ));
        }

        if let Some(scale) = self.scale {
            if self.data_type == DataType::Bool {
                return Err(ConfigError::validation(
                    field("scale"),
                    "scale cannot be applied to bool",
                ));
            }
            if !scale.is_finite() || scale == 0.0 {
                return Err(ConfigError::validation(
                    field("scale"),
                    format!("must be a finite non-zero number, got {}", scale),
                ));
            }
        }

        Ok(())
    }
}

// =============================================================================
// ModbusTcpConfig
// =============================================================================

/// Configuration of one Modbus TCP source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModbusTcpConfig {
    /// Assigned by the registry from the enclosing source entry.
    #[serde(skip)]
    name: String,

    /// Device host name or IP address.
    #[serde(default)]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u32,

    /// Modbus unit identifier.
    #[serde(default = "default_unit_id", alias = "unitid")]
    pub unit_id: u32,

    /// Bound on connect, poll and close.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Interval between poll cycles; zero selects the default.
    #[serde(default, alias = "pollinterval")]
    pub poll_interval: Duration,

    /// Wait between a failure and the next connection attempt.
    #[serde(default = "default_retry_interval", alias = "retryinterval")]
    pub retry_interval: Duration,

    /// Byte order within a register.
    #[serde(default, alias = "byteorder")]
    pub byte_order: Endianness,

    /// Register order within a multi-register value.
    #[serde(default, alias = "wordorder")]
    pub word_order: Endianness,

    /// Variables read on every poll.
    #[serde(default)]
    pub registers: Vec<RegisterMapping>,
}

fn default_port() -> u32 {
    DEFAULT_PORT
}

fn default_unit_id() -> u32 {
    DEFAULT_UNIT_ID
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_retry_interval() -> Duration {
    DEFAULT_RETRY_INTERVAL
}

impl ModbusTcpConfig {
    /// Creates a config for `host` with every other field at its default.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            unit_id: DEFAULT_UNIT_ID,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: Duration::ZERO,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            byte_order: Endianness::Big,
            word_order: Endianness::Big,
            registers: Vec::new(),
        }
    }

    /// Decodes the protocol-specific fields of a source entry.
    pub fn from_value(name: &str, raw: &serde_json::Value) -> ConfigResult<Self> {
        let mut config: Self = serde_json::from_value(raw.clone())
            .map_err(|e| ConfigError::parse(name, e.to_string()))?;
        config.name = name.to_string();
        Ok(config)
    }

    /// Adds a register mapping.
    pub fn with_register(mut self, register: RegisterMapping) -> Self {
        self.registers.push(register);
        self
    }

    /// Returns `host:port`.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Unit identifier as sent on the wire.
    pub(crate) fn unit_id_u8(&self) -> ConfigResult<u8> {
        u8::try_from(self.unit_id)
            .map_err(|_| ConfigError::validation("unitId", format!("{} does not fit a byte", self.unit_id)))
    }

    fn port_u16(&self) -> ConfigResult<u16> {
        u16::try_from(self.port)
            .map_err(|_| ConfigError::validation("port", format!("{} does not fit 16 bits", self.port)))
    }

    fn validate_registers(&self) -> ConfigResult<()> {
        let mut names = HashSet::with_capacity(self.registers.len());
        for register in &self.registers {
            register.validate()?;
            if !names.insert(register.name.as_str()) {
                return Err(ConfigError::validation(
                    "registers",
                    format!("duplicate variable name '{}'", register.name),
                ));
            }
        }
        Ok(())
    }
}

impl SourceConfig for ModbusTcpConfig {
    fn validate(&mut self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::missing_field("host"));
        }

        if self.port == 0 || self.port > u32::from(u16::MAX) {
            return Err(ConfigError::validation(
                "port",
                format!("must be between 1 and 65535, got {}", self.port),
            ));
        }

        if self.unit_id == 0 || self.unit_id > MAX_UNIT_ID {
            return Err(ConfigError::validation(
                "unitId",
                format!("must be between 1 and {}, got {}", MAX_UNIT_ID, self.unit_id),
            ));
        }

        if !self.timeout.is_positive() {
            return Err(ConfigError::validation(
                "timeout",
                format!("must be positive, got {}", self.timeout),
            ));
        }

        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        } else if !self.poll_interval.is_positive() {
            return Err(ConfigError::validation(
                "pollInterval",
                format!("must not be negative, got {}", self.poll_interval),
            ));
        }

        if !self.retry_interval.is_positive() {
            return Err(ConfigError::validation(
                "retryInterval",
                format!("must be positive, got {}", self.retry_interval),
            ));
        }

        self.validate_registers()
    }

    fn protocol_type(&self) -> &str {
        PROTOCOL_TYPE
    }

    fn source_name(&self) -> &str {
        &self.name
    }

    fn timing(&self) -> SourceTiming {
        SourceTiming {
            timeout: self.timeout,
            poll_interval: self.poll_interval,
            retry_interval: self.retry_interval,
        }
    }

    fn endpoint(&self) -> String {
        format!("{} (unit {})", self.socket_addr(), self.unit_id)
    }

    fn create_source(&self) -> ConfigResult<Box<dyn Source>> {
        let transport = TcpTransport::new(self.host.clone(), self.port_u16()?, self.unit_id_u8()?);
        Ok(Box::new(ModbusTcpSource::new(self, transport)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: serde_json::Value) -> ConfigResult<ModbusTcpConfig> {
        let mut config = ModbusTcpConfig::from_value("plc-1", &raw)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse(json!({ "host": "10.0.0.5" })).unwrap();

        assert_eq!(config.port, 502);
        assert_eq!(config.unit_id, 1);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.retry_interval, Duration::from_secs(5));
        assert_eq!(config.byte_order, Endianness::Big);
        assert_eq!(config.word_order, Endianness::Big);
        assert_eq!(config.source_name(), "plc-1");
        assert_eq!(config.protocol_type(), "modbus-tcp");
    }

    #[test]
    fn test_zero_poll_interval_takes_default() {
        let config = parse(json!({ "host": "plc", "pollInterval": "0s" })).unwrap();
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_explicit_fields() {
        let config = parse(json!({
            "host": "plc.local",
            "port": 1502,
            "unitId": 17,
            "timeout": "250ms",
            "pollInterval": "100ms",
            "retryInterval": "2s",
            "byteOrder": "little",
            "wordOrder": "little",
        }))
        .unwrap();

        assert_eq!(config.port, 1502);
        assert_eq!(config.unit_id, 17);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.retry_interval, Duration::from_secs(2));
        assert_eq!(config.byte_order, Endianness::Little);
        assert_eq!(config.endpoint(), "plc.local:1502 (unit 17)");
    }

    #[test]
    fn test_lowercase_keys_accepted() {
        let config = parse(json!({
            "host": "plc",
            "unitid": 3,
            "pollinterval": "2s",
            "wordorder": "little",
        }))
        .unwrap();

        assert_eq!(config.unit_id, 3);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.word_order, Endianness::Little);
    }

    #[test]
    fn test_port_out_of_range() {
        let err = parse(json!({ "host": "plc", "port": 70000 })).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert_eq!(err.field(), Some("port"));

        let err = parse(json!({ "host": "plc", "port": 0 })).unwrap_err();
        assert_eq!(err.field(), Some("port"));
    }

    #[test]
    fn test_missing_host() {
        let err = parse(json!({ "port": 502 })).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field } if field == "host"));
    }

    #[test]
    fn test_unit_id_range() {
        assert!(parse(json!({ "host": "plc", "unitId": 247 })).is_ok());

        let err = parse(json!({ "host": "plc", "unitId": 0 })).unwrap_err();
        assert_eq!(err.field(), Some("unitId"));
        let err = parse(json!({ "host": "plc", "unitId": 248 })).unwrap_err();
        assert_eq!(err.field(), Some("unitId"));
    }

    #[test]
    fn test_non_positive_timing_rejected() {
        let err = parse(json!({ "host": "plc", "timeout": "0s" })).unwrap_err();
        assert_eq!(err.field(), Some("timeout"));

        let err = parse(json!({ "host": "plc", "pollInterval": "-1s" })).unwrap_err();
        assert_eq!(err.field(), Some("pollInterval"));

        let err = parse(json!({ "host": "plc", "retryInterval": "-5s" })).unwrap_err();
        assert_eq!(err.field(), Some("retryInterval"));
    }

    #[test]
    fn test_malformed_input_is_parse_error() {
        let err = parse(json!({ "host": "plc", "timeout": "fast" })).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = parse(json!({ "host": "plc", "byteOrder": "middle" })).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = parse(json!({ "host": "plc", "hots": "typo" })).unwrap_err();
        assert!(err.to_string().contains("hots"));
    }

    #[test]
    fn test_registers() {
        let config = parse(json!({
            "host": "plc",
            "registers": [
                { "name": "temperature", "area": "holding", "address": 0, "type": "float32" },
                { "name": "running", "area": "coil", "address": 10, "type": "bool" },
                { "name": "flow", "area": "input", "address": 4, "type": "int16", "scale": 0.1 },
            ]
        }))
        .unwrap();

        assert_eq!(config.registers.len(), 3);
        assert_eq!(config.registers[0].count(), 2);
        assert_eq!(config.registers[2].scale, Some(0.1));
    }

    #[test]
    fn test_register_area_type_mismatch() {
        let err = parse(json!({
            "host": "plc",
            "registers": [{ "name": "x", "area": "coil", "address": 0, "type": "int16" }]
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("registers.x.type"));

        let err = parse(json!({
            "host": "plc",
            "registers": [{ "name": "y", "area": "holding", "address": 0, "type": "bool" }]
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("registers.y.type"));
    }

    #[test]
    fn test_register_address_overflow() {
        let err = parse(json!({
            "host": "plc",
            "registers": [{ "name": "x", "area": "holding", "address": 65534, "type": "float64" }]
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("registers.x.address"));

        assert!(parse(json!({
            "host": "plc",
            "registers": [{ "name": "x", "area": "holding", "address": 65532, "type": "float64" }]
        }))
        .is_ok());
    }

    #[test]
    fn test_duplicate_register_names() {
        let err = parse(json!({
            "host": "plc",
            "registers": [
                { "name": "x", "area": "holding", "address": 0, "type": "uint16" },
                { "name": "x", "area": "input", "address": 0, "type": "uint16" },
            ]
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("registers"));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let mut config = parse(json!({ "host": "plc" })).unwrap();
        let before = config.clone();
        config.validate().unwrap();
        assert_eq!(config, before);
    }
}
