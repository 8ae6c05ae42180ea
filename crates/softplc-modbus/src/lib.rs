// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # softplc-modbus
//!
//! Modbus TCP source driver for the softplc runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               ModbusTcpConfig                │
//! │  (parsed from a `type: modbus-tcp` entry)    │
//! └──────────────────────────────────────────────┘
//!                        │ create_source()
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │               ModbusTcpSource                │
//! │      (softplc_core::Source impl, codec)      │
//! └──────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │               ModbusTransport                │
//! │    TcpTransport (tokio-modbus) or a fake     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! PDU framing and the MBAP header are handled by `tokio-modbus`.
//!
//! ## Registration
//!
//! ```
//! use softplc_core::SourceRegistry;
//!
//! let registry = SourceRegistry::new();
//! softplc_modbus::register(&registry);
//! assert!(registry.contains("modbus-tcp"));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod source;
pub mod transport;
pub mod types;

pub use codec::RegisterLayout;
pub use config::{ModbusTcpConfig, RegisterMapping};
pub use source::ModbusTcpSource;
pub use transport::{ModbusTransport, TcpTransport};
pub use types::{DataType, Endianness, RegisterArea};

use softplc_core::registry::SourceRegistry;
use softplc_core::source::SourceConfig;

/// Protocol type this crate registers.
pub const PROTOCOL_TYPE: &str = "modbus-tcp";

/// Registers the Modbus TCP factory.
///
/// # Panics
///
/// Panics if `modbus-tcp` is already registered.
pub fn register(registry: &SourceRegistry) {
    registry.register(PROTOCOL_TYPE, |name, raw| {
        let config = ModbusTcpConfig::from_value(name, raw)?;
        Ok(Box::new(config) as Box<dyn SourceConfig>)
    });
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use softplc_core::error::ConfigError;

    #[test]
    fn test_parse_through_registry() {
        let registry = SourceRegistry::new();
        register(&registry);

        let validated = registry
            .parse_config("modbus-tcp", "press-1", &json!({ "host": "10.0.0.5" }))
            .unwrap();

        assert_eq!(validated.name(), "press-1");
        assert_eq!(validated.protocol_type(), "modbus-tcp");
        assert_eq!(validated.timing().poll_interval, std::time::Duration::from_secs(1));
        assert_eq!(validated.endpoint(), "10.0.0.5:502 (unit 1)");
        assert!(validated.create_source().is_ok());
    }

    #[test]
    fn test_registry_reports_port_error() {
        let registry = SourceRegistry::new();
        register(&registry);

        let err = registry
            .parse_config("modbus-tcp", "press-1", &json!({ "host": "plc", "port": 70000 }))
            .unwrap_err();

        assert!(matches!(err.root(), ConfigError::Validation { .. }));
        assert_eq!(err.field(), Some("port"));
        assert!(err.to_string().contains("press-1"));
    }

    #[test]
    #[should_panic(expected = "Source type 'modbus-tcp' already registered")]
    fn test_double_registration_panics() {
        let registry = SourceRegistry::new();
        register(&registry);
        register(&registry);
    }
}
