// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Sample configurations.

use softplc_config::SourceEntry;
use softplc_core::SourceRegistry;

use super::mocks::{MOCK_TYPE, register_mock};

/// A configuration mixing valid and invalid entries.
///
/// Resolves to `healthy`, `flaky` and `refused`; `press-1` has an
/// out-of-range port, `robot` an unknown type and the second `healthy` a
/// duplicate name.
pub const MIXED_YAML: &str = r#"
runtime:
  name: line-3
  shutdown_timeout: 2s

logging:
  level: debug
  format: compact

sources:
  - name: healthy
    type: mock
    pollInterval: 100ms

  - name: flaky
    type: mock
    behavior:
      poll-fails-on: 3
    pollInterval: 100ms
    retryInterval: 200ms

  - name: refused
    type: mock
    behavior: failing-connect
    timeout: 50ms
    retryInterval: 300ms

  - name: press-1
    type: modbus-tcp
    host: 10.0.0.5
    port: 70000

  - name: robot
    type: ethercat

  - name: healthy
    type: mock
"#;

/// A minimal TOML configuration with one Modbus source.
pub const MODBUS_TOML: &str = r#"
[runtime]
name = "press-shop"

[supervisor]
backoff = "exponential"
backoff_multiplier = 2.0
backoff_max = "30s"

[[sources]]
name = "press-1"
type = "modbus-tcp"
host = "${PLC_HOST:10.0.0.5}"
unitId = 3
pollInterval = "250ms"
"#;

/// Builds a registry with the Modbus driver and the mock driver.
pub fn test_registry() -> SourceRegistry {
    let registry = SourceRegistry::new();
    softplc_modbus::register(&registry);
    register_mock(&registry);
    registry
}

/// A mock source entry with the given behavior setting.
pub fn mock_entry(name: &str, behavior: &str) -> SourceEntry {
    SourceEntry::new(name, MOCK_TYPE).with_setting("behavior", behavior)
}
