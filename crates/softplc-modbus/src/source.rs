// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP runtime source.
//!
//! A poll reads every configured register mapping in order and returns the
//! complete value set. Any failed read fails the whole poll; partial results
//! are never returned.

use std::fmt;

use async_trait::async_trait;

use softplc_core::error::{SourceError, SourceResult};
use softplc_core::source::{Source, SourceConfig};
use softplc_core::types::{Value, VariableValue};

use crate::PROTOCOL_TYPE;
use crate::codec::{RegisterLayout, decode_bits, decode_registers};
use crate::config::{ModbusTcpConfig, RegisterMapping};
use crate::transport::ModbusTransport;
use crate::types::RegisterArea;

/// A Modbus source reading a fixed set of register mappings.
pub struct ModbusTcpSource<T: ModbusTransport> {
    name: String,
    transport: T,
    registers: Vec<RegisterMapping>,
    layout: RegisterLayout,
}

impl<T: ModbusTransport> ModbusTcpSource<T> {
    /// Creates a source over `transport` using the mappings of `config`.
    pub fn new(config: &ModbusTcpConfig, transport: T) -> Self {
        Self {
            name: config.source_name().to_string(),
            transport,
            registers: config.registers.clone(),
            layout: RegisterLayout::new(config.byte_order, config.word_order),
        }
    }

    /// Returns the register mappings.
    pub fn registers(&self) -> &[RegisterMapping] {
        &self.registers
    }

    /// Borrows the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Reads and decodes one mapping.
async fn read_mapping<T: ModbusTransport>(
    transport: &mut T,
    mapping: &RegisterMapping,
    layout: RegisterLayout,
) -> SourceResult<Value> {
    let (address, count) = (mapping.address, mapping.count());

    match mapping.area {
        RegisterArea::Coil => {
            let bits = transport.read_coils(address, count).await?;
            decode_bits(&bits, mapping)
        }
        RegisterArea::Discrete => {
            let bits = transport.read_discrete_inputs(address, count).await?;
            decode_bits(&bits, mapping)
        }
        RegisterArea::Holding => {
            let registers = transport.read_holding_registers(address, count).await?;
            decode_registers(&registers, mapping, layout)
        }
        RegisterArea::Input => {
            let registers = transport.read_input_registers(address, count).await?;
            decode_registers(&registers, mapping, layout)
        }
    }
}

#[async_trait]
impl<T: ModbusTransport> Source for ModbusTcpSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn protocol_type(&self) -> &str {
        PROTOCOL_TYPE
    }

    async fn connect(&mut self) -> SourceResult<()> {
        self.transport.connect().await
    }

    async fn poll(&mut self) -> SourceResult<Vec<VariableValue>> {
        if !self.transport.is_connected() {
            return Err(SourceError::NotConnected);
        }

        let mut values = Vec::with_capacity(self.registers.len());

        for mapping in &self.registers {
            match read_mapping(&mut self.transport, mapping, self.layout).await {
                Ok(value) => values.push(VariableValue::new(mapping.name.as_str(), value)),
                Err(e) => {
                    tracing::debug!(
                        source = %self.name,
                        variable = %mapping.name,
                        area = %mapping.area,
                        address = mapping.address,
                        error = %e,
                        "Register read failed"
                    );
                    return Err(e);
                }
            }
        }

        Ok(values)
    }

    async fn close(&mut self) -> SourceResult<()> {
        self.transport.disconnect().await
    }

    fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }
}

impl<T: ModbusTransport> fmt::Debug for ModbusTcpSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModbusTcpSource")
            .field("name", &self.name)
            .field("transport", &self.transport.display_name())
            .field("registers", &self.registers.len())
            .field("layout", &self.layout)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Endianness};
    use std::collections::HashMap;
    use std::time::Duration;

    /// In-memory device with a register image per area.
    #[derive(Default)]
    struct FakeDevice {
        connected: bool,
        refuse: bool,
        holding: HashMap<u16, u16>,
        input: HashMap<u16, u16>,
        coils: HashMap<u16, bool>,
        fail_at: Option<u16>,
        hang_next_holding_read: bool,
        disconnects: u32,
    }

    impl FakeDevice {
        fn words(
            &self,
            image: &HashMap<u16, u16>,
            address: u16,
            count: u16,
        ) -> SourceResult<Vec<u16>> {
            if !self.connected {
                return Err(SourceError::NotConnected);
            }
            if self.fail_at == Some(address) {
                return Err(SourceError::protocol("exception IllegalDataAddress"));
            }
            Ok((address..address + count)
                .map(|a| image.get(&a).copied().unwrap_or(0))
                .collect())
        }
    }

    #[async_trait]
    impl ModbusTransport for FakeDevice {
        async fn connect(&mut self) -> SourceResult<()> {
            if self.refuse {
                return Err(SourceError::connection_failed("connection refused"));
            }
            self.connected = true;
            Ok(())
        }
        async fn disconnect(&mut self) -> SourceResult<()> {
            self.connected = false;
            self.disconnects += 1;
            Ok(())
        }
        fn is_connected(&self) -> bool {
            self.connected
        }
        async fn read_coils(&mut self, address: u16, count: u16) -> SourceResult<Vec<bool>> {
            if !self.connected {
                return Err(SourceError::NotConnected);
            }
            Ok((address..address + count)
                .map(|a| self.coils.get(&a).copied().unwrap_or(false))
                .collect())
        }
        async fn read_discrete_inputs(&mut self, address: u16, count: u16) -> SourceResult<Vec<bool>> {
            self.read_coils(address, count).await
        }
        async fn read_holding_registers(&mut self, address: u16, count: u16) -> SourceResult<Vec<u16>> {
            if std::mem::take(&mut self.hang_next_holding_read) {
                std::future::pending::<()>().await;
            }
            self.words(&self.holding, address, count)
        }
        async fn read_input_registers(&mut self, address: u16, count: u16) -> SourceResult<Vec<u16>> {
            self.words(&self.input, address, count)
        }
        fn display_name(&self) -> String {
            "fake".into()
        }
    }

    fn config() -> ModbusTcpConfig {
        ModbusTcpConfig::new("press-1", "fake")
            .with_register(RegisterMapping::new("temperature", RegisterArea::Holding, 0, DataType::Float32))
            .with_register(RegisterMapping::new("running", RegisterArea::Coil, 5, DataType::Bool))
            .with_register(
                RegisterMapping::new("flow", RegisterArea::Input, 2, DataType::Int16).with_scale(0.5),
            )
    }

    fn device() -> FakeDevice {
        let mut device = FakeDevice::default();
        device.holding.insert(0, 0x42F6);
        device.holding.insert(1, 0xE979);
        device.coils.insert(5, true);
        device.input.insert(2, 40);
        device
    }

    #[tokio::test]
    async fn test_poll_reads_every_mapping() {
        let mut source = ModbusTcpSource::new(&config(), device());
        source.connect().await.unwrap();

        let values = source.poll().await.unwrap();
        assert_eq!(
            values,
            vec![
                VariableValue::new("temperature", Value::Float32(123.456)),
                VariableValue::new("running", true),
                VariableValue::new("flow", 20.0),
            ]
        );
        assert_eq!(source.name(), "press-1");
        assert_eq!(source.protocol_type(), "modbus-tcp");
    }

    #[tokio::test]
    async fn test_poll_is_all_or_nothing() {
        let mut device = device();
        device.fail_at = Some(2);
        let mut source = ModbusTcpSource::new(&config(), device);
        source.connect().await.unwrap();

        let err = source.poll().await.unwrap_err();
        assert!(matches!(err, SourceError::Protocol { .. }));
        // Mappings survive a failed poll.
        assert_eq!(source.registers().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_poll_keeps_mappings() {
        let mut device = device();
        device.hang_next_holding_read = true;
        let mut source = ModbusTcpSource::new(&config(), device);
        source.connect().await.unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(50), source.poll()).await;
        assert!(timed_out.is_err());
        assert_eq!(source.registers().len(), 3);

        source.close().await.unwrap();
        source.connect().await.unwrap();

        let values = source.poll().await.unwrap();
        let names: Vec<&str> = values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["temperature", "running", "flow"]);
    }

    #[tokio::test]
    async fn test_poll_requires_connection() {
        let mut source = ModbusTcpSource::new(&config(), device());
        assert!(matches!(source.poll().await, Err(SourceError::NotConnected)));
    }

    #[tokio::test]
    async fn test_word_order_applied() {
        let mut config = config();
        config.word_order = Endianness::Little;
        let mut device = device();
        device.holding.insert(0, 0xE979);
        device.holding.insert(1, 0x42F6);

        let mut source = ModbusTcpSource::new(&config, device);
        source.connect().await.unwrap();
        let values = source.poll().await.unwrap();
        assert_eq!(values[0].value, Value::Float32(123.456));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut source = ModbusTcpSource::new(&config(), device());
        source.connect().await.unwrap();
        assert!(source.is_connected());

        source.close().await.unwrap();
        source.close().await.unwrap();
        assert!(!source.is_connected());
        assert_eq!(source.transport().disconnects, 2);
    }

    #[tokio::test]
    async fn test_connect_failure_propagates() {
        let mut device = device();
        device.refuse = true;
        let mut source = ModbusTcpSource::new(&config(), device);

        let err = source.connect().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!source.is_connected());
    }
}
