// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Simulated Modbus Device
//!
//! An in-memory [`ModbusTransport`] so the real [`ModbusTcpSource`] can run
//! under the supervisor without a network. Clones share the register image
//! and the read counter, so a scripted hang survives reconnects.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use softplc_core::{ConfigResult, Source, SourceConfig, SourceError, SourceResult, SourceTiming};
use softplc_modbus::{ModbusTcpConfig, ModbusTcpSource, ModbusTransport};

// =============================================================================
// SimulatedDevice
// =============================================================================

/// A Modbus device backed by register maps.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDevice {
    shared: Arc<DeviceState>,
    connected: bool,
}

#[derive(Debug, Default)]
struct DeviceState {
    holding: Mutex<HashMap<u16, u16>>,
    coils: Mutex<HashMap<u16, bool>>,
    hang_on_read: Mutex<Option<u64>>,
    reads: AtomicU64,
}

impl SimulatedDevice {
    /// Creates a device with every register at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a holding register.
    pub fn set_holding(&self, address: u16, value: u16) {
        self.shared.holding.lock().insert(address, value);
    }

    /// Sets a coil.
    pub fn set_coil(&self, address: u16, value: bool) {
        self.shared.coils.lock().insert(address, value);
    }

    /// Makes the Nth read (1-based, counted across clones) never complete.
    pub fn hang_on_read(&self, n: u64) {
        *self.shared.hang_on_read.lock() = Some(n);
    }

    /// Number of read requests issued.
    pub fn reads(&self) -> u64 {
        self.shared.reads.load(Ordering::SeqCst)
    }

    async fn begin_read(&self) -> SourceResult<()> {
        if !self.connected {
            return Err(SourceError::NotConnected);
        }
        let call = self.shared.reads.fetch_add(1, Ordering::SeqCst) + 1;
        let hang = *self.shared.hang_on_read.lock() == Some(call);
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

#[async_trait]
impl ModbusTransport for SimulatedDevice {
    async fn connect(&mut self) -> SourceResult<()> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> SourceResult<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn read_coils(&mut self, address: u16, count: u16) -> SourceResult<Vec<bool>> {
        self.begin_read().await?;
        let coils = self.shared.coils.lock();
        Ok((address..address + count)
            .map(|a| coils.get(&a).copied().unwrap_or(false))
            .collect())
    }

    async fn read_discrete_inputs(&mut self, address: u16, count: u16) -> SourceResult<Vec<bool>> {
        self.read_coils(address, count).await
    }

    async fn read_holding_registers(&mut self, address: u16, count: u16) -> SourceResult<Vec<u16>> {
        self.begin_read().await?;
        let holding = self.shared.holding.lock();
        Ok((address..address + count)
            .map(|a| holding.get(&a).copied().unwrap_or(0))
            .collect())
    }

    async fn read_input_registers(&mut self, address: u16, count: u16) -> SourceResult<Vec<u16>> {
        self.read_holding_registers(address, count).await
    }

    fn display_name(&self) -> String {
        "simulated".into()
    }
}

// =============================================================================
// SimulatedModbusConfig
// =============================================================================

/// A Modbus config whose sources talk to a [`SimulatedDevice`].
#[derive(Debug, Clone)]
pub struct SimulatedModbusConfig {
    modbus: ModbusTcpConfig,
    device: SimulatedDevice,
}

impl SimulatedModbusConfig {
    /// Wraps `modbus`; every created source gets a clone of `device`.
    pub fn new(modbus: ModbusTcpConfig, device: SimulatedDevice) -> Self {
        Self { modbus, device }
    }
}

impl SourceConfig for SimulatedModbusConfig {
    fn validate(&mut self) -> ConfigResult<()> {
        self.modbus.validate()
    }

    fn protocol_type(&self) -> &str {
        self.modbus.protocol_type()
    }

    fn source_name(&self) -> &str {
        self.modbus.source_name()
    }

    fn timing(&self) -> SourceTiming {
        self.modbus.timing()
    }

    fn endpoint(&self) -> String {
        format!("sim://{}", self.modbus.source_name())
    }

    fn create_source(&self) -> ConfigResult<Box<dyn Source>> {
        Ok(Box::new(ModbusTcpSource::new(&self.modbus, self.device.clone())))
    }
}
