// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport layer for Modbus communication.
//!
//! [`ModbusTransport`] abstracts the four read function codes so the source
//! logic can run against the tokio-modbus TCP client ([`TcpTransport`]) or an
//! in-memory device in tests.
//!
//! A transport is owned by one source task and never shared, so operations
//! take `&mut self` and no internal locking is needed.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_modbus::client::Context as ModbusContext;
use tokio_modbus::prelude::*;
use tokio_modbus::{Error as TokioModbusError, ExceptionCode};

use softplc_core::error::{SourceError, SourceResult};

// =============================================================================
// ModbusTransport Trait
// =============================================================================

/// Read access to one Modbus device.
#[async_trait]
pub trait ModbusTransport: Send {
    /// Establishes the connection.
    async fn connect(&mut self) -> SourceResult<()>;

    /// Closes the connection. Safe to call when not connected.
    async fn disconnect(&mut self) -> SourceResult<()>;

    /// Returns `true` while a connection is held.
    fn is_connected(&self) -> bool;

    /// Reads coils (FC 01).
    async fn read_coils(&mut self, address: u16, count: u16) -> SourceResult<Vec<bool>>;

    /// Reads discrete inputs (FC 02).
    async fn read_discrete_inputs(&mut self, address: u16, count: u16) -> SourceResult<Vec<bool>>;

    /// Reads holding registers (FC 03).
    async fn read_holding_registers(&mut self, address: u16, count: u16) -> SourceResult<Vec<u16>>;

    /// Reads input registers (FC 04).
    async fn read_input_registers(&mut self, address: u16, count: u16) -> SourceResult<Vec<u16>>;

    /// Returns a display name for logs.
    fn display_name(&self) -> String;
}

// =============================================================================
// TcpTransport
// =============================================================================

/// Modbus TCP transport using tokio-modbus.
///
/// Operations carry no timeouts of their own; the supervisor bounds every
/// connect, poll and close with the source timeout.
pub struct TcpTransport {
    host: String,
    port: u16,
    unit_id: u8,
    context: Option<ModbusContext>,
}

impl TcpTransport {
    /// Creates a disconnected transport.
    pub fn new(host: impl Into<String>, port: u16, unit_id: u8) -> Self {
        Self {
            host: host.into(),
            port,
            unit_id,
            context: None,
        }
    }

    /// Returns `host:port`.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn context(&mut self) -> SourceResult<&mut ModbusContext> {
        self.context.as_mut().ok_or(SourceError::NotConnected)
    }

    /// Maps a tokio-modbus error; transport failures drop the connection.
    fn map_modbus_error(&mut self, error: TokioModbusError, operation: &str) -> SourceError {
        match error {
            TokioModbusError::Transport(io_error) => {
                self.context = None;
                match io_error.kind() {
                    io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof => SourceError::connection_failed_with(
                        format!("{} lost connection to {}", operation, self.socket_addr()),
                        io_error,
                    ),
                    _ => SourceError::Io(io_error),
                }
            }
            TokioModbusError::Protocol(protocol_error) => {
                SourceError::protocol(format!("{}: {:?}", operation, protocol_error))
            }
        }
    }

    /// Maps a Modbus exception response.
    fn map_exception(exception: ExceptionCode, operation: &str) -> SourceError {
        SourceError::protocol(format!("{}: device returned exception {:?}", operation, exception))
    }
}

/// Resolves `addr_str`, trying a literal address before DNS.
///
/// Arguments are owned: a `&TcpTransport` held across the lookup would make
/// the connect future `!Send`.
async fn resolve_address(host: String, addr_str: String) -> SourceResult<SocketAddr> {
    if let Ok(addr) = addr_str.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let mut addrs = tokio::net::lookup_host(&addr_str).await.map_err(|e| {
        SourceError::connection_failed_with(format!("cannot resolve '{}'", host), e)
    })?;

    addrs.next().ok_or_else(|| {
        SourceError::connection_failed(format!("'{}' resolved to no addresses", host))
    })
}

#[async_trait]
impl ModbusTransport for TcpTransport {
    async fn connect(&mut self) -> SourceResult<()> {
        if self.context.is_some() {
            return Ok(());
        }

        let socket_addr = resolve_address(self.host.clone(), self.socket_addr()).await?;

        let stream = TcpStream::connect(socket_addr).await.map_err(|e| {
            SourceError::connection_failed_with(format!("cannot connect to {}", socket_addr), e)
        })?;
        stream.set_nodelay(true).ok();

        self.context = Some(tcp::attach_slave(stream, Slave(self.unit_id)));

        tracing::info!(
            host = %self.host,
            port = self.port,
            unit_id = self.unit_id,
            "Connected to Modbus TCP device"
        );

        Ok(())
    }

    async fn disconnect(&mut self) -> SourceResult<()> {
        if let Some(mut ctx) = self.context.take() {
            if let Err(e) = ctx.disconnect().await {
                tracing::warn!(error = %e, "Error disconnecting from Modbus device");
            }

            tracing::debug!(
                host = %self.host,
                port = self.port,
                "Disconnected from Modbus TCP device"
            );
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.context.is_some()
    }

    async fn read_coils(&mut self, address: u16, count: u16) -> SourceResult<Vec<bool>> {
        let result = self.context()?.read_coils(address, count).await;
        result
            .map_err(|e| self.map_modbus_error(e, "read_coils"))?
            .map_err(|e| Self::map_exception(e, "read_coils"))
    }

    async fn read_discrete_inputs(&mut self, address: u16, count: u16) -> SourceResult<Vec<bool>> {
        let result = self.context()?.read_discrete_inputs(address, count).await;
        result
            .map_err(|e| self.map_modbus_error(e, "read_discrete_inputs"))?
            .map_err(|e| Self::map_exception(e, "read_discrete_inputs"))
    }

    async fn read_holding_registers(&mut self, address: u16, count: u16) -> SourceResult<Vec<u16>> {
        let result = self.context()?.read_holding_registers(address, count).await;
        result
            .map_err(|e| self.map_modbus_error(e, "read_holding_registers"))?
            .map_err(|e| Self::map_exception(e, "read_holding_registers"))
    }

    async fn read_input_registers(&mut self, address: u16, count: u16) -> SourceResult<Vec<u16>> {
        let result = self.context()?.read_input_registers(address, count).await;
        result
            .map_err(|e| self.map_modbus_error(e, "read_input_registers"))?
            .map_err(|e| Self::map_exception(e, "read_input_registers"))
    }

    fn display_name(&self) -> String {
        format!("Modbus TCP {}:{} (unit {})", self.host, self.port, self.unit_id)
    }
}

impl fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("unit_id", &self.unit_id)
            .field("connected", &self.context.is_some())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
