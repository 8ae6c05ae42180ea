// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Conversion of raw Modbus registers into typed values.
//!
//! Modbus transfers 16-bit registers big-endian. Values wider than one register
//! are assembled according to the source's word order (register sequence) and
//! byte order (bytes within each register), then decoded big-endian.

use softplc_core::error::{SourceError, SourceResult};
use softplc_core::types::Value;

use crate::config::RegisterMapping;
use crate::types::{DataType, Endianness};

/// Register layout of multi-register values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterLayout {
    /// Byte order within a register.
    pub byte_order: Endianness,
    /// Register order within a value.
    pub word_order: Endianness,
}

impl RegisterLayout {
    /// Creates a layout.
    pub const fn new(byte_order: Endianness, word_order: Endianness) -> Self {
        Self {
            byte_order,
            word_order,
        }
    }

    /// Assembles registers into big-endian bytes.
    fn to_bytes<const N: usize>(&self, registers: &[u16]) -> [u8; N] {
        let mut bytes = [0u8; N];
        let words = N / 2;

        for i in 0..words {
            let register = match self.word_order {
                Endianness::Big => registers[i],
                Endianness::Little => registers[words - 1 - i],
            };
            let [hi, lo] = register.to_be_bytes();
            let (first, second) = match self.byte_order {
                Endianness::Big => (hi, lo),
                Endianness::Little => (lo, hi),
            };
            bytes[2 * i] = first;
            bytes[2 * i + 1] = second;
        }

        bytes
    }
}

/// Decodes the registers read for `mapping`.
///
/// # Errors
///
/// Returns [`SourceError::InvalidResponse`] if the device returned fewer
/// registers than the type needs, or a non-finite scaled value.
pub fn decode_registers(
    registers: &[u16],
    mapping: &RegisterMapping,
    layout: RegisterLayout,
) -> SourceResult<Value> {
    let needed = usize::from(mapping.count());
    if registers.len() < needed {
        return Err(SourceError::invalid_response(format!(
            "'{}' needs {} registers, device returned {}",
            mapping.name,
            needed,
            registers.len()
        )));
    }

    let value = match mapping.data_type {
        DataType::Bool => Value::Bool(registers[0] != 0),
        DataType::Int16 => Value::Int16(i16::from_be_bytes(layout.to_bytes::<2>(registers))),
        DataType::UInt16 => Value::UInt16(u16::from_be_bytes(layout.to_bytes::<2>(registers))),
        DataType::Int32 => Value::Int32(i32::from_be_bytes(layout.to_bytes::<4>(registers))),
        DataType::UInt32 => Value::UInt32(u32::from_be_bytes(layout.to_bytes::<4>(registers))),
        DataType::Float32 => Value::Float32(f32::from_be_bytes(layout.to_bytes::<4>(registers))),
        DataType::Int64 => Value::Int64(i64::from_be_bytes(layout.to_bytes::<8>(registers))),
        DataType::UInt64 => Value::UInt64(u64::from_be_bytes(layout.to_bytes::<8>(registers))),
        DataType::Float64 => Value::Float64(f64::from_be_bytes(layout.to_bytes::<8>(registers))),
    };

    apply_scale(value, mapping)
}

/// Decodes the bit read for a `bool` mapping.
pub fn decode_bits(bits: &[bool], mapping: &RegisterMapping) -> SourceResult<Value> {
    bits.first().copied().map(Value::Bool).ok_or_else(|| {
        SourceError::invalid_response(format!("'{}' needs 1 bit, device returned none", mapping.name))
    })
}

fn apply_scale(value: Value, mapping: &RegisterMapping) -> SourceResult<Value> {
    let Some(scale) = mapping.scale else {
        return Ok(value);
    };

    let raw = value.as_f64().ok_or_else(|| {
        SourceError::invalid_response(format!(
            "'{}' is {} and cannot be scaled",
            mapping.name,
            value.type_name()
        ))
    })?;

    let scaled = raw * scale;
    if !scaled.is_finite() {
        return Err(SourceError::invalid_response(format!(
            "'{}' scaled to a non-finite value",
            mapping.name
        )));
    }
    Ok(Value::Float64(scaled))
}

// =============================================================================
// Tests
// =============================================================================
