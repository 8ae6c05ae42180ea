// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus data model: register areas, data types and register ordering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use softplc_core::error::ConfigError;

// =============================================================================
// RegisterArea
// =============================================================================

/// The four Modbus data areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterArea {
    /// Holding registers (FC 03, 16 bit).
    Holding,
    /// Input registers (FC 04, 16 bit).
    Input,
    /// Coils (FC 01, 1 bit).
    Coil,
    /// Discrete inputs (FC 02, 1 bit).
    Discrete,
}

impl RegisterArea {
    /// Returns `true` for the 1-bit areas.
    #[inline]
    pub const fn is_bit(&self) -> bool {
        matches!(self, Self::Coil | Self::Discrete)
    }

    /// Returns the read function code.
    #[inline]
    pub const fn function_code(&self) -> u8 {
        match self {
            Self::Coil => 0x01,
            Self::Discrete => 0x02,
            Self::Holding => 0x03,
            Self::Input => 0x04,
        }
    }

    /// Returns the configuration name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Holding => "holding",
            Self::Input => "input",
            Self::Coil => "coil",
            Self::Discrete => "discrete",
        }
    }
}

impl fmt::Display for RegisterArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// DataType
// =============================================================================

/// How the raw registers of a mapping are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Single bit from a coil or discrete input.
    Bool,
    /// 16-bit signed integer (1 register).
    Int16,
    /// 16-bit unsigned integer (1 register).
    UInt16,
    /// 32-bit signed integer (2 registers).
    Int32,
    /// 32-bit unsigned integer (2 registers).
    UInt32,
    /// 32-bit IEEE 754 float (2 registers).
    Float32,
    /// 64-bit signed integer (4 registers).
    Int64,
    /// 64-bit unsigned integer (4 registers).
    UInt64,
    /// 64-bit IEEE 754 float (4 registers).
    Float64,
}

impl DataType {
    /// Returns the number of registers (or bits, for `Bool`) the type spans.
    #[inline]
    pub const fn register_count(&self) -> u16 {
        match self {
            Self::Bool | Self::Int16 | Self::UInt16 => 1,
            Self::Int32 | Self::UInt32 | Self::Float32 => 2,
            Self::Int64 | Self::UInt64 | Self::Float64 => 4,
        }
    }

    /// Returns the configuration name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Float32 => "float32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Endianness
// =============================================================================

/// Ordering of bytes within a register, or of registers within a value.
///
/// Modbus itself is big-endian on the wire; devices that store multi-register
/// values differently are described by a `byteOrder` / `wordOrder` pair:
///
/// | byteOrder | wordOrder | Layout |
/// |-----------|-----------|--------|
/// | big       | big       | ABCD   |
/// | little    | big       | BADC   |
/// | big       | little    | CDAB   |
/// | little    | little    | DCBA   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Most significant first.
    #[default]
    Big,
    /// Least significant first.
    Little,
}

impl Endianness {
    /// Returns the configuration name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Big => "big",
            Self::Little => "little",
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endianness {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "big" | "bigendian" | "be" | "msbfirst" => Ok(Self::Big),
            "little" | "littleendian" | "le" | "lsbfirst" => Ok(Self::Little),
            _ => Err(ConfigError::validation(
                "byteOrder",
                format!("expected 'big' or 'little', got '{}'", s),
            )),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
