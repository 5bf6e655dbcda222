// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Dynamic value representation, display formatting, and status-code
//! classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Value
// =============================================================================

/// A dynamically-typed value delivered in a data change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Null / empty value.
    Null,
    /// Boolean.
    Boolean(bool),
    /// Signed 8-bit integer.
    SByte(i8),
    /// Unsigned 8-bit integer.
    Byte(u8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Unsigned 16-bit integer.
    UInt16(u16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit double.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Date/time.
    DateTime(DateTime<Utc>),
    /// GUID.
    Guid(Uuid),
    /// Byte string.
    ByteString(Vec<u8>),
    /// Homogeneous array of values.
    Array(Vec<Value>),
}

impl Value {
    /// Formats this value for display.
    ///
    /// The mapping is deterministic:
    /// - null prints `"null"`
    /// - strings pass through unchanged
    /// - integers print in decimal
    /// - floats and doubles print with exactly two decimal places
    ///   (`3.14159` prints `"3.14"`, `100.0` prints `"100.00"`)
    /// - booleans print `"True"` / `"False"`
    /// - date/times print with a 4-digit year
    /// - byte strings print `"[N bytes]"`, arrays `"[N items]"`
    pub fn display_string(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Boolean(b) => {
                if *b {
                    "True".to_string()
                } else {
                    "False".to_string()
                }
            }
            Self::SByte(n) => n.to_string(),
            Self::Byte(n) => n.to_string(),
            Self::Int16(n) => n.to_string(),
            Self::UInt16(n) => n.to_string(),
            Self::Int32(n) => n.to_string(),
            Self::UInt32(n) => n.to_string(),
            Self::Int64(n) => n.to_string(),
            Self::UInt64(n) => n.to_string(),
            Self::Float(f) => format!("{:.2}", f),
            Self::Double(f) => format!("{:.2}", f),
            Self::String(s) => s.clone(),
            Self::DateTime(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Guid(g) => g.to_string(),
            Self::ByteString(bytes) => format!("[{} bytes]", bytes.len()),
            Self::Array(items) => format!("[{} items]", items.len()),
        }
    }

    /// Returns `true` if this is the null value.
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the numeric value as `f64`, if this value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::SByte(n) => Some(*n as f64),
            Self::Byte(n) => Some(*n as f64),
            Self::Int16(n) => Some(*n as f64),
            Self::UInt16(n) => Some(*n as f64),
            Self::Int32(n) => Some(*n as f64),
            Self::UInt32(n) => Some(*n as f64),
            Self::Int64(n) => Some(*n as f64),
            Self::UInt64(n) => Some(*n as f64),
            Self::Float(f) => Some(*f as f64),
            Self::Double(f) => Some(*f),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_string())
    }
}

// =============================================================================
// StatusClass
// =============================================================================

/// Severity mask: bit 31 set means Bad.
const STATUS_BAD_MASK: u32 = 0x8000_0000;

/// Severity mask: bit 30 set (with bit 31 clear) means Uncertain.
const STATUS_UNCERTAIN_MASK: u32 = 0x4000_0000;

/// Quality classification of a raw status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// The value is good.
    Good,
    /// The value is usable but its quality is degraded.
    Uncertain,
    /// The value is unusable.
    Bad,
}

impl StatusClass {
    /// Classifies a raw status code by its severity bits.
    pub const fn from_code(code: u32) -> Self {
        if code & STATUS_BAD_MASK != 0 {
            Self::Bad
        } else if code & STATUS_UNCERTAIN_MASK != 0 {
            Self::Uncertain
        } else {
            Self::Good
        }
    }

    /// Returns `true` if the classified value is good.
    #[inline]
    pub const fn is_good(&self) -> bool {
        matches!(self, Self::Good)
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "Good"),
            Self::Uncertain => write!(f, "Uncertain"),
            Self::Bad => write!(f, "Bad"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
