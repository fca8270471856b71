//! Tagged value type for the SML TLV encoding

use crate::error::{SmlError, SmlResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One decoded TLV unit
///
/// Integer widths are preserved as decoded so that a value encoded by the
/// meter as `Unsigned16` stays distinguishable from an `Unsigned32`.
/// An absent optional field is transmitted as an empty octet string and is
/// represented as `OctetString(vec![])`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmlValue {
    /// Octet string
    OctetString(Vec<u8>),
    /// Boolean value
    Boolean(bool),
    /// Integer 8-bit
    Integer8(i8),
    /// Integer 16-bit
    Integer16(i16),
    /// Integer 32-bit
    Integer32(i32),
    /// Integer 64-bit
    Integer64(i64),
    /// Unsigned integer 8-bit
    Unsigned8(u8),
    /// Unsigned integer 16-bit
    Unsigned16(u16),
    /// Unsigned integer 32-bit
    Unsigned32(u32),
    /// Unsigned integer 64-bit
    Unsigned64(u64),
    /// Ordered list of nested values
    List(Vec<SmlValue>),
}

/// Type field of a TL header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmlType {
    OctetString,
    Boolean,
    Integer,
    Unsigned,
    List,
}

impl SmlType {
    /// Get type from the three type bits (bits 6..4 of a TL byte, already shifted)
    pub fn from_bits(bits: u8) -> SmlResult<Self> {
        match bits & 0x07 {
            0b000 => Ok(SmlType::OctetString),
            0b100 => Ok(SmlType::Boolean),
            0b101 => Ok(SmlType::Integer),
            0b110 => Ok(SmlType::Unsigned),
            0b111 => Ok(SmlType::List),
            other => Err(SmlError::malformed(format!(
                "Unknown SML type field: 0b{:03b}",
                other
            ))),
        }
    }

    /// Convert type to its three type bits
    pub fn bits(self) -> u8 {
        match self {
            SmlType::OctetString => 0b000,
            SmlType::Boolean => 0b100,
            SmlType::Integer => 0b101,
            SmlType::Unsigned => 0b110,
            SmlType::List => 0b111,
        }
    }
}

impl fmt::Display for SmlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SmlType::OctetString => "octet string",
            SmlType::Boolean => "boolean",
            SmlType::Integer => "integer",
            SmlType::Unsigned => "unsigned",
            SmlType::List => "list",
        };
        f.write_str(name)
    }
}

impl SmlValue {
    /// The absent optional field marker
    pub fn absent() -> Self {
        SmlValue::OctetString(Vec::new())
    }

    /// Get the TL type of this value
    pub fn sml_type(&self) -> SmlType {
        match self {
            SmlValue::OctetString(_) => SmlType::OctetString,
            SmlValue::Boolean(_) => SmlType::Boolean,
            SmlValue::Integer8(_)
            | SmlValue::Integer16(_)
            | SmlValue::Integer32(_)
            | SmlValue::Integer64(_) => SmlType::Integer,
            SmlValue::Unsigned8(_)
            | SmlValue::Unsigned16(_)
            | SmlValue::Unsigned32(_)
            | SmlValue::Unsigned64(_) => SmlType::Unsigned,
            SmlValue::List(_) => SmlType::List,
        }
    }

    /// Check if this value is the absent optional field marker
    pub fn is_absent(&self) -> bool {
        matches!(self, SmlValue::OctetString(bytes) if bytes.is_empty())
    }

    /// Get as octet string
    pub fn as_bytes(&self) -> SmlResult<&[u8]> {
        match self {
            SmlValue::OctetString(bytes) => Ok(bytes),
            other => Err(other.mismatch(SmlType::OctetString)),
        }
    }

    /// Get as boolean
    pub fn as_bool(&self) -> SmlResult<bool> {
        match self {
            SmlValue::Boolean(b) => Ok(*b),
            other => Err(other.mismatch(SmlType::Boolean)),
        }
    }

    /// Get any unsigned width widened to u64
    pub fn as_unsigned(&self) -> SmlResult<u64> {
        match self {
            SmlValue::Unsigned8(v) => Ok(u64::from(*v)),
            SmlValue::Unsigned16(v) => Ok(u64::from(*v)),
            SmlValue::Unsigned32(v) => Ok(u64::from(*v)),
            SmlValue::Unsigned64(v) => Ok(*v),
            other => Err(other.mismatch(SmlType::Unsigned)),
        }
    }

    /// Get any signed width widened to i64
    pub fn as_integer(&self) -> SmlResult<i64> {
        match self {
            SmlValue::Integer8(v) => Ok(i64::from(*v)),
            SmlValue::Integer16(v) => Ok(i64::from(*v)),
            SmlValue::Integer32(v) => Ok(i64::from(*v)),
            SmlValue::Integer64(v) => Ok(*v),
            other => Err(other.mismatch(SmlType::Integer)),
        }
    }

    /// Get an unsigned value that must fit into u8
    pub fn as_u8(&self) -> SmlResult<u8> {
        let value = self.as_unsigned()?;
        u8::try_from(value)
            .map_err(|_| SmlError::malformed(format!("Value {} does not fit into u8", value)))
    }

    /// Get an unsigned value that must fit into u16
    pub fn as_u16(&self) -> SmlResult<u16> {
        let value = self.as_unsigned()?;
        u16::try_from(value)
            .map_err(|_| SmlError::malformed(format!("Value {} does not fit into u16", value)))
    }

    /// Get an unsigned value that must fit into u32
    pub fn as_u32(&self) -> SmlResult<u32> {
        let value = self.as_unsigned()?;
        u32::try_from(value)
            .map_err(|_| SmlError::malformed(format!("Value {} does not fit into u32", value)))
    }

    /// Get a signed value that must fit into i8
    pub fn as_i8(&self) -> SmlResult<i8> {
        let value = self.as_integer()?;
        i8::try_from(value)
            .map_err(|_| SmlError::malformed(format!("Value {} does not fit into i8", value)))
    }

    /// Get as list
    pub fn as_list(&self) -> SmlResult<&[SmlValue]> {
        match self {
            SmlValue::List(items) => Ok(items),
            other => Err(other.mismatch(SmlType::List)),
        }
    }

    /// Get as list with an exact element count
    pub fn as_list_of(&self, len: usize) -> SmlResult<&[SmlValue]> {
        let items = self.as_list()?;
        if items.len() != len {
            return Err(SmlError::malformed(format!(
                "Expected list of {} elements, found {}",
                len,
                items.len()
            )));
        }
        Ok(items)
    }

    fn mismatch(&self, expected: SmlType) -> SmlError {
        SmlError::malformed(format!("Expected {}, found {}", expected, self.sml_type()))
    }
}

impl From<bool> for SmlValue {
    fn from(value: bool) -> Self {
        SmlValue::Boolean(value)
    }
}

impl From<Vec<u8>> for SmlValue {
    fn from(value: Vec<u8>) -> Self {
        SmlValue::OctetString(value)
    }
}

impl From<&[u8]> for SmlValue {
    fn from(value: &[u8]) -> Self {
        SmlValue::OctetString(value.to_vec())
    }
}

macro_rules! impl_from_number {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SmlValue {
                fn from(value: $ty) -> Self {
                    SmlValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_number!(
    i8 => Integer8,
    i16 => Integer16,
    i32 => Integer32,
    i64 => Integer64,
    u8 => Unsigned8,
    u16 => Unsigned16,
    u32 => Unsigned32,
    u64 => Unsigned64,
);

impl fmt::Display for SmlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmlValue::OctetString(bytes) => {
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            SmlValue::Boolean(b) => write!(f, "{}", b),
            SmlValue::Integer8(v) => write!(f, "{}", v),
            SmlValue::Integer16(v) => write!(f, "{}", v),
            SmlValue::Integer32(v) => write!(f, "{}", v),
            SmlValue::Integer64(v) => write!(f, "{}", v),
            SmlValue::Unsigned8(v) => write!(f, "{}", v),
            SmlValue::Unsigned16(v) => write!(f, "{}", v),
            SmlValue::Unsigned32(v) => write!(f, "{}", v),
            SmlValue::Unsigned64(v) => write!(f, "{}", v),
            SmlValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}
