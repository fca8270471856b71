//! TL (type-length) header of the SML encoding

use crate::error::{SmlError, SmlResult};
use sml_core::SmlType;

/// Set on a TL byte when another TL byte follows
pub const ANOTHER_TL: u8 = 0x80;
/// Type bits of a TL byte
pub const TYPE_FIELD: u8 = 0x70;
/// Length nibble of a TL byte
pub const LENGTH_FIELD: u8 = 0x0F;
/// End of an SML message
pub const END_OF_MESSAGE: u8 = 0x00;
/// Optional field not set (an octet string holding only its TL byte)
pub const OPTIONAL_SKIPPED: u8 = 0x01;
/// Longest accepted TL chain; 8 nibbles already cover a u32 length
pub const MAX_TL_BYTES: usize = 8;

/// A decoded TL header
///
/// For lists `length` is the element count. For every other type it is the
/// payload length, with the TL bytes already subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLength {
    pub sml_type: SmlType,
    pub length: usize,
    pub header_len: usize,
}

impl TypeLength {
    /// Decode a TL header from the start of `bytes`
    pub fn decode(bytes: &[u8]) -> SmlResult<Self> {
        let first = *bytes
            .first()
            .ok_or_else(|| SmlError::MalformedMessage("Not enough bytes for TL header".to_string()))?;

        let sml_type = SmlType::from_bits((first & TYPE_FIELD) >> 4)?;
        let mut raw = (first & LENGTH_FIELD) as usize;
        let mut header_len = 1;
        let mut more = first & ANOTHER_TL != 0;

        while more {
            if header_len >= MAX_TL_BYTES {
                return Err(SmlError::MalformedMessage(format!(
                    "TL chain longer than {} bytes",
                    MAX_TL_BYTES
                )));
            }
            let byte = *bytes.get(header_len).ok_or_else(|| {
                SmlError::MalformedMessage("TL chain truncated".to_string())
            })?;
            if byte & TYPE_FIELD != 0 {
                return Err(SmlError::MalformedMessage(format!(
                    "TL continuation byte 0x{:02X} carries type bits",
                    byte
                )));
            }
            raw = (raw << 4) | (byte & LENGTH_FIELD) as usize;
            header_len += 1;
            more = byte & ANOTHER_TL != 0;
        }

        let length = match sml_type {
            SmlType::List => raw,
            _ => raw.checked_sub(header_len).ok_or_else(|| {
                SmlError::MalformedMessage(format!(
                    "Declared length {} shorter than its {} TL byte(s)",
                    raw, header_len
                ))
            })?,
        };

        Ok(Self {
            sml_type,
            length,
            header_len,
        })
    }

    /// Encode a TL header for a payload length (or list element count)
    pub fn encode(sml_type: SmlType, length: usize) -> Vec<u8> {
        let (raw, nibbles) = match sml_type {
            SmlType::List => (length, nibble_count(length)),
            _ => {
                // the length includes the TL bytes, which may need another nibble
                let mut n = 1;
                while nibble_count(length + n) > n {
                    n += 1;
                }
                (length + n, n)
            }
        };

        let mut result = Vec::with_capacity(nibbles);
        for i in 0..nibbles {
            let shift = 4 * (nibbles - 1 - i);
            let mut byte = ((raw >> shift) & 0x0F) as u8;
            if i == 0 {
                byte |= sml_type.bits() << 4;
            }
            if i + 1 < nibbles {
                byte |= ANOTHER_TL;
            }
            result.push(byte);
        }
        result
    }
}

fn nibble_count(value: usize) -> usize {
    let mut n = 1;
    while n < (usize::BITS as usize / 4) && (value >> (4 * n)) != 0 {
        n += 1;
    }
    n
}
