//! SML TLV decoder

use crate::error::{SmlError, SmlResult};
use crate::types::{END_OF_MESSAGE, TypeLength};
use sml_core::{SmlType, SmlValue};

/// Deepest list nesting accepted before the input is treated as hostile
pub const MAX_NESTING_DEPTH: usize = 32;

/// SML decoder over one raw frame
///
/// Consumes the buffer strictly left to right; a failed decode leaves the
/// position undefined and the decoder should be discarded.
pub struct SmlDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> SmlDecoder<'a> {
    /// Create a new decoder
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Decode one value, recursing into lists
    pub fn decode_value(&mut self) -> SmlResult<SmlValue> {
        self.decode_value_at_depth(0)
    }

    fn decode_value_at_depth(&mut self, depth: usize) -> SmlResult<SmlValue> {
        if depth > MAX_NESTING_DEPTH {
            return Err(SmlError::MalformedMessage(format!(
                "List nesting deeper than {}",
                MAX_NESTING_DEPTH
            )));
        }

        let tl = self.decode_type_length()?;
        match tl.sml_type {
            SmlType::OctetString => {
                let bytes = self.decode_fixed_bytes(tl.length)?;
                Ok(SmlValue::OctetString(bytes.to_vec()))
            }
            SmlType::Boolean => {
                if tl.length != 1 {
                    return Err(SmlError::MalformedMessage(format!(
                        "Boolean with {} payload bytes",
                        tl.length
                    )));
                }
                Ok(SmlValue::Boolean(self.read_byte()? != 0x00))
            }
            SmlType::Integer => self.decode_integer(tl.length),
            SmlType::Unsigned => self.decode_unsigned(tl.length),
            SmlType::List => {
                // every element takes at least one byte
                if tl.length > self.remaining() {
                    return Err(SmlError::MalformedMessage(format!(
                        "List of {} elements exceeds the {} remaining bytes",
                        tl.length,
                        self.remaining()
                    )));
                }
                let mut items = Vec::with_capacity(tl.length);
                for _ in 0..tl.length {
                    items.push(self.decode_value_at_depth(depth + 1)?);
                }
                Ok(SmlValue::List(items))
            }
        }
    }

    /// Decode a TL header
    pub fn decode_type_length(&mut self) -> SmlResult<TypeLength> {
        let tl = TypeLength::decode(&self.buffer[self.position..])?;
        self.position += tl.header_len;
        Ok(tl)
    }

    /// Decode a signed integer of 1..=8 big-endian bytes
    fn decode_integer(&mut self, width: usize) -> SmlResult<SmlValue> {
        let bytes = self.decode_number_bytes(width)?;
        let mut value: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
        for &byte in bytes {
            value = (value << 8) | i64::from(byte);
        }
        Ok(match width {
            1 => SmlValue::Integer8(value as i8),
            2 => SmlValue::Integer16(value as i16),
            3 | 4 => SmlValue::Integer32(value as i32),
            _ => SmlValue::Integer64(value),
        })
    }

    /// Decode an unsigned integer of 1..=8 big-endian bytes
    fn decode_unsigned(&mut self, width: usize) -> SmlResult<SmlValue> {
        let bytes = self.decode_number_bytes(width)?;
        let mut value: u64 = 0;
        for &byte in bytes {
            value = (value << 8) | u64::from(byte);
        }
        Ok(match width {
            1 => SmlValue::Unsigned8(value as u8),
            2 => SmlValue::Unsigned16(value as u16),
            3 | 4 => SmlValue::Unsigned32(value as u32),
            _ => SmlValue::Unsigned64(value),
        })
    }

    fn decode_number_bytes(&mut self, width: usize) -> SmlResult<&'a [u8]> {
        if width == 0 || width > 8 {
            return Err(SmlError::MalformedMessage(format!(
                "Unsupported integer width: {} bytes",
                width
            )));
        }
        self.decode_fixed_bytes(width)
    }

    /// Consume the end-of-message marker
    pub fn decode_end_of_message(&mut self) -> SmlResult<()> {
        let byte = self.read_byte()?;
        if byte != END_OF_MESSAGE {
            return Err(SmlError::MalformedMessage(format!(
                "Expected end of message, found 0x{:02X}",
                byte
            )));
        }
        Ok(())
    }

    /// Decode fixed-length bytes
    pub fn decode_fixed_bytes(&mut self, len: usize) -> SmlResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(SmlError::MalformedMessage(format!(
                "Not enough bytes: need {}, have {}",
                len,
                self.remaining()
            )));
        }

        let result = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(result)
    }

    /// Read a single byte
    fn read_byte(&mut self) -> SmlResult<u8> {
        let byte = *self
            .buffer
            .get(self.position)
            .ok_or_else(|| SmlError::MalformedMessage("Not enough bytes".to_string()))?;
        self.position += 1;
        Ok(byte)
    }

    /// Bytes consumed between `start` and the current position
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.buffer[start.min(self.position)..self.position]
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get remaining bytes
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Check whether the whole buffer has been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_octet_string() {
        let bytes = [0x03, 0xAB, 0xCD];
        let mut decoder = SmlDecoder::new(&bytes);
        let value = decoder.decode_value().unwrap();
        assert_eq!(value, SmlValue::OctetString(vec![0xAB, 0xCD]));
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_decode_absent() {
        let bytes = [0x01];
        let mut decoder = SmlDecoder::new(&bytes);
        assert!(decoder.decode_value().unwrap().is_absent());
    }

    #[test]
    fn test_decode_boolean() {
        let bytes = [0x42, 0xFF];
        let mut decoder = SmlDecoder::new(&bytes);
        assert_eq!(decoder.decode_value().unwrap(), SmlValue::Boolean(true));

        let bytes = [0x43, 0x01, 0x00];
        let mut decoder = SmlDecoder::new(&bytes);
        assert!(decoder.decode_value().is_err());
    }

    #[test]
    fn test_decode_signed_widths() {
        let mut decoder = SmlDecoder::new(&[0x52, 0xFF]);
        assert_eq!(decoder.decode_value().unwrap(), SmlValue::Integer8(-1));

        let mut decoder = SmlDecoder::new(&[0x53, 0xFF, 0x38]);
        assert_eq!(decoder.decode_value().unwrap(), SmlValue::Integer16(-200));

        // 3-byte integer widens to Integer32 with sign extension
        let mut decoder = SmlDecoder::new(&[0x54, 0xFF, 0xFF, 0xFE]);
        assert_eq!(decoder.decode_value().unwrap(), SmlValue::Integer32(-2));

        let mut decoder = SmlDecoder::new(&[0x59, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(decoder.decode_value().unwrap(), SmlValue::Integer64(65536));
    }

    #[test]
    fn test_decode_unsigned_widths() {
        let mut decoder = SmlDecoder::new(&[0x62, 0x1E]);
        assert_eq!(decoder.decode_value().unwrap(), SmlValue::Unsigned8(30));

        let mut decoder = SmlDecoder::new(&[0x65, 0x00, 0x1C, 0x86, 0x2F]);
        assert_eq!(decoder.decode_value().unwrap(), SmlValue::Unsigned32(0x001C862F));

        let mut decoder = SmlDecoder::new(&[0x66, 0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(
            decoder.decode_value().unwrap(),
            SmlValue::Unsigned64(0x01_0203_0405)
        );
    }

    #[test]
    fn test_decode_nested_list() {
        let bytes = [0x72, 0x62, 0x01, 0x71, 0x42, 0x00];
        let mut decoder = SmlDecoder::new(&bytes);
        assert_eq!(
            decoder.decode_value().unwrap(),
            SmlValue::List(vec![
                SmlValue::Unsigned8(1),
                SmlValue::List(vec![SmlValue::Boolean(false)]),
            ])
        );
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_length_past_end_is_malformed() {
        let bytes = [0x05, 0x01, 0x02];
        let mut decoder = SmlDecoder::new(&bytes);
        assert!(matches!(
            decoder.decode_value(),
            Err(SmlError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_list_count_past_end_is_malformed() {
        let bytes = [0x7F, 0x62, 0x01];
        let mut decoder = SmlDecoder::new(&bytes);
        assert!(matches!(
            decoder.decode_value(),
            Err(SmlError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_invalid_integer_width() {
        let mut decoder = SmlDecoder::new(&[0x51]);
        assert!(decoder.decode_value().is_err());

        // 9 payload bytes
        let mut bytes = vec![0x5A];
        bytes.extend_from_slice(&[0u8; 9]);
        let mut decoder = SmlDecoder::new(&bytes);
        assert!(decoder.decode_value().is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let mut bytes = vec![0x71; MAX_NESTING_DEPTH + 2];
        bytes.push(0x62);
        bytes.push(0x00);
        let mut decoder = SmlDecoder::new(&bytes);
        assert!(matches!(
            decoder.decode_value(),
            Err(SmlError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_end_of_message() {
        let mut decoder = SmlDecoder::new(&[0x00]);
        decoder.decode_end_of_message().unwrap();

        let mut decoder = SmlDecoder::new(&[0x01]);
        assert!(decoder.decode_end_of_message().is_err());
    }
}
