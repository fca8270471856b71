//! SML TLV encoder
//!
//! The reader never transmits; the encoder produces byte-exact SML for
//! tests and tooling.

use crate::crc::Crc16;
use crate::file::SmlFile;
use crate::message::SmlMessage;
use crate::types::{END_OF_MESSAGE, TypeLength};
use sml_core::{SmlType, SmlValue};

/// SML encoder
pub struct SmlEncoder {
    buffer: Vec<u8>,
}

impl SmlEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new encoder with initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a value with its canonical width
    pub fn encode_value(&mut self, value: &SmlValue) {
        match value {
            SmlValue::OctetString(bytes) => {
                self.encode_type_length(SmlType::OctetString, bytes.len());
                self.buffer.extend_from_slice(bytes);
            }
            SmlValue::Boolean(b) => {
                self.encode_type_length(SmlType::Boolean, 1);
                self.buffer.push(if *b { 0x01 } else { 0x00 });
            }
            SmlValue::Integer8(v) => self.encode_number(SmlType::Integer, &v.to_be_bytes()),
            SmlValue::Integer16(v) => self.encode_number(SmlType::Integer, &v.to_be_bytes()),
            SmlValue::Integer32(v) => self.encode_number(SmlType::Integer, &v.to_be_bytes()),
            SmlValue::Integer64(v) => self.encode_number(SmlType::Integer, &v.to_be_bytes()),
            SmlValue::Unsigned8(v) => self.encode_number(SmlType::Unsigned, &v.to_be_bytes()),
            SmlValue::Unsigned16(v) => self.encode_number(SmlType::Unsigned, &v.to_be_bytes()),
            SmlValue::Unsigned32(v) => self.encode_number(SmlType::Unsigned, &v.to_be_bytes()),
            SmlValue::Unsigned64(v) => self.encode_number(SmlType::Unsigned, &v.to_be_bytes()),
            SmlValue::List(items) => {
                self.encode_type_length(SmlType::List, items.len());
                for item in items {
                    self.encode_value(item);
                }
            }
        }
    }

    /// Encode a message, computing its CRC
    pub fn encode_message(&mut self, message: &SmlMessage) {
        let start = self.buffer.len();
        self.encode_type_length(SmlType::List, 6);
        self.encode_value(&SmlValue::from(message.transaction_id.clone()));
        self.encode_value(&SmlValue::Unsigned8(message.group_no));
        self.encode_value(&SmlValue::Unsigned8(message.abort_on_error));
        self.encode_value(&message.body.to_value());

        let crc = Crc16::checksum(&self.buffer[start..]);
        self.encode_value(&SmlValue::Unsigned16(crc));
        self.buffer.push(END_OF_MESSAGE);
    }

    /// Encode every message of a file
    pub fn encode_file(&mut self, file: &SmlFile) {
        for message in file {
            self.encode_message(message);
        }
    }

    fn encode_type_length(&mut self, sml_type: SmlType, length: usize) {
        self.buffer
            .extend_from_slice(&TypeLength::encode(sml_type, length));
    }

    fn encode_number(&mut self, sml_type: SmlType, bytes: &[u8]) {
        self.encode_type_length(sml_type, bytes.len());
        self.buffer.extend_from_slice(bytes);
    }

    /// Get encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Take the encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for SmlEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a whole file into a frame payload
pub fn encode_file(file: &SmlFile) -> Vec<u8> {
    let mut encoder = SmlEncoder::with_capacity(256);
    encoder.encode_file(file);
    encoder.into_bytes()
}
