//! Raw frame type and transmission encoding

use crate::transport::constants::{END_MARKER, ESCAPE_SEQUENCE, START_SEQUENCE};
use bytes::Bytes;
use sml_codec::Crc16;
use std::ops::Deref;

/// Unescaped payload of one SML transmission
///
/// Holds the bytes between the start and the end escape sequence, with
/// doubled escape groups collapsed and the fill bytes removed. This is
/// exactly the input of the message decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    payload: Bytes,
}

impl RawFrame {
    /// Create a frame from an already unescaped payload
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Take the payload
    pub fn into_bytes(self) -> Bytes {
        self.payload
    }
}

impl Deref for RawFrame {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.payload
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.payload
    }
}

/// Wrap a payload into a complete version 1 transmission
///
/// Pads the payload to 4-byte alignment, doubles every aligned escape
/// group and appends the end sequence with fill count and CRC.
pub fn encode_transmission(payload: &[u8]) -> Vec<u8> {
    let fill = (4 - payload.len() % 4) % 4;
    let mut padded = payload.to_vec();
    padded.resize(payload.len() + fill, 0x00);

    let mut result = Vec::with_capacity(padded.len() + 16);
    result.extend_from_slice(&START_SEQUENCE);
    for group in padded.chunks(4) {
        if group == ESCAPE_SEQUENCE {
            result.extend_from_slice(&ESCAPE_SEQUENCE);
        }
        result.extend_from_slice(group);
    }
    result.extend_from_slice(&ESCAPE_SEQUENCE);
    result.push(END_MARKER);
    result.push(fill as u8);

    let mut crc = Crc16::new();
    crc.update_bytes(&result);
    result.extend_from_slice(&crc.crc_bytes());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_aligned_payload() {
        let bytes = encode_transmission(&[0x76, 0x05, 0x01, 0x02]);
        assert_eq!(&bytes[..8], &START_SEQUENCE);
        assert_eq!(&bytes[8..12], &[0x76, 0x05, 0x01, 0x02]);
        assert_eq!(&bytes[12..16], &ESCAPE_SEQUENCE);
        assert_eq!(bytes[16], END_MARKER);
        assert_eq!(bytes[17], 0);
        assert_eq!(bytes.len(), 20);

        let mut crc = Crc16::new();
        crc.update_bytes(&bytes[..18]);
        assert_eq!(&bytes[18..], &crc.crc_bytes());
    }

    #[test]
    fn test_encode_fill_and_escape() {
        let payload = [0x1B, 0x1B, 0x1B, 0x1B, 0xAA];
        let bytes = encode_transmission(&payload);
        // start, doubled escape, payload group, padded group, end
        assert_eq!(&bytes[8..16], &[0x1B; 8]);
        assert_eq!(&bytes[16..20], &[0xAA, 0x00, 0x00, 0x00]);
        assert_eq!(bytes[25], 3);
        assert_eq!(bytes.len(), 28);
    }

    #[test]
    fn test_raw_frame_access() {
        let frame = RawFrame::new(vec![0x01, 0x02]);
        assert_eq!(frame.len(), 2);
        assert_eq!(&frame[..], &[0x01, 0x02]);
        assert_eq!(frame.as_ref(), frame.as_bytes());
        assert!(!frame.is_empty());
        assert_eq!(frame.into_bytes(), Bytes::from_static(&[0x01, 0x02]));
    }
}
