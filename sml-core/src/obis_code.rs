use crate::error::{SmlError, SmlResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OBIS (Object Identification System) code naming an SML list entry
///
/// SML carries the code as a 6-byte octet string in `objName`. Only the
/// identifier is modelled here; what a given code measures is up to the
/// caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObisCode {
    bytes: [u8; 6],
}

impl ObisCode {
    /// Create a new OBIS code from its six value groups
    pub fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self {
            bytes: [a, b, c, d, e, f],
        }
    }

    /// Build an OBIS code from an `objName` octet string
    ///
    /// Returns `None` if the slice is not exactly 6 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = bytes.try_into().ok()?;
        Some(Self { bytes })
    }

    /// Parse an OBIS code from string format
    ///
    /// Supports formats like:
    /// - "1.0.1.8.0.255"
    /// - "1-0:1.8.0*255"
    /// - "1-0:1.8.0" (F defaults to 255)
    pub fn from_string(s: &str) -> SmlResult<Self> {
        if let Ok(code) = Self::parse_dot_format(s) {
            return Ok(code);
        }

        if let Ok(code) = Self::parse_extended_format(s) {
            return Ok(code);
        }

        Err(SmlError::InvalidData(format!("Invalid OBIS code format: {}", s)))
    }

    fn parse_dot_format(s: &str) -> SmlResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 6 {
            return Err(SmlError::InvalidData("Expected 6 dot-separated values".to_string()));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = parse_group(part)?;
        }

        Ok(Self { bytes })
    }

    fn parse_extended_format(s: &str) -> SmlResult<Self> {
        let (medium, rest) = s
            .split_once(':')
            .ok_or_else(|| SmlError::InvalidData("Missing ':' separator".to_string()))?;
        let (a, b) = medium
            .split_once('-')
            .ok_or_else(|| SmlError::InvalidData("Missing '-' separator".to_string()))?;
        let (cde, f) = match rest.split_once('*') {
            Some((cde, f)) => (cde, parse_group(f)?),
            None => (rest, 255),
        };

        let cde: Vec<&str> = cde.split('.').collect();
        if cde.len() != 3 {
            return Err(SmlError::InvalidData("Expected C.D.E value groups".to_string()));
        }

        Ok(Self::new(
            parse_group(a)?,
            parse_group(b)?,
            parse_group(cde[0])?,
            parse_group(cde[1])?,
            parse_group(cde[2])?,
            f,
        ))
    }

    /// Get the OBIS code as a byte array
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Format as "A-B:C.D.E*F"
    pub fn to_extended_string(&self) -> String {
        format!(
            "{}-{}:{}.{}.{}*{}",
            self.bytes[0], self.bytes[1], self.bytes[2],
            self.bytes[3], self.bytes[4], self.bytes[5]
        )
    }
}

fn parse_group(part: &str) -> SmlResult<u8> {
    part.trim()
        .parse::<u8>()
        .map_err(|_| SmlError::InvalidData(format!("Invalid byte value: {}", part)))
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}.{}",
            self.bytes[0], self.bytes[1], self.bytes[2],
            self.bytes[3], self.bytes[4], self.bytes[5]
        )
    }
}
