//! Connector configuration

use serde::{Deserialize, Serialize};
use sml_codec::DecodeOptions;
use sml_core::{SmlError, SmlResult};
use sml_session::{DEFAULT_FRAME_TIMEOUT, ExtractorConfig, MAX_FRAME_LENGTH};
use std::time::Duration;

/// Settings of one connector
///
/// Deserializable so a host can load it from its own configuration store;
/// every missing key falls back to its default.
///
/// ```json
/// { "frame_timeout_ms": 5000, "verify_transport_crc": true,
///   "verify_message_crc": false, "max_frame_length": 65536 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Bound on extracting one transmission
    #[serde(rename = "frame_timeout_ms", with = "millis")]
    pub frame_timeout: Duration,
    /// Drop transmissions whose transport CRC does not match
    pub verify_transport_crc: bool,
    /// Fail the decode when a message CRC does not match
    pub verify_message_crc: bool,
    /// Largest accepted unescaped transmission payload
    pub max_frame_length: usize,
}

impl ConnectorConfig {
    /// Check the settings for values no read cycle can succeed with
    pub fn validate(&self) -> SmlResult<()> {
        if self.frame_timeout.is_zero() {
            return Err(SmlError::InvalidData(
                "Frame timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_frame_length == 0 {
            return Err(SmlError::InvalidData(
                "Maximum frame length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            verify_crc: self.verify_transport_crc,
            max_frame_length: self.max_frame_length,
            ..ExtractorConfig::default()
        }
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            verify_message_crc: self.verify_message_crc,
        }
    }
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
            verify_transport_crc: true,
            verify_message_crc: false,
            max_frame_length: MAX_FRAME_LENGTH,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
