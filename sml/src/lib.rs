//! sml_rs - Rust reader for SML (Smart Message Language) meters
//!
//! Electricity meters with an SML interface push a framed transmission
//! every few seconds on their optical or RS-232 port. This library opens
//! the port, extracts one transmission and decodes it into typed SML
//! messages.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `sml-core`: Core types (`SmlValue`, `SmlTime`, `ObisCode`) and error handling
//! - `sml-codec`: TLV decoding/encoding and SML message structures
//! - `sml-transport`: Link layer (Serial, TCP, in-memory)
//! - `sml-session`: SML transport protocol v1 framing
//! - `sml-client`: Connector running one read cycle per call
//!
//! # Usage
//!
//! ```no_run
//! # async fn run() -> Result<(), sml::ConnectorError> {
//! let file = sml::read_meter_values("/dev/ttyUSB0").await?;
//! for response in file.get_list_responses() {
//!     for entry in &response.val_list {
//!         println!("{:?} = {}", entry.obis_code(), entry.value);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use sml_core::{ObisCode, SmlError, SmlResult, SmlTime, SmlType, SmlValue};

// Re-export the decoded data model
pub use sml_codec::{
    AttentionResponse, CloseRequest, CloseResponse, DecodeOptions, GetListRequest,
    GetListResponse, OpenRequest, OpenResponse, SmlFile, SmlListEntry, SmlMessage,
    SmlMessageBody,
};

// Re-export client API
pub use sml_client::{
    ConnectionState, ConnectorBuilder, ConnectorConfig, ConnectorError, MeterReader, ReadStage,
    SmlConnector,
};

pub mod codec {
    pub use sml_codec::*;
}

pub mod transport {
    pub use sml_transport::*;
}

pub mod session {
    pub use sml_session::*;
}

/// Read one SML file from the meter on a serial port with default settings
pub async fn read_meter_values(port: &str) -> Result<SmlFile, ConnectorError> {
    let mut connector = SmlConnector::new(sml_transport::SerialTransport::new_simple(port));
    connector.read_meter_values().await
}

/// Decode every complete transmission in a captured byte stream
///
/// Transmissions with a bad transport CRC are skipped; the first one that
/// fails to decode aborts with its error.
pub fn decode_capture(bytes: &[u8], options: &DecodeOptions) -> SmlResult<Vec<SmlFile>> {
    sml_session::extract_frames(bytes)
        .iter()
        .map(|frame| SmlFile::decode(frame.as_bytes(), options))
        .collect()
}
