//! SML encoding/decoding
//!
//! This crate decodes the tag-length-value encoding of the Smart Message
//! Language into [`SmlValue`](sml_core::SmlValue) trees and maps them onto
//! typed SML messages. An encoder for the same format is provided for
//! tests and tooling.

pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod file;
pub mod message;
pub mod types;

pub use crc::Crc16;
pub use decoder::{MAX_NESTING_DEPTH, SmlDecoder};
pub use encoder::{SmlEncoder, encode_file};
pub use error::{SmlError, SmlResult};
pub use file::SmlFile;
pub use message::{
    AttentionResponse, CloseRequest, CloseResponse, DecodeOptions, GetListRequest,
    GetListResponse, OpenRequest, OpenResponse, SmlListEntry, SmlMessage, SmlMessageBody, tags,
};
pub use types::TypeLength;
