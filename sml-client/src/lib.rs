//! SML meter connector
//!
//! This crate ties the layers together: it opens the link, extracts one
//! SML transmission, decodes it into an [`SmlFile`](sml_codec::SmlFile)
//! and always closes the link again.

pub mod connector;
pub mod error;

pub use connector::{
    ConnectionState, ConnectorBuilder, ConnectorConfig, MeterReader, SmlConnector,
};
pub use error::{ConnectorError, ReadStage};
