//! Core types and utilities for the SML protocol
//!
//! This crate provides the error taxonomy shared by every layer, the
//! tagged [`SmlValue`] produced by the TLV decoder, SML time values and
//! the OBIS identifier used to name list entries.

pub mod error;
pub mod obis_code;
pub mod time;
pub mod value;

pub use error::{SmlError, SmlResult};
pub use obis_code::ObisCode;
pub use time::SmlTime;
pub use value::{SmlType, SmlValue};
