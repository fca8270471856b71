//! Session layer module for the SML reader
//!
//! This crate implements the SML transport protocol version 1: locating a
//! transmission between its escape sequences in the raw byte stream,
//! unescaping the payload and checking the transmission CRC.

pub mod error;
pub mod transport;

pub use error::{SmlError, SmlResult};
pub use transport::*;
