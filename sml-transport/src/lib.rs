//! Link layer module for the SML reader
//!
//! This crate provides the byte-stream transports a meter can be read
//! through: the serial port with the line settings fixed by the SML
//! optical/RS-232 interface, TCP for network-attached reading heads, and
//! an in-memory transport for replaying captures.

pub mod error;
pub mod handle;
pub mod memory;
pub mod serial;
pub mod stream;
pub mod tcp;

pub use error::{SmlError, SmlResult};
pub use handle::{LineSettings, LinkHandle, SML_LINE_SETTINGS};
pub use memory::{MemoryTransport, ReadStep};
pub use serial::{DEFAULT_READ_TIMEOUT, SerialSettings, SerialTransport};
pub use stream::{StreamAccessor, TransportLayer};
pub use tcp::{TcpSettings, TcpTransport};
