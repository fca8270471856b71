//! Link identity and the fixed SML line parameters

use std::fmt;
use tokio_serial::{DataBits, FlowControl, Parity, StopBits};

/// Serial line parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

/// Line parameters required by the meter firmware; not configurable
pub const SML_LINE_SETTINGS: LineSettings = LineSettings {
    baud_rate: 9600,
    data_bits: DataBits::Eight,
    stop_bits: StopBits::One,
    parity: Parity::None,
    flow_control: FlowControl::Hardware,
};

/// Identifies one physical connection
///
/// Two handles are equal iff their port identifiers are equal; hosts use
/// this to deduplicate readers configured for the same port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkHandle {
    port: String,
}

impl LinkHandle {
    /// Create a handle from a port identifier ("/dev/ttyUSB0", "COM3", "host:port")
    pub fn new(port: impl Into<String>) -> Self {
        Self { port: port.into() }
    }

    /// Port identifier
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Line parameters applied when this handle is opened as a serial port
    pub fn line_settings(&self) -> LineSettings {
        SML_LINE_SETTINGS
    }
}

impl fmt::Display for LinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.port)
    }
}
