//! Connector builder
//!
//! ```rust,no_run
//! use sml_client::ConnectorBuilder;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut connector = ConnectorBuilder::new()
//!     .serial("/dev/ttyUSB0")
//!     .frame_timeout(Duration::from_secs(3))
//!     .build_serial()?;
//! let file = connector.read_meter_values().await?;
//! # Ok(())
//! # }
//! ```

use super::config::ConnectorConfig;
use super::connector::{MeterReader, SmlConnector};
use sml_core::{SmlError, SmlResult};
use sml_transport::{SerialTransport, TcpTransport, TransportLayer};
use std::time::Duration;

/// Builder for [`SmlConnector`]
#[derive(Debug, Clone)]
pub struct ConnectorBuilder {
    transport_type: TransportType,
    config: ConnectorConfig,
}

/// Transport type configuration
#[derive(Debug, Clone)]
enum TransportType {
    /// Serial port, line settings fixed
    Serial { port_name: String },
    /// Serial-to-TCP bridge
    Tcp { address: String },
    /// Not configured
    None,
}

impl ConnectorBuilder {
    /// Create a builder with default settings and no transport
    pub fn new() -> Self {
        Self {
            transport_type: TransportType::None,
            config: ConnectorConfig::default(),
        }
    }

    /// Read from a serial port ("/dev/ttyUSB0", "COM3")
    pub fn serial(mut self, port_name: &str) -> Self {
        self.transport_type = TransportType::Serial {
            port_name: port_name.to_string(),
        };
        self
    }

    /// Read from a network bridge ("host:port")
    pub fn tcp(mut self, address: &str) -> Self {
        self.transport_type = TransportType::Tcp {
            address: address.to_string(),
        };
        self
    }

    /// Replace all settings at once, e.g. with a deserialized configuration
    pub fn config(mut self, config: ConnectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound on extracting one transmission
    pub fn frame_timeout(mut self, timeout: Duration) -> Self {
        self.config.frame_timeout = timeout;
        self
    }

    pub fn verify_transport_crc(mut self, verify: bool) -> Self {
        self.config.verify_transport_crc = verify;
        self
    }

    pub fn verify_message_crc(mut self, verify: bool) -> Self {
        self.config.verify_message_crc = verify;
        self
    }

    pub fn max_frame_length(mut self, length: usize) -> Self {
        self.config.max_frame_length = length;
        self
    }

    /// Build a connector over a serial port
    ///
    /// # Errors
    /// Returns error if no serial port is configured or the settings are invalid
    pub fn build_serial(self) -> SmlResult<SmlConnector<SerialTransport>> {
        self.config.validate()?;
        match self.transport_type {
            TransportType::Serial { port_name } => Ok(SmlConnector::with_config(
                SerialTransport::new_simple(port_name),
                self.config,
            )),
            _ => Err(SmlError::InvalidData(
                "Serial port must be configured".to_string(),
            )),
        }
    }

    /// Build a connector over TCP
    ///
    /// # Errors
    /// Returns error if no address is configured, it is not "host:port",
    /// or the settings are invalid
    pub fn build_tcp(self) -> SmlResult<SmlConnector<TcpTransport>> {
        self.config.validate()?;
        match self.transport_type {
            TransportType::Tcp { address } => Ok(SmlConnector::with_config(
                TcpTransport::from_address(&address)?,
                self.config,
            )),
            _ => Err(SmlError::InvalidData(
                "TCP address must be configured".to_string(),
            )),
        }
    }

    /// Build a connector over a caller-supplied transport
    pub fn build_with<T: TransportLayer>(self, transport: T) -> SmlResult<SmlConnector<T>> {
        self.config.validate()?;
        Ok(SmlConnector::with_config(transport, self.config))
    }

    /// Build a connector over whichever transport is configured
    ///
    /// # Errors
    /// Returns error if no transport is configured or the settings are invalid
    pub fn build(self) -> SmlResult<Box<dyn MeterReader>> {
        match self.transport_type {
            TransportType::Serial { .. } => Ok(Box::new(self.build_serial()?)),
            TransportType::Tcp { .. } => Ok(Box::new(self.build_tcp()?)),
            TransportType::None => Err(SmlError::InvalidData(
                "Transport type must be configured (Serial or TCP)".to_string(),
            )),
        }
    }
}

impl Default for ConnectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sml_transport::MemoryTransport;

    #[test]
    fn test_build_serial() {
        let connector = ConnectorBuilder::new()
            .serial("/dev/ttyUSB0")
            .frame_timeout(Duration::from_secs(3))
            .verify_message_crc(true)
            .build_serial()
            .unwrap();
        assert_eq!(connector.handle().port(), "/dev/ttyUSB0");
        assert_eq!(connector.config().frame_timeout, Duration::from_secs(3));
        assert!(connector.config().verify_message_crc);
        assert!(!connector.state().is_open());
    }

    #[test]
    fn test_build_tcp() {
        let connector = ConnectorBuilder::new()
            .tcp("192.168.1.20:8899")
            .build_tcp()
            .unwrap();
        assert_eq!(connector.handle().port(), "192.168.1.20:8899");

        assert!(ConnectorBuilder::new().tcp("bad address").build_tcp().is_err());
    }

    #[test]
    fn test_build_dispatches_on_transport() {
        let reader = ConnectorBuilder::new().serial("COM3").build().unwrap();
        assert_eq!(reader.handle().port(), "COM3");

        assert!(matches!(
            ConnectorBuilder::new().build().map(|_| ()),
            Err(SmlError::InvalidData(_))
        ));
        assert!(ConnectorBuilder::new().tcp("host:1").build_serial().is_err());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let result = ConnectorBuilder::new()
            .serial("/dev/ttyUSB0")
            .max_frame_length(0)
            .build_serial();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_with_custom_transport() {
        let config = ConnectorConfig {
            verify_transport_crc: false,
            ..ConnectorConfig::default()
        };
        let connector = ConnectorBuilder::new()
            .config(config.clone())
            .build_with(MemoryTransport::new("capture", []))
            .unwrap();
        assert_eq!(connector.config(), &config);
    }
}
