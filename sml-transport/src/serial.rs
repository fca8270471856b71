//! Serial port transport implementation

use crate::error::{SmlError, SmlResult};
use crate::handle::{LinkHandle, SML_LINE_SETTINGS};
use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_serial::{ErrorKind, SerialStream};

/// Wrapper for SerialStream that implements Debug
struct DebugSerialStream(SerialStream);

impl fmt::Debug for DebugSerialStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialStream").finish()
    }
}

impl Deref for DebugSerialStream {
    type Target = SerialStream;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugSerialStream {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Read timeout applied unless the caller picks another one
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial port transport layer settings
///
/// Only the port and the read timeout are selectable; the line parameters
/// always come from [`SML_LINE_SETTINGS`].
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub handle: LinkHandle,
    pub timeout: Option<Duration>,
}

impl SerialSettings {
    /// Create serial settings for a port with the default read timeout
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            handle: LinkHandle::new(port_name),
            timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }

    /// Create serial settings with timeout
    pub fn with_timeout(port_name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            handle: LinkHandle::new(port_name),
            timeout: Some(timeout),
        }
    }
}

/// Serial port transport layer implementation
#[derive(Debug)]
pub struct SerialTransport {
    stream: Option<DebugSerialStream>,
    settings: SerialSettings,
    closed: bool,
}

impl SerialTransport {
    /// Create a new serial transport layer
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Create serial transport for a port name
    pub fn new_simple(port_name: impl Into<String>) -> Self {
        Self::new(SerialSettings::new(port_name))
    }
}

/// Map a port open failure onto the link error taxonomy
fn map_open_error(port: &str, err: tokio_serial::Error) -> SmlError {
    match err.kind {
        ErrorKind::NoDevice => SmlError::PortBusy(format!("{}: {}", port, err.description)),
        ErrorKind::InvalidInput => {
            SmlError::UnsupportedParams(format!("{}: {}", port, err.description))
        }
        ErrorKind::Io(std::io::ErrorKind::NotFound) => {
            SmlError::PortNotFound(format!("{}: {}", port, err.description))
        }
        ErrorKind::Io(kind) => SmlError::Io(std::io::Error::new(
            kind,
            format!("Failed to open serial port {}: {}", port, err.description),
        )),
        ErrorKind::Unknown => SmlError::Io(std::io::Error::other(format!(
            "Failed to open serial port {}: {}",
            port, err.description
        ))),
    }
}

#[async_trait]
impl TransportLayer for SerialTransport {
    fn handle(&self) -> &LinkHandle {
        &self.settings.handle
    }

    async fn open(&mut self) -> SmlResult<()> {
        if !self.closed {
            return Err(SmlError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let port = self.settings.handle.port();
        let line = SML_LINE_SETTINGS;
        let builder = tokio_serial::new(port, line.baud_rate)
            .data_bits(line.data_bits)
            .stop_bits(line.stop_bits)
            .parity(line.parity)
            .flow_control(line.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| map_open_error(port, e))?;
        log::debug!("Opened serial port {} at {} baud", port, line.baud_rate);

        self.stream = Some(DebugSerialStream(stream));
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for SerialTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> SmlResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> SmlResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            SmlError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Serial stream not connected",
            ))
        })?;

        if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| SmlError::Timeout(timeout))?
                .map_err(SmlError::Io)
        } else {
            stream.read(buf).await.map_err(SmlError::Io)
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> SmlResult<()> {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::debug!("Closed serial port {}", self.settings.handle);
        }
        self.closed = true;
        Ok(())
    }
}
