//! TCP transport implementation
//!
//! For reading heads exposed over the network (serial-to-TCP bridges). The
//! meter pushes the same byte stream it would push on the serial line.

use crate::error::{SmlError, SmlResult};
use crate::handle::LinkHandle;
use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

/// Wrapper for TcpStream that implements Debug
struct DebugTcpStream(TcpStream);

impl fmt::Debug for DebugTcpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpStream").finish()
    }
}

impl Deref for DebugTcpStream {
    type Target = TcpStream;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugTcpStream {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    /// "host:port" of the bridge; also the link identity
    pub handle: LinkHandle,
    /// Bound for connection establishment and for each read
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create new TCP settings
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            handle: LinkHandle::new(address),
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Create TCP settings with timeout
    pub fn with_timeout(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            handle: LinkHandle::new(address),
            timeout: Some(timeout),
        }
    }
}

/// TCP transport layer implementation
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<DebugTcpStream>,
    settings: TcpSettings,
    closed: bool,
}

impl TcpTransport {
    /// Create a new TCP transport layer
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Create TCP transport from an address string
    pub fn from_address(address: &str) -> SmlResult<Self> {
        if address.rsplit_once(':').is_none_or(|(host, port)| {
            host.is_empty() || port.parse::<u16>().is_err()
        }) {
            return Err(SmlError::InvalidData(format!(
                "Invalid TCP address: {}",
                address
            )));
        }
        Ok(Self::new(TcpSettings::new(address)))
    }
}

#[async_trait]
impl TransportLayer for TcpTransport {
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

        let address = self.settings.handle.port();
        // Apply timeout to connection establishment if specified
        let stream = if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, TcpStream::connect(address))
                .await
                .map_err(|_| connect_timeout_error(address, timeout))?
                .map_err(SmlError::Io)?
        } else {
            TcpStream::connect(address).await.map_err(SmlError::Io)?
        };
        log::debug!("Connected to {}", address);

        self.stream = Some(DebugTcpStream(stream));
        self.closed = false;
        Ok(())
    }
}

/// A connect that runs out of time is a link failure, not a read timeout
fn connect_timeout_error(address: &str, timeout: Duration) -> SmlError {
    SmlError::Io(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("Connecting to {} timed out after {:?}", address, timeout),
    ))
}

#[async_trait]
impl StreamAccessor for TcpTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> SmlResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> SmlResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            SmlError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "TCP stream not connected",
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
            log::debug!("Disconnected from {}", self.settings.handle);
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_from_address() {
        assert!(TcpTransport::from_address("192.168.1.20:8899").is_ok());
        assert!(TcpTransport::from_address("reader.local:2001").is_ok());
        assert!(TcpTransport::from_address("no-port").is_err());
        assert!(TcpTransport::from_address(":2001").is_err());
        assert!(TcpTransport::from_address("host:notaport").is_err());
    }

    #[test]
    fn test_connect_timeout_is_link_failure() {
        let err = connect_timeout_error("10.0.0.1:2001", Duration::from_secs(1));
        match &err {
            SmlError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::TimedOut),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_reads_pushed_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(&[0x1B, 0x1B, 0x1B, 0x1B]).await.unwrap();
        });

        let mut transport =
            TcpTransport::new(TcpSettings::with_timeout(address, Duration::from_secs(2)));
        transport.open().await.unwrap();
        assert!(!transport.is_closed());

        let mut buf = [0u8; 16];
        let mut received = Vec::new();
        loop {
            let n = transport.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received, vec![0x1B; 4]);

        transport.close().await.unwrap();
        assert!(transport.is_closed());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            drop(socket);
        });

        let mut transport =
            TcpTransport::new(TcpSettings::with_timeout(address, Duration::from_millis(50)));
        transport.open().await.unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(
            transport.read(&mut buf).await,
            Err(SmlError::Timeout(_))
        ));
        transport.close().await.unwrap();
        server.await.unwrap();
    }
}
