//! Stream accessor trait for the link layer

use crate::error::SmlResult;
use crate::handle::LinkHandle;
use async_trait::async_trait;
use std::time::Duration;

/// Stream accessor interface to read the byte stream of a meter
#[async_trait]
pub trait StreamAccessor: Send + Sync {
    /// Set the read timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout duration. None means infinite timeout.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> SmlResult<()>;

    /// Read data from the stream
    ///
    /// # Arguments
    ///
    /// * `buf` - Buffer to read into
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if EOF. Fails with `SmlError::Timeout`
    /// when no byte arrived within the read timeout.
    async fn read(&mut self, buf: &mut [u8]) -> SmlResult<usize>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream
    ///
    /// Closing an already closed stream is a no-op.
    async fn close(&mut self) -> SmlResult<()>;
}

/// Transport layer trait that extends StreamAccessor
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Identity of the physical connection
    fn handle(&self) -> &LinkHandle;

    /// Open the physical layer connection
    async fn open(&mut self) -> SmlResult<()>;
}
