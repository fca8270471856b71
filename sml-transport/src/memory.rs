//! In-memory transport replaying scripted reads

use crate::error::{SmlError, SmlResult};
use crate::handle::LinkHandle;
use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// One scripted outcome of a read call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStep {
    /// Bytes delivered by the next reads (split across calls if the buffer is smaller)
    Data(Vec<u8>),
    /// The next read fails with an I/O error of this kind
    Fail(std::io::ErrorKind),
    /// The peer goes silent; every further read waits for the read timeout
    Stall,
    /// The next read is delayed once, then the script continues
    Pause(Duration),
}

type OpenFailure = Box<dyn Fn() -> SmlError + Send + Sync>;

/// Transport replaying a script of reads, for captured meter output and tests
///
/// Once the script is exhausted reads return EOF.
pub struct MemoryTransport {
    handle: LinkHandle,
    steps: VecDeque<ReadStep>,
    timeout: Option<Duration>,
    closed: bool,
    open_failure: Option<OpenFailure>,
    open_count: usize,
    close_count: usize,
}

impl MemoryTransport {
    /// Create a transport that replays `steps`
    pub fn new(port: impl Into<String>, steps: impl IntoIterator<Item = ReadStep>) -> Self {
        Self {
            handle: LinkHandle::new(port),
            steps: steps.into_iter().collect(),
            timeout: None,
            closed: true,
            open_failure: None,
            open_count: 0,
            close_count: 0,
        }
    }

    /// Create a transport delivering `bytes` in chunks of `chunk_size`
    pub fn from_chunks(port: impl Into<String>, bytes: &[u8], chunk_size: usize) -> Self {
        let steps = bytes
            .chunks(chunk_size.max(1))
            .map(|chunk| ReadStep::Data(chunk.to_vec()));
        Self::new(port, steps)
    }

    /// Make every `open()` fail with the error built by `failure`
    pub fn fail_open<F>(mut self, failure: F) -> Self
    where
        F: Fn() -> SmlError + Send + Sync + 'static,
    {
        self.open_failure = Some(Box::new(failure));
        self
    }

    /// Append further steps to the script
    pub fn push(&mut self, step: ReadStep) {
        self.steps.push_back(step);
    }

    /// Number of successful opens
    pub fn open_count(&self) -> usize {
        self.open_count
    }

    /// Number of close calls, including those on an already closed stream
    pub fn close_count(&self) -> usize {
        self.close_count
    }

    /// Read timeout currently in effect
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("handle", &self.handle)
            .field("pending_steps", &self.steps.len())
            .field("closed", &self.closed)
            .field("open_count", &self.open_count)
            .field("close_count", &self.close_count)
            .finish()
    }
}

#[async_trait]
impl TransportLayer for MemoryTransport {
    fn handle(&self) -> &LinkHandle {
        &self.handle
    }

    async fn open(&mut self) -> SmlResult<()> {
        if let Some(failure) = &self.open_failure {
            return Err(failure());
        }
        if !self.closed {
            return Err(SmlError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }
        self.closed = false;
        self.open_count += 1;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for MemoryTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> SmlResult<()> {
        self.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> SmlResult<usize> {
        if self.closed {
            return Err(SmlError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Memory stream not connected",
            )));
        }

        loop {
            return match self.steps.pop_front() {
                None => Ok(0),
                Some(ReadStep::Data(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.steps.push_front(ReadStep::Data(data.split_off(n)));
                    }
                    Ok(n)
                }
                Some(ReadStep::Fail(kind)) => Err(SmlError::Io(std::io::Error::new(
                    kind,
                    "Scripted read failure",
                ))),
                Some(ReadStep::Stall) => {
                    self.steps.push_front(ReadStep::Stall);
                    match self.timeout {
                        Some(timeout) => {
                            tokio::time::sleep(timeout).await;
                            Err(SmlError::Timeout(timeout))
                        }
                        None => std::future::pending().await,
                    }
                }
                Some(ReadStep::Pause(delay)) => {
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> SmlResult<()> {
        self.closed = true;
        self.close_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_chunks_then_eof() {
        let mut transport = MemoryTransport::from_chunks("mem", &[1, 2, 3, 4, 5], 2);
        transport.open().await.unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(transport.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], &[1, 2]);
        assert_eq!(transport.read(&mut buf).await.unwrap(), 2);
        assert_eq!(transport.read(&mut buf).await.unwrap(), 1);
        assert_eq!(buf[0], 5);
        assert_eq!(transport.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_splits_data_larger_than_buffer() {
        let mut transport = MemoryTransport::new("mem", [ReadStep::Data(vec![9; 5])]);
        transport.open().await.unwrap();

        let mut buf = [0u8; 3];
        assert_eq!(transport.read(&mut buf).await.unwrap(), 3);
        assert_eq!(transport.read(&mut buf).await.unwrap(), 2);
        assert_eq!(transport.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scripted_failure_and_stall() {
        let mut transport = MemoryTransport::new(
            "mem",
            [ReadStep::Fail(std::io::ErrorKind::BrokenPipe), ReadStep::Stall],
        );
        transport.open().await.unwrap();
        transport
            .set_timeout(Some(Duration::from_millis(10)))
            .await
            .unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(transport.read(&mut buf).await, Err(SmlError::Io(_))));
        assert!(matches!(transport.read(&mut buf).await, Err(SmlError::Timeout(_))));
        // a stalled peer stays silent
        assert!(matches!(transport.read(&mut buf).await, Err(SmlError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_pause_is_consumed_once() {
        let mut transport = MemoryTransport::new(
            "mem",
            [ReadStep::Pause(Duration::from_millis(5)), ReadStep::Data(vec![7])],
        );
        transport.open().await.unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(transport.read(&mut buf).await.unwrap(), 1);
        assert_eq!(buf[0], 7);
        assert_eq!(transport.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_close_counting() {
        let mut transport = MemoryTransport::new("mem", []);
        transport.open().await.unwrap();
        assert!(transport.open().await.is_err());
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(transport.is_closed());
        assert_eq!(transport.open_count(), 1);
        assert_eq!(transport.close_count(), 2);
    }

    #[tokio::test]
    async fn test_injected_open_failure() {
        let mut transport = MemoryTransport::new("mem", [])
            .fail_open(|| SmlError::PortBusy("mem".to_string()));
        assert!(matches!(transport.open().await, Err(SmlError::PortBusy(_))));
        assert!(transport.is_closed());
        assert_eq!(transport.open_count(), 0);
    }
}
