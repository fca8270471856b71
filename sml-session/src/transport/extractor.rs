//! Async frame extraction from a byte stream

use crate::error::{SmlError, SmlResult};
use crate::transport::constants::MAX_FRAME_LENGTH;
use crate::transport::frame::RawFrame;
use crate::transport::scanner::{FrameScanner, RejectReason, ScanEvent};
use crate::transport::statistics::FrameStatistics;
use bytes::{Buf, BytesMut};
use sml_transport::StreamAccessor;
use std::time::Duration;
use tokio::time::Instant;

/// Frame extractor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Reject transmissions whose CRC does not match
    pub verify_crc: bool,
    /// Largest accepted unescaped payload
    pub max_frame_length: usize,
    /// Bytes requested from the stream per read
    pub read_chunk_size: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            verify_crc: true,
            max_frame_length: MAX_FRAME_LENGTH,
            read_chunk_size: 512,
        }
    }
}

/// Pulls complete SML transmissions out of a stream
///
/// Bytes read past the end of a transmission are kept and served to the
/// next call, so back-to-back transmissions are not lost.
#[derive(Debug)]
pub struct FrameExtractor {
    scanner: FrameScanner,
    buffer: BytesMut,
    config: ExtractorConfig,
    statistics: FrameStatistics,
}

impl FrameExtractor {
    /// Create an extractor
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            scanner: FrameScanner::with_options(config.verify_crc, config.max_frame_length),
            buffer: BytesMut::with_capacity(config.read_chunk_size),
            config,
            statistics: FrameStatistics::new(),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Get statistics
    pub fn statistics(&self) -> &FrameStatistics {
        &self.statistics
    }

    /// Bytes received but not yet scanned
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop buffered bytes and any partial transmission
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanner.reset();
    }

    /// Read from `stream` until one complete transmission is recognized
    ///
    /// The whole call is bounded by `timeout`. Rejected candidates are
    /// logged and skipped while the deadline allows.
    ///
    /// # Errors
    ///
    /// * `SmlError::Timeout` - no complete transmission before the deadline
    /// * `SmlError::IncompleteFrame` - end of stream before a complete transmission
    /// * `SmlError::Io` - the stream failed
    pub async fn next_frame<S>(&mut self, stream: &mut S, timeout: Duration) -> SmlResult<RawFrame>
    where
        S: StreamAccessor + ?Sized,
    {
        let deadline = Instant::now() + timeout;
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];

        loop {
            if let Some(frame) = self.scan_buffered() {
                return Ok(frame);
            }

            let read = match tokio::time::timeout_at(deadline, stream.read(&mut chunk)).await {
                Ok(read) => read,
                Err(_) => return Err(self.timed_out(timeout)),
            };

            match read {
                Ok(0) => {
                    self.statistics.increment_incomplete_frames();
                    let detail = if self.scanner.in_frame() {
                        "end of stream inside a transmission"
                    } else {
                        "end of stream before a start sequence"
                    };
                    return Err(SmlError::IncompleteFrame(detail.to_string()));
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                // a per-read timeout of the transport only means no data yet
                Err(SmlError::Timeout(_)) => {
                    if Instant::now() >= deadline {
                        return Err(self.timed_out(timeout));
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn scan_buffered(&mut self) -> Option<RawFrame> {
        let mut found = None;
        while found.is_none() && !self.buffer.is_empty() {
            let (consumed, event) = self.scanner.feed(&self.buffer);
            self.buffer.advance(consumed);
            match event {
                ScanEvent::Pending => {}
                ScanEvent::Frame(frame) => {
                    log::debug!("Extracted SML transmission of {} bytes", frame.len());
                    self.statistics.increment_frames_extracted();
                    found = Some(frame);
                }
                ScanEvent::Rejected(reason) => {
                    log::warn!("Dropped SML transmission: {}", reason);
                    self.statistics.increment_frames_rejected();
                    if matches!(reason, RejectReason::CrcMismatch { .. }) {
                        self.statistics.increment_crc_errors();
                    }
                }
            }
        }
        self.statistics.bytes_discarded = self.scanner.discarded_bytes();
        found
    }

    fn timed_out(&mut self, timeout: Duration) -> SmlError {
        self.statistics.increment_timeouts();
        log::debug!("No complete SML transmission within {:?}", timeout);
        SmlError::Timeout(timeout)
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}
