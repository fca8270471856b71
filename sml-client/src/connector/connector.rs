//! Connector orchestrating one read cycle per call
//!
//! A read cycle opens the link, extracts one SML transmission within the
//! frame timeout, decodes it and closes the link again. Close runs exactly
//! once per cycle, whichever stage failed.

use super::config::ConnectorConfig;
use crate::error::{ConnectorError, ReadStage};
use async_trait::async_trait;
use sml_codec::SmlFile;
use sml_core::SmlResult;
use sml_session::{FrameExtractor, FrameStatistics};
use sml_transport::{LinkHandle, TransportLayer};
use std::hash::{Hash, Hasher};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Link is closed (initial state, and after every read cycle)
    Closed,
    /// Link is open while a read cycle runs
    Open,
}

impl ConnectionState {
    /// Check if the link is open
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// Anything a host can poll for meter values
///
/// Lets a host keep connectors over different transports side by side.
#[async_trait]
pub trait MeterReader: Send {
    /// Identity of the link this reader polls
    fn handle(&self) -> &LinkHandle;

    /// Run one read cycle
    async fn read_meter_values(&mut self) -> Result<SmlFile, ConnectorError>;
}

/// Reads SML files from a meter over a transport
#[derive(Debug)]
pub struct SmlConnector<T: TransportLayer> {
    transport: T,
    extractor: FrameExtractor,
    config: ConnectorConfig,
    state: ConnectionState,
}

impl<T: TransportLayer> SmlConnector<T> {
    /// Create a connector with default settings
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ConnectorConfig::default())
    }

    /// Create a connector with explicit settings
    pub fn with_config(transport: T, config: ConnectorConfig) -> Self {
        Self {
            transport,
            extractor: FrameExtractor::new(config.extractor_config()),
            config,
            state: ConnectionState::Closed,
        }
    }

    /// Identity of the link
    pub fn handle(&self) -> &LinkHandle {
        self.transport.handle()
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Framing statistics accumulated over all read cycles
    pub fn statistics(&self) -> &FrameStatistics {
        self.extractor.statistics()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Run one read cycle: open, extract, decode, close
    ///
    /// # Errors
    ///
    /// The error carries the stage that failed, with link errors passed
    /// through unchanged. The link is closed before returning, also when
    /// the open failed; a failure while closing is logged only. If the
    /// future is dropped mid-cycle, the next call releases the link first.
    pub async fn read_meter_values(&mut self) -> Result<SmlFile, ConnectorError> {
        let result = match self.open().await {
            Ok(()) => self.read_file().await,
            Err(e) => Err(ConnectorError::new(ReadStage::Open, e)),
        };
        self.close().await;

        match &result {
            Ok(file) => log::debug!("Read {} SML message(s) from {}", file.len(), self.handle()),
            Err(e) => log::debug!("Reading {} failed: {}", self.handle(), e),
        }
        result
    }

    async fn open(&mut self) -> SmlResult<()> {
        if self.state.is_open() || !self.transport.is_closed() {
            // an earlier cycle was dropped before it could close the link
            log::warn!("Releasing {} left open by a cancelled read", self.handle());
            self.close().await;
        }
        self.transport.open().await?;
        // bytes of an earlier session must not leak into this one
        self.extractor.reset();
        self.state = ConnectionState::Open;
        Ok(())
    }

    async fn read_file(&mut self) -> Result<SmlFile, ConnectorError> {
        let frame = self
            .extractor
            .next_frame(&mut self.transport, self.config.frame_timeout)
            .await
            .map_err(|e| ConnectorError::new(ReadStage::Extract, e))?;

        SmlFile::decode(frame.as_bytes(), &self.config.decode_options())
            .map_err(|e| ConnectorError::new(ReadStage::Decode, e))
    }

    async fn close(&mut self) {
        if let Err(e) = self.transport.close().await {
            log::error!("Failed to close {}: {}", self.handle(), e);
        }
        self.state = ConnectionState::Closed;
    }
}

#[async_trait]
impl<T: TransportLayer> MeterReader for SmlConnector<T> {
    fn handle(&self) -> &LinkHandle {
        SmlConnector::handle(self)
    }

    async fn read_meter_values(&mut self) -> Result<SmlFile, ConnectorError> {
        SmlConnector::read_meter_values(self).await
    }
}

impl<T: TransportLayer> PartialEq for SmlConnector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle() == other.handle()
    }
}

impl<T: TransportLayer> Eq for SmlConnector<T> {}

impl<T: TransportLayer> Hash for SmlConnector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle().hash(state);
    }
}
