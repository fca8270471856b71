//! Stage-tagged connector errors

use sml_core::SmlError;
use std::fmt;
use thiserror::Error;

/// Step of a read cycle at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadStage {
    /// Opening the link
    Open,
    /// Extracting a transmission from the byte stream
    Extract,
    /// Decoding the extracted transmission
    Decode,
}

impl fmt::Display for ReadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadStage::Open => "open",
            ReadStage::Extract => "extract",
            ReadStage::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// Failure of a read cycle, tagged with the stage that failed
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct ConnectorError {
    pub stage: ReadStage,
    pub source: SmlError,
}

impl ConnectorError {
    pub fn new(stage: ReadStage, source: SmlError) -> Self {
        Self { stage, source }
    }

    /// Whether polling again later may succeed
    pub fn is_retriable(&self) -> bool {
        self.source.is_retriable()
    }

    /// Take the underlying error
    pub fn into_inner(self) -> SmlError {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::time::Duration;

    #[test]
    fn test_display_and_source() {
        let err = ConnectorError::new(ReadStage::Extract, SmlError::Timeout(Duration::from_secs(5)));
        assert_eq!(err.to_string(), "extract stage failed: Timeout after 5s");
        assert!(err.source().is_some());
        assert!(err.is_retriable());

        let err = ConnectorError::new(ReadStage::Open, SmlError::PortBusy("COM3".to_string()));
        assert!(!err.is_retriable());
        assert!(matches!(err.into_inner(), SmlError::PortBusy(_)));
    }
}
