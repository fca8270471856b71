use std::time::Duration;
use thiserror::Error;

/// Main error type for SML reader operations
#[derive(Error, Debug)]
pub enum SmlError {
    #[error("Port busy: {0}")]
    PortBusy(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Unsupported port parameters: {0}")]
    UnsupportedParams(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Incomplete frame: {0}")]
    IncompleteFrame(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl SmlError {
    /// Whether a caller may reasonably retry the same read
    ///
    /// Link errors are surfaced verbatim and are not considered transient.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            SmlError::Timeout(_) | SmlError::IncompleteFrame(_) | SmlError::MalformedMessage(_)
        )
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        SmlError::MalformedMessage(msg.into())
    }
}

/// Result type alias for SML operations
pub type SmlResult<T> = Result<T, SmlError>;
