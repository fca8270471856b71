//! SML transport protocol v1 framing

pub mod constants;
pub mod extractor;
pub mod frame;
pub mod scanner;
pub mod statistics;

pub use constants::{
    DEFAULT_FRAME_TIMEOUT, END_MARKER, ESCAPE_SEQUENCE, MAX_FILL_BYTES, MAX_FRAME_LENGTH,
    START_SEQUENCE, VERSION_1,
};
pub use extractor::{ExtractorConfig, FrameExtractor};
pub use frame::{RawFrame, encode_transmission};
pub use scanner::{FrameScanner, RejectReason, ScanEvent, extract_frames};
pub use statistics::FrameStatistics;
