//! Escape sequences of the SML transport protocol v1

use std::time::Duration;

/// Escape group; a literal occurrence inside the payload is sent twice
pub const ESCAPE_SEQUENCE: [u8; 4] = [0x1B, 0x1B, 0x1B, 0x1B];
/// Group following the escape at the start of a version 1 transmission
pub const VERSION_1: [u8; 4] = [0x01, 0x01, 0x01, 0x01];
/// Escape plus version group
pub const START_SEQUENCE: [u8; 8] = [0x1B, 0x1B, 0x1B, 0x1B, 0x01, 0x01, 0x01, 0x01];
/// First byte of the group following the escape at the end of a transmission
pub const END_MARKER: u8 = 0x1A;
/// Padding keeps the payload 4-byte aligned, so at most 3 fill bytes
pub const MAX_FILL_BYTES: u8 = 3;
/// Default cap on the unescaped payload of one transmission
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;
/// Default bound on one frame extraction
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_millis(5000);

pub(crate) const START_WINDOW: u64 = u64::from_be_bytes(START_SEQUENCE);
