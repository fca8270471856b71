//! Byte-at-a-time scanner for SML transmissions
//!
//! The scanner performs no I/O. It is fed bytes and reports when a
//! complete transmission has been recognized or a candidate had to be
//! dropped. State is kept per byte, so markers split across reads are
//! recognized.

use crate::transport::constants::{
    END_MARKER, ESCAPE_SEQUENCE, MAX_FILL_BYTES, MAX_FRAME_LENGTH, START_SEQUENCE, START_WINDOW,
    VERSION_1,
};
use crate::transport::frame::RawFrame;
use sml_codec::Crc16;
use std::fmt;

/// Why a candidate transmission was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Transmission CRC does not match the received bytes
    CrcMismatch { expected: [u8; 2], actual: [u8; 2] },
    /// Escape sequence followed by a group that is neither an escaped
    /// escape, a start nor an end
    InvalidEscape([u8; 4]),
    /// Fill count larger than 3 or larger than the payload
    InvalidFill(u8),
    /// Payload grew past the configured maximum
    Overlong(usize),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::CrcMismatch { expected, actual } => write!(
                f,
                "transmission CRC mismatch: expected {:02X}{:02X}, received {:02X}{:02X}",
                expected[0], expected[1], actual[0], actual[1]
            ),
            RejectReason::InvalidEscape(group) => write!(
                f,
                "invalid escape sequence {:02X}{:02X}{:02X}{:02X}",
                group[0], group[1], group[2], group[3]
            ),
            RejectReason::InvalidFill(fill) => write!(f, "invalid fill count {}", fill),
            RejectReason::Overlong(len) => write!(f, "payload longer than {} bytes", len),
        }
    }
}

/// Outcome of feeding bytes to the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// More bytes are needed
    Pending,
    /// A complete transmission was recognized
    Frame(RawFrame),
    /// A candidate transmission was dropped; the scanner is hunting again
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Looking for the start sequence
    Hunting,
    /// Collecting aligned payload groups
    Body,
    /// Collecting the group that follows an escape sequence
    Escape,
}

/// Sans-io state machine recognizing SML transport v1 transmissions
#[derive(Debug, Clone)]
pub struct FrameScanner {
    state: State,
    window: u64,
    group: [u8; 4],
    group_len: usize,
    payload: Vec<u8>,
    crc: Crc16,
    verify_crc: bool,
    max_frame_length: usize,
    hunted: u64,
    discarded: u64,
}

impl FrameScanner {
    /// Create a scanner that verifies the transmission CRC
    pub fn new() -> Self {
        Self::with_options(true, MAX_FRAME_LENGTH)
    }

    /// Create a scanner with explicit CRC policy and payload cap
    pub fn with_options(verify_crc: bool, max_frame_length: usize) -> Self {
        Self {
            state: State::Hunting,
            window: 0,
            group: [0; 4],
            group_len: 0,
            payload: Vec::new(),
            crc: Crc16::new(),
            verify_crc,
            max_frame_length,
            hunted: 0,
            discarded: 0,
        }
    }

    /// Drop any partial transmission and start hunting again
    pub fn reset(&mut self) {
        self.state = State::Hunting;
        self.window = 0;
        self.group_len = 0;
        self.payload.clear();
        self.hunted = 0;
    }

    /// Check whether a start sequence has been seen and the end is still outstanding
    pub fn in_frame(&self) -> bool {
        self.state != State::Hunting
    }

    /// Total bytes skipped while hunting for a start sequence
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    /// Feed bytes until the first event
    ///
    /// Returns the number of bytes consumed together with the event. Bytes
    /// past a recognized or rejected transmission are not consumed.
    pub fn feed(&mut self, bytes: &[u8]) -> (usize, ScanEvent) {
        for (i, &byte) in bytes.iter().enumerate() {
            match self.push(byte) {
                ScanEvent::Pending => {}
                event => return (i + 1, event),
            }
        }
        (bytes.len(), ScanEvent::Pending)
    }

    /// Feed a single byte
    pub fn push(&mut self, byte: u8) -> ScanEvent {
        match self.state {
            State::Hunting => {
                self.window = (self.window << 8) | u64::from(byte);
                self.hunted += 1;
                if self.window == START_WINDOW {
                    self.discarded += self.hunted.saturating_sub(START_SEQUENCE.len() as u64);
                    self.hunted = 0;
                    self.begin();
                }
                ScanEvent::Pending
            }
            State::Body => {
                self.crc.update(byte);
                if !self.collect(byte) {
                    return ScanEvent::Pending;
                }
                if self.group == ESCAPE_SEQUENCE {
                    self.state = State::Escape;
                    return ScanEvent::Pending;
                }
                let group = self.group;
                self.append(&group)
            }
            State::Escape => {
                // the two CRC bytes of the end sequence are not covered
                if self.group_len < 2 || self.group[0] != END_MARKER {
                    self.crc.update(byte);
                }
                if !self.collect(byte) {
                    return ScanEvent::Pending;
                }
                match self.group {
                    ESCAPE_SEQUENCE => {
                        self.state = State::Body;
                        self.append(&ESCAPE_SEQUENCE)
                    }
                    VERSION_1 => {
                        log::debug!(
                            "Start sequence inside transmission, dropping {} payload bytes",
                            self.payload.len()
                        );
                        self.begin();
                        ScanEvent::Pending
                    }
                    [END_MARKER, fill, c1, c2] => self.finish(fill, [c1, c2]),
                    other => self.reject(RejectReason::InvalidEscape(other)),
                }
            }
        }
    }

    fn begin(&mut self) {
        self.state = State::Body;
        self.group_len = 0;
        self.payload.clear();
        self.crc = Crc16::new();
        self.crc.update_bytes(&START_SEQUENCE);
    }

    /// Append a payload group, enforcing the length cap
    fn append(&mut self, group: &[u8; 4]) -> ScanEvent {
        self.payload.extend_from_slice(group);
        if self.payload.len() > self.max_frame_length {
            return self.reject(RejectReason::Overlong(self.max_frame_length));
        }
        ScanEvent::Pending
    }

    /// Add a byte to the current group; true once the group is complete
    fn collect(&mut self, byte: u8) -> bool {
        self.group[self.group_len] = byte;
        self.group_len += 1;
        if self.group_len == 4 {
            self.group_len = 0;
            true
        } else {
            false
        }
    }

    fn finish(&mut self, fill: u8, received: [u8; 2]) -> ScanEvent {
        if fill > MAX_FILL_BYTES || usize::from(fill) > self.payload.len() {
            return self.reject(RejectReason::InvalidFill(fill));
        }
        let expected = self.crc.crc_bytes();
        if self.verify_crc && expected != received {
            return self.reject(RejectReason::CrcMismatch {
                expected,
                actual: received,
            });
        }

        let mut payload = std::mem::take(&mut self.payload);
        payload.truncate(payload.len() - usize::from(fill));
        self.reset();
        ScanEvent::Frame(RawFrame::new(payload))
    }

    fn reject(&mut self, reason: RejectReason) -> ScanEvent {
        self.reset();
        ScanEvent::Rejected(reason)
    }
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract every valid transmission from a captured byte stream
///
/// Rejected candidates are logged and skipped.
pub fn extract_frames(bytes: &[u8]) -> Vec<RawFrame> {
    let mut scanner = FrameScanner::new();
    let mut frames = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let (consumed, event) = scanner.feed(rest);
        rest = &rest[consumed..];
        match event {
            ScanEvent::Frame(frame) => frames.push(frame),
            ScanEvent::Rejected(reason) => log::warn!("Dropped SML transmission: {}", reason),
            ScanEvent::Pending => {}
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::frame::encode_transmission;

    fn scan_one(bytes: &[u8]) -> ScanEvent {
        let mut scanner = FrameScanner::new();
        let (consumed, event) = scanner.feed(bytes);
        assert_eq!(consumed, bytes.len());
        event
    }

    #[test]
    fn test_recognizes_transmission() {
        let payload = [0x76, 0x05, 0x00, 0x00, 0x00, 0x03, 0x62];
        let event = scan_one(&encode_transmission(&payload));
        assert_eq!(event, ScanEvent::Frame(RawFrame::new(payload.to_vec())));
    }

    #[test]
    fn test_unescapes_payload() {
        let payload = [0xAA, 0xBB, 0xCC, 0xDD, 0x1B, 0x1B, 0x1B, 0x1B, 0x01];
        let event = scan_one(&encode_transmission(&payload));
        assert_eq!(event, ScanEvent::Frame(RawFrame::new(payload.to_vec())));
    }

    #[test]
    fn test_skips_noise_and_counts_it() {
        let mut bytes = vec![0x00, 0x1B, 0x1B, 0x01, 0xFF];
        bytes.extend(encode_transmission(&[0x01, 0x02, 0x03, 0x04]));
        let mut scanner = FrameScanner::new();
        let (_, event) = scanner.feed(&bytes);
        assert!(matches!(event, ScanEvent::Frame(_)));
        assert_eq!(scanner.discarded_bytes(), 5);
    }

    #[test]
    fn test_stops_after_trailer() {
        let mut bytes = encode_transmission(&[0x01, 0x02, 0x03, 0x04]);
        let frame_len = bytes.len();
        bytes.extend_from_slice(&[0xEE, 0xEE]);

        let mut scanner = FrameScanner::new();
        let (consumed, event) = scanner.feed(&bytes);
        assert_eq!(consumed, frame_len);
        assert!(matches!(event, ScanEvent::Frame(_)));
        assert!(!scanner.in_frame());
    }

    #[test]
    fn test_split_markers() {
        let bytes = encode_transmission(&[0x1B, 0x1B, 0x1B, 0x1B, 0x42]);
        let mut scanner = FrameScanner::new();
        let mut frames = Vec::new();
        for &byte in &bytes {
            if let ScanEvent::Frame(frame) = scanner.push(byte) {
                frames.push(frame);
            }
        }
        assert_eq!(frames, vec![RawFrame::new(vec![0x1B, 0x1B, 0x1B, 0x1B, 0x42])]);
    }

    #[test]
    fn test_crc_mismatch_rejected() {
        let mut bytes = encode_transmission(&[0x01, 0x02, 0x03, 0x04]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            scan_one(&bytes),
            ScanEvent::Rejected(RejectReason::CrcMismatch { .. })
        ));

        // accepted when verification is off
        let mut scanner = FrameScanner::with_options(false, MAX_FRAME_LENGTH);
        let (_, event) = scanner.feed(&bytes);
        assert!(matches!(event, ScanEvent::Frame(_)));
    }

    #[test]
    fn test_invalid_escape_rejected() {
        let mut bytes = START_SEQUENCE.to_vec();
        bytes.extend_from_slice(&ESCAPE_SEQUENCE);
        bytes.extend_from_slice(&[0x02, 0x02, 0x02, 0x02]);
        assert_eq!(
            scan_one(&bytes),
            ScanEvent::Rejected(RejectReason::InvalidEscape([0x02; 4]))
        );
    }

    #[test]
    fn test_invalid_fill_rejected() {
        let mut bytes = START_SEQUENCE.to_vec();
        bytes.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        bytes.extend_from_slice(&ESCAPE_SEQUENCE);
        bytes.extend_from_slice(&[END_MARKER, 0x04, 0x00, 0x00]);
        assert_eq!(
            scan_one(&bytes),
            ScanEvent::Rejected(RejectReason::InvalidFill(4))
        );
    }

    #[test]
    fn test_overlong_rejected() {
        let mut scanner = FrameScanner::with_options(true, 8);
        let bytes = encode_transmission(&[0x11; 12]);
        let (_, event) = scanner.feed(&bytes);
        assert_eq!(event, ScanEvent::Rejected(RejectReason::Overlong(8)));
    }

    #[test]
    fn test_overlong_escaped_payload_rejected() {
        let mut scanner = FrameScanner::with_options(true, 8);
        let bytes = encode_transmission(&[0x1B; 16]);
        let (_, event) = scanner.feed(&bytes);
        assert_eq!(event, ScanEvent::Rejected(RejectReason::Overlong(8)));
        assert!(!scanner.in_frame());
    }

    #[test]
    fn test_restart_inside_frame() {
        // a meter that restarts mid-transmission: only the second one counts
        let mut bytes = START_SEQUENCE.to_vec();
        bytes.extend_from_slice(&[0x99; 8]);
        bytes.extend(encode_transmission(&[0x01, 0x02, 0x03, 0x04]));
        assert_eq!(
            scan_one(&bytes),
            ScanEvent::Frame(RawFrame::new(vec![0x01, 0x02, 0x03, 0x04]))
        );
    }

    #[test]
    fn test_extract_frames_from_capture() {
        let mut capture = vec![0xFF, 0x00];
        capture.extend(encode_transmission(&[0x01]));
        let mut broken = encode_transmission(&[0x02]);
        broken[10] ^= 0x01;
        capture.extend(broken);
        capture.extend(encode_transmission(&[0x03, 0x04]));
        capture.extend_from_slice(&START_SEQUENCE);

        let frames = extract_frames(&capture);
        assert_eq!(
            frames,
            vec![RawFrame::new(vec![0x01]), RawFrame::new(vec![0x03, 0x04])]
        );
    }
}
