//! Frame extraction statistics

/// Frame extractor statistics
///
/// Counters accumulate over the lifetime of an extractor and survive
/// [`FrameExtractor::reset`](crate::FrameExtractor::reset).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStatistics {
    /// Transmissions handed to the decoder
    pub frames_extracted: u64,
    /// Candidate transmissions dropped for any reason
    pub frames_rejected: u64,
    /// Rejections caused by a transmission CRC mismatch
    pub crc_errors: u64,
    /// Bytes skipped while hunting for a start sequence
    pub bytes_discarded: u64,
    /// Extractions that ran into the frame timeout
    pub timeouts: u64,
    /// Extractions that hit end of stream before a complete frame
    pub incomplete_frames: u64,
}

impl FrameStatistics {
    /// Create new statistics with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all statistics counters
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn increment_frames_extracted(&mut self) {
        self.frames_extracted += 1;
    }

    pub fn increment_frames_rejected(&mut self) {
        self.frames_rejected += 1;
    }

    pub fn increment_crc_errors(&mut self) {
        self.crc_errors += 1;
    }

    pub fn increment_timeouts(&mut self) {
        self.timeouts += 1;
    }

    pub fn increment_incomplete_frames(&mut self) {
        self.incomplete_frames += 1;
    }

    /// Get the share of candidate transmissions that were rejected, in percent
    ///
    /// Returns 0.0 if no transmission has been seen.
    pub fn error_rate(&self) -> f64 {
        let total = self.frames_extracted + self.frames_rejected;
        if total == 0 {
            0.0
        } else {
            (self.frames_rejected as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_rate() {
        let mut stats = FrameStatistics::new();
        assert_eq!(stats.error_rate(), 0.0);

        stats.increment_frames_extracted();
        stats.increment_frames_extracted();
        stats.increment_frames_extracted();
        stats.increment_frames_rejected();
        assert_eq!(stats.error_rate(), 25.0);

        stats.clear();
        assert_eq!(stats, FrameStatistics::default());
    }
}
