//! DEPTH16 sample decoding
//!
//! Each sample packs a 13-bit range in millimeters and a 3-bit confidence code.
//! Confidence code 0 means full confidence; codes 1..=7 scale linearly as
//! `(code - 1) / 7`.

/// Filtered range assigned to samples rejected by confidence gating.
pub const INVALID_RANGE: i16 = i16::MAX;

const RANGE_MASK: u16 = 0x1FFF;
const CONFIDENCE_SHIFT: u16 = 13;
const CONFIDENCE_MASK: u16 = 0x7;

/// A decoded depth sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthSample {
    /// Range in millimeters (13 bits)
    pub range: u16,
    /// Raw confidence code (3 bits)
    pub confidence_raw: u8,
}

impl DepthSample {
    pub fn decode(sample: u16) -> Self {
        Self {
            range: sample & RANGE_MASK,
            confidence_raw: ((sample >> CONFIDENCE_SHIFT) & CONFIDENCE_MASK) as u8,
        }
    }

    pub fn confidence_fraction(&self) -> f32 {
        if self.confidence_raw == 0 {
            1.0
        } else {
            (self.confidence_raw - 1) as f32 / 7.0
        }
    }

    pub fn is_valid(&self, confidence_threshold: f32) -> bool {
        self.confidence_fraction() > confidence_threshold
    }

    /// Range as used by the visualization path: the measured range when the
    /// sample passes gating, [`INVALID_RANGE`] otherwise.
    pub fn filtered_range(&self, confidence_threshold: f32) -> i16 {
        if self.is_valid(confidence_threshold) {
            self.range as i16
        } else {
            INVALID_RANGE
        }
    }
}

/// Running near/far statistics of one frame.
///
/// Only samples that passed gating with a non-zero range are observed. A frame
/// without any such sample keeps both sentinels (`min == i16::MAX`,
/// `max == i16::MIN`), which [`RangeStats::is_degenerate`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeStats {
    pub min: i16,
    pub max: i16,
}

impl Default for RangeStats {
    fn default() -> Self {
        Self {
            min: i16::MAX,
            max: i16::MIN,
        }
    }
}

impl RangeStats {
    pub fn observe(&mut self, filtered_range: i16) {
        if filtered_range <= 0 || filtered_range == INVALID_RANGE {
            return;
        }
        self.min = self.min.min(filtered_range);
        self.max = self.max.max(filtered_range);
    }

    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    pub fn range_text(&self) -> String {
        format!("Range: {} mm to {} mm", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_splits_fields() {
        for sample in [0u16, 1, 0x1FFF, 0x2000, 0x3ABC, 0xE001, u16::MAX] {
            let decoded = DepthSample::decode(sample);
            assert_eq!(decoded.range, sample & 0x1FFF);
            assert_eq!(decoded.confidence_raw as u16, (sample >> 13) & 0x7);
        }
    }

    #[test]
    fn test_decode_exhaustive() {
        for sample in 0..=u16::MAX {
            let decoded = DepthSample::decode(sample);
            assert_eq!(decoded.range, sample & 0x1FFF);
            assert_eq!(decoded.confidence_raw as u16, (sample >> 13) & 0x7);
        }
    }

    #[test]
    fn test_confidence_mapping() {
        let full = DepthSample { range: 10, confidence_raw: 0 };
        let lowest = DepthSample { range: 10, confidence_raw: 1 };
        let highest = DepthSample { range: 10, confidence_raw: 7 };

        assert_eq!(full.confidence_fraction(), 1.0);
        assert!(lowest.confidence_fraction().abs() < f32::EPSILON);
        assert!((highest.confidence_fraction() - 6.0 / 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_gating() {
        let lowest = DepthSample::decode(0x2000 | 1200);
        let full = DepthSample::decode(1200);

        assert_eq!(lowest.filtered_range(0.0), INVALID_RANGE);
        assert_eq!(full.filtered_range(0.0), 1200);
        // code 4 -> 3/7 ~ 0.43
        let mid = DepthSample::decode((4 << 13) | 800);
        assert_eq!(mid.filtered_range(0.4), 800);
        assert_eq!(mid.filtered_range(0.5), INVALID_RANGE);
    }

    #[test]
    fn test_stats_skip_zero_and_invalid() {
        let mut stats = RangeStats::default();
        for range in [0, INVALID_RANGE, 900, 300, 0, 4000] {
            stats.observe(range);
        }
        assert_eq!(stats, RangeStats { min: 300, max: 4000 });
        assert!(!stats.is_degenerate());
        assert_eq!(stats.range_text(), "Range: 300 mm to 4000 mm");
    }

    #[test]
    fn test_stats_without_samples_are_degenerate() {
        let mut stats = RangeStats::default();
        stats.observe(0);
        stats.observe(INVALID_RANGE);
        assert_eq!(stats.min, i16::MAX);
        assert_eq!(stats.max, i16::MIN);
        assert!(stats.is_degenerate());
    }
}
