//! Range normalization into the `[0, 240]` hue domain

use crate::depth_pipeline::decode::RangeStats;

/// Upper end of the normalized domain (blue end of the hue wheel).
pub const MAX_SCALAR: f32 = 240.0;

/// Value returned for every range when the bounds carry no spread.
/// Maps to "far", so degenerate frames render fully transparent.
pub const DEGENERATE_SCALAR: f32 = MAX_SCALAR;

/// Inclusive range bounds in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeBounds {
    pub min: i16,
    pub max: i16,
}

impl RangeBounds {
    pub fn new(min: i16, max: i16) -> Self {
        Self { min, max }
    }

    /// Picks the frame's observed bounds when `dynamic` is set, the static ones otherwise.
    pub fn select(dynamic: bool, stats: &RangeStats, static_bounds: RangeBounds) -> Self {
        if dynamic {
            Self::new(stats.min, stats.max)
        } else {
            static_bounds
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    pub fn normalize(&self, range: i16) -> f32 {
        if self.is_degenerate() {
            return DEGENERATE_SCALAR;
        }
        let min = self.min as f32;
        let max = self.max as f32;
        let clamped = (range as f32).clamp(min, max);
        (clamped - min) / (max - min) * MAX_SCALAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth_pipeline::decode::INVALID_RANGE;

    #[test]
    fn test_static_bounds() {
        let bounds = RangeBounds::new(0, 5000);
        assert_eq!(bounds.normalize(0), 0.0);
        assert_eq!(bounds.normalize(2500), 120.0);
        assert_eq!(bounds.normalize(5000), 240.0);
        assert_eq!(bounds.normalize(INVALID_RANGE), 240.0);
        assert_eq!(bounds.normalize(-20), 0.0);
    }

    #[test]
    fn test_output_bounded_and_monotonic() {
        for (min, max) in [(0i16, 5000i16), (300, 301), (-100, 100), (1000, 8191)] {
            let bounds = RangeBounds::new(min, max);
            let mut previous = f32::MIN;
            for range in (-200i16..9000).step_by(7) {
                let value = bounds.normalize(range);
                assert!((0.0..=MAX_SCALAR).contains(&value), "{} out of bounds", value);
                assert!(value >= previous);
                previous = value;
            }
        }
    }

    #[test]
    fn test_degenerate_bounds_use_fallback() {
        let sentinels = RangeBounds::select(true, &RangeStats::default(), RangeBounds::new(0, 5000));
        let flat = RangeBounds::new(700, 700);

        for bounds in [sentinels, flat] {
            for range in [0, 700, INVALID_RANGE, i16::MIN] {
                let value = bounds.normalize(range);
                assert!(value.is_finite());
                assert_eq!(value, DEGENERATE_SCALAR);
            }
        }
    }

    #[test]
    fn test_select() {
        let stats = RangeStats { min: 10, max: 20 };
        let fixed = RangeBounds::new(0, 5000);
        assert_eq!(RangeBounds::select(true, &stats, fixed), RangeBounds::new(10, 20));
        assert_eq!(RangeBounds::select(false, &stats, fixed), fixed);
    }
}
