//! Orientation-dependent pixel remapping
//!
//! The sampled window of the sensor is walked once per frame. Every output
//! coordinate `(x, y)` with `x < scaled_width`, `y < scaled_height` reads one
//! source sample and writes:
//! - the filtered range into the visualization raster, and
//! - the untouched sample (little-endian) into the recording buffer,
//!
//! both at the same output index. The two rotation classes differ in the
//! output index (transposed or not) and in the direction source rows advance.

use crate::depth_pipeline::common::error::{PipelineError, Result};
use crate::depth_pipeline::decode::{DepthSample, RangeStats};
use crate::depth_pipeline::frame::RawDepthFrame;

/// Device rotation classes with a dedicated mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationClass {
    /// Display rotation 0: output is transposed and source rows are read bottom-to-top
    Natural,
    /// Display rotation 90: output keeps sensor axes and source rows are read top-to-bottom
    Rotated90,
}

impl RotationClass {
    /// Classifies a display rotation hint (quarter turns). Hints other than
    /// 0 and 1 have no dedicated mapping and fall back to `Natural`.
    pub fn from_hint(hint: u8) -> Self {
        match hint {
            1 => RotationClass::Rotated90,
            _ => RotationClass::Natural,
        }
    }

    /// `(width, height)` of the output raster.
    pub fn output_dims(&self, window: &SourceWindow) -> (usize, usize) {
        match self {
            RotationClass::Natural => (window.scaled_height, window.scaled_width),
            RotationClass::Rotated90 => (window.scaled_width, window.scaled_height),
        }
    }

    pub fn source_index(&self, window: &SourceWindow, x: usize, y: usize) -> usize {
        match self {
            RotationClass::Natural => window.natural_source_index(x, y),
            RotationClass::Rotated90 => window.rotated_source_index(x, y),
        }
    }

    pub fn output_index(&self, window: &SourceWindow, x: usize, y: usize) -> usize {
        match self {
            RotationClass::Natural => window.natural_output_index(x, y),
            RotationClass::Rotated90 => window.rotated_output_index(x, y),
        }
    }
}

/// Calibrated window of the sensor that is sampled each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceWindow {
    pub sensor_width: usize,
    pub sensor_height: usize,
    pub scaled_width: usize,
    pub scaled_height: usize,
    pub width_offset: usize,
    pub height_offset: usize,
}

impl SourceWindow {
    pub fn natural_source_index(&self, x: usize, y: usize) -> usize {
        self.sensor_width * (self.sensor_height - 1 - (y + self.height_offset)) + (x + self.width_offset)
    }

    pub fn natural_output_index(&self, x: usize, y: usize) -> usize {
        self.scaled_height * x + y
    }

    pub fn rotated_source_index(&self, x: usize, y: usize) -> usize {
        self.sensor_width * (y + self.height_offset) + (x + self.width_offset)
    }

    pub fn rotated_output_index(&self, x: usize, y: usize) -> usize {
        self.scaled_width * y + x
    }

    pub fn output_len(&self) -> usize {
        self.scaled_width * self.scaled_height
    }

    fn check_frame(&self, frame: &RawDepthFrame) -> Result<()> {
        if frame.width() != self.sensor_width || frame.height() != self.sensor_height {
            return Err(PipelineError::InvalidDimensions(frame.width(), frame.height()));
        }
        Ok(())
    }
}

/// Result of one remapping pass.
#[derive(Debug, Clone)]
pub struct RemappedFrame {
    pub width: usize,
    pub height: usize,
    /// Filtered ranges in output order
    pub ranges: Vec<i16>,
    /// Raw samples in output order, little-endian
    pub record_bytes: Vec<u8>,
    pub stats: RangeStats,
}

pub fn remap_frame(
    frame: &RawDepthFrame,
    rotation: RotationClass,
    window: &SourceWindow,
    confidence_threshold: f32,
) -> Result<RemappedFrame> {
    window.check_frame(frame)?;

    let len = window.output_len();
    let samples = frame.samples();
    let mut ranges = vec![0i16; len];
    let mut record_bytes = vec![0u8; len * 2];
    let mut stats = RangeStats::default();

    for y in 0..window.scaled_height {
        for x in 0..window.scaled_width {
            let index = rotation.output_index(window, x, y);
            let raw = samples[rotation.source_index(window, x, y)];

            record_bytes[index * 2..index * 2 + 2].copy_from_slice(&raw.to_le_bytes());

            let filtered = DepthSample::decode(raw).filtered_range(confidence_threshold);
            stats.observe(filtered);
            ranges[index] = filtered;
        }
    }

    let (width, height) = rotation.output_dims(window);
    Ok(RemappedFrame {
        width,
        height,
        ranges,
        record_bytes,
        stats,
    })
}
