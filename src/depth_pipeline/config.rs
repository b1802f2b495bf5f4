//! Pipeline configuration types

use std::path::PathBuf;
use std::time::Duration;

use crate::depth_pipeline::common::error::{PipelineError, Result};
use crate::depth_pipeline::remap::SourceWindow;

/// Static configuration of the depth pipeline, built once at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Native sensor width in samples
    pub sensor_width: usize,
    /// Native sensor height in samples
    pub sensor_height: usize,
    /// Width of the sampled window (output and recording raster)
    pub scaled_width: usize,
    /// Height of the sampled window (output and recording raster)
    pub scaled_height: usize,
    /// Per-device lens alignment offset along the sensor rows
    pub width_offset: usize,
    /// Per-device lens alignment offset along the sensor columns
    pub height_offset: usize,
    /// Bytes per raw sample in stream files
    pub bytes_per_pixel: usize,
    /// Platform identifier written in stream file headers
    pub platform_id: u8,
    /// Samples with a confidence fraction at or below this are filtered out
    pub confidence_threshold: f32,
    /// Fixed (min, max) range in millimeters used when dynamic ranging is off
    pub static_range_mm: (i16, i16),
    /// Requested depth stream rate, informational
    pub depth_target_fps: u32,
    /// Requested colour stream rate, informational
    pub main_target_fps: u32,
    /// Capacity of the inbound frame queue
    pub frame_queue_capacity: usize,
    /// Wait before a one-shot capture is armed
    pub capture_settle_delay: Duration,
    /// Rolling window for frame-rate accounting
    pub fps_window: Duration,
    /// Directory that receives capture and recording files
    pub output_dir: PathBuf,
    /// Whether depth frames are visualized when nothing is being persisted
    pub previewing: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sensor_width: 320,
            sensor_height: 240,
            scaled_width: 310,
            scaled_height: 205,
            width_offset: 0,
            height_offset: 5,
            bytes_per_pixel: 2,
            platform_id: 0,
            confidence_threshold: 0.0,
            static_range_mm: (0, 5000),
            depth_target_fps: 20,
            main_target_fps: 30,
            frame_queue_capacity: 50,
            capture_settle_delay: Duration::from_millis(4000),
            fps_window: Duration::from_millis(1000),
            output_dir: PathBuf::from("captures"),
            previewing: true,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    pub fn source_window(&self) -> SourceWindow {
        SourceWindow {
            sensor_width: self.sensor_width,
            sensor_height: self.sensor_height,
            scaled_width: self.scaled_width,
            scaled_height: self.scaled_height,
            width_offset: self.width_offset,
            height_offset: self.height_offset,
        }
    }

    /// Size in bytes of one raw frame payload in a stream file.
    pub fn record_frame_bytes(&self) -> usize {
        self.scaled_width * self.scaled_height * self.bytes_per_pixel
    }

    pub fn validate(&self) -> Result<()> {
        if self.sensor_width == 0 || self.sensor_height == 0 {
            return Err(PipelineError::InvalidDimensions(self.sensor_width, self.sensor_height));
        }
        if self.scaled_width == 0 || self.scaled_height == 0 {
            return Err(PipelineError::InvalidDimensions(self.scaled_width, self.scaled_height));
        }
        if self.scaled_width + self.width_offset > self.sensor_width
            || self.scaled_height + self.height_offset > self.sensor_height
        {
            return Err(PipelineError::InvalidConfig(format!(
                "window {}x{} at offset ({}, {}) exceeds sensor {}x{}",
                self.scaled_width,
                self.scaled_height,
                self.width_offset,
                self.height_offset,
                self.sensor_width,
                self.sensor_height
            )));
        }
        if self.bytes_per_pixel != 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "bytes_per_pixel must be 2 for 16-bit samples, got {}",
                self.bytes_per_pixel
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "confidence_threshold {} is outside [0, 1]",
                self.confidence_threshold
            )));
        }
        let (min, max) = self.static_range_mm;
        if min >= max {
            return Err(PipelineError::InvalidConfig(format!(
                "static range min {} must be below max {}",
                min, max
            )));
        }
        if self.frame_queue_capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "frame_queue_capacity must be positive".to_string(),
            ));
        }
        if self.fps_window.is_zero() {
            return Err(PipelineError::InvalidConfig(
                "fps_window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    sensor_size: Option<(usize, usize)>,
    scaled_size: Option<(usize, usize)>,
    offsets: Option<(usize, usize)>,
    platform_id: Option<u8>,
    confidence_threshold: Option<f32>,
    static_range_mm: Option<(i16, i16)>,
    target_fps: Option<(u32, u32)>,
    frame_queue_capacity: Option<usize>,
    capture_settle_delay: Option<Duration>,
    fps_window: Option<Duration>,
    output_dir: Option<PathBuf>,
    previewing: Option<bool>,
}

impl PipelineConfigBuilder {
    pub fn sensor_size(mut self, width: usize, height: usize) -> Self {
        self.sensor_size = Some((width, height));
        self
    }

    pub fn scaled_size(mut self, width: usize, height: usize) -> Self {
        self.scaled_size = Some((width, height));
        self
    }

    pub fn offsets(mut self, width_offset: usize, height_offset: usize) -> Self {
        self.offsets = Some((width_offset, height_offset));
        self
    }

    pub fn platform_id(mut self, platform_id: u8) -> Self {
        self.platform_id = Some(platform_id);
        self
    }

    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = Some(threshold);
        self
    }

    pub fn static_range_mm(mut self, min: i16, max: i16) -> Self {
        self.static_range_mm = Some((min, max));
        self
    }

    pub fn target_fps(mut self, depth: u32, main: u32) -> Self {
        self.target_fps = Some((depth, main));
        self
    }

    pub fn frame_queue_capacity(mut self, capacity: usize) -> Self {
        self.frame_queue_capacity = Some(capacity);
        self
    }

    pub fn capture_settle_delay(mut self, delay: Duration) -> Self {
        self.capture_settle_delay = Some(delay);
        self
    }

    pub fn fps_window(mut self, window: Duration) -> Self {
        self.fps_window = Some(window);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn previewing(mut self, enable: bool) -> Self {
        self.previewing = Some(enable);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        let (sensor_width, sensor_height) = self
            .sensor_size
            .unwrap_or((default.sensor_width, default.sensor_height));
        let (scaled_width, scaled_height) = self
            .scaled_size
            .unwrap_or((default.scaled_width, default.scaled_height));
        let (width_offset, height_offset) = self
            .offsets
            .unwrap_or((default.width_offset, default.height_offset));
        let (depth_target_fps, main_target_fps) = self
            .target_fps
            .unwrap_or((default.depth_target_fps, default.main_target_fps));
        PipelineConfig {
            sensor_width,
            sensor_height,
            scaled_width,
            scaled_height,
            width_offset,
            height_offset,
            bytes_per_pixel: default.bytes_per_pixel,
            platform_id: self.platform_id.unwrap_or(default.platform_id),
            confidence_threshold: self.confidence_threshold.unwrap_or(default.confidence_threshold),
            static_range_mm: self.static_range_mm.unwrap_or(default.static_range_mm),
            depth_target_fps,
            main_target_fps,
            frame_queue_capacity: self.frame_queue_capacity.unwrap_or(default.frame_queue_capacity),
            capture_settle_delay: self.capture_settle_delay.unwrap_or(default.capture_settle_delay),
            fps_window: self.fps_window.unwrap_or(default.fps_window),
            output_dir: self.output_dir.unwrap_or(default.output_dir),
            previewing: self.previewing.unwrap_or(default.previewing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.record_frame_bytes(), 310 * 205 * 2);
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::builder()
            .sensor_size(4, 4)
            .scaled_size(4, 4)
            .offsets(0, 0)
            .confidence_threshold(0.5)
            .capture_settle_delay(Duration::ZERO)
            .previewing(false)
            .build();

        assert_eq!(config.sensor_width, 4);
        assert_eq!(config.scaled_height, 4);
        assert_eq!(config.height_offset, 0);
        assert_eq!(config.confidence_threshold, 0.5);
        assert!(config.capture_settle_delay.is_zero());
        assert!(!config.previewing);
        assert_eq!(config.static_range_mm, (0, 5000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_exceeding_sensor_is_rejected() {
        let config = PipelineConfig::builder()
            .sensor_size(320, 240)
            .scaled_size(310, 240)
            .offsets(0, 5)
            .build();

        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_inverted_static_range_is_rejected() {
        let config = PipelineConfig::builder().static_range_mm(100, 100).build();
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));
    }
}
