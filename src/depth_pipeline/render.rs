use tracing::{instrument, trace};

use crate::depth_pipeline::{
    color::scalar_to_argb,
    common::error::{PipelineError, Result},
    config::PipelineConfig,
    decode::{DepthSample, RangeStats},
    frame::{RawDepthFrame, VisualizationFrame},
    normalize::RangeBounds,
    remap::{remap_frame, RotationClass, SourceWindow},
    timing::{StageTimings, Timer},
};

/// Output of one depth frame pass.
#[derive(Debug, Clone)]
pub struct RenderedDepth {
    pub visualization: VisualizationFrame,
    /// Unfiltered samples in output order, ready for a stream file record
    pub record_bytes: Vec<u8>,
    pub stats: RangeStats,
    pub timings: StageTimings,
}

/// Turns raw depth frames into visualization rasters.
#[derive(Debug, Clone)]
pub struct DepthRenderer {
    window: SourceWindow,
    confidence_threshold: f32,
    static_bounds: RangeBounds,
}

impl DepthRenderer {
    pub fn new(config: &PipelineConfig) -> Self {
        let (min, max) = config.static_range_mm;
        Self {
            window: config.source_window(),
            confidence_threshold: config.confidence_threshold,
            static_bounds: RangeBounds::new(min, max),
        }
    }

    pub fn window(&self) -> &SourceWindow {
        &self.window
    }

    #[instrument(level = "trace", skip(self, frame))]
    pub fn render(
        &self,
        frame: &RawDepthFrame,
        rotation: RotationClass,
        dynamic: bool,
    ) -> Result<RenderedDepth> {
        let mut timings = StageTimings::new();

        let timer = Timer::start("remap");
        let remapped = remap_frame(frame, rotation, &self.window, self.confidence_threshold)?;
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        let timer = Timer::start("colorize");
        let bounds = RangeBounds::select(dynamic, &remapped.stats, self.static_bounds);
        let pixels = colorize(&remapped.ranges, bounds);
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        trace!(
            min = remapped.stats.min,
            max = remapped.stats.max,
            total_us = timings.total_duration().as_micros() as u64,
            "Depth frame rendered"
        );

        Ok(RenderedDepth {
            visualization: VisualizationFrame {
                width: remapped.width,
                height: remapped.height,
                pixels,
            },
            record_bytes: remapped.record_bytes,
            stats: remapped.stats,
            timings,
        })
    }

    /// Renders a raster that is already in output order, e.g. a frame read back
    /// from a stream file. No remapping is applied.
    pub fn render_recorded(
        &self,
        samples: &[u16],
        width: usize,
        height: usize,
        dynamic: bool,
    ) -> Result<(VisualizationFrame, RangeStats)> {
        if width * height != samples.len() {
            return Err(PipelineError::FrameSize {
                expected: width * height * 2,
                actual: samples.len() * 2,
            });
        }

        let mut stats = RangeStats::default();
        let ranges: Vec<i16> = samples
            .iter()
            .map(|&raw| {
                let filtered = DepthSample::decode(raw).filtered_range(self.confidence_threshold);
                stats.observe(filtered);
                filtered
            })
            .collect();

        let bounds = RangeBounds::select(dynamic, &stats, self.static_bounds);
        let frame = VisualizationFrame {
            width,
            height,
            pixels: colorize(&ranges, bounds),
        };
        Ok((frame, stats))
    }
}

fn colorize(ranges: &[i16], bounds: RangeBounds) -> Vec<u32> {
    ranges
        .iter()
        .map(|&range| scalar_to_argb(bounds.normalize(range)))
        .collect()
}
